//! One-shot IDR(s) solve over slices.

use super::solver::IdrSolver;
use crate::config::IdrConfig;
use crate::error::{Error, Result};
use crate::model::OperatorModel;
use crate::operator::RealOperator;
use crate::preconditioner::RealPreconditioner;

/// Result of a one-shot IDR(s) solve.
#[derive(Debug, Clone)]
pub struct IdrResult {
    /// Solution vector.
    pub x: Vec<f64>,
    /// Number of iterations performed.
    pub iterations: usize,
    /// Final relative residual of the recurrence.
    pub residual: f64,
    /// Whether the solver converged.
    pub converged: bool,
    /// Residual norm after every iteration.
    pub history: Vec<f64>,
}

/// Solve `A x = b` with right-preconditioned IDR(s), starting from `x = 0`.
///
/// # Arguments
/// * `op` - The matrix operator A
/// * `precond` - The preconditioner M (approximates A)
/// * `b` - Right-hand side vector
/// * `config` - IDR(s) configuration
pub fn solve_idrs(
    op: &dyn RealOperator,
    precond: &dyn RealPreconditioner,
    b: &[f64],
    config: &IdrConfig,
) -> Result<IdrResult> {
    let model = OperatorModel::new(op, precond)?;
    let n = model.dim();
    if b.len() != n {
        return Err(Error::DimensionMismatch {
            expected: n,
            actual: b.len(),
        });
    }

    let mut solver = IdrSolver::with_config(model, config.clone())?;
    solver.set_initial_guess(vec![0.0; n]);
    solver.set_rhs(b.to_vec());

    let outcome = solver.solve()?;
    if !outcome.converged() {
        log::warn!(
            "IDR(s) did not converge after {} iterations (residual: {:.2e})",
            solver.iterations(),
            solver.relative_residual()
        );
    }

    let iterations = solver.iterations();
    let residual = solver.relative_residual();
    let history = solver.residual_history().to_vec();
    let x = solver.into_solution().unwrap_or_else(|| vec![0.0; n]);

    Ok(IdrResult {
        x,
        iterations,
        residual,
        converged: outcome.converged(),
        history,
    })
}

//! IDR(s) iterative solver for non-symmetric linear systems.
//!
//! IDR(s) forces residuals into a sequence of nested subspaces of shrinking
//! dimension, each step making the residual orthogonal to a fixed random
//! shadow space of dimension `s`. In exact arithmetic it terminates after at
//! most `n + n/s` matrix applications.
//!
//! # Usage
//!
//! ```ignore
//! use idrs_solver::{IdrConfig, IdrSolver, OperatorModel};
//!
//! let model = OperatorModel::new(&operator, &preconditioner)?;
//! let mut solver = IdrSolver::with_config(model, IdrConfig::default().with_s(8))?;
//! solver.set_initial_guess(vec![0.0; n]);
//! solver.set_rhs(b);
//! let outcome = solver.solve()?;
//! ```
//!
//! # Module Structure
//!
//! - [`solver`] - The stateful [`IdrSolver`] and its main recurrence
//! - [`diagnostics`] - Iteration status, residual history export, explicit residual
//! - [`driver`] - One-shot slice-level entry point

pub mod diagnostics;
pub mod driver;
pub mod solver;

pub use diagnostics::format_significant;
pub use driver::{IdrResult, solve_idrs};
pub use solver::IdrSolver;

use crate::error::Result;

/// How a solve that did not fail ended.
///
/// Both variants report status `0`: running out of iterations has always been
/// reported as success to callers that only look at the status code. Use
/// [`SolveOutcome::converged`] to tell them apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveOutcome {
    /// `||r|| <= tol * ||b||`.
    Converged,
    /// The iteration budget ran out first.
    IterationsExhausted,
}

impl SolveOutcome {
    /// Whether the tolerance was met.
    pub fn converged(self) -> bool {
        self == SolveOutcome::Converged
    }

    /// Always `true`; see the type-level docs.
    pub fn is_success(self) -> bool {
        true
    }

    /// Classic integer status, always `0`.
    pub fn status_code(self) -> i32 {
        0
    }
}

/// Integer status of a solve: `0` for either outcome, the error's code otherwise.
pub fn status_code(result: &Result<SolveOutcome>) -> i32 {
    match result {
        Ok(outcome) => outcome.status_code(),
        Err(err) => err.status_code(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn outcome_status() {
        assert_eq!(SolveOutcome::Converged.status_code(), 0);
        assert_eq!(SolveOutcome::IterationsExhausted.status_code(), 0);
        assert!(SolveOutcome::IterationsExhausted.is_success());
        assert!(!SolveOutcome::IterationsExhausted.converged());
        assert!(SolveOutcome::Converged.converged());
    }

    #[test]
    fn status_of_results() {
        assert_eq!(status_code(&Ok(SolveOutcome::Converged)), 0);
        assert_eq!(
            status_code(&Err(Error::Breakdown {
                iteration: 0,
                stage: 0
            })),
            -1
        );
        assert_eq!(status_code(&Err(Error::Setup("initial guess"))), 1);
    }
}

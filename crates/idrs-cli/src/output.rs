//! Solve summary formatting.

use idrs_solver::{IdrConfig, IdrSolver, ModelOps, SolveOutcome};
use serde::Serialize;

/// What a finished solve reports back to the user.
#[derive(Debug, Clone, Serialize)]
pub struct SolveSummary {
    pub n: usize,
    pub s: usize,
    pub preconditioner: String,
    pub converged: bool,
    pub iterations: usize,
    pub cycles: usize,
    pub replacements: usize,
    pub relative_residual: f64,
    pub explicit_residual: f64,
    pub tolerance: f64,
}

impl SolveSummary {
    pub fn collect<M: ModelOps>(
        solver: &IdrSolver<M>,
        outcome: SolveOutcome,
        config: &IdrConfig,
        preconditioner: &str,
        n: usize,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            n,
            s: config.s,
            preconditioner: preconditioner.to_string(),
            converged: outcome.converged(),
            iterations: solver.iterations(),
            cycles: solver.cycles(),
            replacements: solver.replacements(),
            relative_residual: solver.relative_residual(),
            explicit_residual: solver.explicit_residual_norm()?,
            tolerance: config.tol,
        })
    }

    pub fn to_text(&self) -> String {
        let status = if self.converged {
            "converged"
        } else {
            "iteration budget exhausted"
        };
        let mut out = String::new();
        out.push_str(&format!(
            "IDR({}) on convection-diffusion, n = {}, preconditioner: {}\n",
            self.s, self.n, self.preconditioner
        ));
        out.push_str(&format!("Status:             {status}\n"));
        out.push_str(&format!("Iterations:         {}\n", self.iterations));
        out.push_str(&format!("Cycles:             {}\n", self.cycles));
        out.push_str(&format!("Replacements:       {}\n", self.replacements));
        out.push_str(&format!(
            "Relative residual:  {:.6e} (tol {:.1e})\n",
            self.relative_residual, self.tolerance
        ));
        out.push_str(&format!("Explicit residual:  {:.6e}", self.explicit_residual));
        out
    }
}

/// Print the leading and trailing entries of the solution.
pub fn print_solution_excerpt(x: &[f64], count: usize) {
    println!("\nSolution:");
    let n = x.len();
    if n <= 2 * count {
        for (i, xi) in x.iter().enumerate() {
            println!("  x[{i}] = {xi:.9}");
        }
        return;
    }
    for (i, xi) in x.iter().enumerate().take(count) {
        println!("  x[{i}] = {xi:.9}");
    }
    println!("  ...");
    for (i, xi) in x.iter().enumerate().skip(n - count) {
        println!("  x[{i}] = {xi:.9}");
    }
}

//! Iteration status, residual history and explicit residual checks.
//!
//! None of these mutate solve state; they read what the last
//! [`solve`](IdrSolver::solve) left behind.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use rand::Rng;

use super::solver::{IdrSolver, apply_matrix};
use crate::error::{Error, Result};
use crate::model::ModelOps;
use crate::vector::VectorOps;

/// Significant digits written per residual-history entry.
pub const HISTORY_DIGITS: usize = 12;

/// Format `value` with `digits` significant digits, choosing fixed or
/// exponential notation the way C's `%g` does and dropping trailing zeros.
pub fn format_significant(value: f64, digits: usize) -> String {
    if value == 0.0 {
        return if value.is_sign_negative() { "-0" } else { "0" }.to_string();
    }
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }

    let digits = digits.max(1);
    let sci = format!("{:.*e}", digits - 1, value);
    let Some((mantissa, exp)) = sci.split_once('e') else {
        return sci;
    };
    let exp: i32 = exp.parse().unwrap_or(0);

    if exp < -4 || exp >= digits as i32 {
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{}e{sign}{:02}", trim_fraction(mantissa), exp.abs())
    } else {
        let decimals = (digits as i32 - 1 - exp) as usize;
        trim_fraction(&format!("{value:.decimals$}")).to_string()
    }
}

fn trim_fraction(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

/// Write one value per line with [`HISTORY_DIGITS`] significant digits.
pub fn write_history<W: Write>(writer: &mut W, history: &[f64]) -> std::io::Result<()> {
    for &value in history {
        writeln!(writer, "{}", format_significant(value, HISTORY_DIGITS))?;
    }
    Ok(())
}

impl<M: ModelOps, R: Rng> IdrSolver<M, R> {
    /// Iterations performed by the last solve.
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Completed G-space cycles in the last solve.
    pub fn cycles(&self) -> usize {
        self.cycles
    }

    /// Recurrence residual norm `||r||`.
    pub fn residual_norm(&self) -> f64 {
        self.normr
    }

    /// Absolute convergence threshold `tol * ||b||` of the last solve.
    pub fn tolerance_threshold(&self) -> f64 {
        self.tolb
    }

    /// `||r|| / ||b||`, or `||r||` when `b` is zero.
    pub fn relative_residual(&self) -> f64 {
        if self.normb > 0.0 {
            self.normr / self.normb
        } else {
            self.normr
        }
    }

    /// Residual norms, one per iteration, starting with the initial residual.
    pub fn residual_history(&self) -> &[f64] {
        &self.history
    }

    /// Residual replacements performed in the last solve.
    pub fn replacements(&self) -> usize {
        self.replacements
    }

    /// Recompute `||b - A x|| / ||b||` from scratch.
    ///
    /// Independent of the recurrence residual, so comparing the two shows how
    /// far the recurrence has drifted. Returns the absolute norm when `b` is
    /// zero.
    pub fn explicit_residual_norm(&self) -> Result<f64> {
        let x = self.x.as_ref().ok_or(Error::Setup("initial guess"))?;
        let b = self.b.as_ref().ok_or(Error::Setup("right-hand side"))?;

        let mut r = x.clone();
        apply_matrix(&self.model, x, &mut r)?;
        r.update(1.0, b, -1.0);

        let normb = b.norm();
        let normr = r.norm();
        Ok(if normb > 0.0 { normr / normb } else { normr })
    }

    /// Write the residual history to `path`, one value per line.
    ///
    /// An empty history is not an error: a warning is logged and `Ok(false)`
    /// returned without touching the file.
    pub fn write_residual_history(&self, path: impl AsRef<Path>) -> Result<bool> {
        let path = path.as_ref();
        if self.history.is_empty() {
            log::warn!(
                "residual history is empty, nothing written to {}",
                path.display()
            );
            return Ok(false);
        }

        let mut writer = BufWriter::new(File::create(path)?);
        write_history(&mut writer, &self.history)?;
        writer.flush()?;
        Ok(true)
    }

    /// Log the residual history as `index value` lines.
    pub fn log_residual_history(&self) {
        for (i, value) in self.history.iter().enumerate() {
            log::info!("{i} {value:e}");
        }
    }

    /// Log the shadow space Gram matrix and return its orthonormality defect.
    pub fn log_shadow_space(&self) -> Option<f64> {
        let space = self.shadow.as_ref()?;
        let gram = space.gram_matrix();
        log::info!("IDR(s): shadow space of dimension {}", space.dim());
        for i in 0..space.dim() {
            for j in 0..space.dim() {
                log::info!("i={i} j={j} P(:,i)^T P(:,j)={:e}", gram[(i, j)]);
            }
        }
        Some(space.orthonormality_defect())
    }

    pub(crate) fn log_status(&self) {
        if self.config.verbosity > 4 {
            log::info!(
                "iteration: {} residual: {:e} rel. tol: {:e}",
                self.iterations,
                self.normr,
                self.tolb
            );
        } else {
            log::trace!(
                "iteration: {} residual: {:e} rel. tol: {:e}",
                self.iterations,
                self.normr,
                self.tolb
            );
        }
    }
}

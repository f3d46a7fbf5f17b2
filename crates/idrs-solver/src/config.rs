//! IDR(s) solver configuration.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// IDR(s) solver configuration.
///
/// Deserializes with every field optional, so a partial JSON object such as
/// `{"s": 8, "tol": 1e-10}` overrides only the named values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdrConfig {
    /// Shadow-space dimension.
    pub s: usize,
    /// Stabilization threshold for the relaxation parameter, in (0, 1].
    pub angle: f64,
    /// Convergence tolerance (relative residual).
    pub tol: f64,
    /// Maximum number of iterations (matrix applications after setup).
    pub max_iterations: usize,
    /// Reuse the initial search space of the previous solve.
    pub reuse_search_space: bool,
    /// Residual smoothing. Not supported; must stay `false`.
    pub smoothing: bool,
    /// Replace the recurrence residual by `b - A x` when drift is detected.
    pub residual_replacement: bool,
    /// Diagnostic verbosity level.
    pub verbosity: u32,
    /// Constant close to machine precision used in the drift test
    /// `||r|| > tol * ||b|| / replacement_threshold`.
    pub replacement_threshold: f64,
    /// Seed for the shadow-space random source. `None` draws from OS entropy.
    pub seed: Option<u64>,
}

impl Default for IdrConfig {
    fn default() -> Self {
        Self {
            s: 4,
            angle: 0.7,
            tol: 1e-8,
            max_iterations: 1000,
            reuse_search_space: true,
            smoothing: false,
            residual_replacement: false,
            verbosity: 0,
            replacement_threshold: 1e-13,
            seed: None,
        }
    }
}

impl IdrConfig {
    /// Tolerance used when a solver is constructed with its problem attached.
    pub const PROBLEM_TOL: f64 = 1e-6;

    /// Set the shadow-space dimension.
    pub fn with_s(mut self, s: usize) -> Self {
        self.s = s;
        self
    }

    /// Set the stabilization angle.
    pub fn with_angle(mut self, angle: f64) -> Self {
        self.angle = angle;
        self
    }

    /// Set the relative tolerance.
    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    /// Set the iteration budget.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Enable or disable reuse of the initial search space.
    pub fn with_reuse_search_space(mut self, reuse: bool) -> Self {
        self.reuse_search_space = reuse;
        self
    }

    /// Enable or disable residual replacement.
    pub fn with_residual_replacement(mut self, enabled: bool) -> Self {
        self.residual_replacement = enabled;
        self
    }

    /// Set the verbosity level.
    pub fn with_verbosity(mut self, verbosity: u32) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Seed the shadow-space random source.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Check every value is in range.
    pub fn validate(&self) -> Result<()> {
        if self.s == 0 {
            return Err(Error::InvalidConfig("s must be at least 1".into()));
        }
        if !(self.angle > 0.0 && self.angle <= 1.0) {
            return Err(Error::InvalidConfig(format!(
                "angle must lie in (0, 1], got {}",
                self.angle
            )));
        }
        if !(self.tol.is_finite() && self.tol > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "tol must be positive and finite, got {}",
                self.tol
            )));
        }
        if !(self.replacement_threshold.is_finite() && self.replacement_threshold > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "replacement_threshold must be positive and finite, got {}",
                self.replacement_threshold
            )));
        }
        if self.smoothing {
            return Err(Error::Unsupported("residual smoothing".into()));
        }
        Ok(())
    }

    /// Residual norm above which the recurrence is considered to have drifted.
    pub(crate) fn drift_threshold(&self, tolb: f64) -> f64 {
        tolb / self.replacement_threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idr_config_default() {
        let config = IdrConfig::default();
        assert_eq!(config.s, 4);
        assert!((config.angle - 0.7).abs() < 1e-15);
        assert!((config.tol - 1e-8).abs() < 1e-20);
        assert_eq!(config.max_iterations, 1000);
        assert!(config.reuse_search_space);
        assert!(!config.smoothing);
        assert!(!config.residual_replacement);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_out_of_range() {
        assert!(IdrConfig::default().with_s(0).validate().is_err());
        assert!(IdrConfig::default().with_angle(0.0).validate().is_err());
        assert!(IdrConfig::default().with_angle(1.5).validate().is_err());
        assert!(IdrConfig::default().with_tol(-1.0).validate().is_err());
        assert!(IdrConfig::default().with_tol(f64::NAN).validate().is_err());
        assert!(IdrConfig::default().with_angle(1.0).validate().is_ok());
    }

    #[test]
    fn smoothing_is_unsupported() {
        let config = IdrConfig {
            smoothing: true,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::Unsupported(_))));
    }

    #[test]
    fn partial_json_overrides_defaults() {
        let config: IdrConfig =
            serde_json::from_str(r#"{"s": 8, "tol": 1e-10, "seed": 3}"#).unwrap();
        assert_eq!(config.s, 8);
        assert!((config.tol - 1e-10).abs() < 1e-20);
        assert_eq!(config.seed, Some(3));
        assert_eq!(config.max_iterations, 1000);
        assert!((config.angle - 0.7).abs() < 1e-15);
    }
}

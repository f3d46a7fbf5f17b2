//! Error types for the IDR(s) solver.

use thiserror::Error;

/// Boxed collaborator error, as returned by a model's matrix or preconditioner.
pub type ModelError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur while configuring or running the solver.
#[derive(Debug, Error)]
pub enum Error {
    /// Initial guess or right-hand side was not supplied before solving.
    #[error("Problem not set up: missing {0}")]
    Setup(&'static str),

    /// A diagonal entry of the small projected system is exactly zero.
    #[error("Breakdown at iteration {iteration}, stage {stage}: M[k][k] == 0")]
    Breakdown { iteration: usize, stage: usize },

    /// The relaxation parameter is undefined (zero-norm or orthogonal update direction).
    #[error("Breakdown computing omega: {0}")]
    OmegaBreakdown(&'static str),

    /// A configuration value is out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A recognized option requests a feature this solver does not provide.
    #[error("Unsupported option: {0}")]
    Unsupported(String),

    /// A shadow space could not be built or does not fit the problem.
    #[error("Invalid shadow space: {0}")]
    InvalidShadowSpace(String),

    /// Vector or operator sizes disagree.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Matrix or preconditioner application failed.
    #[error("Model error: {0}")]
    Model(#[source] ModelError),

    /// I/O error while exporting diagnostics.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Integer status for callers that expect the classic solver return code.
    ///
    /// `1` for setup problems, `-1` for numerical breakdown, `2` otherwise.
    pub fn status_code(&self) -> i32 {
        match self {
            Error::Setup(_) => 1,
            Error::Breakdown { .. } | Error::OmegaBreakdown(_) => -1,
            _ => 2,
        }
    }

    /// Whether this error is a numerical breakdown of the recurrence.
    pub fn is_breakdown(&self) -> bool {
        matches!(self, Error::Breakdown { .. } | Error::OmegaBreakdown(_))
    }

    pub(crate) fn model(err: impl Into<ModelError>) -> Self {
        Error::Model(err.into())
    }
}

/// Result type for solver operations.
pub type Result<T> = std::result::Result<T, Error>;

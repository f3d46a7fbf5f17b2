//! Model capability consumed by the solver.
//!
//! A model owns the physics: how to apply the system matrix and the
//! preconditioner. The solver treats both as opaque, possibly failing,
//! possibly communicating operations and propagates their errors unmodified.

use crate::error::{Error, ModelError};
use crate::operator::RealOperator;
use crate::preconditioner::RealPreconditioner;
use crate::vector::VectorOps;

/// Matrix and preconditioner application for one linear system.
pub trait ModelOps {
    /// Vector type the model operates on.
    type Vector: VectorOps;

    /// Failure type of the model's operations.
    type Error: Into<ModelError>;

    /// Compute `y = A * x`.
    fn apply_matrix(&self, x: &Self::Vector, y: &mut Self::Vector) -> Result<(), Self::Error>;

    /// Compute `y = M^(-1) * x`.
    fn apply_precon(&self, x: &Self::Vector, y: &mut Self::Vector) -> Result<(), Self::Error>;
}

impl<M: ModelOps + ?Sized> ModelOps for &M {
    type Vector = M::Vector;
    type Error = M::Error;

    fn apply_matrix(&self, x: &Self::Vector, y: &mut Self::Vector) -> Result<(), Self::Error> {
        (**self).apply_matrix(x, y)
    }

    fn apply_precon(&self, x: &Self::Vector, y: &mut Self::Vector) -> Result<(), Self::Error> {
        (**self).apply_precon(x, y)
    }
}

/// Adapts a slice-level operator and preconditioner pair into a [`ModelOps`]
/// over `Vec<f64>`.
pub struct OperatorModel<'a> {
    op: &'a dyn RealOperator,
    precond: &'a dyn RealPreconditioner,
}

impl<'a> OperatorModel<'a> {
    /// Pair an operator with a preconditioner of the same dimension.
    pub fn new(op: &'a dyn RealOperator, precond: &'a dyn RealPreconditioner) -> Result<Self, Error> {
        if precond.dim() != op.dim() {
            return Err(Error::DimensionMismatch {
                expected: op.dim(),
                actual: precond.dim(),
            });
        }
        Ok(Self { op, precond })
    }

    /// Dimension of the system.
    pub fn dim(&self) -> usize {
        self.op.dim()
    }

    fn check(&self, x: &[f64], y: &[f64]) -> Result<(), Error> {
        let n = self.op.dim();
        for len in [x.len(), y.len()] {
            if len != n {
                return Err(Error::DimensionMismatch {
                    expected: n,
                    actual: len,
                });
            }
        }
        Ok(())
    }
}

impl ModelOps for OperatorModel<'_> {
    type Vector = Vec<f64>;
    type Error = Error;

    fn apply_matrix(&self, x: &Vec<f64>, y: &mut Vec<f64>) -> Result<(), Error> {
        self.check(x, y)?;
        self.op.apply(x, y);
        Ok(())
    }

    fn apply_precon(&self, x: &Vec<f64>, y: &mut Vec<f64>) -> Result<(), Error> {
        self.check(x, y)?;
        self.precond.apply(x, y);
        Ok(())
    }
}

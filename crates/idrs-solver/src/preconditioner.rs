//! Preconditioners for the IDR(s) solver.
//!
//! The solver applies the preconditioner on the right: every new search
//! direction is `M^(-1) v`, and the residual it tracks is the residual of the
//! original system.

use crate::sparse_operator::SparseRealOperator;

/// A preconditioner for real-valued linear systems.
///
/// Given a linear system Ax = b, a preconditioner M approximates A and
/// `apply` computes `y = M^(-1) * x`.
pub trait RealPreconditioner: Send + Sync {
    /// Apply the preconditioner: y = M^(-1) * x.
    fn apply(&self, x: &[f64], y: &mut [f64]);

    /// Dimension of the preconditioner.
    fn dim(&self) -> usize;
}

/// Diagonal entries below this magnitude are treated as 1.
const PIVOT_FLOOR: f64 = 1e-30;

/// Jacobi preconditioner, `M = diag(A)`.
#[derive(Debug, Clone)]
pub struct JacobiPreconditioner {
    inv_diag: Vec<f64>,
}

fn invert_diagonal(diag: &[f64]) -> Vec<f64> {
    diag.iter()
        .map(|&d| if d.abs() < PIVOT_FLOOR { 1.0 } else { d.recip() })
        .collect()
}

impl JacobiPreconditioner {
    /// Build from `(row, col, value)` triplets; repeated diagonal entries add up.
    pub fn from_triplets(size: usize, triplets: &[(usize, usize, f64)]) -> Self {
        let mut diag = vec![0.0; size];
        for &(row, col, value) in triplets {
            if row == col && row < size {
                diag[row] += value;
            }
        }

        Self {
            inv_diag: invert_diagonal(&diag),
        }
    }

    /// Create from a diagonal vector.
    pub fn from_diagonal(diag: &[f64]) -> Self {
        Self {
            inv_diag: invert_diagonal(diag),
        }
    }

    /// Create from the stored diagonal of a sparse operator.
    pub fn from_sparse(op: &SparseRealOperator) -> Self {
        Self::from_diagonal(&op.diagonal())
    }

    /// `1 / diag(A)` as applied.
    pub fn inverse_diagonal(&self) -> &[f64] {
        &self.inv_diag
    }
}

impl RealPreconditioner for JacobiPreconditioner {
    fn apply(&self, x: &[f64], y: &mut [f64]) {
        assert_eq!(x.len(), self.dim());
        assert_eq!(y.len(), self.dim());

        for ((yi, xi), di) in y.iter_mut().zip(x).zip(&self.inv_diag) {
            *yi = di * xi;
        }
    }

    fn dim(&self) -> usize {
        self.inv_diag.len()
    }
}

/// No preconditioning, `M = I`.
#[derive(Debug, Clone, Copy)]
pub struct IdentityPreconditioner {
    size: usize,
}

impl IdentityPreconditioner {
    /// Create an identity preconditioner of the given size.
    pub fn new(size: usize) -> Self {
        Self { size }
    }
}

impl RealPreconditioner for IdentityPreconditioner {
    fn apply(&self, x: &[f64], y: &mut [f64]) {
        y.copy_from_slice(x);
    }

    fn dim(&self) -> usize {
        self.size
    }
}

//! Slice-level linear operators.
//!
//! [`RealOperator`] is the matrix-free interface: anything that can compute
//! `y = A * x` can be handed to [`OperatorModel`](crate::model::OperatorModel)
//! and solved with IDR(s).

use nalgebra::{DMatrix, DVectorView, DVectorViewMut};

/// A real-valued linear operator `y = A * x`.
pub trait RealOperator: Send + Sync {
    /// Apply the operator: y = A * x.
    fn apply(&self, x: &[f64], y: &mut [f64]);

    /// Dimension of the (square) operator.
    fn dim(&self) -> usize;
}

/// Diagonal operator `A = diag(d)`.
#[derive(Debug, Clone)]
pub struct DiagonalOperator {
    diag: Vec<f64>,
}

impl DiagonalOperator {
    /// Create from the diagonal entries.
    pub fn new(diag: Vec<f64>) -> Self {
        Self { diag }
    }

    /// Diagonal entries.
    pub fn diagonal(&self) -> &[f64] {
        &self.diag
    }
}

impl RealOperator for DiagonalOperator {
    fn apply(&self, x: &[f64], y: &mut [f64]) {
        assert_eq!(x.len(), self.diag.len());
        assert_eq!(y.len(), self.diag.len());

        for ((yi, &xi), &di) in y.iter_mut().zip(x).zip(&self.diag) {
            *yi = di * xi;
        }
    }

    fn dim(&self) -> usize {
        self.diag.len()
    }
}

/// Dense operator backed by a nalgebra matrix.
#[derive(Debug, Clone)]
pub struct DenseOperator {
    matrix: DMatrix<f64>,
}

impl DenseOperator {
    /// Wrap a square matrix. Returns `None` if the matrix is not square.
    pub fn new(matrix: DMatrix<f64>) -> Option<Self> {
        (matrix.nrows() == matrix.ncols()).then_some(Self { matrix })
    }

    /// Build from row-major nested vectors.
    pub fn from_rows(rows: &[Vec<f64>]) -> Option<Self> {
        let n = rows.len();
        if rows.iter().any(|row| row.len() != n) {
            return None;
        }
        Self::new(DMatrix::from_fn(n, n, |i, j| rows[i][j]))
    }

    /// Get a reference to the underlying matrix.
    pub fn matrix(&self) -> &DMatrix<f64> {
        &self.matrix
    }
}

impl RealOperator for DenseOperator {
    fn apply(&self, x: &[f64], y: &mut [f64]) {
        let n = self.matrix.nrows();
        assert_eq!(x.len(), n);
        assert_eq!(y.len(), n);

        let x = DVectorView::from_slice(x, n);
        let mut y = DVectorViewMut::from_slice(y, n);
        y.gemv(1.0, &self.matrix, &x, 0.0);
    }

    fn dim(&self) -> usize {
        self.matrix.nrows()
    }
}

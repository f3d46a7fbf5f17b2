//! Sparse matrix operator for iterative solvers.
//!
//! [`SparseRealOperator`] implements [`RealOperator`] for faer's sparse column
//! matrices, so assembled sparse systems can be solved with IDR(s).

use crate::operator::RealOperator;
use faer::sparse::{SparseColMat, Triplet};

/// Compressed-sparse-column operator backed by faer.
pub struct SparseRealOperator {
    matrix: SparseColMat<usize, f64>,
}

impl SparseRealOperator {
    /// Wrap an assembled faer matrix.
    pub fn from_matrix(matrix: SparseColMat<usize, f64>) -> Self {
        Self { matrix }
    }

    /// Assemble a square `size` x `size` operator from `(row, col, value)`
    /// triplets, summing duplicates.
    pub fn from_triplets(size: usize, triplets: &[(usize, usize, f64)]) -> Option<Self> {
        let entries: Vec<_> = triplets
            .iter()
            .map(|&(row, col, value)| Triplet::new(row, col, value))
            .collect();

        let matrix = SparseColMat::try_new_from_triplets(size, size, &entries).ok()?;
        Some(Self::from_matrix(matrix))
    }

    /// The underlying faer matrix.
    pub fn matrix(&self) -> &SparseColMat<usize, f64> {
        &self.matrix
    }

    /// Number of stored entries.
    pub fn nnz(&self) -> usize {
        self.matrix.as_ref().val().len()
    }

    /// Main diagonal, zero where no entry is stored.
    pub fn diagonal(&self) -> Vec<f64> {
        let view = self.matrix.as_ref();
        let col_ptr = view.col_ptr();
        let rows = view.row_idx();
        let vals = view.val();

        let mut diag = vec![0.0; self.dim()];
        for (col, d) in diag.iter_mut().enumerate() {
            let range = col_ptr[col]..col_ptr[col + 1];
            for (&row, &v) in rows[range.clone()].iter().zip(&vals[range]) {
                if row == col {
                    *d += v;
                }
            }
        }
        diag
    }
}

impl RealOperator for SparseRealOperator {
    fn dim(&self) -> usize {
        self.matrix.nrows()
    }

    fn apply(&self, x: &[f64], y: &mut [f64]) {
        assert_eq!(x.len(), self.dim());
        assert_eq!(y.len(), self.dim());

        let view = self.matrix.as_ref();
        let col_ptr = view.col_ptr();
        let rows = view.row_idx();
        let vals = view.val();

        y.fill(0.0);
        // y += A[:, col] * x[col], column by column
        for (col, &xc) in x.iter().enumerate() {
            if xc == 0.0 {
                continue;
            }
            let range = col_ptr[col]..col_ptr[col + 1];
            for (&row, &v) in rows[range.clone()].iter().zip(&vals[range]) {
                y[row] += v * xc;
            }
        }
    }
}

/// Triplets of the 1D convection-diffusion operator `-u'' + pe * u'` on the
/// unit interval with homogeneous Dirichlet ends, central differences on `n`
/// interior points, scaled by `h^2`.
///
/// The matrix is non-symmetric for `pe != 0`; for `pe * h < 2` it is still
/// diagonally dominant.
pub fn convection_diffusion_triplets(n: usize, peclet: f64) -> Vec<(usize, usize, f64)> {
    let h = 1.0 / (n as f64 + 1.0);
    let lower = -1.0 - 0.5 * peclet * h;
    let upper = -1.0 + 0.5 * peclet * h;

    let mut triplets = Vec::with_capacity(3 * n);
    for i in 0..n {
        triplets.push((i, i, 2.0));
        if i > 0 {
            triplets.push((i, i - 1, lower));
        }
        if i + 1 < n {
            triplets.push((i, i + 1, upper));
        }
    }
    triplets
}

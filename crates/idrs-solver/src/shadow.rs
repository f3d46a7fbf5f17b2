//! Random orthonormal shadow space.
//!
//! The shadow space `P = [p_0, ..., p_{s-1}]` is the fixed target every
//! residual is made orthogonal to. It is drawn once and reused for the
//! lifetime of a solver unless explicitly rebuilt.

use nalgebra::DMatrix;
use rand::Rng;

use crate::error::{Error, Result};
use crate::vector::VectorOps;

/// Tolerance on `|p_i . p_j - delta_ij|` for caller-supplied bases.
pub const ORTHONORMALITY_TOL: f64 = 1e-10;

/// An ordered set of `s` mutually orthonormal vectors.
#[derive(Debug, Clone, PartialEq)]
pub struct ShadowSpace<V> {
    vectors: Vec<V>,
}

impl<V: VectorOps> ShadowSpace<V> {
    /// Draw `s` random vectors shaped like `template` and orthonormalize them
    /// with a single pass of classical Gram-Schmidt.
    ///
    /// There is no re-orthogonalization; a draw that becomes exactly zero
    /// after projection is reported as an error.
    pub fn build<R: Rng + ?Sized>(s: usize, template: &V, rng: &mut R) -> Result<Self> {
        if s > template.len() {
            return Err(Error::InvalidShadowSpace(format!(
                "dimension {s} exceeds problem size {}",
                template.len()
            )));
        }

        let mut vectors: Vec<V> = Vec::with_capacity(s);
        for j in 0..s {
            let mut p = template.clone();
            p.random_fill(rng);

            // Classical Gram-Schmidt: all projections use the raw draw
            let coeffs: Vec<f64> = vectors.iter().map(|q| q.dot(&p)).collect();
            for (q, alpha) in vectors.iter().zip(coeffs) {
                p.update(-alpha, q, 1.0);
            }

            let norm = p.norm();
            if norm == 0.0 || !norm.is_finite() {
                return Err(Error::InvalidShadowSpace(format!(
                    "random draw {j} is linearly dependent on previous vectors"
                )));
            }
            p.scale(1.0 / norm);
            vectors.push(p);
        }

        Ok(Self { vectors })
    }

    /// Wrap caller-supplied vectors, checking they are orthonormal.
    pub fn from_vectors(vectors: Vec<V>) -> Result<Self> {
        if vectors.is_empty() {
            return Err(Error::InvalidShadowSpace("no vectors supplied".into()));
        }
        let n = vectors[0].len();
        if let Some(v) = vectors.iter().find(|v| v.len() != n) {
            return Err(Error::DimensionMismatch {
                expected: n,
                actual: v.len(),
            });
        }

        let space = Self { vectors };
        let defect = space.orthonormality_defect();
        if !(defect < ORTHONORMALITY_TOL) {
            return Err(Error::InvalidShadowSpace(format!(
                "vectors are not orthonormal (defect {defect:.3e})"
            )));
        }
        Ok(space)
    }

    /// Number of shadow vectors `s`.
    pub fn dim(&self) -> usize {
        self.vectors.len()
    }

    /// Length of each shadow vector.
    pub fn vector_len(&self) -> usize {
        self.vectors.first().map_or(0, VectorOps::len)
    }

    /// Shadow vector `i`.
    pub fn get(&self, i: usize) -> &V {
        &self.vectors[i]
    }

    /// All shadow vectors in order.
    pub fn vectors(&self) -> &[V] {
        &self.vectors
    }

    /// Gram matrix `G[i][j] = p_i . p_j`.
    pub fn gram_matrix(&self) -> DMatrix<f64> {
        let s = self.dim();
        DMatrix::from_fn(s, s, |i, j| self.vectors[i].dot(&self.vectors[j]))
    }

    /// Largest deviation of the Gram matrix from the identity.
    pub fn orthonormality_defect(&self) -> f64 {
        let gram = self.gram_matrix();
        let identity = DMatrix::<f64>::identity(self.dim(), self.dim());
        (gram - identity).amax()
    }
}

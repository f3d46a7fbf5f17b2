//! Vector capability consumed by the solver.
//!
//! The solver never indexes into vectors. Everything it needs is expressed
//! through [`VectorOps`], so a distributed vector type can implement the
//! reductions (`dot`, `norm`) as global collectives without the solver
//! knowing about it.

use nalgebra::DVector;
use rand::Rng;

/// Linear-algebra operations the IDR(s) recurrence needs from a vector type.
///
/// `Clone` produces a vector of the same shape/distribution; it is used as
/// the template for every work vector the solver allocates.
pub trait VectorOps: Clone {
    /// Global number of entries.
    fn len(&self) -> usize;

    /// Whether the vector has no entries.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Inner product `self · other`.
    fn dot(&self, other: &Self) -> f64;

    /// Euclidean norm.
    fn norm(&self) -> f64 {
        self.dot(self).sqrt()
    }

    /// In-place combination `self = alpha * a + beta * self`.
    fn update(&mut self, alpha: f64, a: &Self, beta: f64);

    /// In-place scaling `self = c * self`.
    fn scale(&mut self, c: f64);

    /// Overwrite with uniform samples from `[-1, 1)`.
    fn random_fill<R: Rng + ?Sized>(&mut self, rng: &mut R);
}

fn slice_dot(a: &[f64], b: &[f64]) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    a.iter().zip(b).map(|(&ai, &bi)| ai * bi).sum()
}

fn slice_update(y: &mut [f64], alpha: f64, a: &[f64], beta: f64) {
    debug_assert_eq!(y.len(), a.len());
    if beta == 1.0 {
        for (yi, &ai) in y.iter_mut().zip(a) {
            *yi += alpha * ai;
        }
    } else {
        for (yi, &ai) in y.iter_mut().zip(a) {
            *yi = alpha * ai + beta * *yi;
        }
    }
}

fn slice_random_fill<R: Rng + ?Sized>(y: &mut [f64], rng: &mut R) {
    for yi in y.iter_mut() {
        *yi = rng.random_range(-1.0..1.0);
    }
}

impl VectorOps for Vec<f64> {
    fn len(&self) -> usize {
        self.as_slice().len()
    }

    fn dot(&self, other: &Self) -> f64 {
        slice_dot(self, other)
    }

    fn update(&mut self, alpha: f64, a: &Self, beta: f64) {
        slice_update(self, alpha, a, beta);
    }

    fn scale(&mut self, c: f64) {
        self.iter_mut().for_each(|yi| *yi *= c);
    }

    fn random_fill<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        slice_random_fill(self, rng);
    }
}

impl VectorOps for DVector<f64> {
    fn len(&self) -> usize {
        self.nrows()
    }

    fn dot(&self, other: &Self) -> f64 {
        slice_dot(self.as_slice(), other.as_slice())
    }

    fn update(&mut self, alpha: f64, a: &Self, beta: f64) {
        slice_update(self.as_mut_slice(), alpha, a.as_slice(), beta);
    }

    fn scale(&mut self, c: f64) {
        *self *= c;
    }

    fn random_fill<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        slice_random_fill(self.as_mut_slice(), rng);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn vec_norm() {
        let v: Vec<f64> = vec![3.0, 4.0];
        assert!((v.norm() - 5.0).abs() < 1e-15);
    }

    #[test]
    fn vec_update_combines() {
        let mut y: Vec<f64> = vec![1.0, 2.0, 3.0];
        let a = vec![1.0, 1.0, 1.0];
        y.update(2.0, &a, -1.0);
        assert_eq!(y, vec![1.0, 0.0, -1.0]);

        y.update(0.5, &a, 1.0);
        assert_eq!(y, vec![1.5, 0.5, -0.5]);
    }

    #[test]
    fn dvector_matches_vec() {
        let a: Vec<f64> = vec![1.0, -2.0, 0.5];
        let b: Vec<f64> = vec![4.0, 1.0, 2.0];
        let da = DVector::from_vec(a.clone());
        let db = DVector::from_vec(b.clone());

        assert_eq!(a.dot(&b), VectorOps::dot(&da, &db));

        let mut y = b.clone();
        let mut dy = db.clone();
        y.update(-3.0, &a, 2.0);
        dy.update(-3.0, &da, 2.0);
        assert_eq!(y.as_slice(), dy.as_slice());

        VectorOps::scale(&mut dy, 0.5);
        assert!((dy[0] - 0.5 * y[0]).abs() < 1e-15);
    }

    #[test]
    fn random_fill_is_seeded() {
        let mut a: Vec<f64> = vec![0.0; 16];
        let mut b: Vec<f64> = vec![0.0; 16];
        a.random_fill(&mut StdRng::seed_from_u64(7));
        b.random_fill(&mut StdRng::seed_from_u64(7));
        assert_eq!(a, b);
        assert!(a.iter().all(|&v| (-1.0..1.0).contains(&v)));
        assert!(a.norm() > 0.0);
    }
}

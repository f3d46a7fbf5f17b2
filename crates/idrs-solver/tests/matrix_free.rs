//! IDR(s) driven by a matrix-free model over nalgebra vectors.

use std::convert::Infallible;

use idrs_solver::{IdrConfig, IdrSolver, ModelOps, VectorOps};
use nalgebra::DVector;

/// 5-point convection-diffusion stencil on an `nx` x `nx` grid, never assembled.
struct Stencil2d {
    nx: usize,
    convection: f64,
}

impl Stencil2d {
    fn len(&self) -> usize {
        self.nx * self.nx
    }
}

impl ModelOps for Stencil2d {
    type Vector = DVector<f64>;
    type Error = Infallible;

    fn apply_matrix(&self, x: &DVector<f64>, y: &mut DVector<f64>) -> Result<(), Infallible> {
        let nx = self.nx;
        let c = self.convection;
        for j in 0..nx {
            for i in 0..nx {
                let k = j * nx + i;
                let mut acc = 4.0 * x[k];
                if i > 0 {
                    acc -= (1.0 + c) * x[k - 1];
                }
                if i + 1 < nx {
                    acc -= (1.0 - c) * x[k + 1];
                }
                if j > 0 {
                    acc -= x[k - nx];
                }
                if j + 1 < nx {
                    acc -= x[k + nx];
                }
                y[k] = acc;
            }
        }
        Ok(())
    }

    fn apply_precon(&self, x: &DVector<f64>, y: &mut DVector<f64>) -> Result<(), Infallible> {
        y.copy_from(x);
        VectorOps::scale(y, 0.25);
        Ok(())
    }
}

fn solve(model: &Stencil2d, s: usize) -> (usize, f64) {
    let n = model.len();
    let config = IdrConfig::default().with_s(s).with_tol(1e-9).with_seed(7);
    let mut solver = IdrSolver::with_config(model, config).unwrap();
    solver.set_initial_guess(DVector::zeros(n));
    solver.set_rhs(DVector::from_element(n, 1.0));

    assert!(solver.solve().unwrap().converged(), "s = {s} did not converge");
    (solver.iterations(), solver.explicit_residual_norm().unwrap())
}

#[test]
fn matrix_free_stencil_converges_for_several_s() {
    let model = Stencil2d {
        nx: 16,
        convection: 0.3,
    };
    for s in [1, 2, 4, 8] {
        let (iterations, explicit) = solve(&model, s);
        assert!(iterations > 0);
        assert!(explicit < 1e-7, "s = {s}: explicit residual {explicit}");
    }
}

#[test]
fn borrowed_model_is_a_model() {
    let model = Stencil2d {
        nx: 4,
        convection: 0.0,
    };
    let x = DVector::from_element(16, 1.0);
    let mut y = DVector::zeros(16);
    (&model).apply_matrix(&x, &mut y).unwrap();
    // Interior rows of the Laplacian annihilate constants
    assert_eq!(y[5], 0.0);
    assert_eq!(y[0], 2.0);
}

//! The IDR(s) recurrence.

use nalgebra::DMatrix;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::SolveOutcome;
use crate::config::IdrConfig;
use crate::error::{Error, Result};
use crate::model::ModelOps;
use crate::omega::omega;
use crate::shadow::ShadowSpace;
use crate::vector::VectorOps;

/// Stateful IDR(s) solver.
///
/// Owns the shadow space and the cached initial search space, both of which
/// survive across [`solve`](IdrSolver::solve) calls. A solver must not be
/// driven by more than one caller at a time; `solve` takes `&mut self`.
pub struct IdrSolver<M: ModelOps, R = StdRng> {
    pub(crate) model: M,
    pub(crate) config: IdrConfig,
    rng: R,
    pub(crate) x: Option<M::Vector>,
    pub(crate) b: Option<M::Vector>,
    pub(crate) shadow: Option<ShadowSpace<M::Vector>>,
    initial_space: Vec<M::Vector>,
    pub(crate) iterations: usize,
    pub(crate) cycles: usize,
    pub(crate) normr: f64,
    pub(crate) normb: f64,
    pub(crate) tolb: f64,
    pub(crate) replacements: usize,
    pub(crate) history: Vec<f64>,
}

fn seeded_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}

pub(crate) fn apply_matrix<M: ModelOps>(model: &M, x: &M::Vector, y: &mut M::Vector) -> Result<()> {
    model.apply_matrix(x, y).map_err(Error::model)
}

fn apply_precon<M: ModelOps>(model: &M, x: &M::Vector, y: &mut M::Vector) -> Result<()> {
    model.apply_precon(x, y).map_err(Error::model)
}

/// Draw a shadow space shaped like `template`, logging each vector's norm
/// above verbosity 9.
fn draw_shadow_space<V: VectorOps, R: Rng>(
    config: &IdrConfig,
    template: &V,
    rng: &mut R,
) -> Result<ShadowSpace<V>> {
    let space = ShadowSpace::build(config.s, template, rng)?;
    if config.verbosity > 9 {
        for (i, p) in space.vectors().iter().enumerate() {
            log::debug!("IDR(s): shadow vector {i}: norm {:.12e}", p.norm());
        }
    }
    Ok(space)
}

/// `vs[dst] -= alpha * vs[src]` for `src < dst`.
fn subtract_column<V: VectorOps>(vs: &mut [V], dst: usize, alpha: f64, src: usize) {
    debug_assert!(src < dst);
    let (head, tail) = vs.split_at_mut(dst);
    tail[0].update(-alpha, &head[src], 1.0);
}

impl<M: ModelOps> IdrSolver<M> {
    /// Create a solver with the default configuration and no problem attached.
    pub fn new(model: M) -> Self {
        Self::from_parts(model, IdrConfig::default(), StdRng::from_os_rng())
    }

    /// Create a solver with a validated configuration.
    ///
    /// The shadow space is drawn from `config.seed` when set.
    pub fn with_config(model: M, config: IdrConfig) -> Result<Self> {
        config.validate()?;
        let rng = seeded_rng(config.seed);
        Ok(Self::from_parts(model, config, rng))
    }

    /// Create a solver with its initial guess and right-hand side attached.
    ///
    /// Uses the looser tolerance [`IdrConfig::PROBLEM_TOL`].
    pub fn with_problem(model: M, x0: M::Vector, b: M::Vector) -> Self {
        let config = IdrConfig::default().with_tol(IdrConfig::PROBLEM_TOL);
        let mut solver = Self::from_parts(model, config, StdRng::from_os_rng());
        solver.x = Some(x0);
        solver.b = Some(b);
        solver
    }
}

impl<M: ModelOps, R: Rng> IdrSolver<M, R> {
    /// Create a solver drawing its shadow space from `rng`.
    pub fn with_rng(model: M, config: IdrConfig, rng: R) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_parts(model, config, rng))
    }

    fn from_parts(model: M, config: IdrConfig, rng: R) -> Self {
        Self {
            model,
            config,
            rng,
            x: None,
            b: None,
            shadow: None,
            initial_space: Vec::new(),
            iterations: 0,
            cycles: 0,
            normr: 0.0,
            normb: 0.0,
            tolb: 0.0,
            replacements: 0,
            history: Vec::new(),
        }
    }

    /// Current configuration.
    pub fn config(&self) -> &IdrConfig {
        &self.config
    }

    /// Replace the configuration between solves.
    ///
    /// Changing `s` discards the shadow space and the cached search space.
    pub fn set_config(&mut self, config: IdrConfig) -> Result<()> {
        config.validate()?;
        if config.verbosity > 5 {
            log::info!("IDR(s): updating parameters: {config:?}");
        }
        if config.s != self.config.s {
            self.shadow = None;
            self.initial_space.clear();
        }
        self.config = config;
        Ok(())
    }

    /// The model this solver drives.
    pub fn model(&self) -> &M {
        &self.model
    }

    /// Set the initial guess. The solution overwrites it in place.
    pub fn set_initial_guess(&mut self, x0: M::Vector) {
        self.x = Some(x0);
    }

    /// Set the right-hand side.
    pub fn set_rhs(&mut self, b: M::Vector) {
        self.b = Some(b);
    }

    /// Current iterate.
    pub fn solution(&self) -> Option<&M::Vector> {
        self.x.as_ref()
    }

    /// Right-hand side.
    pub fn rhs(&self) -> Option<&M::Vector> {
        self.b.as_ref()
    }

    /// Consume the solver, returning the current iterate.
    pub fn into_solution(self) -> Option<M::Vector> {
        self.x
    }

    /// The shadow space, once built.
    pub fn shadow_space(&self) -> Option<&ShadowSpace<M::Vector>> {
        self.shadow.as_ref()
    }

    /// Install a caller-provided shadow space of dimension `s`.
    pub fn set_shadow_space(&mut self, space: ShadowSpace<M::Vector>) -> Result<()> {
        if space.dim() != self.config.s {
            return Err(Error::InvalidShadowSpace(format!(
                "expected {} vectors, got {}",
                self.config.s,
                space.dim()
            )));
        }
        if let Some(template) = self.x.as_ref().or(self.b.as_ref()) {
            if space.vector_len() != template.len() {
                return Err(Error::DimensionMismatch {
                    expected: template.len(),
                    actual: space.vector_len(),
                });
            }
        }
        self.shadow = Some(space);
        Ok(())
    }

    /// Draw a fresh shadow space, discarding the current one.
    pub fn rebuild_shadow_space(&mut self) -> Result<()> {
        let template = self
            .x
            .as_ref()
            .or(self.b.as_ref())
            .ok_or(Error::Setup("initial guess"))?;
        self.shadow = Some(draw_shadow_space(&self.config, template, &mut self.rng)?);
        Ok(())
    }

    /// Solve `A x = b` from the attached initial guess.
    ///
    /// On success the iterate holds the solution; on breakdown it holds the
    /// iterate from before the failing step.
    pub fn solve(&mut self) -> Result<SolveOutcome> {
        let (mut x, b) = match (self.x.take(), self.b.take()) {
            (Some(x), Some(b)) => (x, b),
            (x, b) => {
                let missing = if x.is_none() {
                    "initial guess"
                } else {
                    "right-hand side"
                };
                log::warn!("IDR(s): problem not set up correctly, missing {missing}");
                self.x = x;
                self.b = b;
                return Err(Error::Setup(missing));
            }
        };

        let result = self.run(&mut x, &b);
        self.x = Some(x);
        self.b = Some(b);
        result
    }

    fn run(&mut self, x: &mut M::Vector, b: &M::Vector) -> Result<SolveOutcome> {
        if x.len() != b.len() {
            return Err(Error::DimensionMismatch {
                expected: b.len(),
                actual: x.len(),
            });
        }

        let s = self.config.s;
        let max_it = self.config.max_iterations;
        let angle = self.config.angle;
        let replacement = self.config.residual_replacement;

        let stale_shadow = self
            .shadow
            .as_ref()
            .is_none_or(|p| p.dim() != s || p.vector_len() != x.len());
        if stale_shadow {
            self.shadow = Some(draw_shadow_space(&self.config, x, &mut self.rng)?);
        }

        self.normb = b.norm();
        let normb = self.normb;
        let tolb = self.config.tol * normb;
        self.tolb = tolb;
        let drift = self.config.drift_threshold(tolb);

        // r = b - A x
        let mut r = x.clone();
        apply_matrix(&self.model, x, &mut r)?;
        r.update(1.0, b, -1.0);

        let mut normr = r.norm();
        self.normr = normr;
        self.history.clear();
        self.history.push(normr);
        self.replacements = 0;
        self.cycles = 0;

        // The cached space is only trusted after a solve of at least s iterations
        let create_init_u = !self.config.reuse_search_space
            || self.iterations < s
            || self.initial_space.len() != s
            || self.initial_space.iter().any(|u| u.len() != x.len());

        let mut u: Vec<M::Vector> = if create_init_u {
            self.initial_space = vec![x.clone(); s];
            vec![x.clone(); s]
        } else {
            log::debug!("IDR(s): reusing initial search space");
            self.initial_space.clone()
        };
        let mut g: Vec<M::Vector> = vec![x.clone(); s];
        let mut m = DMatrix::<f64>::zeros(s, s);
        let mut f = vec![0.0; s];
        let mut gamma = vec![0.0; s];

        let mut v = r.clone();
        let mut t = r.clone();
        let mut om = 1.0;
        let mut trueres = false;
        let mut jj = 0;

        self.iterations = 0;
        self.log_status();

        let Some(p) = self.shadow.as_ref() else {
            return Err(Error::InvalidShadowSpace("shadow space missing".into()));
        };

        while normr > tolb && self.iterations < max_it {
            // Right-hand side of the small system: f = P' r
            for (i, fi) in f.iter_mut().enumerate() {
                *fi = r.dot(p.get(i));
            }

            for k in 0..s {
                v.clone_from(&r);

                if jj > 0 {
                    // Solve the lower triangular system and make v orthogonal to P
                    for i in k..s {
                        let mut gi = f[i];
                        for j in k..i {
                            gi -= m[(i, j)] * gamma[j];
                        }
                        gamma[i] = gi / m[(i, i)];
                        v.update(-gamma[i], &g[i], 1.0);
                    }

                    apply_precon(&self.model, &v, &mut t)?;
                    t.scale(om);
                    for i in k..s {
                        t.update(gamma[i], &u[i], 1.0);
                    }
                    u[k].clone_from(&t);
                } else if create_init_u {
                    apply_precon(&self.model, &v, &mut self.initial_space[k])?;
                    u[k].clone_from(&self.initial_space[k]);
                }

                // G(:,k) = A U(:,k) lies in the current G-space
                apply_matrix(&self.model, &u[k], &mut g[k])?;

                // Bi-orthogonalize against the previous columns
                for i in 0..k {
                    let alpha = p.get(i).dot(&g[k]) / m[(i, i)];
                    subtract_column(&mut g, k, alpha, i);
                    subtract_column(&mut u, k, alpha, i);
                }

                // Column k of M = P' G; entries above the diagonal stay zero
                for i in k..s {
                    m[(i, k)] = g[k].dot(p.get(i));
                }
                if m[(k, k)] == 0.0 {
                    log::warn!(
                        "IDR(s) breakdown at iteration {}, stage {k}: M[k][k] == 0",
                        self.iterations
                    );
                    return Err(Error::Breakdown {
                        iteration: self.iterations,
                        stage: k,
                    });
                }

                // Make r orthogonal to p_k
                let beta = f[k] / m[(k, k)];
                r.update(-beta, &g[k], 1.0);
                x.update(beta, &u[k], 1.0);

                normr = r.norm();
                if replacement && normr > drift {
                    trueres = true;
                }

                for i in (k + 1)..s {
                    f[i] -= beta * m[(i, k)];
                }

                self.history.push(normr);
                self.iterations += 1;
                self.normr = normr;
                self.log_status();
                if normr <= tolb || self.iterations >= max_it {
                    break;
                }
            }

            if normr <= tolb || self.iterations >= max_it {
                break;
            }

            jj += 1;
            self.cycles = jj;

            // First residual in the next G-space; r is already orthogonal to P
            apply_precon(&self.model, &r, &mut v)?;
            apply_matrix(&self.model, &v, &mut t)?;
            om = omega(&t, &r, angle).inspect_err(|e| {
                log::warn!("IDR(s) at iteration {}: {e}", self.iterations);
            })?;

            r.update(-om, &t, 1.0);
            x.update(om, &v, 1.0);
            normr = r.norm();

            if replacement && normr > drift {
                trueres = true;
            }
            if trueres && normr < normb {
                log::info!(
                    "IDR(s): replacing residual at iteration {}",
                    self.iterations + 1
                );
                apply_matrix(&self.model, x, &mut r)?;
                r.update(1.0, b, -1.0);
                normr = r.norm();
                trueres = false;
                self.replacements += 1;
            }

            self.history.push(normr);
            self.iterations += 1;
            self.normr = normr;
            self.log_status();
        }

        let outcome = if normr <= tolb {
            SolveOutcome::Converged
        } else {
            log::debug!(
                "IDR(s) did not converge after {} iterations (residual: {:.2e})",
                self.iterations,
                normr
            );
            SolveOutcome::IterationsExhausted
        };
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::OperatorModel;
    use crate::operator::{DenseOperator, DiagonalOperator};
    use crate::preconditioner::{IdentityPreconditioner, JacobiPreconditioner};

    /// Model whose matrix application always fails.
    struct FailingModel;

    impl ModelOps for FailingModel {
        type Vector = Vec<f64>;
        type Error = std::io::Error;

        fn apply_matrix(&self, _x: &Vec<f64>, _y: &mut Vec<f64>) -> std::io::Result<()> {
            Err(std::io::Error::other("matrix unavailable"))
        }

        fn apply_precon(&self, x: &Vec<f64>, y: &mut Vec<f64>) -> std::io::Result<()> {
            y.copy_from_slice(x);
            Ok(())
        }
    }

    fn seeded(s: usize) -> IdrConfig {
        IdrConfig::default().with_s(s).with_seed(42)
    }

    #[test]
    fn missing_problem_is_setup_error() {
        let op = DiagonalOperator::new(vec![1.0; 3]);
        let precond = IdentityPreconditioner::new(3);
        let model = OperatorModel::new(&op, &precond).unwrap();
        let mut solver = IdrSolver::with_config(model, seeded(2)).unwrap();

        assert!(matches!(solver.solve(), Err(Error::Setup("initial guess"))));

        solver.set_initial_guess(vec![0.0; 3]);
        assert!(matches!(solver.solve(), Err(Error::Setup("right-hand side"))));
        // The initial guess survives the failed call
        assert_eq!(solver.solution(), Some(&vec![0.0; 3]));
        assert!(solver.residual_history().is_empty());
    }

    #[test]
    fn mismatched_lengths_rejected() {
        let op = DiagonalOperator::new(vec![1.0; 3]);
        let precond = IdentityPreconditioner::new(3);
        let model = OperatorModel::new(&op, &precond).unwrap();
        let mut solver = IdrSolver::with_config(model, seeded(2)).unwrap();
        solver.set_initial_guess(vec![0.0; 2]);
        solver.set_rhs(vec![1.0; 3]);

        assert!(matches!(
            solver.solve(),
            Err(Error::DimensionMismatch {
                expected: 3,
                actual: 2
            })
        ));
    }

    #[test]
    fn solves_nonsymmetric_dense_system() {
        let op = DenseOperator::from_rows(&[
            vec![4.0, 1.0, 0.0, 0.0],
            vec![-1.0, 4.0, 1.0, 0.0],
            vec![0.0, -1.0, 4.0, 1.0],
            vec![0.0, 0.0, -1.0, 4.0],
        ])
        .unwrap();
        let precond = IdentityPreconditioner::new(4);
        let model = OperatorModel::new(&op, &precond).unwrap();
        let mut solver =
            IdrSolver::with_config(model, seeded(2).with_tol(1e-12).with_max_iterations(100))
                .unwrap();

        // x = [1, 2, 3, 4]
        solver.set_initial_guess(vec![0.0; 4]);
        solver.set_rhs(vec![6.0, 10.0, 14.0, 13.0]);

        let outcome = solver.solve().unwrap();
        assert!(outcome.converged());

        let x = solver.solution().unwrap();
        for (i, xi) in x.iter().enumerate() {
            assert!((xi - (i + 1) as f64).abs() < 1e-8, "x[{i}] = {xi}");
        }
    }

    #[test]
    fn jacobi_preconditioned_diagonal_converges_immediately() {
        let diag: Vec<f64> = (1..=10).map(|i| i as f64).collect();
        let op = DiagonalOperator::new(diag.clone());
        let precond = JacobiPreconditioner::from_diagonal(&diag);
        let model = OperatorModel::new(&op, &precond).unwrap();
        let mut solver = IdrSolver::with_config(model, seeded(4)).unwrap();
        solver.set_initial_guess(vec![0.0; 10]);
        solver.set_rhs(diag.clone());

        assert!(solver.solve().unwrap().converged());
        assert_eq!(solver.iterations(), 1);
        for xi in solver.solution().unwrap() {
            assert!((xi - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn exhausted_budget_reports_success_status() {
        let diag: Vec<f64> = (1..=40).map(|i| i as f64).collect();
        let op = DiagonalOperator::new(diag);
        let precond = IdentityPreconditioner::new(40);
        let model = OperatorModel::new(&op, &precond).unwrap();
        let mut solver =
            IdrSolver::with_config(model, seeded(2).with_tol(1e-14).with_max_iterations(5))
                .unwrap();
        solver.set_initial_guess(vec![0.0; 40]);
        solver.set_rhs(vec![1.0; 40]);

        let outcome = solver.solve().unwrap();
        assert_eq!(outcome, SolveOutcome::IterationsExhausted);
        assert_eq!(outcome.status_code(), 0);
        assert_eq!(solver.iterations(), 5);
        assert_eq!(solver.residual_history().len(), 6);
    }

    #[test]
    fn model_errors_propagate() {
        let mut solver = IdrSolver::with_config(FailingModel, seeded(1)).unwrap();
        solver.set_initial_guess(vec![0.0; 2]);
        solver.set_rhs(vec![1.0; 2]);

        let err = solver.solve().unwrap_err();
        assert!(matches!(err, Error::Model(_)));
        assert_eq!(err.to_string(), "Model error: matrix unavailable");
    }

    #[test]
    fn changing_s_rebuilds_shadow_space() {
        let op = DiagonalOperator::new((1..=8).map(f64::from).collect());
        let precond = IdentityPreconditioner::new(8);
        let model = OperatorModel::new(&op, &precond).unwrap();
        let mut solver = IdrSolver::with_config(model, seeded(2)).unwrap();
        solver.set_initial_guess(vec![0.0; 8]);
        solver.set_rhs(vec![1.0; 8]);
        solver.solve().unwrap();
        assert_eq!(solver.shadow_space().unwrap().dim(), 2);

        solver.set_config(seeded(3)).unwrap();
        assert!(solver.shadow_space().is_none());

        solver.set_initial_guess(vec![0.0; 8]);
        solver.solve().unwrap();
        assert_eq!(solver.shadow_space().unwrap().dim(), 3);
    }

    #[test]
    fn set_shadow_space_checks_dimension() {
        let op = DiagonalOperator::new(vec![1.0; 3]);
        let precond = IdentityPreconditioner::new(3);
        let model = OperatorModel::new(&op, &precond).unwrap();
        let mut solver = IdrSolver::with_config(model, seeded(2)).unwrap();
        solver.set_initial_guess(vec![0.0; 3]);

        let one = ShadowSpace::from_vectors(vec![vec![1.0, 0.0, 0.0]]).unwrap();
        assert!(matches!(
            solver.set_shadow_space(one),
            Err(Error::InvalidShadowSpace(_))
        ));

        let short = ShadowSpace::from_vectors(vec![vec![1.0, 0.0], vec![0.0, 1.0]]).unwrap();
        assert!(matches!(
            solver.set_shadow_space(short),
            Err(Error::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn rebuild_requires_template() {
        let op = DiagonalOperator::new(vec![1.0; 3]);
        let precond = IdentityPreconditioner::new(3);
        let model = OperatorModel::new(&op, &precond).unwrap();
        let mut solver = IdrSolver::with_config(model, seeded(2)).unwrap();
        assert!(matches!(
            solver.rebuild_shadow_space(),
            Err(Error::Setup(_))
        ));

        solver.set_rhs(vec![1.0; 3]);
        solver.rebuild_shadow_space().unwrap();
        assert!(solver.shadow_space().unwrap().orthonormality_defect() < 1e-10);
    }

    #[test]
    fn with_problem_uses_problem_tolerance() {
        let op = DiagonalOperator::new(vec![2.0; 4]);
        let precond = IdentityPreconditioner::new(4);
        let model = OperatorModel::new(&op, &precond).unwrap();
        let mut solver = IdrSolver::with_problem(model, vec![0.0; 4], vec![2.0; 4]);
        assert!((solver.config().tol - 1e-6).abs() < 1e-20);

        assert!(solver.solve().unwrap().converged());
        for xi in solver.solution().unwrap() {
            assert!((xi - 1.0).abs() < 1e-6);
        }
    }
}

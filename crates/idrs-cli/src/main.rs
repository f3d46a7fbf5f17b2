//! idrs CLI tool.
//!
//! Solves a 1D convection-diffusion model problem with IDR(s) and reports
//! convergence.

mod output;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, ValueEnum};
use idrs_solver::{
    IdentityPreconditioner, IdrConfig, IdrSolver, JacobiPreconditioner, OperatorModel,
    RealPreconditioner, SparseRealOperator, convection_diffusion_triplets, status_code,
};

use output::{SolveSummary, print_solution_excerpt};

#[derive(Parser, Debug)]
#[command(name = "idrs")]
#[command(about = "Solve a convection-diffusion system with IDR(s)")]
#[command(version)]
struct Cli {
    /// Number of interior grid points
    #[arg(short, long, default_value_t = 1000)]
    n: usize,

    /// Global Peclet number of the convection term
    #[arg(long, default_value_t = 50.0)]
    peclet: f64,

    /// JSON file with solver settings; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Shadow-space dimension
    #[arg(short, long)]
    s: Option<usize>,

    /// Stabilization angle for omega
    #[arg(long)]
    angle: Option<f64>,

    /// Relative residual tolerance
    #[arg(long)]
    tol: Option<f64>,

    /// Maximum number of iterations
    #[arg(long)]
    max_iter: Option<usize>,

    /// Seed for the shadow space
    #[arg(long)]
    seed: Option<u64>,

    /// Preconditioner
    #[arg(long, value_enum, default_value_t = Precond::Jacobi)]
    precond: Precond,

    /// Enable residual replacement
    #[arg(long)]
    replace_residuals: bool,

    /// Solver diagnostic level (status lines above 4, shadow space above 9)
    #[arg(long)]
    solver_verbosity: Option<u32>,

    /// Write the residual history, one value per line
    #[arg(long)]
    history: Option<PathBuf>,

    /// Print the summary as JSON
    #[arg(long)]
    json: bool,

    /// Print leading and trailing solution entries
    #[arg(long)]
    show_solution: bool,

    /// Increase log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Precond {
    Jacobi,
    None,
}

impl Precond {
    fn name(self) -> &'static str {
        match self {
            Precond::Jacobi => "jacobi",
            Precond::None => "none",
        }
    }
}

impl Cli {
    /// Defaults, then the config file, then explicit flags.
    fn solver_config(&self) -> Result<IdrConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("reading config {}", path.display()))?;
                serde_json::from_str(&text)
                    .with_context(|| format!("parsing config {}", path.display()))?
            }
            None => IdrConfig::default(),
        };

        if let Some(s) = self.s {
            config.s = s;
        }
        if let Some(angle) = self.angle {
            config.angle = angle;
        }
        if let Some(tol) = self.tol {
            config.tol = tol;
        }
        if let Some(max_iter) = self.max_iter {
            config.max_iterations = max_iter;
        }
        if let Some(seed) = self.seed {
            config.seed = Some(seed);
        }
        if let Some(level) = self.solver_verbosity {
            config.verbosity = level;
        }
        if self.replace_residuals {
            config.residual_replacement = true;
        }

        config.validate()?;
        Ok(config)
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let env = env_logger::Env::default().default_filter_or(level);
    let _ = env_logger::Builder::from_env(env).try_init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = cli.solver_config()?;
    let n = cli.n;
    anyhow::ensure!(n > 0, "problem size must be positive");

    log::info!(
        "Building convection-diffusion operator: n = {n}, Peclet = {}",
        cli.peclet
    );
    let triplets = convection_diffusion_triplets(n, cli.peclet);
    let op = SparseRealOperator::from_triplets(n, &triplets)
        .context("failed to assemble the convection-diffusion operator")?;
    let precond: Box<dyn RealPreconditioner> = match cli.precond {
        Precond::Jacobi => Box::new(JacobiPreconditioner::from_sparse(&op)),
        Precond::None => Box::new(IdentityPreconditioner::new(n)),
    };

    let model = OperatorModel::new(&op, precond.as_ref())?;
    let mut solver = IdrSolver::with_config(model, config.clone())?;
    solver.set_initial_guess(vec![0.0; n]);
    solver.set_rhs(vec![1.0; n]);

    let result = solver.solve();
    log::debug!("IDR(s) status code: {}", status_code(&result));
    let outcome = result.context("IDR(s) solve failed")?;

    if config.verbosity > 9 {
        if let Some(defect) = solver.log_shadow_space() {
            log::info!("shadow space orthonormality defect: {defect:e}");
        }
    }

    if let Some(path) = &cli.history {
        if solver.write_residual_history(path)? {
            log::info!("Residual history written to {}", path.display());
        }
    }

    let summary = SolveSummary::collect(&solver, outcome, &config, cli.precond.name(), n)?;
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("{}", summary.to_text());
    }

    if cli.show_solution {
        if let Some(x) = solver.solution() {
            print_solution_excerpt(x, 5);
        }
    }

    Ok(())
}

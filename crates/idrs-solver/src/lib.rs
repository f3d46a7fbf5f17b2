//! IDR(s) Krylov solver for large linear systems.
//!
//! The system matrix and preconditioner are only ever applied, never
//! inspected, so the same solver drives dense, sparse and matrix-free models.
//! This crate provides:
//! - [`VectorOps`] / [`ModelOps`]: the vector and model capabilities the solver consumes
//! - [`ShadowSpace`]: the random orthonormal projection target
//! - [`IdrSolver`]: the stateful IDR(s) recurrence with residual replacement
//! - [`solve_idrs`]: a one-shot entry point over slices
//! - Operators and preconditioners to build models from

pub mod config;
pub mod error;
pub mod idr;
pub mod model;
pub mod omega;
pub mod operator;
pub mod preconditioner;
pub mod shadow;
pub mod sparse_operator;
pub mod vector;

pub use config::IdrConfig;
pub use error::{Error, Result};
pub use idr::{IdrResult, IdrSolver, SolveOutcome, solve_idrs, status_code};
pub use model::{ModelOps, OperatorModel};
pub use omega::omega;
pub use operator::{DenseOperator, DiagonalOperator, RealOperator};
pub use preconditioner::{IdentityPreconditioner, JacobiPreconditioner, RealPreconditioner};
pub use shadow::ShadowSpace;
pub use sparse_operator::{SparseRealOperator, convection_diffusion_triplets};
pub use vector::VectorOps;

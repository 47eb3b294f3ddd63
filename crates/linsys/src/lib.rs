//! Basis and factorization layer for the active-set engine.
//!
//! [`basis::Basis`] tracks the partition of constraint rows and variable
//! bounds into the active set and its null-space complement, with a
//! dense basis inverse maintained by product-form updates.
//! [`cholesky::CholeskyUpdater`] keeps a Cholesky factor of the reduced
//! Hessian over the null space, updated one rank at a time.
//! [`controller::ActiveSetController`] applies every active-set change
//! to both in lockstep.

#![forbid(unsafe_code)]

pub mod basis;
pub mod cholesky;
pub mod controller;

pub use basis::{Basis, BasisError};
pub use cholesky::{CholeskyUpdater, FactorError};
pub use controller::{Activation, ActiveSetController, ControllerError};

//! Iteration-level machinery of the active-set engine: gradient state,
//! pricing rules, ratio tests, starting-point construction, and the
//! solve loop itself.

#![forbid(unsafe_code)]

pub mod gradient;
pub mod pricing;
pub mod ratiotest;
pub mod solver;
pub mod start;

pub use gradient::{Gradient, ReducedCosts, ReducedGradient};
pub use pricing::{make_pricing, Pricing};
pub use ratiotest::{ratiotest, RatiotestResult};
pub use solver::{NullspaceSolver, SolveError};
pub use start::compute_starting_point;

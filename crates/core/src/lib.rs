#![forbid(unsafe_code)]

pub mod events;
pub mod instance;
pub mod math;
pub mod options;
pub mod problem;
pub mod runtime;
pub mod solution;
pub mod start;
pub mod stats;
pub mod vector;

pub use events::*;
pub use instance::*;
pub use math::*;
pub use options::*;
pub use problem::*;
pub use runtime::*;
pub use solution::*;
pub use start::*;
pub use stats::*;
pub use vector::*;

use crate::math::RealNumber;
use crate::stats::SolveStats;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Status {
    NotSet,
    Optimal,
    Infeasible,
    Unbounded,
    IterationLimit,
    TimeLimit,
    Error,
}

impl Status {
    /// Problem-level outcomes are reportable terminations, not failures.
    pub fn is_terminal(self) -> bool {
        self != Status::NotSet
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Solution<T: RealNumber> {
    pub status: Status,
    pub primal: Vec<T>,
    pub dualcon: Vec<T>,
    pub dualvar: Vec<T>,
    pub objective_value: T,
    pub iterations: usize,
    pub stats: SolveStats<T>,
}

impl<T> Solution<T>
where
    T: RealNumber,
{
    pub fn with_capacity(num_var: usize, num_con: usize) -> Self {
        Self {
            status: Status::NotSet,
            primal: vec![T::zero(); num_var],
            dualcon: vec![T::zero(); num_con],
            dualvar: vec![T::zero(); num_var],
            objective_value: T::zero(),
            iterations: 0,
            stats: SolveStats::new(),
        }
    }
}

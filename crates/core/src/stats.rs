use crate::math::RealNumber;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One statistics snapshot, taken every `reporting_frequency` iterations
/// and once at termination.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IterationRecord<T: RealNumber> {
    pub iteration: usize,
    pub nullspace_dimension: usize,
    pub objective: T,
    pub elapsed: Duration,
    pub sum_primal_infeasibilities: T,
    pub num_primal_infeasibilities: usize,
    pub factor_density: T,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolveStats<T: RealNumber> {
    pub history: Vec<IterationRecord<T>>,
    pub num_iterations: usize,
    pub solve_time: Duration,
}

impl<T> SolveStats<T>
where
    T: RealNumber,
{
    pub fn new() -> Self {
        Self {
            history: Vec::new(),
            num_iterations: 0,
            solve_time: Duration::ZERO,
        }
    }

    pub fn push(&mut self, record: IterationRecord<T>) {
        self.history.push(record);
    }
}

impl<T> Default for SolveStats<T>
where
    T: RealNumber,
{
    fn default() -> Self {
        Self::new()
    }
}

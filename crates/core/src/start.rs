use crate::math::RealNumber;
use crate::vector::Vector;
use serde::{Deserialize, Serialize};

/// Membership of one constraint/bound index in the active-set partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BasisStatus {
    /// Inactive: not treated as an equality.
    Default,
    ActiveAtLower,
    ActiveAtUpper,
}

/// One-shot starting point for the engine: primal iterate, its row
/// activity, the initial active set, and a status per combined index.
/// Consumed once to seed the Basis and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct CrashSolution<T> {
    pub primal: Vector<T>,
    pub rowact: Vector<T>,
    pub active: Vec<usize>,
    pub status: Vec<BasisStatus>,
}

impl<T> CrashSolution<T>
where
    T: RealNumber,
{
    /// All-inactive start at the given point.
    pub fn inactive_at(primal: Vector<T>, rowact: Vector<T>, num_total: usize) -> Self {
        Self {
            primal,
            rowact,
            active: Vec::new(),
            status: vec![BasisStatus::Default; num_total],
        }
    }
}

use crate::instance::Instance;
use crate::math::{RealNumber, Timer};
use crate::options::Settings;
use crate::solution::{Solution, Status};
use crate::stats::SolveStats;
use crate::vector::Vector;

/// Mutable context of one solve: the immutable Instance plus everything
/// the iteration loop advances. Created per solve call, owned by exactly
/// one engine Solver while it runs, read by the caller afterwards. There
/// is no ambient solver state anywhere else.
#[derive(Debug)]
pub struct Runtime<T: RealNumber> {
    pub instance: Instance<T>,
    pub settings: Settings<T>,
    pub primal: Vector<T>,
    pub rowactivity: Vector<T>,
    pub dualcon: Vector<T>,
    pub dualvar: Vector<T>,
    pub status: Status,
    pub statistics: SolveStats<T>,
    pub timer: Timer,
}

impl<T> Runtime<T>
where
    T: RealNumber,
{
    pub fn new(instance: Instance<T>, settings: Settings<T>) -> Self {
        let num_var = instance.num_var;
        let num_con = instance.num_con;
        Self {
            instance,
            settings,
            primal: Vector::new(num_var),
            rowactivity: Vector::new(num_con),
            dualcon: Vector::new(num_con),
            dualvar: Vector::new(num_var),
            status: Status::NotSet,
            statistics: SolveStats::new(),
            timer: Timer::start(),
        }
    }

    /// Copy the terminal state out into a caller-facing Solution.
    pub fn into_solution(self) -> Solution<T> {
        let objective_value = self.instance.objective(&self.primal);
        Solution {
            status: self.status,
            primal: self.primal.value,
            dualcon: self.dualcon.value,
            dualvar: self.dualvar.value,
            objective_value,
            iterations: self.statistics.num_iterations,
            stats: self.statistics,
        }
    }
}

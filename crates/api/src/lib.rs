#![forbid(unsafe_code)]

use asqp_algos::solver::NullspaceSolver;
use asqp_algos::start::compute_starting_point;
use asqp_core::events::IterationObserver;
use asqp_core::instance::Instance;
use asqp_core::math::RealNumber;
use asqp_core::problem::{Bounds, CscMatrix, ProblemQP, RowConstraints};
use asqp_core::runtime::Runtime;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

pub use asqp_core::events::RecordingObserver;
pub use asqp_core::options::{PricingStrategy, RatiotestStrategy, Settings};
pub use asqp_core::solution::{Solution, Status};
pub use asqp_core::start::{BasisStatus, CrashSolution};
pub use asqp_core::stats::SolveStats;

#[derive(Debug, Error)]
pub enum SolverError {
    #[error("problem validation failed: {0}")]
    InvalidProblem(String),
    #[error("settings rejected: {0}")]
    InvalidSettings(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QpBuilder<T: RealNumber> {
    q: Option<CscMatrix<T>>,
    c: Option<Vec<T>>,
    constraints: Option<RowConstraints<T>>,
    bounds: Option<Bounds<T>>,
}

impl<T> Default for QpBuilder<T>
where
    T: RealNumber,
{
    fn default() -> Self {
        Self {
            q: None,
            c: None,
            constraints: None,
            bounds: None,
        }
    }
}

impl<T> QpBuilder<T>
where
    T: RealNumber,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn q(mut self, matrix: CscMatrix<T>) -> Self {
        self.q = Some(matrix);
        self
    }

    pub fn c(mut self, vector: Vec<T>) -> Self {
        self.c = Some(vector);
        self
    }

    pub fn rows(mut self, matrix: CscMatrix<T>, lower: Vec<T>, upper: Vec<T>) -> Self {
        self.constraints = Some(RowConstraints {
            matrix,
            bounds: Bounds { lower, upper },
        });
        self
    }

    pub fn bounds(mut self, lower: Vec<T>, upper: Vec<T>) -> Self {
        self.bounds = Some(Bounds { lower, upper });
        self
    }

    pub fn build(self) -> Result<ProblemQP<T>, SolverError> {
        let quadratic = self
            .q
            .ok_or_else(|| SolverError::InvalidProblem("quadratic matrix missing".into()))?;
        let linear = self
            .c
            .ok_or_else(|| SolverError::InvalidProblem("linear term missing".into()))?;
        let problem = ProblemQP {
            quadratic,
            linear,
            constraints: self.constraints,
            bounds: self.bounds,
        };
        problem
            .validate()
            .map_err(|err| SolverError::InvalidProblem(err.to_string()))?;
        Ok(problem)
    }
}

/// User-facing active-set solver.
///
/// `solve` repairs an (optional) guess into a feasible starting point by
/// cyclic projection and reports [`Status::Infeasible`] when the repair
/// cannot close the constraint violations. `solve_with_start` hands a
/// prepared [`CrashSolution`] to the engine verbatim, which is the entry
/// point for warm starts with a known active set.
pub struct Solver<T: RealNumber> {
    settings: Settings<T>,
    guess: Option<Vec<T>>,
}

impl<T> Solver<T>
where
    T: RealNumber + 'static,
{
    pub fn new() -> Self {
        Self {
            settings: Settings::default(),
            guess: None,
        }
    }

    pub fn settings(mut self, settings: Settings<T>) -> Self {
        self.settings = settings;
        self
    }

    pub fn guess(mut self, guess: Vec<T>) -> Self {
        self.guess = Some(guess);
        self
    }

    pub fn solve(&self, problem: &ProblemQP<T>) -> Result<Solution<T>, SolverError> {
        self.solve_observed(problem, None)
    }

    pub fn solve_observed(
        &self,
        problem: &ProblemQP<T>,
        observer: Option<&mut dyn IterationObserver<T>>,
    ) -> Result<Solution<T>, SolverError> {
        let instance = self.instantiate(problem)?;
        let zeros = vec![T::zero(); instance.num_var];
        let guess = self.guess.as_deref().unwrap_or(&zeros);
        let crash =
            compute_starting_point(&instance, guess, self.settings.feasibility_tolerance);

        let (residual, violated) = instance.sum_num_primal_infeasibilities(
            &crash.primal,
            &crash.rowact,
            self.settings.feasibility_tolerance,
        );
        if violated > 0 {
            warn!(
                violated,
                residual = residual.to_f64().unwrap_or(f64::NAN),
                "starting point repair left violations, reporting infeasible"
            );
            let mut runtime = Runtime::new(instance, self.settings.clone());
            runtime.primal.repopulate(&crash.primal);
            runtime.rowactivity.repopulate(&crash.rowact);
            runtime.status = Status::Infeasible;
            return Ok(runtime.into_solution());
        }

        self.run(instance, &crash, observer)
    }

    /// Solve from a caller-prepared starting point, without feasibility
    /// repair. The crash is trusted: its primal point, row activity, and
    /// active set go straight into the basis.
    pub fn solve_with_start(
        &self,
        problem: &ProblemQP<T>,
        crash: &CrashSolution<T>,
    ) -> Result<Solution<T>, SolverError> {
        let instance = self.instantiate(problem)?;
        self.run(instance, crash, None)
    }

    fn instantiate(&self, problem: &ProblemQP<T>) -> Result<Instance<T>, SolverError> {
        self.settings
            .validate()
            .map_err(|err| SolverError::InvalidSettings(err.to_string()))?;
        Instance::from_problem(problem)
            .map_err(|err| SolverError::InvalidProblem(err.to_string()))
    }

    fn run(
        &self,
        instance: Instance<T>,
        crash: &CrashSolution<T>,
        observer: Option<&mut dyn IterationObserver<T>>,
    ) -> Result<Solution<T>, SolverError> {
        let mut runtime = Runtime::new(instance, self.settings.clone());
        let mut engine = NullspaceSolver::new(&mut runtime);
        if let Err(err) = engine.solve(crash, observer) {
            // numerical failures terminate with Status::Error; the
            // solution still carries the last iterate and statistics
            warn!(error = %err, "solve aborted");
        }
        Ok(runtime.into_solution())
    }
}

impl<T> Default for Solver<T>
where
    T: RealNumber + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

pub fn solve_qp<T: RealNumber + 'static>(
    problem: &ProblemQP<T>,
    settings: Settings<T>,
) -> Result<Solution<T>, SolverError> {
    Solver::new().settings(settings).solve(problem)
}

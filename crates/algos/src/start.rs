use asqp_core::instance::Instance;
use asqp_core::math::{project_box, RealNumber};
use asqp_core::start::{BasisStatus, CrashSolution};
use asqp_core::vector::Vector;
use tracing::debug;

const MAX_PROJECTION_PASSES: usize = 100;

/// Build a feasible starting point by cyclic projection: clamp the guess
/// into the variable box, then sweep the rows, projecting onto each
/// violated one, re-clamping after every sweep. Converges for any
/// consistent system; an inconsistent one leaves residual violations
/// behind for the caller to detect through the infeasibility measure.
///
/// Variable bounds that end up tight are seeded into the active set, so
/// vertex starts enter the loop with a small null space.
pub fn compute_starting_point<T: RealNumber>(
    instance: &Instance<T>,
    guess: &[T],
    feasibility_tolerance: T,
) -> CrashSolution<T> {
    let n = instance.num_var;
    let mut x = vec![T::zero(); n];
    for j in 0..n {
        x[j] = guess.get(j).copied().unwrap_or(T::zero());
    }
    project_box(&mut x, &instance.var_lower, &instance.var_upper);

    let mut row_norms = vec![T::zero(); instance.num_con];
    for i in 0..instance.num_con {
        let mut acc = T::zero();
        for j in 0..n {
            let a = instance.a_entry(i, j);
            acc += a * a;
        }
        row_norms[i] = acc;
    }

    let mut passes = 0;
    for pass in 0..MAX_PROJECTION_PASSES {
        passes = pass + 1;
        let mut moved = false;
        for i in 0..instance.num_con {
            if row_norms[i] == T::zero() {
                continue;
            }
            let mut activity = T::zero();
            for j in 0..n {
                activity += instance.a_entry(i, j) * x[j];
            }
            let target = if activity < instance.con_lower[i] - feasibility_tolerance {
                instance.con_lower[i]
            } else if activity > instance.con_upper[i] + feasibility_tolerance {
                instance.con_upper[i]
            } else {
                continue;
            };
            let scale = (target - activity) / row_norms[i];
            for j in 0..n {
                x[j] += scale * instance.a_entry(i, j);
            }
            moved = true;
        }
        project_box(&mut x, &instance.var_lower, &instance.var_upper);
        if !moved {
            break;
        }
    }
    debug!(passes, "starting point projection finished");

    let mut active = Vec::new();
    let mut status = vec![BasisStatus::Default; instance.num_total()];
    for j in 0..n {
        let index = instance.num_con + j;
        if instance.var_lower[j].is_finite()
            && (x[j] - instance.var_lower[j]).abs() <= feasibility_tolerance
        {
            x[j] = instance.var_lower[j];
            active.push(index);
            status[index] = BasisStatus::ActiveAtLower;
        } else if instance.var_upper[j].is_finite()
            && (instance.var_upper[j] - x[j]).abs() <= feasibility_tolerance
        {
            x[j] = instance.var_upper[j];
            active.push(index);
            status[index] = BasisStatus::ActiveAtUpper;
        }
    }

    let primal = Vector::from_dense(&x);
    let mut rowact = Vector::new(instance.num_con);
    instance.mat_vec(&primal, &mut rowact);
    CrashSolution {
        primal,
        rowact,
        active,
        status,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use asqp_core::math::Scalar;
    use asqp_core::problem::{Bounds, CscMatrix, ProblemQP, RowConstraints};

    fn simplex_instance() -> Instance<Scalar> {
        let problem = ProblemQP {
            quadratic: CscMatrix::identity(2),
            linear: vec![0.0, 0.0],
            constraints: Some(RowConstraints {
                matrix: CscMatrix {
                    nrows: 1,
                    ncols: 2,
                    indptr: vec![0, 1, 2],
                    indices: vec![0, 0],
                    data: vec![1.0, 1.0],
                },
                bounds: Bounds {
                    lower: vec![1.0],
                    upper: vec![f64::INFINITY],
                },
            }),
            bounds: Some(Bounds {
                lower: vec![0.0, 0.0],
                upper: vec![f64::INFINITY, f64::INFINITY],
            }),
        };
        Instance::from_problem(&problem).unwrap()
    }

    #[test]
    fn projection_repairs_infeasible_guess() {
        let instance = simplex_instance();
        let crash = compute_starting_point(&instance, &[0.0, 0.0], 1e-9);
        let (sum, num) = instance.sum_num_primal_infeasibilities(
            &crash.primal,
            &crash.rowact,
            1e-7,
        );
        assert_eq!(num, 0);
        assert_relative_eq!(sum, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn feasible_guess_is_kept() {
        let instance = simplex_instance();
        let crash = compute_starting_point(&instance, &[2.0, 3.0], 1e-9);
        assert_relative_eq!(crash.primal.get(0), 2.0, epsilon = 1e-12);
        assert_relative_eq!(crash.primal.get(1), 3.0, epsilon = 1e-12);
        assert!(crash.active.is_empty());
    }

    #[test]
    fn tight_bounds_seed_the_active_set() {
        let instance = simplex_instance();
        let crash = compute_starting_point(&instance, &[0.0, 2.0], 1e-9);
        // x1 stays on its lower bound, combined index num_con + 0
        assert!(crash.active.contains(&1));
        assert_eq!(crash.status[1], BasisStatus::ActiveAtLower);
    }
}

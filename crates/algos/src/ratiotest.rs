use asqp_core::instance::Instance;
use asqp_core::math::RealNumber;
use asqp_core::options::RatiotestStrategy;
use asqp_core::start::BasisStatus;
use asqp_core::vector::Vector;
use asqp_linsys::Basis;

/// Outcome of a ratio test: the accepted step length, the first blocking
/// constraint (if any), and which of its bounds it would bind at.
#[derive(Debug, Clone, Copy)]
pub struct RatiotestResult<T> {
    pub alpha: T,
    pub limiting: Option<usize>,
    pub at_lower: bool,
}

struct Candidate<T> {
    index: usize,
    ratio: T,
    pivot: T,
    at_lower: bool,
}

/// One inactive constraint's blocking ratio along the step, or `None`
/// when its move cannot reach a finite bound.
fn blocking_ratio<T: RealNumber>(
    instance: &Instance<T>,
    index: usize,
    value: T,
    step: T,
    relax: T,
) -> Option<(T, bool)> {
    let pivot_tolerance = T::from_f64(1e-12).unwrap();
    if step > pivot_tolerance {
        let upper = instance.bound_upper(index);
        if upper.is_finite() {
            return Some(((upper + relax - value) / step, false));
        }
    } else if step < -pivot_tolerance {
        let lower = instance.bound_lower(index);
        if lower.is_finite() {
            return Some(((lower - relax - value) / step, true));
        }
    }
    None
}

fn candidates<T: RealNumber>(
    instance: &Instance<T>,
    basis: &Basis<T>,
    primal: &Vector<T>,
    p: &Vector<T>,
    rowactivity: &Vector<T>,
    rowmove: &Vector<T>,
    relax: T,
) -> Vec<Candidate<T>> {
    let mut out = Vec::new();
    for index in 0..instance.num_total() {
        if basis.status(index) != BasisStatus::Default {
            continue;
        }
        let (value, step) = if index < instance.num_con {
            (rowactivity.get(index), rowmove.get(index))
        } else {
            let j = index - instance.num_con;
            (primal.get(j), p.get(j))
        };
        if let Some((ratio, at_lower)) = blocking_ratio(instance, index, value, step, relax) {
            out.push(Candidate {
                index,
                ratio: ratio.max(T::zero()),
                pivot: step.abs(),
                at_lower,
            });
        }
    }
    out
}

/// Textbook ratio test: strict minimum ratio, ties broken towards the
/// larger pivot for numerical safety.
fn ratiotest_textbook<T: RealNumber>(
    candidates: Vec<Candidate<T>>,
    maxstep: T,
) -> RatiotestResult<T> {
    let mut result = RatiotestResult {
        alpha: maxstep,
        limiting: None,
        at_lower: false,
    };
    let mut best_pivot = T::zero();
    for candidate in candidates {
        let better = candidate.ratio < result.alpha
            || (candidate.ratio == result.alpha
                && result.limiting.is_some()
                && candidate.pivot > best_pivot);
        if better {
            result.alpha = candidate.ratio;
            result.limiting = Some(candidate.index);
            result.at_lower = candidate.at_lower;
            best_pivot = candidate.pivot;
        }
    }
    result
}

/// Two-pass Harris ratio test: pass one finds the furthest step with all
/// bounds relaxed by the feasibility tolerance, pass two picks the
/// largest pivot among constraints blocking within that relaxed step.
/// The accepted step is the winner's exact ratio, clamped to
/// [0, maxstep].
fn ratiotest_twopass<T: RealNumber>(
    instance: &Instance<T>,
    basis: &Basis<T>,
    primal: &Vector<T>,
    p: &Vector<T>,
    rowactivity: &Vector<T>,
    rowmove: &Vector<T>,
    maxstep: T,
    feasibility_tolerance: T,
) -> RatiotestResult<T> {
    let relaxed = candidates(
        instance,
        basis,
        primal,
        p,
        rowactivity,
        rowmove,
        feasibility_tolerance,
    );
    let mut relaxed_step = maxstep;
    for candidate in &relaxed {
        if candidate.ratio < relaxed_step {
            relaxed_step = candidate.ratio;
        }
    }

    let exact = candidates(
        instance,
        basis,
        primal,
        p,
        rowactivity,
        rowmove,
        T::zero(),
    );
    let mut winner: Option<&Candidate<T>> = None;
    for candidate in &exact {
        if candidate.ratio > relaxed_step {
            continue;
        }
        if winner.map_or(true, |w| candidate.pivot > w.pivot) {
            winner = Some(candidate);
        }
    }
    match winner {
        Some(candidate) => RatiotestResult {
            alpha: candidate.ratio.max(T::zero()).min(maxstep),
            limiting: Some(candidate.index),
            at_lower: candidate.at_lower,
        },
        None => RatiotestResult {
            alpha: maxstep,
            limiting: None,
            at_lower: false,
        },
    }
}

#[allow(clippy::too_many_arguments)]
pub fn ratiotest<T: RealNumber>(
    strategy: RatiotestStrategy,
    instance: &Instance<T>,
    basis: &Basis<T>,
    primal: &Vector<T>,
    p: &Vector<T>,
    rowactivity: &Vector<T>,
    rowmove: &Vector<T>,
    maxstep: T,
    feasibility_tolerance: T,
) -> RatiotestResult<T> {
    match strategy {
        RatiotestStrategy::Textbook => {
            let exact = candidates(
                instance,
                basis,
                primal,
                p,
                rowactivity,
                rowmove,
                T::zero(),
            );
            ratiotest_textbook(exact, maxstep)
        }
        RatiotestStrategy::Twopass => ratiotest_twopass(
            instance,
            basis,
            primal,
            p,
            rowactivity,
            rowmove,
            maxstep,
            feasibility_tolerance,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use asqp_core::math::Scalar;
    use asqp_core::problem::{Bounds, CscMatrix, ProblemQP};
    use asqp_core::start::CrashSolution;

    fn boxed_instance() -> Instance<Scalar> {
        let problem = ProblemQP {
            quadratic: CscMatrix::identity(2),
            linear: vec![0.0, 0.0],
            constraints: None,
            bounds: Some(Bounds {
                lower: vec![0.0, 0.0],
                upper: vec![2.0, 3.0],
            }),
        };
        Instance::from_problem(&problem).unwrap()
    }

    fn all_inactive(instance: &Instance<Scalar>) -> Basis<Scalar> {
        let crash = CrashSolution::inactive_at(
            Vector::from_dense(&[1.0, 1.0]),
            Vector::new(0),
            instance.num_total(),
        );
        Basis::new(instance, &crash).unwrap()
    }

    #[test]
    fn first_bound_hit_limits_the_step() {
        let instance = boxed_instance();
        let basis = all_inactive(&instance);
        let primal = Vector::from_dense(&[1.0, 1.0]);
        let p = Vector::from_dense(&[1.0, 1.0]);
        let rowactivity = Vector::new(0);
        let rowmove = Vector::new(0);
        let result = ratiotest(
            RatiotestStrategy::Textbook,
            &instance,
            &basis,
            &primal,
            &p,
            &rowactivity,
            &rowmove,
            f64::INFINITY,
            1e-9,
        );
        // x1 hits its upper bound 2 first
        assert_eq!(result.limiting, Some(0));
        assert!(!result.at_lower);
        assert_relative_eq!(result.alpha, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn unblocked_step_reports_no_limit() {
        let problem = ProblemQP {
            quadratic: CscMatrix::identity(1),
            linear: vec![0.0],
            constraints: None,
            bounds: Some(Bounds {
                lower: vec![0.0],
                upper: vec![f64::INFINITY],
            }),
        };
        let instance = Instance::from_problem(&problem).unwrap();
        let crash = CrashSolution::inactive_at(
            Vector::from_dense(&[1.0]),
            Vector::new(0),
            instance.num_total(),
        );
        let basis = Basis::new(&instance, &crash).unwrap();
        let result = ratiotest(
            RatiotestStrategy::Twopass,
            &instance,
            &basis,
            &Vector::from_dense(&[1.0]),
            &Vector::from_dense(&[1.0]),
            &Vector::new(0),
            &Vector::new(0),
            f64::INFINITY,
            1e-9,
        );
        assert!(result.limiting.is_none());
        assert!(result.alpha.is_infinite());
    }

    #[test]
    fn twopass_prefers_larger_pivot_at_degenerate_vertex() {
        // both bounds block at the same ratio; the harris pass must
        // choose the one with the larger pivot
        let instance = boxed_instance();
        let basis = all_inactive(&instance);
        let primal = Vector::from_dense(&[1.0, 2.0]);
        let p = Vector::from_dense(&[-1.0, -2.0]);
        let result = ratiotest(
            RatiotestStrategy::Twopass,
            &instance,
            &basis,
            &primal,
            &p,
            &Vector::new(0),
            &Vector::new(0),
            f64::INFINITY,
            1e-9,
        );
        assert_eq!(result.limiting, Some(1));
        assert!(result.at_lower);
        assert_relative_eq!(result.alpha, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn step_clamped_to_maxstep() {
        let instance = boxed_instance();
        let basis = all_inactive(&instance);
        let primal = Vector::from_dense(&[1.0, 1.0]);
        let p = Vector::from_dense(&[1.0, 0.0]);
        let result = ratiotest(
            RatiotestStrategy::Twopass,
            &instance,
            &basis,
            &primal,
            &p,
            &Vector::new(0),
            &Vector::new(0),
            0.25,
            1e-9,
        );
        assert_relative_eq!(result.alpha, 0.25, epsilon = 1e-12);
    }
}

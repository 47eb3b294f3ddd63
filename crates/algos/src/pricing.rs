use asqp_core::math::RealNumber;
use asqp_core::options::PricingStrategy;
use asqp_core::start::BasisStatus;
use asqp_linsys::Basis;

/// Selects which active constraint to release next.
///
/// `price` scans the multipliers of the active set and returns the
/// combined index of the most attractive sign violation, or `None` when
/// every multiplier has the right sign within tolerance. `update_weights`
/// is called after each activation so reference-framework schemes can
/// track their weights.
pub trait Pricing<T: RealNumber> {
    fn price(&mut self, basis: &Basis<T>, lambda: &[T], tolerance: T) -> Option<usize>;

    fn update_weights(&mut self, entering: usize, dropped: usize, pivot: T);
}

/// Sign violation of one active multiplier. A constraint active at its
/// lower bound wants lambda >= 0, one active at its upper bound wants
/// lambda <= 0.
fn violation<T: RealNumber>(status: BasisStatus, lambda: T, tolerance: T) -> T {
    match status {
        BasisStatus::ActiveAtLower => {
            if lambda < -tolerance {
                -lambda
            } else {
                T::zero()
            }
        }
        BasisStatus::ActiveAtUpper => {
            if lambda > tolerance {
                lambda
            } else {
                T::zero()
            }
        }
        BasisStatus::Default => T::zero(),
    }
}

fn slot_lambda<T: RealNumber>(basis: &Basis<T>, lambda: &[T], index: usize) -> T {
    match basis.index_in_factor(index) {
        Some(slot) => lambda[slot],
        None => unreachable!("active index {index} has no factor slot"),
    }
}

/// Largest sign violation wins.
#[derive(Debug, Default)]
pub struct DantzigPricing;

impl<T: RealNumber> Pricing<T> for DantzigPricing {
    fn price(&mut self, basis: &Basis<T>, lambda: &[T], tolerance: T) -> Option<usize> {
        let mut best: Option<(usize, T)> = None;
        for &index in basis.active() {
            let viol = violation(basis.status(index), slot_lambda(basis, lambda, index), tolerance);
            if viol > T::zero() && best.map_or(true, |(_, b)| viol > b) {
                best = Some((index, viol));
            }
        }
        best.map(|(index, _)| index)
    }

    fn update_weights(&mut self, _entering: usize, _dropped: usize, _pivot: T) {}
}

/// Devex reference-framework pricing: score = violation² / weight, with
/// Forrest-Goldfarb weight propagation on each basis change and a reset
/// once the weights grow too large to be meaningful.
#[derive(Debug)]
pub struct DevexPricing<T> {
    weights: Vec<T>,
}

impl<T: RealNumber> DevexPricing<T> {
    pub fn new(num_total: usize) -> Self {
        Self {
            weights: vec![T::one(); num_total],
        }
    }

    fn best_score(&self, basis: &Basis<T>, lambda: &[T], tolerance: T, cutoff: T) -> Option<usize> {
        let mut best: Option<(usize, T)> = None;
        for &index in basis.active() {
            let viol = violation(basis.status(index), slot_lambda(basis, lambda, index), tolerance);
            if viol < cutoff || viol == T::zero() {
                continue;
            }
            let score = viol * viol / self.weights[index];
            if best.map_or(true, |(_, b)| score > b) {
                best = Some((index, score));
            }
        }
        best.map(|(index, _)| index)
    }
}

impl<T: RealNumber> Pricing<T> for DevexPricing<T> {
    fn price(&mut self, basis: &Basis<T>, lambda: &[T], tolerance: T) -> Option<usize> {
        self.best_score(basis, lambda, tolerance, T::zero())
    }

    fn update_weights(&mut self, entering: usize, dropped: usize, pivot: T) {
        let propagated = self.weights[dropped] / (pivot * pivot);
        self.weights[entering] = propagated.max(T::one());
        let limit = T::from_f64(1e7).unwrap();
        if self.weights[entering] > limit {
            for w in &mut self.weights {
                *w = T::one();
            }
        }
    }
}

/// Devex with a Harris-style candidate pass: only violations within a
/// fixed fraction of the largest one compete on their devex score, which
/// keeps the scheme from chasing well-weighted but tiny violations.
#[derive(Debug)]
pub struct DevexHarrisPricing<T> {
    inner: DevexPricing<T>,
}

impl<T: RealNumber> DevexHarrisPricing<T> {
    pub fn new(num_total: usize) -> Self {
        Self {
            inner: DevexPricing::new(num_total),
        }
    }
}

impl<T: RealNumber> Pricing<T> for DevexHarrisPricing<T> {
    fn price(&mut self, basis: &Basis<T>, lambda: &[T], tolerance: T) -> Option<usize> {
        let mut largest = T::zero();
        for &index in basis.active() {
            let viol = violation(basis.status(index), slot_lambda(basis, lambda, index), tolerance);
            if viol > largest {
                largest = viol;
            }
        }
        if largest == T::zero() {
            return None;
        }
        let cutoff = largest * T::from_f64(0.1).unwrap();
        self.inner.best_score(basis, lambda, tolerance, cutoff)
    }

    fn update_weights(&mut self, entering: usize, dropped: usize, pivot: T) {
        Pricing::update_weights(&mut self.inner, entering, dropped, pivot);
    }
}

/// Exact steepest-edge pricing: each candidate's violation is normalised
/// by the squared norm of the basis direction its release would free.
/// Accurate and expensive; the weights are read off the basis inverse
/// on every call instead of being maintained.
#[derive(Debug, Default)]
pub struct SteepestEdgePricing;

impl<T: RealNumber> Pricing<T> for SteepestEdgePricing {
    fn price(&mut self, basis: &Basis<T>, lambda: &[T], tolerance: T) -> Option<usize> {
        let mut best: Option<(usize, T)> = None;
        for &index in basis.active() {
            let viol = violation(basis.status(index), slot_lambda(basis, lambda, index), tolerance);
            if viol == T::zero() {
                continue;
            }
            let slot = match basis.index_in_factor(index) {
                Some(slot) => slot,
                None => unreachable!("active index {index} has no factor slot"),
            };
            let direction_norm = basis.btran(slot).norm2();
            let weight = (direction_norm * direction_norm).max(T::from_f64(1e-12).unwrap());
            let score = viol * viol / weight;
            if best.map_or(true, |(_, b)| score > b) {
                best = Some((index, score));
            }
        }
        best.map(|(index, _)| index)
    }

    fn update_weights(&mut self, _entering: usize, _dropped: usize, _pivot: T) {}
}

pub fn make_pricing<T: RealNumber + 'static>(
    strategy: PricingStrategy,
    num_total: usize,
) -> Box<dyn Pricing<T>> {
    match strategy {
        PricingStrategy::Dantzig => Box::new(DantzigPricing),
        PricingStrategy::Devex => Box::new(DevexPricing::new(num_total)),
        PricingStrategy::DevexHarris => Box::new(DevexHarrisPricing::new(num_total)),
        PricingStrategy::SteepestEdge => Box::new(SteepestEdgePricing),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use asqp_core::instance::Instance;
    use asqp_core::math::Scalar;
    use asqp_core::problem::{Bounds, CscMatrix, ProblemQP};
    use asqp_core::start::CrashSolution;
    use asqp_core::vector::Vector;

    fn bound_instance() -> Instance<Scalar> {
        let problem = ProblemQP {
            quadratic: CscMatrix::identity(2),
            linear: vec![0.0, 0.0],
            constraints: None,
            bounds: Some(Bounds {
                lower: vec![0.0, 0.0],
                upper: vec![1.0, 1.0],
            }),
        };
        Instance::from_problem(&problem).unwrap()
    }

    fn bounds_active_basis(instance: &Instance<Scalar>) -> Basis<Scalar> {
        let crash = CrashSolution {
            primal: Vector::new(2),
            rowact: Vector::new(0),
            active: vec![0, 1],
            status: vec![BasisStatus::ActiveAtLower, BasisStatus::ActiveAtLower],
        };
        Basis::new(instance, &crash).unwrap()
    }

    #[test]
    fn dantzig_picks_largest_violation() {
        let instance = bound_instance();
        let basis = bounds_active_basis(&instance);
        let mut pricing = DantzigPricing;
        let slot0 = basis.index_in_factor(0).unwrap();
        let slot1 = basis.index_in_factor(1).unwrap();
        let mut lambda = vec![0.0; 2];
        lambda[slot0] = -1.0;
        lambda[slot1] = -3.0;
        assert_eq!(pricing.price(&basis, &lambda, 1e-7), Some(1));
    }

    #[test]
    fn right_sign_multipliers_are_optimal() {
        let instance = bound_instance();
        let basis = bounds_active_basis(&instance);
        let mut pricing = DevexPricing::new(instance.num_total());
        let lambda = vec![0.5, 0.25];
        assert_eq!(pricing.price(&basis, &lambda, 1e-7), None);
    }

    #[test]
    fn devex_weights_steer_selection() {
        let instance = bound_instance();
        let basis = bounds_active_basis(&instance);
        let mut pricing = DevexPricing::new(instance.num_total());
        // weight down index 1 so the smaller violation wins
        pricing.weights[1] = 100.0;
        let slot0 = basis.index_in_factor(0).unwrap();
        let slot1 = basis.index_in_factor(1).unwrap();
        let mut lambda = vec![0.0; 2];
        lambda[slot0] = -1.0;
        lambda[slot1] = -3.0;
        assert_eq!(pricing.price(&basis, &lambda, 1e-7), Some(0));
    }

    #[test]
    fn forrest_goldfarb_floor_is_one() {
        let mut pricing = DevexPricing::<Scalar>::new(3);
        pricing.update_weights(2, 0, 10.0);
        assert_eq!(pricing.weights[2], 1.0);
        pricing.update_weights(1, 0, 0.1);
        assert_eq!(pricing.weights[1], 100.0);
    }
}

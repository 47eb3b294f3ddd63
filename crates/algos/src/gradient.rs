use asqp_core::instance::Instance;
use asqp_core::math::RealNumber;
use asqp_core::vector::Vector;
use asqp_linsys::Basis;

/// Objective gradient g = Qx + c, advanced incrementally along each
/// accepted step: g += alpha * Qp.
#[derive(Debug, Clone)]
pub struct Gradient<T> {
    value: Vector<T>,
}

impl<T> Gradient<T>
where
    T: RealNumber,
{
    pub fn new(instance: &Instance<T>, x: &Vector<T>) -> Self {
        let mut value = Vector::new(instance.num_var);
        instance.q_vec(x, &mut value);
        for (j, &cj) in instance.linear().iter().enumerate() {
            if cj != T::zero() {
                let updated = value.get(j) + cj;
                value.set(j, updated);
            }
        }
        Self { value }
    }

    pub fn vector(&self) -> &Vector<T> {
        &self.value
    }

    pub fn update(&mut self, qp: &Vector<T>, alpha: T) {
        self.value.saxpy(alpha, qp);
    }
}

/// Reduced gradient Zᵀg over the inactive ordinals. Kept exactly in
/// step with the null-space frame: `expand` appends the component along
/// a freed basis direction, `reduce` removes one ordinal through the
/// entering row's d-combination, and `update` adds alpha * Zᵀ(Qp) after
/// a step of length alpha.
#[derive(Debug, Clone)]
pub struct ReducedGradient<T> {
    value: Vec<T>,
}

impl<T> ReducedGradient<T>
where
    T: RealNumber,
{
    pub fn new(basis: &Basis<T>, gradient: &Gradient<T>) -> Self {
        Self {
            value: basis.ztprod(gradient.vector()),
        }
    }

    pub fn values(&self) -> &[T] {
        &self.value
    }

    /// Component along the direction freed by a deactivation: g·yp.
    pub fn expand(&mut self, gdotyp: T) {
        self.value.push(gdotyp);
    }

    /// Surviving ordinals become z_j − (d_j/d_p)·z_p; their components
    /// follow the same combination before ordinal `pivot` is removed.
    pub fn reduce(&mut self, d: &[T], pivot: usize, was_inactive: bool) {
        debug_assert_eq!(d.len(), self.value.len());
        if !was_inactive {
            let rg_pivot = self.value[pivot];
            let d_pivot = d[pivot];
            for (j, rg) in self.value.iter_mut().enumerate() {
                if j != pivot {
                    *rg = *rg - d[j] / d_pivot * rg_pivot;
                }
            }
        }
        self.value.remove(pivot);
    }

    /// rg += alpha * Zᵀ(Qp), in the frame `ztqp` was computed in.
    pub fn update(&mut self, alpha: T, ztqp: &[T]) {
        debug_assert_eq!(ztqp.len(), self.value.len());
        for (rg, &v) in self.value.iter_mut().zip(ztqp) {
            *rg += alpha * v;
        }
    }
}

/// Lagrange multipliers lambda = B⁻ᵀ g, one per factor slot, recomputed
/// lazily: any gradient or basis change invalidates the cached values.
#[derive(Debug, Clone)]
pub struct ReducedCosts<T> {
    lambda: Vec<T>,
    uptodate: bool,
}

impl<T> ReducedCosts<T>
where
    T: RealNumber,
{
    pub fn new(num_var: usize) -> Self {
        Self {
            lambda: vec![T::zero(); num_var],
            uptodate: false,
        }
    }

    pub fn invalidate(&mut self) {
        self.uptodate = false;
    }

    pub fn values(&mut self, basis: &Basis<T>, gradient: &Gradient<T>) -> &[T] {
        if !self.uptodate {
            self.lambda = basis.btran_full(gradient.vector());
            self.uptodate = true;
        }
        &self.lambda
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use asqp_core::math::Scalar;
    use asqp_core::problem::{Bounds, CscMatrix, ProblemQP};
    use asqp_core::start::CrashSolution;

    fn simple_instance() -> Instance<Scalar> {
        let problem = ProblemQP {
            quadratic: CscMatrix::identity(2),
            linear: vec![-1.0, -2.0],
            constraints: None,
            bounds: Some(Bounds::unbounded(2)),
        };
        Instance::from_problem(&problem).unwrap()
    }

    #[test]
    fn gradient_matches_direct_evaluation() {
        let instance = simple_instance();
        let x = Vector::from_dense(&[3.0, 4.0]);
        let gradient = Gradient::new(&instance, &x);
        assert_relative_eq!(gradient.vector().get(0), 2.0, epsilon = 1e-12);
        assert_relative_eq!(gradient.vector().get(1), 2.0, epsilon = 1e-12);
    }

    #[test]
    fn incremental_update_tracks_step() {
        let instance = simple_instance();
        let x = Vector::from_dense(&[3.0, 4.0]);
        let mut gradient = Gradient::new(&instance, &x);
        let p = Vector::from_dense(&[-1.0, -1.0]);
        let mut qp = Vector::new(2);
        instance.q_vec(&p, &mut qp);
        gradient.update(&qp, 0.5);

        let mut stepped = x.clone();
        stepped.saxpy(0.5, &p);
        let fresh = Gradient::new(&instance, &stepped);
        assert_relative_eq!(gradient.vector().get(0), fresh.vector().get(0), epsilon = 1e-12);
        assert_relative_eq!(gradient.vector().get(1), fresh.vector().get(1), epsilon = 1e-12);
    }

    #[test]
    fn reduced_gradient_reduce_combines_components() {
        let instance = simple_instance();
        let crash = CrashSolution::inactive_at(
            Vector::new(2),
            Vector::new(0),
            instance.num_total(),
        );
        let basis = Basis::new(&instance, &crash).unwrap();
        let gradient = Gradient::new(&instance, &Vector::new(2));
        let mut rg = ReducedGradient::new(&basis, &gradient);
        assert_eq!(rg.values().len(), 2);
        assert_relative_eq!(rg.values()[0], -1.0, epsilon = 1e-12);
        assert_relative_eq!(rg.values()[1], -2.0, epsilon = 1e-12);

        // drop ordinal 0 through d = (2, 1): survivor picks up
        // rg_1 - (d_1/d_0) rg_0 = -2 - 0.5 * (-1)
        rg.reduce(&[2.0, 1.0], 0, false);
        assert_eq!(rg.values().len(), 1);
        assert_relative_eq!(rg.values()[0], -1.5, epsilon = 1e-12);
    }

    #[test]
    fn reduced_costs_cache_invalidation() {
        let instance = simple_instance();
        let crash = CrashSolution::inactive_at(
            Vector::new(2),
            Vector::new(0),
            instance.num_total(),
        );
        let basis = Basis::new(&instance, &crash).unwrap();
        let x = Vector::from_dense(&[1.0, 1.0]);
        let mut gradient = Gradient::new(&instance, &x);
        let mut costs = ReducedCosts::new(2);
        let before = costs.values(&basis, &gradient).to_vec();

        let mut qp = Vector::new(2);
        instance.q_vec(&Vector::from_dense(&[1.0, 0.0]), &mut qp);
        gradient.update(&qp, 1.0);
        // stale until invalidated
        assert_eq!(costs.values(&basis, &gradient), before.as_slice());
        costs.invalidate();
        assert!(costs.values(&basis, &gradient) != before.as_slice());
    }
}

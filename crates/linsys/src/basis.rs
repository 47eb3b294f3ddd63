use asqp_core::instance::Instance;
use asqp_core::math::RealNumber;
use asqp_core::start::{BasisStatus, CrashSolution};
use asqp_core::vector::Vector;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BasisError {
    #[error("active set of size {size} exceeds variable count {num_var}")]
    ActiveSetOverflow { size: usize, num_var: usize },
    #[error("crash active set is linearly dependent at constraint {0}")]
    DependentActiveSet(usize),
    #[error("basis matrix is numerically singular")]
    SingularBasis,
    #[error("constraint {0} is not active")]
    NotActive(usize),
    #[error("constraint {0} is not inactive")]
    NotInactive(usize),
    #[error("crash status for constraint {0} is inconsistent with its active list")]
    InconsistentCrash(usize),
}

/// Partition of the combined constraint/bound index space into the
/// active set and the inactive complement filling the basis.
///
/// Every index held in the basis occupies one of `num_var` factor slots;
/// the slot rows (constraint rows of A, unit rows for bounds) form a
/// square nonsingular matrix B whose inverse is maintained explicitly in
/// product form. Columns of B⁻¹ at inactive slots span the null space of
/// the active rows; `zprod`/`ztprod` apply that operator and its
/// adjoint. Mutation happens only through `activate`/`deactivate`, which
/// the controller pairs with the matching factor update.
#[derive(Debug, Clone)]
pub struct Basis<T> {
    num_var: usize,
    num_con: usize,
    status: Vec<BasisStatus>,
    active: Vec<usize>,
    inactive: Vec<usize>,
    index_in_factor: Vec<Option<usize>>,
    slot_index: Vec<usize>,
    binv: Vec<T>,
}

impl<T> Basis<T>
where
    T: RealNumber,
{
    pub fn new(instance: &Instance<T>, crash: &CrashSolution<T>) -> Result<Self, BasisError> {
        let num_var = instance.num_var;
        let num_con = instance.num_con;
        let num_total = instance.num_total();
        if crash.active.len() > num_var {
            return Err(BasisError::ActiveSetOverflow {
                size: crash.active.len(),
                num_var,
            });
        }
        let mut status = vec![BasisStatus::Default; num_total];
        for &index in &crash.active {
            match crash.status.get(index).copied() {
                Some(s @ (BasisStatus::ActiveAtLower | BasisStatus::ActiveAtUpper)) => {
                    status[index] = s;
                }
                _ => return Err(BasisError::InconsistentCrash(index)),
            }
        }

        let pivot_columns = echelon_pivot_columns(instance, &crash.active)?;
        let mut inactive = Vec::with_capacity(num_var - crash.active.len());
        for var in 0..num_var {
            if !pivot_columns[var] {
                inactive.push(num_con + var);
            }
        }

        let mut basis = Self {
            num_var,
            num_con,
            status,
            active: crash.active.clone(),
            inactive,
            index_in_factor: vec![None; num_total],
            slot_index: vec![0; num_var],
            binv: vec![T::zero(); num_var * num_var],
        };
        let order: Vec<usize> = basis
            .active
            .iter()
            .chain(basis.inactive.iter())
            .copied()
            .collect();
        for (slot, index) in order.into_iter().enumerate() {
            basis.index_in_factor[index] = Some(slot);
            basis.slot_index[slot] = index;
        }
        basis.invert_from_scratch(instance)?;
        Ok(basis)
    }

    pub fn num_active(&self) -> usize {
        self.active.len()
    }

    pub fn num_inactive(&self) -> usize {
        self.inactive.len()
    }

    pub fn active(&self) -> &[usize] {
        &self.active
    }

    pub fn inactive(&self) -> &[usize] {
        &self.inactive
    }

    pub fn status(&self, index: usize) -> BasisStatus {
        self.status[index]
    }

    pub fn index_in_factor(&self, index: usize) -> Option<usize> {
        self.index_in_factor[index]
    }

    // every index held in the basis owns a slot; violating this is a
    // bookkeeping bug, not a recoverable condition
    fn slot_of(&self, index: usize) -> usize {
        match self.index_in_factor[index] {
            Some(slot) => slot,
            None => unreachable!("index {index} has no factor slot"),
        }
    }

    /// Back-transform of a unit vector through the basis: the tableau
    /// column of the slot, i.e. B⁻¹ e_slot.
    pub fn btran(&self, slot: usize) -> Vector<T> {
        let mut out = Vector::new(self.num_var);
        for r in 0..self.num_var {
            let v = self.binv[r * self.num_var + slot];
            if v != T::zero() {
                out.set(r, v);
            }
        }
        out
    }

    /// Project reduced coordinates (over the inactive ordinals) into the
    /// full variable space: p = Z x.
    pub fn zprod(&self, x: &[T]) -> Vector<T> {
        assert_eq!(x.len(), self.inactive.len(), "zprod dimension mismatch");
        let mut p = Vector::new(self.num_var);
        for (ordinal, &index) in self.inactive.iter().enumerate() {
            let coeff = x[ordinal];
            if coeff == T::zero() {
                continue;
            }
            let slot = self.slot_of(index);
            for r in 0..self.num_var {
                let v = self.binv[r * self.num_var + slot];
                if v != T::zero() {
                    let updated = p.value[r] + coeff * v;
                    p.set(r, updated);
                }
            }
        }
        p.resparsify();
        p
    }

    /// Adjoint projection: out[ordinal] = z_ordinal · g.
    pub fn ztprod(&self, g: &Vector<T>) -> Vec<T> {
        let mut out = vec![T::zero(); self.inactive.len()];
        for (ordinal, &index) in self.inactive.iter().enumerate() {
            let slot = self.slot_of(index);
            let mut acc = T::zero();
            for &r in &g.index {
                acc += self.binv[r * self.num_var + slot] * g.value[r];
            }
            out[ordinal] = acc;
        }
        out
    }

    /// Reduced costs for every slot: λ = B⁻ᵀ g.
    pub fn btran_full(&self, g: &Vector<T>) -> Vec<T> {
        let mut lambda = vec![T::zero(); self.num_var];
        for slot in 0..self.num_var {
            let mut acc = T::zero();
            for &r in &g.index {
                acc += self.binv[r * self.num_var + slot] * g.value[r];
            }
            lambda[slot] = acc;
        }
        lambda
    }

    /// Move an active index into the inactive complement. The basis
    /// matrix itself is unchanged; the slot merely changes sides, which
    /// grows the null space by one dimension.
    pub fn deactivate(&mut self, index: usize) -> Result<(), BasisError> {
        let position = self
            .active
            .iter()
            .position(|&i| i == index)
            .ok_or(BasisError::NotActive(index))?;
        self.active.remove(position);
        self.inactive.push(index);
        self.status[index] = BasisStatus::Default;
        Ok(())
    }

    /// Make `index` active with the given status, dropping `drop_index`
    /// from the inactive complement. When the two differ, the row of
    /// `drop_index` is replaced by the row of `index` and the basis
    /// inverse is repaired with a product-form (Sherman–Morrison) update.
    pub fn activate(
        &mut self,
        instance: &Instance<T>,
        index: usize,
        new_status: BasisStatus,
        drop_index: usize,
    ) -> Result<(), BasisError> {
        if self.active.len() + 1 > self.num_var {
            return Err(BasisError::ActiveSetOverflow {
                size: self.active.len() + 1,
                num_var: self.num_var,
            });
        }
        let ordinal = self
            .inactive
            .iter()
            .position(|&i| i == drop_index)
            .ok_or(BasisError::NotInactive(drop_index))?;
        if index == drop_index {
            self.inactive.remove(ordinal);
            self.active.push(index);
            self.status[index] = new_status;
            return Ok(());
        }

        let slot = self.index_in_factor[drop_index].ok_or(BasisError::NotInactive(drop_index))?;
        let mut w = instance.row_vector(index);
        let old_row = instance.row_vector(drop_index);
        w.saxpy(-T::one(), &old_row);

        // denom = 1 + wᵀ B⁻¹ e_slot; equals the entering row's pivot in
        // the null-space coordinates and must stay away from zero.
        let mut vt = vec![T::zero(); self.num_var];
        for c in 0..self.num_var {
            let mut acc = T::zero();
            for &r in &w.index {
                acc += w.value[r] * self.binv[r * self.num_var + c];
            }
            vt[c] = acc;
        }
        let denom = T::one() + vt[slot];
        if denom.abs() < T::from_f64(1e-12).unwrap() {
            return Err(BasisError::SingularBasis);
        }
        let u: Vec<T> = (0..self.num_var)
            .map(|r| self.binv[r * self.num_var + slot])
            .collect();
        for r in 0..self.num_var {
            if u[r] == T::zero() {
                continue;
            }
            let scale = u[r] / denom;
            for c in 0..self.num_var {
                self.binv[r * self.num_var + c] -= scale * vt[c];
            }
        }

        self.inactive.remove(ordinal);
        self.status[drop_index] = BasisStatus::Default;
        self.index_in_factor[drop_index] = None;
        self.active.push(index);
        self.index_in_factor[index] = Some(slot);
        self.slot_index[slot] = index;
        self.status[index] = new_status;
        Ok(())
    }

    /// Exact primal recovery at a full active set: solve B x = b where
    /// b holds each active index's binding bound value.
    pub fn recomputex(&self, instance: &Instance<T>) -> Result<Vector<T>, BasisError> {
        let mut bound = vec![T::zero(); self.num_var];
        for slot in 0..self.num_var {
            let index = self.slot_index[slot];
            bound[slot] = match self.status[index] {
                BasisStatus::ActiveAtLower => instance.bound_lower(index),
                BasisStatus::ActiveAtUpper => instance.bound_upper(index),
                BasisStatus::Default => return Err(BasisError::NotActive(index)),
            };
        }
        let mut x = Vector::new(self.num_var);
        for r in 0..self.num_var {
            let mut acc = T::zero();
            for (slot, &b) in bound.iter().enumerate() {
                acc += self.binv[r * self.num_var + slot] * b;
            }
            if acc != T::zero() {
                x.set(r, acc);
            }
        }
        Ok(x)
    }

    fn invert_from_scratch(&mut self, instance: &Instance<T>) -> Result<(), BasisError> {
        let n = self.num_var;
        // Gauss-Jordan on [B | I]
        let mut work = vec![T::zero(); n * 2 * n];
        for slot in 0..n {
            let row = instance.row_vector(self.slot_index[slot]);
            for &j in &row.index {
                work[slot * 2 * n + j] = row.value[j];
            }
            work[slot * 2 * n + n + slot] = T::one();
        }
        for col in 0..n {
            let mut pivot_row = col;
            let mut pivot_mag = work[col * 2 * n + col].abs();
            for r in (col + 1)..n {
                let mag = work[r * 2 * n + col].abs();
                if mag > pivot_mag {
                    pivot_mag = mag;
                    pivot_row = r;
                }
            }
            if pivot_mag < T::from_f64(1e-12).unwrap() {
                return Err(BasisError::SingularBasis);
            }
            if pivot_row != col {
                for c in 0..2 * n {
                    work.swap(col * 2 * n + c, pivot_row * 2 * n + c);
                }
            }
            let pivot = work[col * 2 * n + col];
            for c in 0..2 * n {
                work[col * 2 * n + c] = work[col * 2 * n + c] / pivot;
            }
            for r in 0..n {
                if r == col {
                    continue;
                }
                let factor = work[r * 2 * n + col];
                if factor == T::zero() {
                    continue;
                }
                for c in 0..2 * n {
                    let update = work[col * 2 * n + c] * factor;
                    work[r * 2 * n + c] -= update;
                }
            }
        }
        for r in 0..n {
            for c in 0..n {
                self.binv[r * self.num_var + c] = work[r * 2 * n + n + c];
            }
        }
        Ok(())
    }
}

/// Row-echelon pass over the crash active rows. Returns which variable
/// columns carry a pivot; the complement is filled with unit rows.
fn echelon_pivot_columns<T: RealNumber>(
    instance: &Instance<T>,
    active: &[usize],
) -> Result<Vec<bool>, BasisError> {
    let n = instance.num_var;
    let mut rows: Vec<Vec<T>> = active
        .iter()
        .map(|&index| {
            let row = instance.row_vector(index);
            row.value
        })
        .collect();
    let mut is_pivot = vec![false; n];
    let mut pivots: Vec<(usize, usize)> = Vec::new(); // (row, col)
    for r in 0..rows.len() {
        for &(pr, pc) in &pivots {
            let factor = rows[r][pc] / rows[pr][pc];
            if factor != T::zero() {
                let reference = rows[pr].clone();
                for c in 0..n {
                    let update = factor * reference[c];
                    rows[r][c] -= update;
                }
            }
        }
        let mut best_col = 0;
        let mut best_mag = T::zero();
        for c in 0..n {
            if !is_pivot[c] && rows[r][c].abs() > best_mag {
                best_mag = rows[r][c].abs();
                best_col = c;
            }
        }
        if best_mag < T::from_f64(1e-10).unwrap() {
            return Err(BasisError::DependentActiveSet(active[r]));
        }
        is_pivot[best_col] = true;
        pivots.push((r, best_col));
    }
    Ok(is_pivot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use asqp_core::math::Scalar;
    use asqp_core::problem::{Bounds, CscMatrix, ProblemQP, RowConstraints};

    fn instance() -> Instance<Scalar> {
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

    fn crash_with_row_active(instance: &Instance<Scalar>) -> CrashSolution<Scalar> {
        let mut status = vec![BasisStatus::Default; instance.num_total()];
        status[0] = BasisStatus::ActiveAtLower;
        CrashSolution {
            primal: Vector::from_dense(&[0.5, 0.5]),
            rowact: Vector::from_dense(&[1.0]),
            active: vec![0],
            status,
        }
    }

    #[test]
    fn completion_fills_with_bounds() {
        let instance = instance();
        let crash = crash_with_row_active(&instance);
        let basis = Basis::new(&instance, &crash).unwrap();
        assert_eq!(basis.num_active(), 1);
        assert_eq!(basis.num_inactive(), 1);
        // the single inactive index is a variable bound
        assert!(basis.inactive()[0] >= instance.num_con);
    }

    #[test]
    fn null_space_is_orthogonal_to_active_rows() {
        let instance = instance();
        let crash = crash_with_row_active(&instance);
        let basis = Basis::new(&instance, &crash).unwrap();
        let z = basis.zprod(&[1.0]);
        let row = instance.row_vector(0);
        assert!(row.dot(&z).abs() < 1e-10);
    }

    #[test]
    fn activate_replaces_row_and_updates_inverse() {
        let instance = instance();
        let crash = CrashSolution::inactive_at(
            Vector::from_dense(&[2.0, 2.0]),
            Vector::from_dense(&[4.0]),
            instance.num_total(),
        );
        let mut basis = Basis::new(&instance, &crash).unwrap();
        assert_eq!(basis.num_inactive(), 2);
        let drop_index = basis.inactive()[0];
        basis
            .activate(&instance, 0, BasisStatus::ActiveAtLower, drop_index)
            .unwrap();
        assert_eq!(basis.num_active(), 1);
        // remaining null direction must be orthogonal to the new row
        let z = basis.zprod(&[1.0]);
        let row = instance.row_vector(0);
        assert!(row.dot(&z).abs() < 1e-10);
    }

    #[test]
    fn recomputex_at_full_active_set() {
        let instance = instance();
        let mut status = vec![BasisStatus::Default; instance.num_total()];
        status[0] = BasisStatus::ActiveAtLower;
        status[1] = BasisStatus::ActiveAtLower;
        let crash = CrashSolution {
            primal: Vector::from_dense(&[0.0, 1.0]),
            rowact: Vector::from_dense(&[1.0]),
            active: vec![0, 1],
            status,
        };
        let basis = Basis::new(&instance, &crash).unwrap();
        let x = basis.recomputex(&instance).unwrap();
        assert!((x.value[0] - 0.0).abs() < 1e-10);
        assert!((x.value[1] - 1.0).abs() < 1e-10);
    }

    #[test]
    fn dependent_crash_rows_rejected() {
        let problem = ProblemQP {
            quadratic: CscMatrix::identity(2),
            linear: vec![0.0, 0.0],
            constraints: Some(RowConstraints {
                matrix: CscMatrix {
                    nrows: 2,
                    ncols: 2,
                    indptr: vec![0, 2, 4],
                    indices: vec![0, 1, 0, 1],
                    data: vec![1.0, 2.0, 1.0, 2.0],
                },
                bounds: Bounds {
                    lower: vec![0.0, 0.0],
                    upper: vec![1.0, 1.0],
                },
            }),
            bounds: None,
        };
        let instance = Instance::from_problem(&problem).unwrap();
        let mut status = vec![BasisStatus::Default; instance.num_total()];
        status[0] = BasisStatus::ActiveAtLower;
        status[1] = BasisStatus::ActiveAtLower;
        let crash = CrashSolution {
            primal: Vector::new(2),
            rowact: Vector::new(2),
            active: vec![0, 1],
            status,
        };
        assert!(matches!(
            Basis::new(&instance, &crash),
            Err(BasisError::DependentActiveSet(_))
        ));
    }
}

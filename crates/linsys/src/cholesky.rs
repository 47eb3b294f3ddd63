use crate::basis::Basis;
use asqp_core::instance::Instance;
use asqp_core::math::RealNumber;
use asqp_core::vector::Vector;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FactorError {
    #[error("reduced hessian is not positive definite at column {column} (pivot {pivot:.3e})")]
    NotPositiveDefinite { column: usize, pivot: f64 },
    #[error("factor expand lost positive definiteness (radicand {radicand:.3e})")]
    IndefiniteUpdate { radicand: f64 },
    #[error("factor dimension mismatch: have {have}, expected {expected}")]
    Dimension { have: usize, expected: usize },
}

/// Lower-triangular Cholesky factor of the reduced Hessian ZᵀQZ over the
/// current null space, updated incrementally as the active set changes.
///
/// `expand` appends one row/column when a constraint leaves the active
/// set, reusing the projections the search-direction computation already
/// produced; `reduce` removes one null-space direction through the
/// entering constraint's d-combination and re-triangularises with Givens
/// rotations. Neither touches Q. Callers skip both on a zero-curvature
/// direction, in which case the active-set change nets out within the
/// same iteration.
#[derive(Debug, Clone)]
pub struct CholeskyUpdater<T> {
    capacity: usize,
    dim: usize,
    l: Vec<T>,
}

impl<T> CholeskyUpdater<T>
where
    T: RealNumber,
{
    /// Dense initial factorization of ZᵀQZ for the seed basis.
    pub fn new(instance: &Instance<T>, basis: &Basis<T>) -> Result<Self, FactorError> {
        let k = basis.num_inactive();
        let reduced = reduced_hessian(instance, basis);
        let mut factor = Self::empty(instance.num_var);
        factor.factorize(&reduced, k)?;
        Ok(factor)
    }

    /// Direction of (numerically) zero curvature behind a failed seed
    /// factorization. The leading `column`×`column` block of ZᵀQZ is
    /// positive definite, so u = (−(L Lᵀ)⁻¹ m, 1, 0, …) with m the
    /// off-diagonal part of the failed column has uᵀ(ZᵀQZ)u equal to
    /// the rejected pivot.
    pub fn flat_direction(
        instance: &Instance<T>,
        basis: &Basis<T>,
        column: usize,
    ) -> Result<Vec<T>, FactorError> {
        let k = basis.num_inactive();
        assert!(column < k, "flat direction column out of range");
        let reduced = reduced_hessian(instance, basis);
        let mut leading = Self::empty(instance.num_var);
        let mut block = vec![T::zero(); column * column];
        for i in 0..column {
            for j in 0..column {
                block[i * column + j] = reduced[i * k + j];
            }
        }
        leading.factorize(&block, column)?;
        let mut w: Vec<T> = (0..column).map(|i| reduced[i * k + column]).collect();
        leading.solve(&mut w);
        let mut u = vec![T::zero(); k];
        for (i, &wi) in w.iter().enumerate() {
            u[i] = -wi;
        }
        u[column] = T::one();
        Ok(u)
    }

    fn empty(capacity: usize) -> Self {
        Self {
            capacity,
            dim: 0,
            l: vec![T::zero(); capacity * capacity],
        }
    }

    // standard left-looking Cholesky of a dense k×k matrix
    fn factorize(&mut self, reduced: &[T], k: usize) -> Result<(), FactorError> {
        for j in 0..k {
            let mut diag = reduced[j * k + j];
            for c in 0..j {
                diag -= self.l(j, c) * self.l(j, c);
            }
            if diag <= T::from_f64(1e-12).unwrap() {
                return Err(FactorError::NotPositiveDefinite {
                    column: j,
                    pivot: diag.to_f64().unwrap_or(f64::NAN),
                });
            }
            let diag = diag.sqrt();
            *self.l_mut(j, j) = diag;
            for i in (j + 1)..k {
                let mut lij = reduced[i * k + j];
                for c in 0..j {
                    lij -= self.l(i, c) * self.l(j, c);
                }
                *self.l_mut(i, j) = lij / diag;
            }
        }
        self.dim = k;
        Ok(())
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    fn l(&self, row: usize, col: usize) -> T {
        self.l[row * self.capacity + col]
    }

    fn l_mut(&mut self, row: usize, col: usize) -> &mut T {
        &mut self.l[row * self.capacity + col]
    }

    /// Forward substitution L y = v.
    pub fn solve_l(&self, v: &mut [T]) {
        assert_eq!(v.len(), self.dim, "solve_l dimension mismatch");
        for i in 0..self.dim {
            for j in 0..i {
                let update = self.l(i, j) * v[j];
                v[i] -= update;
            }
            v[i] = v[i] / self.l(i, i);
        }
    }

    /// Back substitution Lᵀ y = v.
    pub fn solve_lt(&self, v: &mut [T]) {
        assert_eq!(v.len(), self.dim, "solve_lt dimension mismatch");
        for i in (0..self.dim).rev() {
            for j in (i + 1)..self.dim {
                let update = self.l(j, i) * v[j];
                v[i] -= update;
            }
            v[i] = v[i] / self.l(i, i);
        }
    }

    /// Solve L Lᵀ y = v.
    pub fn solve(&self, v: &mut [T]) {
        self.solve_l(v);
        self.solve_lt(v);
    }

    /// Rank-1 expand when a constraint leaves the active set: the new
    /// null direction yp contributes the row [lᵀ, sqrt(ypᵀQyp − lᵀl)],
    /// where l = L⁻¹ Zᵀ(Q yp) was already computed by the caller.
    pub fn expand(&mut self, yp: &Vector<T>, gyp: &Vector<T>, l: &[T]) -> Result<(), FactorError> {
        if l.len() != self.dim {
            return Err(FactorError::Dimension {
                have: l.len(),
                expected: self.dim,
            });
        }
        let curvature = yp.dot(gyp);
        let radicand = curvature - asqp_core::math::dot(l, l);
        if radicand <= T::from_f64(1e-12).unwrap() {
            return Err(FactorError::IndefiniteUpdate {
                radicand: radicand.to_f64().unwrap_or(f64::NAN),
            });
        }
        let row = self.dim;
        for (col, &value) in l.iter().enumerate() {
            *self.l_mut(row, col) = value;
        }
        *self.l_mut(row, row) = radicand.sqrt();
        self.dim += 1;
        Ok(())
    }

    /// Downdate when a constraint enters the active set. `d` expresses
    /// the entering row in the current null-space coordinates; ordinal
    /// `pivot` is eliminated, the surviving directions become
    /// z_j − (d_j/d_p)·z_p, and the factor follows by triangularising
    /// Lᵀ·P with Givens rotations.
    pub fn reduce(&mut self, d: &[T], pivot: usize, was_inactive: bool) -> Result<(), FactorError> {
        let k = self.dim;
        if d.len() != k {
            return Err(FactorError::Dimension {
                have: d.len(),
                expected: k,
            });
        }
        assert!(pivot < k, "reduce pivot out of range");
        if k == 1 {
            *self.l_mut(0, 0) = T::zero();
            self.dim = 0;
            return Ok(());
        }
        let cols = k - 1;
        let mut t = vec![T::zero(); k * cols];
        let mut target = 0;
        for j in 0..k {
            if j == pivot {
                continue;
            }
            let ratio = if was_inactive {
                T::zero()
            } else {
                d[j] / d[pivot]
            };
            for i in 0..k {
                t[i * cols + target] = self.l(j, i) - ratio * self.l(pivot, i);
            }
            target += 1;
        }

        for c in 0..cols {
            for r in (c + 1)..k {
                let b = t[r * cols + c];
                if b == T::zero() {
                    continue;
                }
                let a = t[c * cols + c];
                let g = (a * a + b * b).sqrt();
                if g == T::zero() {
                    continue;
                }
                let cs = a / g;
                let sn = b / g;
                for cc in c..cols {
                    let top = t[c * cols + cc];
                    let bottom = t[r * cols + cc];
                    t[c * cols + cc] = cs * top + sn * bottom;
                    t[r * cols + cc] = cs * bottom - sn * top;
                }
            }
        }

        for j in 0..cols {
            for i in 0..cols {
                *self.l_mut(j, i) = T::zero();
            }
        }
        for c in 0..cols {
            let flip = t[c * cols + c] < T::zero();
            for j in c..cols {
                let value = t[c * cols + j];
                *self.l_mut(j, c) = if flip { -value } else { value };
            }
        }
        // clear the retired row
        for i in 0..k {
            *self.l_mut(cols, i) = T::zero();
        }
        self.dim = cols;
        Ok(())
    }

    /// Fill-in of the current factor, for diagnostics.
    pub fn density(&self) -> T {
        if self.dim == 0 {
            return T::zero();
        }
        let mut nonzeros = 0;
        for i in 0..self.dim {
            for j in 0..=i {
                if self.l(i, j) != T::zero() {
                    nonzeros += 1;
                }
            }
        }
        T::from_usize(nonzeros).unwrap_or(T::zero())
            / T::from_usize(self.dim * self.dim).unwrap_or(T::one())
    }
}

/// Dense ZᵀQZ over the current null space, row-major k×k.
fn reduced_hessian<T: RealNumber>(instance: &Instance<T>, basis: &Basis<T>) -> Vec<T> {
    let k = basis.num_inactive();
    let mut reduced = vec![T::zero(); k * k];
    let mut qz: Vec<Vector<T>> = Vec::with_capacity(k);
    for ordinal in 0..k {
        let mut coords = vec![T::zero(); k];
        coords[ordinal] = T::one();
        let z = basis.zprod(&coords);
        let mut out = Vector::new(instance.num_var);
        instance.q_vec(&z, &mut out);
        qz.push(out);
    }
    for i in 0..k {
        let mut coords = vec![T::zero(); k];
        coords[i] = T::one();
        let zi = basis.zprod(&coords);
        for j in 0..k {
            reduced[i * k + j] = zi.dot(&qz[j]);
        }
    }
    reduced
}

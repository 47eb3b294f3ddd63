use crate::basis::{Basis, BasisError};
use crate::cholesky::{CholeskyUpdater, FactorError};
use asqp_core::instance::Instance;
use asqp_core::math::RealNumber;
use asqp_core::start::{BasisStatus, CrashSolution};
use asqp_core::vector::Vector;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error(transparent)]
    Basis(#[from] BasisError),
    #[error(transparent)]
    Factor(#[from] FactorError),
    #[error("degenerate pivot for entering index {index} (magnitude {pivot:.3e})")]
    DegeneratePivot { index: usize, pivot: f64 },
}

/// A prepared active-set change: the entering row expressed in the
/// current null-space coordinates, and the ordinal chosen to leave.
#[derive(Debug, Clone)]
pub struct Activation<T> {
    pub d: Vec<T>,
    pub pivot: usize,
    pub was_inactive: bool,
}

impl<T> Activation<T>
where
    T: RealNumber,
{
    /// Express the entering row in the basis's current null-space
    /// coordinates and pick the leaving ordinal as the entry of largest
    /// magnitude. A pivot below `d_zero_threshold` means the entering
    /// row is numerically linearly dependent on the active set.
    pub fn prepare(
        basis: &Basis<T>,
        instance: &Instance<T>,
        index: usize,
        d_zero_threshold: T,
    ) -> Result<Self, ControllerError> {
        let was_inactive = basis.inactive().contains(&index);
        let d: Vec<T> = if was_inactive {
            let mut d = vec![T::zero(); basis.num_inactive()];
            let ordinal = basis.inactive().iter().position(|&i| i == index).unwrap();
            d[ordinal] = T::one();
            d
        } else {
            let row = instance.row_vector(index);
            basis.ztprod(&row)
        };

        let mut pivot = 0;
        let mut best = T::zero();
        for (ordinal, &value) in d.iter().enumerate() {
            if value.abs() > best {
                best = value.abs();
                pivot = ordinal;
            }
        }
        if best < d_zero_threshold {
            return Err(ControllerError::DegeneratePivot {
                index,
                pivot: best.to_f64().unwrap_or(0.0),
            });
        }
        Ok(Self {
            d,
            pivot,
            was_inactive,
        })
    }
}

/// Owns the basis and the reduced-Hessian factor and applies every
/// active-set change to both, so they can never drift apart. On a
/// zero-curvature direction the factor updates are skipped in matched
/// pairs within one iteration.
#[derive(Debug)]
pub struct ActiveSetController<T> {
    basis: Basis<T>,
    factor: CholeskyUpdater<T>,
}

impl<T> ActiveSetController<T>
where
    T: RealNumber,
{
    pub fn new(instance: &Instance<T>, crash: &CrashSolution<T>) -> Result<Self, ControllerError> {
        let basis = Basis::new(instance, crash)?;
        let factor = CholeskyUpdater::new(instance, &basis)?;
        Ok(Self { basis, factor })
    }

    /// Pair a basis with a factor the caller seeded separately.
    pub fn from_parts(basis: Basis<T>, factor: CholeskyUpdater<T>) -> Self {
        Self { basis, factor }
    }

    pub fn basis(&self) -> &Basis<T> {
        &self.basis
    }

    pub fn factor(&self) -> &CholeskyUpdater<T> {
        &self.factor
    }

    /// Release an active index into the null space. The factor is not
    /// grown here: the caller decides after the curvature check whether
    /// to follow up with [`ActiveSetController::expand_factor`] or to
    /// leave the factor alone on a zero-curvature direction.
    pub fn deactivate(&mut self, index: usize) -> Result<(), ControllerError> {
        self.basis.deactivate(index)?;
        Ok(())
    }

    /// Grow the factor by the direction freed in the last deactivation.
    /// `yp` is the freed basis direction, `gyp` its image under Q, and
    /// `l` the forward solve the search-direction computation already
    /// produced.
    pub fn expand_factor(
        &mut self,
        yp: &Vector<T>,
        gyp: &Vector<T>,
        l: &[T],
    ) -> Result<(), ControllerError> {
        self.factor.expand(yp, gyp, l)?;
        Ok(())
    }

    pub fn prepare_activation(
        &self,
        instance: &Instance<T>,
        index: usize,
        d_zero_threshold: T,
    ) -> Result<Activation<T>, ControllerError> {
        Activation::prepare(&self.basis, instance, index, d_zero_threshold)
    }

    /// Apply a prepared activation: downdate the factor, then swap the
    /// leaving ordinal's row for the entering one in the basis.
    pub fn activate(
        &mut self,
        instance: &Instance<T>,
        index: usize,
        new_status: BasisStatus,
        activation: &Activation<T>,
        zero_curvature: bool,
    ) -> Result<(), ControllerError> {
        if !zero_curvature {
            self.factor
                .reduce(&activation.d, activation.pivot, activation.was_inactive)?;
        }
        let drop_index = self.basis.inactive()[activation.pivot];
        self.basis.activate(instance, index, new_status, drop_index)?;
        Ok(())
    }

    pub fn recomputex(&self, instance: &Instance<T>) -> Result<Vector<T>, ControllerError> {
        Ok(self.basis.recomputex(instance)?)
    }
}

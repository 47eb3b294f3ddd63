use crate::math::RealNumber;
use serde::{Deserialize, Serialize};

/// Dense vector with a maintained list of nonzero positions.
///
/// The index list is an unordered superset of the true nonzero pattern;
/// operations that can introduce cancellation leave stale indices behind
/// until [`Vector::resparsify`] or [`Vector::sanitize`] is called. All
/// numeric kernels of the engine (dot, saxpy, norms) run over the index
/// list so that sparse intermediate results stay cheap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vector<T> {
    pub dim: usize,
    pub value: Vec<T>,
    pub index: Vec<usize>,
}

impl<T> Vector<T>
where
    T: RealNumber,
{
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            value: vec![T::zero(); dim],
            index: Vec::new(),
        }
    }

    /// Unit vector with a single one at `position`.
    pub fn unit(dim: usize, position: usize) -> Self {
        assert!(position < dim, "unit position out of range");
        let mut vector = Self::new(dim);
        vector.value[position] = T::one();
        vector.index.push(position);
        vector
    }

    pub fn from_dense(values: &[T]) -> Self {
        let mut vector = Self::new(values.len());
        for (i, &v) in values.iter().enumerate() {
            if v != T::zero() {
                vector.value[i] = v;
                vector.index.push(i);
            }
        }
        vector
    }

    pub fn num_nz(&self) -> usize {
        self.index.len()
    }

    pub fn reset(&mut self) {
        for &i in &self.index {
            self.value[i] = T::zero();
        }
        self.index.clear();
    }

    pub fn get(&self, i: usize) -> T {
        self.value[i]
    }

    pub fn set(&mut self, i: usize, v: T) {
        // a stale index can survive a cancellation to exact zero; never
        // push it twice or dot/norm2 would double-count the entry
        if self.value[i] == T::zero() && v != T::zero() && !self.index.contains(&i) {
            self.index.push(i);
        }
        self.value[i] = v;
    }

    pub fn dot(&self, other: &Vector<T>) -> T {
        assert_eq!(self.dim, other.dim, "dot dimension mismatch");
        // iterate the sparser side
        let (sparse, dense) = if self.num_nz() <= other.num_nz() {
            (self, other)
        } else {
            (other, self)
        };
        sparse
            .index
            .iter()
            .fold(T::zero(), |acc, &i| acc + sparse.value[i] * dense.value[i])
    }

    pub fn dot_slice(&self, other: &[T]) -> T {
        assert_eq!(self.dim, other.len(), "dot dimension mismatch");
        self.index
            .iter()
            .fold(T::zero(), |acc, &i| acc + self.value[i] * other[i])
    }

    /// self += alpha * x
    pub fn saxpy(&mut self, alpha: T, x: &Vector<T>) -> &mut Self {
        assert_eq!(self.dim, x.dim, "saxpy dimension mismatch");
        for &i in &x.index {
            let updated = self.value[i] + alpha * x.value[i];
            self.set_keeping_index(i, updated);
        }
        self
    }

    /// self = beta * self + alpha * x
    pub fn saxpy2(&mut self, beta: T, alpha: T, x: &Vector<T>) -> &mut Self {
        assert_eq!(self.dim, x.dim, "saxpy dimension mismatch");
        self.scale(beta);
        self.saxpy(alpha, x)
    }

    pub fn scale(&mut self, factor: T) -> &mut Self {
        for &i in &self.index {
            self.value[i] *= factor;
        }
        self
    }

    pub fn norm2(&self) -> T {
        self.index
            .iter()
            .fold(T::zero(), |acc, &i| acc + self.value[i] * self.value[i])
            .sqrt()
    }

    /// Zero out entries whose magnitude has drifted below `threshold`.
    pub fn sanitize(&mut self, threshold: T) -> &mut Self {
        let mut kept = Vec::with_capacity(self.index.len());
        for &i in &self.index {
            if self.value[i].abs() < threshold {
                self.value[i] = T::zero();
            } else {
                kept.push(i);
            }
        }
        self.index = kept;
        self
    }

    /// Rebuild the index list from the stored values.
    pub fn resparsify(&mut self) -> &mut Self {
        self.index.clear();
        for i in 0..self.dim {
            if self.value[i] != T::zero() {
                self.index.push(i);
            }
        }
        self
    }

    /// Overwrite self with the contents of `other`.
    pub fn repopulate(&mut self, other: &Vector<T>) -> &mut Self {
        assert_eq!(self.dim, other.dim, "repopulate dimension mismatch");
        self.reset();
        for &i in &other.index {
            self.value[i] = other.value[i];
            self.index.push(i);
        }
        self
    }

    fn set_keeping_index(&mut self, i: usize, v: T) {
        if self.value[i] == T::zero() && v != T::zero() && !self.index.contains(&i) {
            self.index.push(i);
        }
        // a now-zero entry keeps its index slot until resparsify
        self.value[i] = v;
    }
}

#[cfg(test)]
mod tests {
    use super::Vector;
    use crate::math::Scalar;

    #[test]
    fn unit_and_dot() {
        let e1 = Vector::<Scalar>::unit(3, 1);
        let v = Vector::from_dense(&[2.0, 5.0, -1.0]);
        assert_eq!(e1.num_nz(), 1);
        assert!((e1.dot(&v) - 5.0).abs() < 1e-12);
        assert!((v.dot_slice(&[1.0, 0.0, 1.0]) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn saxpy_tracks_fill_in() {
        let mut v = Vector::from_dense(&[1.0 as Scalar, 0.0, 0.0]);
        let w = Vector::from_dense(&[0.0, 2.0, 0.0]);
        v.saxpy(0.5, &w);
        assert!((v.value[1] - 1.0).abs() < 1e-12);
        assert_eq!(v.num_nz(), 2);
    }

    #[test]
    fn sanitize_drops_drift() {
        let mut v = Vector::from_dense(&[1.0 as Scalar, 1e-15, -2.0]);
        v.sanitize(1e-12);
        assert_eq!(v.num_nz(), 2);
        assert_eq!(v.value[1], 0.0);
    }

    #[test]
    fn cancelled_entry_is_not_double_counted() {
        let mut v = Vector::from_dense(&[2.0 as Scalar, 1.0]);
        let w = Vector::from_dense(&[-2.0, 0.0]);
        v.saxpy(1.0, &w);
        assert_eq!(v.value[0], 0.0);
        v.set(0, 3.0);
        assert_eq!(v.num_nz(), 2);
        assert!((v.dot(&v) - 10.0).abs() < 1e-12);
    }

    #[test]
    fn saxpy2_two_scalar_form() {
        let mut v = Vector::from_dense(&[1.0 as Scalar, 2.0]);
        let w = Vector::from_dense(&[3.0, -1.0]);
        v.saxpy2(-1.0, 1.0, &w);
        assert!((v.value[0] - 2.0).abs() < 1e-12);
        assert!((v.value[1] + 3.0).abs() < 1e-12);
    }
}

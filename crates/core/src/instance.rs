use crate::math::RealNumber;
use crate::problem::{ProblemError, ProblemQP};
use crate::vector::Vector;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InstanceError {
    #[error(transparent)]
    Problem(#[from] ProblemError),
    #[error("hessian is not symmetric at ({0}, {1})")]
    Asymmetric(usize, usize),
}

/// Immutable problem data for one solve.
///
/// Matrices are stored dense row-major; the sparse problem form is
/// scattered once at construction. Constraint/bound indices share one
/// space: `0..num_con` are rows of A, `num_con..num_con + num_var` are
/// variable bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instance<T> {
    pub num_var: usize,
    pub num_con: usize,
    q: Vec<T>,
    a: Vec<T>,
    c: Vec<T>,
    pub con_lower: Vec<T>,
    pub con_upper: Vec<T>,
    pub var_lower: Vec<T>,
    pub var_upper: Vec<T>,
}

impl<T> Instance<T>
where
    T: RealNumber,
{
    pub fn from_problem(problem: &ProblemQP<T>) -> Result<Self, InstanceError> {
        problem.validate()?;
        let n = problem.nvars();
        let m = problem.ncons();
        let q = problem.quadratic.to_dense();
        for i in 0..n {
            for j in (i + 1)..n {
                let diff = (q[i * n + j] - q[j * n + i]).abs();
                let scale = T::one() + q[i * n + j].abs();
                if diff > T::from_f64(1e-10).unwrap() * scale {
                    return Err(InstanceError::Asymmetric(i, j));
                }
            }
        }
        let mut a = vec![T::zero(); m * n];
        let (con_lower, con_upper) = match &problem.constraints {
            Some(rows) => {
                rows.matrix.scatter(n, 0, &mut a);
                (rows.bounds.lower.clone(), rows.bounds.upper.clone())
            }
            None => (Vec::new(), Vec::new()),
        };
        let (var_lower, var_upper) = match &problem.bounds {
            Some(bounds) => (bounds.lower.clone(), bounds.upper.clone()),
            None => (
                vec![T::neg_infinity(); n],
                vec![T::infinity(); n],
            ),
        };
        Ok(Self {
            num_var: n,
            num_con: m,
            q,
            a,
            c: problem.linear.clone(),
            con_lower,
            con_upper,
            var_lower,
            var_upper,
        })
    }

    pub fn num_total(&self) -> usize {
        self.num_con + self.num_var
    }

    pub fn linear(&self) -> &[T] {
        &self.c
    }

    pub fn q_entry(&self, i: usize, j: usize) -> T {
        self.q[i * self.num_var + j]
    }

    pub fn a_entry(&self, row: usize, col: usize) -> T {
        self.a[row * self.num_var + col]
    }

    /// out = A x
    pub fn mat_vec(&self, x: &Vector<T>, out: &mut Vector<T>) {
        assert_eq!(x.dim, self.num_var);
        assert_eq!(out.dim, self.num_con);
        out.reset();
        for row in 0..self.num_con {
            let mut acc = T::zero();
            for &j in &x.index {
                acc += self.a[row * self.num_var + j] * x.value[j];
            }
            out.set(row, acc);
        }
    }

    /// out = Aᵀ y
    pub fn mat_vec_transpose(&self, y: &Vector<T>, out: &mut Vector<T>) {
        assert_eq!(y.dim, self.num_con);
        assert_eq!(out.dim, self.num_var);
        out.reset();
        for col in 0..self.num_var {
            let mut acc = T::zero();
            for &row in &y.index {
                acc += self.a[row * self.num_var + col] * y.value[row];
            }
            out.set(col, acc);
        }
    }

    /// out = Q x
    pub fn q_vec(&self, x: &Vector<T>, out: &mut Vector<T>) {
        assert_eq!(x.dim, self.num_var);
        assert_eq!(out.dim, self.num_var);
        out.reset();
        for row in 0..self.num_var {
            let mut acc = T::zero();
            for &j in &x.index {
                acc += self.q[row * self.num_var + j] * x.value[j];
            }
            out.set(row, acc);
        }
    }

    pub fn objective(&self, x: &Vector<T>) -> T {
        let mut obj = x.dot_slice(&self.c);
        let mut qx = Vector::new(self.num_var);
        self.q_vec(x, &mut qx);
        obj += T::from_f64(0.5).unwrap() * x.dot(&qx);
        obj
    }

    /// Lower bound of a combined constraint/bound index.
    pub fn bound_lower(&self, index: usize) -> T {
        if index < self.num_con {
            self.con_lower[index]
        } else {
            self.var_lower[index - self.num_con]
        }
    }

    /// Upper bound of a combined constraint/bound index.
    pub fn bound_upper(&self, index: usize) -> T {
        if index < self.num_con {
            self.con_upper[index]
        } else {
            self.var_upper[index - self.num_con]
        }
    }

    /// Basis row for a combined index: a row of A, or a unit vector for a
    /// variable bound.
    pub fn row_vector(&self, index: usize) -> Vector<T> {
        if index < self.num_con {
            let mut row = Vector::new(self.num_var);
            for j in 0..self.num_var {
                let v = self.a[index * self.num_var + j];
                if v != T::zero() {
                    row.set(j, v);
                }
            }
            row
        } else {
            Vector::unit(self.num_var, index - self.num_con)
        }
    }

    /// Sum and count of primal infeasibilities over rows and variable
    /// bounds, measured against `tolerance`.
    pub fn sum_num_primal_infeasibilities(
        &self,
        x: &Vector<T>,
        rowactivity: &Vector<T>,
        tolerance: T,
    ) -> (T, usize) {
        let mut sum = T::zero();
        let mut num = 0;
        for i in 0..self.num_con {
            let act = rowactivity.value[i];
            let below = self.con_lower[i] - act;
            let above = act - self.con_upper[i];
            let violation = below.max(above);
            if violation > tolerance {
                sum += violation;
                num += 1;
            }
        }
        for j in 0..self.num_var {
            let v = x.value[j];
            let violation = (self.var_lower[j] - v).max(v - self.var_upper[j]);
            if violation > tolerance {
                sum += violation;
                num += 1;
            }
        }
        (sum, num)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Scalar;
    use crate::problem::{Bounds, CscMatrix, RowConstraints};

    fn two_var_instance() -> Instance<Scalar> {
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
    fn objective_and_products() {
        let instance = two_var_instance();
        let x = Vector::from_dense(&[0.5, 0.5]);
        assert!((instance.objective(&x) - 0.25).abs() < 1e-12);
        let mut ax = Vector::new(1);
        instance.mat_vec(&x, &mut ax);
        assert!((ax.value[0] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn combined_index_bounds() {
        let instance = two_var_instance();
        assert_eq!(instance.bound_lower(0), 1.0);
        assert_eq!(instance.bound_lower(1), 0.0);
        assert_eq!(instance.bound_upper(2), f64::INFINITY);
        let row = instance.row_vector(2);
        assert_eq!(row.value[1], 1.0);
    }

    #[test]
    fn infeasibility_measure() {
        let instance = two_var_instance();
        let x = Vector::from_dense(&[0.0, 0.0]);
        let mut ax = Vector::new(1);
        instance.mat_vec(&x, &mut ax);
        let (sum, num) = instance.sum_num_primal_infeasibilities(&x, &ax, 1e-9);
        assert_eq!(num, 1);
        assert!((sum - 1.0).abs() < 1e-12);
    }

    #[test]
    fn asymmetric_hessian_rejected() {
        let problem = ProblemQP {
            quadratic: CscMatrix {
                nrows: 2,
                ncols: 2,
                indptr: vec![0, 1, 2],
                indices: vec![1, 0],
                data: vec![1.0 as Scalar, 2.0],
            },
            linear: vec![0.0, 0.0],
            constraints: None,
            bounds: None,
        };
        assert!(Instance::from_problem(&problem).is_err());
    }
}

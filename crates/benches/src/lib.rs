//! Random problem generators shared by the benchmark targets.

#![forbid(unsafe_code)]

use asqp_core::math::Scalar;
use asqp_core::problem::CscMatrix;
use rand::{rngs::SmallRng, Rng};

/// Diagonal Hessian with eigenvalues in [1, 1.1]: strictly convex and
/// well conditioned, so benchmark times measure the active-set walk
/// rather than numerical rescue work.
pub fn random_spd_matrix(n: usize, rng: &mut SmallRng) -> CscMatrix<Scalar> {
    let mut indptr = Vec::with_capacity(n + 1);
    let mut indices = Vec::with_capacity(n);
    let mut data = Vec::with_capacity(n);
    indptr.push(0);
    for col in 0..n {
        indices.push(col);
        data.push(1.0 + rng.gen::<Scalar>() * 0.1);
        indptr.push(indices.len());
    }
    CscMatrix {
        nrows: n,
        ncols: n,
        indptr,
        indices,
        data,
    }
}

pub fn random_constraints(m: usize, n: usize, rng: &mut SmallRng) -> CscMatrix<Scalar> {
    let mut indptr = Vec::with_capacity(n + 1);
    let mut indices = Vec::new();
    let mut data = Vec::new();
    indptr.push(0);
    for _col in 0..n {
        for row in 0..m {
            indices.push(row);
            data.push(rng.gen::<Scalar>() * 0.5 - 0.25);
        }
        indptr.push(indices.len());
    }
    CscMatrix {
        nrows: m,
        ncols: n,
        indptr,
        indices,
        data,
    }
}

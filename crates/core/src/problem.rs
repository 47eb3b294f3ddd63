use crate::math::RealNumber;
use serde::{Deserialize, Serialize};
use sprs::CsMat;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProblemError {
    #[error("dimension mismatch: {0}")]
    DimensionMismatch(String),
    #[error("invalid structure: {0}")]
    InvalidStructure(String),
}

pub type ProblemResult<T> = Result<T, ProblemError>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CscMatrix<T> {
    pub nrows: usize,
    pub ncols: usize,
    pub indptr: Vec<usize>,
    pub indices: Vec<usize>,
    pub data: Vec<T>,
}

impl<T> CscMatrix<T>
where
    T: RealNumber,
{
    pub fn empty(nrows: usize, ncols: usize) -> Self {
        Self {
            nrows,
            ncols,
            indptr: vec![0; ncols + 1],
            indices: Vec::new(),
            data: Vec::new(),
        }
    }

    pub fn identity(n: usize) -> Self {
        let mut indptr = Vec::with_capacity(n + 1);
        let mut indices = Vec::with_capacity(n);
        let mut data = Vec::with_capacity(n);
        indptr.push(0);
        for i in 0..n {
            indices.push(i);
            data.push(T::one());
            indptr.push(indices.len());
        }
        Self {
            nrows: n,
            ncols: n,
            indptr,
            indices,
            data,
        }
    }

    pub fn nnz(&self) -> usize {
        self.data.len()
    }

    pub fn validate(&self) -> ProblemResult<()> {
        if self.indptr.len() != self.ncols + 1 {
            return Err(ProblemError::DimensionMismatch(format!(
                "indptr length {} != ncols + 1 ({})",
                self.indptr.len(),
                self.ncols + 1
            )));
        }
        if self.indices.len() != self.data.len() {
            return Err(ProblemError::DimensionMismatch(format!(
                "indices length {} != data length {}",
                self.indices.len(),
                self.data.len()
            )));
        }
        if self.indices.iter().any(|&row| row >= self.nrows) {
            return Err(ProblemError::InvalidStructure(
                "row index exceeds nrows".into(),
            ));
        }
        Ok(())
    }

    pub fn to_csmat(&self) -> ProblemResult<CsMat<T>> {
        self.validate()?;
        Ok(CsMat::new_csc(
            (self.nrows, self.ncols),
            self.indptr.clone(),
            self.indices.clone(),
            self.data.clone(),
        ))
    }

    /// Scatter the stored entries into a dense row-major target with a
    /// row offset. Helper shared by Instance construction.
    pub fn scatter(&self, ncols: usize, row_offset: usize, target: &mut [T]) {
        for col in 0..self.ncols {
            let start = self.indptr[col];
            let end = self.indptr[col + 1];
            for idx in start..end {
                let row = self.indices[idx];
                target[(row_offset + row) * ncols + col] = self.data[idx];
            }
        }
    }

    pub fn to_dense(&self) -> Vec<T> {
        let mut dense = vec![T::zero(); self.nrows * self.ncols];
        self.scatter(self.ncols, 0, &mut dense);
        dense
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bounds<T> {
    pub lower: Vec<T>,
    pub upper: Vec<T>,
}

impl<T> Bounds<T>
where
    T: RealNumber,
{
    pub fn unbounded(dim: usize) -> Self {
        Self {
            lower: vec![T::neg_infinity(); dim],
            upper: vec![T::infinity(); dim],
        }
    }

    pub fn validate(&self) -> ProblemResult<()> {
        if self.lower.len() != self.upper.len() {
            return Err(ProblemError::DimensionMismatch(format!(
                "lower len {} != upper len {}",
                self.lower.len(),
                self.upper.len()
            )));
        }
        for (i, (lo, hi)) in self.lower.iter().zip(self.upper.iter()).enumerate() {
            if lo > hi {
                return Err(ProblemError::InvalidStructure(format!(
                    "lower bound exceeds upper bound at index {i}"
                )));
            }
        }
        Ok(())
    }
}

/// Two-sided linear constraint rows: lower <= A x <= upper.
///
/// Equalities are expressed with lower == upper; one-sided rows leave the
/// free side infinite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RowConstraints<T> {
    pub matrix: CscMatrix<T>,
    pub bounds: Bounds<T>,
}

impl<T> RowConstraints<T>
where
    T: RealNumber,
{
    fn validate(&self, nvars: usize) -> ProblemResult<()> {
        self.matrix.validate()?;
        if self.matrix.ncols != nvars {
            return Err(ProblemError::DimensionMismatch(format!(
                "constraint matrix columns {} != nvars {}",
                self.matrix.ncols, nvars
            )));
        }
        if self.matrix.nrows != self.bounds.lower.len() {
            return Err(ProblemError::DimensionMismatch(format!(
                "constraint rows {} != bound rows {}",
                self.matrix.nrows,
                self.bounds.lower.len()
            )));
        }
        self.bounds.validate()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProblemQP<T> {
    pub quadratic: CscMatrix<T>,
    pub linear: Vec<T>,
    pub constraints: Option<RowConstraints<T>>,
    pub bounds: Option<Bounds<T>>,
}

impl<T> ProblemQP<T>
where
    T: RealNumber,
{
    pub fn nvars(&self) -> usize {
        self.linear.len()
    }

    pub fn ncons(&self) -> usize {
        self.constraints
            .as_ref()
            .map(|c| c.matrix.nrows)
            .unwrap_or(0)
    }

    pub fn validate(&self) -> ProblemResult<()> {
        let n = self.nvars();
        self.quadratic.validate()?;
        if self.quadratic.ncols != n || self.quadratic.nrows != n {
            return Err(ProblemError::DimensionMismatch(format!(
                "quadratic matrix must be square and match variable dimension {n}"
            )));
        }
        if let Some(bounds) = &self.bounds {
            if bounds.lower.len() != n {
                return Err(ProblemError::DimensionMismatch(format!(
                    "bounds size {} != nvars {n}",
                    bounds.lower.len()
                )));
            }
            bounds.validate()?;
        }
        if let Some(rows) = &self.constraints {
            rows.validate(n)?;
        }
        Ok(())
    }
}

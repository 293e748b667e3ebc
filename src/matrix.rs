//! In-memory matrix types
//!
//! [`Matrix`] is a dense row-major table of `f64` values. [`DqiGrid`] holds
//! the text data-quality codes of a model; its rows are sized independently
//! and callers must not assume a uniform width.

use crate::error::{MatrixError, Result};
use serde::Serialize;

/// Dense row-major matrix of double precision values
///
/// Immutable once built: `data.len() == rows * cols` always holds, and a
/// matrix with no rows or no columns is `0x0`.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl Matrix {
    /// Create a matrix from row-major data
    ///
    /// # Returns
    /// * `Ok(Matrix)` if `data` holds exactly `rows * cols` values
    /// * `Err(MatrixError::MalformedMatrix)` otherwise, or if exactly one of
    ///   the dimensions is zero
    pub fn new(rows: usize, cols: usize, data: Vec<f64>) -> Result<Self> {
        if (rows == 0) != (cols == 0) {
            return Err(MatrixError::MalformedMatrix(format!(
                "degenerate {}x{} matrix",
                rows, cols
            )));
        }
        let expected = rows.checked_mul(cols).ok_or_else(|| {
            MatrixError::MalformedMatrix(format!("dimensions {}x{} overflow", rows, cols))
        })?;
        if data.len() != expected {
            return Err(MatrixError::MalformedMatrix(format!(
                "expected {} values for a {}x{} matrix, got {}",
                expected,
                rows,
                cols,
                data.len()
            )));
        }
        Ok(Matrix { rows, cols, data })
    }

    /// Create a matrix from nested rows; all rows must have the same length
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self> {
        let cols = rows.first().map_or(0, Vec::len);
        if let Some(bad) = rows.iter().position(|r| r.len() != cols) {
            return Err(MatrixError::MalformedMatrix(format!(
                "row {} has {} values, expected {}",
                bad,
                rows[bad].len(),
                cols
            )));
        }
        let n = rows.len();
        Matrix::new(n, cols, rows.into_iter().flatten().collect())
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Row-major backing values
    pub fn data(&self) -> &[f64] {
        &self.data
    }

    /// Value at `(row, col)`, or `None` when outside the matrix
    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        if row < self.rows && col < self.cols {
            Some(self.data[row * self.cols + col])
        } else {
            None
        }
    }

    /// Borrow row `row`, or `None` when `row >= rows`
    pub fn row(&self, row: usize) -> Option<&[f64]> {
        if row >= self.rows {
            return None;
        }
        let start = row * self.cols;
        Some(&self.data[start..start + self.cols])
    }

    /// Copy out column `col`, one value per row, or `None` when `col >= cols`
    pub fn col(&self, col: usize) -> Option<Vec<f64>> {
        if col >= self.cols {
            return None;
        }
        Some(
            self.data
                .iter()
                .skip(col)
                .step_by(self.cols)
                .copied()
                .collect(),
        )
    }

    /// Nested row-major copy of the whole matrix
    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        if self.cols == 0 {
            return Vec::new();
        }
        self.data.chunks(self.cols).map(<[f64]>::to_vec).collect()
    }
}

/// Grid of data quality indicator codes
///
/// Rows may have different lengths.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DqiGrid {
    rows: Vec<Vec<String>>,
}

impl DqiGrid {
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        DqiGrid { rows }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Borrow row `row`, or `None` if there is no such row
    pub fn row(&self, row: usize) -> Option<&[String]> {
        self.rows.get(row).map(Vec::as_slice)
    }

    /// Total number of cells over all rows
    pub fn cell_count(&self) -> usize {
        self.rows.iter().map(Vec::len).sum()
    }
}

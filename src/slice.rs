//! Slice selection
//!
//! Turns a decoded matrix or DQI grid plus an optional row and column into
//! the response payload. A column selector takes precedence over a row
//! selector; with neither the whole structure is returned.

use crate::error::{MatrixError, Result};
use crate::matrix::{DqiGrid, Matrix};
use crate::models::SliceQuery;
use serde::Serialize;
use tracing::debug;

/// Selected part of a numeric matrix
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MatrixSlice {
    /// One value per row
    Column(Vec<f64>),
    /// One value per column
    Row(Vec<f64>),
    /// All rows, row-major
    Full(Vec<Vec<f64>>),
}

/// Selected part of a DQI grid
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum GridSlice {
    Column(Vec<String>),
    Row(Vec<String>),
    Full(Vec<Vec<String>>),
}

impl MatrixSlice {
    /// Number of top-level elements in the payload
    pub fn len(&self) -> usize {
        match self {
            MatrixSlice::Column(values) | MatrixSlice::Row(values) => values.len(),
            MatrixSlice::Full(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl GridSlice {
    pub fn len(&self) -> usize {
        match self {
            GridSlice::Column(values) | GridSlice::Row(values) => values.len(),
            GridSlice::Full(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Select a column, a row or the whole of a numeric matrix
///
/// # Returns
/// * `Err(MatrixError::ColumnOutOfBounds)` if `col >= cols`
/// * `Err(MatrixError::RowOutOfBounds)` if no column is given and `row >= rows`
pub fn select_matrix(matrix: &Matrix, query: SliceQuery) -> Result<MatrixSlice> {
    if let Some(col) = query.col {
        return matrix.col(col).map(MatrixSlice::Column).ok_or_else(|| {
            debug!("Column {} out of bounds for {} columns", col, matrix.cols());
            MatrixError::ColumnOutOfBounds { col }
        });
    }

    if let Some(row) = query.row {
        return matrix
            .row(row)
            .map(|values| MatrixSlice::Row(values.to_vec()))
            .ok_or_else(|| {
                debug!("Row {} out of bounds for {} rows", row, matrix.rows());
                MatrixError::RowOutOfBounds {
                    row,
                    rows: matrix.rows(),
                }
            });
    }

    Ok(MatrixSlice::Full(matrix.to_rows()))
}

/// Select a column, a row or the whole of a DQI grid
///
/// Rows may differ in length, so a column is checked against every row: if
/// any row has no cell at `col` the selection fails with `ColumnOutOfBounds`.
pub fn select_grid(grid: &DqiGrid, query: SliceQuery) -> Result<GridSlice> {
    if let Some(col) = query.col {
        let column = grid
            .rows()
            .iter()
            .enumerate()
            .map(|(row, cells)| {
                cells.get(col).cloned().ok_or_else(|| {
                    debug!("Column {} out of bounds in grid row {}", col, row);
                    MatrixError::ColumnOutOfBounds { col }
                })
            })
            .collect::<Result<Vec<_>>>()?;
        return Ok(GridSlice::Column(column));
    }

    if let Some(row) = query.row {
        return grid
            .row(row)
            .map(|cells| GridSlice::Row(cells.to_vec()))
            .ok_or(MatrixError::RowOutOfBounds {
                row,
                rows: grid.row_count(),
            });
    }

    Ok(GridSlice::Full(grid.rows().to_vec()))
}

//! Matrix codec
//!
//! Decodes numeric matrix files (`*.bin`) and DQI grid files (`*.csv`).
//!
//! # Binary layout (version 1)
//!
//! All values are little-endian:
//!
//! | Offset | Size            | Field                         |
//! |--------|-----------------|-------------------------------|
//! | 0      | 4               | `rows` (`u32`)                |
//! | 4      | 4               | `cols` (`u32`)                |
//! | 8      | `rows*cols*8`   | `f64` values, row-major       |
//!
//! The data preparation pipeline writes this layout; [`encode_matrix`]
//! produces it as well.

use crate::error::{MatrixError, Result};
use crate::matrix::{DqiGrid, Matrix};
use tracing::debug;

/// Size of the dimension header in bytes
pub const HEADER_SIZE: usize = 8;

const VALUE_SIZE: usize = std::mem::size_of::<f64>();

/// Decode a numeric matrix from its binary representation
///
/// # Returns
/// * `Ok(Matrix)` if the header and payload are consistent
/// * `Err(MatrixError::MalformedMatrix)` if the stream is shorter than the
///   header, the payload does not match the declared dimensions, the
///   declared size overflows, or exactly one dimension is zero
pub fn decode_matrix(bytes: &[u8]) -> Result<Matrix> {
    if bytes.len() < HEADER_SIZE {
        return Err(MatrixError::MalformedMatrix(format!(
            "stream has {} bytes, header needs {}",
            bytes.len(),
            HEADER_SIZE
        )));
    }

    let rows = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
    let cols = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]) as usize;
    if (rows == 0) != (cols == 0) {
        return Err(MatrixError::MalformedMatrix(format!(
            "degenerate {}x{} matrix",
            rows, cols
        )));
    }

    let payload_len = rows
        .checked_mul(cols)
        .and_then(|n| n.checked_mul(VALUE_SIZE))
        .ok_or_else(|| {
            MatrixError::MalformedMatrix(format!("dimensions {}x{} overflow", rows, cols))
        })?;

    let payload = &bytes[HEADER_SIZE..];
    if payload.len() < payload_len {
        return Err(MatrixError::MalformedMatrix(format!(
            "{}x{} matrix needs {} payload bytes, got {}",
            rows,
            cols,
            payload_len,
            payload.len()
        )));
    }
    if payload.len() > payload_len {
        return Err(MatrixError::MalformedMatrix(format!(
            "{} trailing bytes after {}x{} matrix",
            payload.len() - payload_len,
            rows,
            cols
        )));
    }

    let data: Vec<f64> = payload
        .chunks_exact(VALUE_SIZE)
        .map(|chunk| {
            let mut buf = [0u8; VALUE_SIZE];
            buf.copy_from_slice(chunk);
            f64::from_le_bytes(buf)
        })
        .collect();

    debug!("Decoded {}x{} matrix ({} bytes)", rows, cols, bytes.len());
    Matrix::new(rows, cols, data)
}

/// Encode a matrix into the version 1 binary layout
///
/// Fails with `MalformedMatrix` if a dimension does not fit in a `u32`.
pub fn encode_matrix(matrix: &Matrix) -> Result<Vec<u8>> {
    let dim = |n: usize| {
        u32::try_from(n).map_err(|_| {
            MatrixError::MalformedMatrix(format!("dimension {} exceeds u32", n))
        })
    };
    let rows = dim(matrix.rows())?;
    let cols = dim(matrix.cols())?;

    let mut out = Vec::with_capacity(HEADER_SIZE + matrix.data().len() * VALUE_SIZE);
    out.extend_from_slice(&rows.to_le_bytes());
    out.extend_from_slice(&cols.to_le_bytes());
    for value in matrix.data() {
        out.extend_from_slice(&value.to_le_bytes());
    }
    Ok(out)
}

/// Decode a DQI grid from comma separated text
///
/// One record per line, no header row. Records may have different lengths;
/// blank lines are skipped.
///
/// # Returns
/// * `Ok(DqiGrid)` on success
/// * `Err(MatrixError::MalformedGrid)` on an unterminated quoted field or
///   invalid UTF-8
pub fn decode_grid(bytes: &[u8]) -> Result<DqiGrid> {
    // csv accepts a quoted field running to EOF, so check the balance first.
    // Escaped quotes ("") always come in pairs.
    if bytes.iter().filter(|&&b| b == b'"').count() % 2 != 0 {
        return Err(MatrixError::MalformedGrid(
            "unterminated quoted field".to_string(),
        ));
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);

    let mut rows = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record
            .map_err(|e| MatrixError::MalformedGrid(format!("record {}: {}", index, e)))?;
        rows.push(record.iter().map(str::to_string).collect());
    }

    debug!("Decoded DQI grid with {} rows", rows.len());
    Ok(DqiGrid::new(rows))
}

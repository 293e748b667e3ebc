//! Core data models: matrix names and slice selectors

use crate::error::{MatrixError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use url::form_urlencoded;

/// Numeric matrices a model provides
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NumericMatrix {
    A,
    B,
    C,
    D,
    L,
    U,
}

impl NumericMatrix {
    pub const ALL: [NumericMatrix; 6] = [
        NumericMatrix::A,
        NumericMatrix::B,
        NumericMatrix::C,
        NumericMatrix::D,
        NumericMatrix::L,
        NumericMatrix::U,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NumericMatrix::A => "A",
            NumericMatrix::B => "B",
            NumericMatrix::C => "C",
            NumericMatrix::D => "D",
            NumericMatrix::L => "L",
            NumericMatrix::U => "U",
        }
    }

    /// File name of the matrix inside a model folder (e.g. `A.bin`)
    pub fn file_name(&self) -> String {
        format!("{}.bin", self.as_str())
    }
}

impl FromStr for NumericMatrix {
    type Err = MatrixError;

    fn from_str(name: &str) -> Result<Self> {
        NumericMatrix::ALL
            .into_iter()
            .find(|m| m.as_str() == name)
            .ok_or_else(|| MatrixError::UnknownMatrix(name.to_string()))
    }
}

impl fmt::Display for NumericMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Data quality indicator grids a model provides
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DqiMatrix {
    B,
    D,
    U,
}

impl DqiMatrix {
    pub const ALL: [DqiMatrix; 3] = [DqiMatrix::B, DqiMatrix::D, DqiMatrix::U];

    pub fn as_str(&self) -> &'static str {
        match self {
            DqiMatrix::B => "B_dqi",
            DqiMatrix::D => "D_dqi",
            DqiMatrix::U => "U_dqi",
        }
    }

    /// File name of the grid inside a model folder (e.g. `B_dqi.csv`)
    pub fn file_name(&self) -> String {
        format!("{}.csv", self.as_str())
    }
}

impl FromStr for DqiMatrix {
    type Err = MatrixError;

    fn from_str(name: &str) -> Result<Self> {
        DqiMatrix::ALL
            .into_iter()
            .find(|m| m.as_str() == name)
            .ok_or_else(|| MatrixError::UnknownMatrix(name.to_string()))
    }
}

impl fmt::Display for DqiMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Any matrix name a client may address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatrixName {
    Numeric(NumericMatrix),
    Dqi(DqiMatrix),
}

impl FromStr for MatrixName {
    type Err = MatrixError;

    fn from_str(name: &str) -> Result<Self> {
        if let Ok(numeric) = name.parse::<NumericMatrix>() {
            return Ok(MatrixName::Numeric(numeric));
        }
        name.parse::<DqiMatrix>().map(MatrixName::Dqi)
    }
}

impl fmt::Display for MatrixName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatrixName::Numeric(m) => m.fmt(f),
            MatrixName::Dqi(m) => m.fmt(f),
        }
    }
}

/// Optional row and column selectors of a slice request
///
/// `None` means "not supplied", which is distinct from index `0`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SliceQuery {
    pub row: Option<usize>,
    pub col: Option<usize>,
}

impl SliceQuery {
    /// Select the full structure
    pub fn full() -> Self {
        Self::default()
    }

    /// Select a single row
    pub fn row(row: usize) -> Self {
        SliceQuery {
            row: Some(row),
            col: None,
        }
    }

    /// Select a single column
    pub fn col(col: usize) -> Self {
        SliceQuery {
            row: None,
            col: Some(col),
        }
    }

    /// Parse `row` and `col` from a URL query string
    ///
    /// `col` is validated before `row`. Missing or empty parameters mean
    /// "not supplied"; anything that is not a non-negative integer fails with
    /// `InvalidIndex`.
    ///
    /// # Arguments
    /// * `query` - The raw query string without the leading `?`; keys and
    ///   values may be percent-encoded
    pub fn from_query(query: Option<&str>) -> Result<Self> {
        let col = index_param("col", query)?;
        let row = index_param("row", query)?;
        Ok(SliceQuery { row, col })
    }
}

fn index_param(name: &str, query: Option<&str>) -> Result<Option<usize>> {
    // First occurrence wins; keys and values are percent-decoded
    let value = form_urlencoded::parse(query.unwrap_or("").as_bytes())
        .find(|(key, _)| key == name)
        .map(|(_, value)| value);

    match value.as_deref() {
        None | Some("") => Ok(None),
        Some(value) => value
            .parse::<usize>()
            .map(Some)
            .map_err(|_| MatrixError::invalid_index(name, value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_names() {
        for name in ["A", "B", "C", "D", "L", "U"] {
            let matrix: NumericMatrix = name.parse().unwrap();
            assert_eq!(matrix.as_str(), name);
        }
        assert_eq!(NumericMatrix::L.file_name(), "L.bin");
        assert!(matches!(
            "Z".parse::<NumericMatrix>(),
            Err(MatrixError::UnknownMatrix(name)) if name == "Z"
        ));
        assert!("B_dqi".parse::<NumericMatrix>().is_err());
    }

    #[test]
    fn test_dqi_names() {
        assert_eq!("U_dqi".parse::<DqiMatrix>().unwrap(), DqiMatrix::U);
        assert_eq!(DqiMatrix::B.file_name(), "B_dqi.csv");
        assert!("B".parse::<DqiMatrix>().is_err());
        assert!("A_dqi".parse::<DqiMatrix>().is_err());
    }

    #[test]
    fn test_matrix_name_dispatch() {
        assert_eq!(
            "B".parse::<MatrixName>().unwrap(),
            MatrixName::Numeric(NumericMatrix::B)
        );
        assert_eq!(
            "B_dqi".parse::<MatrixName>().unwrap(),
            MatrixName::Dqi(DqiMatrix::B)
        );
        assert!("b".parse::<MatrixName>().is_err());
        assert_eq!(MatrixName::Dqi(DqiMatrix::D).to_string(), "D_dqi");
    }

    #[test]
    fn test_query_absent_and_empty() {
        assert_eq!(SliceQuery::from_query(None).unwrap(), SliceQuery::full());
        assert_eq!(SliceQuery::from_query(Some("")).unwrap(), SliceQuery::full());
        assert_eq!(
            SliceQuery::from_query(Some("row=&col=")).unwrap(),
            SliceQuery::full()
        );
    }

    #[test]
    fn test_query_zero_is_supplied() {
        assert_eq!(SliceQuery::from_query(Some("row=0")).unwrap(), SliceQuery::row(0));
        assert_eq!(SliceQuery::from_query(Some("col=0")).unwrap(), SliceQuery::col(0));
    }

    #[test]
    fn test_query_both() {
        let query = SliceQuery::from_query(Some("row=1&col=2&format=json")).unwrap();
        assert_eq!(query.row, Some(1));
        assert_eq!(query.col, Some(2));
    }

    #[test]
    fn test_query_invalid() {
        assert!(matches!(
            SliceQuery::from_query(Some("row=abc")),
            Err(MatrixError::InvalidIndex { name, value }) if name == "row" && value == "abc"
        ));
        assert!(matches!(
            SliceQuery::from_query(Some("col=-1")),
            Err(MatrixError::InvalidIndex { name, .. }) if name == "col"
        ));
    }

    #[test]
    fn test_query_col_checked_first() {
        let err = SliceQuery::from_query(Some("row=x&col=y")).unwrap_err();
        assert_eq!(err, MatrixError::invalid_index("col", "y"));
    }

    #[test]
    fn test_query_percent_encoded() {
        assert_eq!(SliceQuery::from_query(Some("row=%31")).unwrap(), SliceQuery::row(1));
        assert_eq!(SliceQuery::from_query(Some("c%6Fl=2")).unwrap(), SliceQuery::col(2));
        assert!(matches!(
            SliceQuery::from_query(Some("col=%2D1")),
            Err(MatrixError::InvalidIndex { ref value, .. }) if value == "-1"
        ));
    }

    #[test]
    fn test_query_first_value_wins() {
        assert_eq!(
            SliceQuery::from_query(Some("row=2&row=7")).unwrap(),
            SliceQuery::row(2)
        );
    }
}

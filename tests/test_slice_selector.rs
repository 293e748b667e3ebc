//! Integration tests for row and column selection

use useeio_matrix::{
    decode_grid, select_grid, select_matrix, DqiGrid, GridSlice, Matrix, MatrixError,
    MatrixSlice, SliceQuery,
};

/// 3 rows, 4 columns; value = row * 10 + col
fn sample_matrix() -> Matrix {
    let data = (0..3)
        .flat_map(|r| (0..4).map(move |c| (r * 10 + c) as f64))
        .collect();
    Matrix::new(3, 4, data).unwrap()
}

#[test]
fn test_row_selection() {
    let slice = select_matrix(&sample_matrix(), SliceQuery::row(1)).unwrap();
    assert_eq!(slice, MatrixSlice::Row(vec![10.0, 11.0, 12.0, 13.0]));
}

#[test]
fn test_column_selection() {
    let slice = select_matrix(&sample_matrix(), SliceQuery::col(2)).unwrap();
    assert_eq!(slice, MatrixSlice::Column(vec![2.0, 12.0, 22.0]));
}

#[test]
fn test_full_selection() {
    let slice = select_matrix(&sample_matrix(), SliceQuery::full()).unwrap();
    match slice {
        MatrixSlice::Full(rows) => {
            assert_eq!(rows.len(), 3);
            assert!(rows.iter().all(|row| row.len() == 4));
            assert_eq!(rows[2], vec![20.0, 21.0, 22.0, 23.0]);
        }
        other => panic!("expected full matrix, got {:?}", other),
    }
}

#[test]
fn test_column_takes_precedence_over_row() {
    let matrix = sample_matrix();
    let both = SliceQuery {
        row: Some(1),
        col: Some(2),
    };
    assert_eq!(
        select_matrix(&matrix, both).unwrap(),
        select_matrix(&matrix, SliceQuery::col(2)).unwrap()
    );

    // An out-of-range row is ignored when a column is given
    let bad_row = SliceQuery {
        row: Some(99),
        col: Some(0),
    };
    assert!(select_matrix(&matrix, bad_row).is_ok());
}

#[test]
fn test_index_zero_is_not_absent() {
    let matrix = sample_matrix();
    assert_eq!(
        select_matrix(&matrix, SliceQuery::row(0)).unwrap(),
        MatrixSlice::Row(vec![0.0, 1.0, 2.0, 3.0])
    );
    assert_eq!(
        select_matrix(&matrix, SliceQuery::col(0)).unwrap(),
        MatrixSlice::Column(vec![0.0, 10.0, 20.0])
    );
}

#[test]
fn test_bounds() {
    let matrix = sample_matrix();
    assert_eq!(
        select_matrix(&matrix, SliceQuery::row(3)),
        Err(MatrixError::RowOutOfBounds { row: 3, rows: 3 })
    );
    assert_eq!(
        select_matrix(&matrix, SliceQuery::col(4)),
        Err(MatrixError::ColumnOutOfBounds { col: 4 })
    );
    assert!(select_matrix(&matrix, SliceQuery::row(2)).is_ok());
    assert!(select_matrix(&matrix, SliceQuery::col(3)).is_ok());
}

#[test]
fn test_grid_column_checked_on_every_row() {
    let grid = decode_grid(b"a,b,c\nd,e\n").unwrap();

    assert_eq!(
        select_grid(&grid, SliceQuery::col(2)),
        Err(MatrixError::ColumnOutOfBounds { col: 2 })
    );
    assert_eq!(
        select_grid(&grid, SliceQuery::col(1)).unwrap(),
        GridSlice::Column(vec!["b".to_string(), "e".to_string()])
    );
}

#[test]
fn test_grid_rows_keep_their_length() {
    let grid = decode_grid(b"a,b,c\nd,e\n").unwrap();

    assert_eq!(select_grid(&grid, SliceQuery::row(1)).unwrap().len(), 2);
    assert_eq!(
        select_grid(&grid, SliceQuery::row(2)),
        Err(MatrixError::RowOutOfBounds { row: 2, rows: 2 })
    );
    match select_grid(&grid, SliceQuery::full()).unwrap() {
        GridSlice::Full(rows) => {
            assert_eq!(rows[0].len(), 3);
            assert_eq!(rows[1].len(), 2);
        }
        other => panic!("expected full grid, got {:?}", other),
    }
}

#[test]
fn test_empty_grid() {
    let grid = DqiGrid::new(Vec::new());
    assert!(select_grid(&grid, SliceQuery::full()).unwrap().is_empty());
    assert!(select_grid(&grid, SliceQuery::row(0)).is_err());
}

#[test]
fn test_query_string_selectors() {
    let matrix = sample_matrix();

    let query = SliceQuery::from_query(Some("row=2")).unwrap();
    assert_eq!(select_matrix(&matrix, query).unwrap().len(), 4);

    let query = SliceQuery::from_query(Some("row=0&col=3")).unwrap();
    assert_eq!(
        select_matrix(&matrix, query).unwrap(),
        MatrixSlice::Column(vec![3.0, 13.0, 23.0])
    );

    let query = SliceQuery::from_query(Some("row=&col=")).unwrap();
    assert_eq!(query, SliceQuery::full());

    assert!(matches!(
        SliceQuery::from_query(Some("row=abc")),
        Err(MatrixError::InvalidIndex { .. })
    ));
    assert!(matches!(
        SliceQuery::from_query(Some("col=-1")),
        Err(MatrixError::InvalidIndex { .. })
    ));
}

use super::*;

// 3 barcodes x 4 genes:
// [1 0 2 0]
// [0 0 0 0]
// [0 3 0 4]
fn sample() -> CsrMatrix<u32> {
    CsrMatrix::new(3, 4, vec![0, 2, 2, 4], vec![0, 2, 1, 3], vec![1, 2, 3, 4]).unwrap()
}

#[test]
fn test_new_validates_layout() {
    assert_eq!(
        CsrMatrix::<u32>::new(2, 2, vec![0, 1], vec![0], vec![1]).unwrap_err(),
        SparseError::IndptrLength {
            expected: 3,
            got: 2
        }
    );
    assert_eq!(
        CsrMatrix::<u32>::new(2, 2, vec![0, 2, 1], vec![0, 1], vec![1, 1]).unwrap_err(),
        SparseError::IndptrNotMonotone(2)
    );
    assert_eq!(
        CsrMatrix::<u32>::new(1, 2, vec![0, 2], vec![0], vec![1]).unwrap_err(),
        SparseError::IndptrEnd { end: 2, nnz: 1 }
    );
    assert_eq!(
        CsrMatrix::<u32>::new(1, 2, vec![0, 1], vec![0, 1], vec![1]).unwrap_err(),
        SparseError::LengthMismatch {
            indices: 2,
            data: 1
        }
    );
    assert_eq!(
        CsrMatrix::<u32>::new(1, 2, vec![0, 1], vec![5], vec![1]).unwrap_err(),
        SparseError::IndexOutOfBounds { index: 5, dim: 2 }
    );
}

#[test]
fn test_get_and_sums() {
    let m = sample();
    assert_eq!(m.shape(), (3, 4));
    assert_eq!(m.nnz(), 4);
    assert_eq!(m.get(0, 2), 2);
    assert_eq!(m.get(1, 1), 0);
    assert_eq!(m.get(2, 3), 4);
    assert_eq!(m.row_sums(), vec![3.0, 0.0, 7.0]);
    assert_eq!(m.col_sums(), vec![1.0, 3.0, 2.0, 4.0]);
}

#[test]
fn test_to_csc_preserves_entries() {
    let m = sample();
    let c = m.to_csc();
    assert_eq!(c.shape(), (3, 4));
    assert_eq!(c.indptr(), &[0, 1, 2, 3, 4]);
    assert_eq!(c.indices(), &[0, 2, 0, 2]);
    for r in 0..3 {
        for col in 0..4 {
            assert_eq!(c.get(r, col), m.get(r, col));
        }
    }
    assert_eq!(c.to_csr(), m);
}

#[test]
fn test_transpose_swaps_shape_without_copy() {
    let m = sample();
    let t = m.clone().transpose();
    assert_eq!(t.shape(), (4, 3));
    assert_eq!(t.indptr(), m.indptr());
    assert_eq!(t.get(2, 0), 2);
    assert_eq!(t.get(3, 2), 4);
    assert_eq!(t.transpose(), m);
}

#[test]
fn test_select_rows_keeps_order() {
    let m = sample();
    let s = m.select_rows(&[2, 0]).unwrap();
    assert_eq!(s.shape(), (2, 4));
    assert_eq!(s.row_sums(), vec![7.0, 3.0]);
    assert!(m.select_rows(&[3]).is_err());
}

#[test]
fn test_select_cols_remaps() {
    let m = sample();
    let s = m.select_cols(&[3, 0]).unwrap();
    assert_eq!(s.shape(), (3, 2));
    assert_eq!(s.get(0, 1), 1);
    assert_eq!(s.get(2, 0), 4);
    assert_eq!(s.get(0, 0), 0);
    assert_eq!(s.nnz(), 2);
    assert!(m.select_cols(&[4]).is_err());
}

#[test]
fn test_from_rows_sorts_and_drops_zeros() {
    let m = CsrMatrix::from_rows(3, vec![vec![(2, 1.0), (0, 0.0), (1, 5.0)], vec![]]);
    assert_eq!(m.shape(), (2, 3));
    assert_eq!(m.indices(), &[1, 2]);
    assert_eq!(m.data(), &[5.0, 1.0]);
}

#[test]
fn test_vstack_offsets_rows() {
    let a = CscMatrix::from_cols(2, vec![vec![(0, 1u32)], vec![(1, 2)]]);
    let b = CscMatrix::from_cols(1, vec![vec![], vec![(0, 3u32)]]);
    let s = CscMatrix::vstack(&[a, b]).unwrap();
    assert_eq!(s.shape(), (3, 2));
    assert_eq!(s.get(0, 0), 1);
    assert_eq!(s.get(1, 1), 2);
    assert_eq!(s.get(2, 1), 3);
    assert_eq!(s.col_sums(), vec![1.0, 5.0]);
}

#[test]
fn test_vstack_rejects_column_mismatch() {
    let a = CscMatrix::<u32>::zeros(1, 2);
    let b = CscMatrix::<u32>::zeros(1, 3);
    assert_eq!(
        CscMatrix::vstack(&[a, b]).unwrap_err(),
        SparseError::ColumnMismatch {
            expected: 2,
            got: 3
        }
    );
}

#[test]
fn test_map_values_changes_type() {
    let m = sample().map_values(|v| f64::from(v) * 0.5);
    assert_eq!(m.get(2, 3), 2.0);
    assert_eq!(m.nnz(), 4);
}

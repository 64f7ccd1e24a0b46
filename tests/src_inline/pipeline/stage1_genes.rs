use super::*;

// 3 barcodes x 5 genes; gene 1 and gene 4 are never observed.
fn matrix() -> CsrMatrix<u32> {
    CsrMatrix::from_rows(
        5,
        vec![vec![(0, 3), (2, 1)], vec![(3, 2)], vec![(0, 1)]],
    )
}

#[test]
fn test_keeps_observed_genes_in_order() {
    let genes = select_genes(&matrix(), &[]);
    assert!(!genes.is_fallback());
    assert_eq!(genes.value, vec![0, 2, 3]);
}

#[test]
fn test_blacklist_removes_genes() {
    let genes = select_genes(&matrix(), &[2, 4, 40]);
    assert_eq!(genes.value, vec![0, 3]);
}

#[test]
fn test_empty_matrix_selects_nothing() {
    let genes = select_genes(&CsrMatrix::<u32>::zeros(4, 3), &[]);
    assert!(genes.value.is_empty());
    assert!(!genes.is_fallback());
}

use super::*;

fn matrix(totals: &[u32]) -> CsrMatrix<u32> {
    let rows = totals
        .iter()
        .map(|&c| vec![(0, c)])
        .collect::<Vec<_>>();
    CsrMatrix::from_rows(1, rows)
}

fn params(model: ModelKind) -> BarcodeSelectionParams {
    BarcodeSelectionParams {
        n_cells_prior: 2,
        low_count_threshold: 30,
        num_transition_barcodes: 1,
        empty_counts_prior: 0,
        model,
    }
}

#[test]
fn test_rank_descending_breaks_ties_by_index() {
    assert_eq!(rank_descending(&[5.0, 7.0, 5.0, 7.0]), vec![1, 3, 0, 2]);
}

#[test]
fn test_full_model_selects_cells_transition_and_empties() {
    let m = matrix(&[1000, 900, 50, 40, 5]);
    let order = rank_barcodes(&m);
    assert_eq!(order, vec![0, 1, 2, 3, 4]);

    let selection = select_barcodes(&m, &order, &params(ModelKind::Full));
    assert!(!selection.is_fallback());
    let selection = selection.value;
    assert_eq!(selection.barcode_inds, vec![0, 1, 2]);
    assert_eq!(selection.empty_barcode_inds, vec![3]);
    assert_eq!(selection.n_cells, 2);
    assert_eq!(selection.cutoff, Some(30));
    assert_eq!(selection.transition_count, 1);
}

#[test]
fn test_short_transition_window_leaves_no_empties() {
    let m = matrix(&[1000, 900, 50, 40, 5]);
    let mut p = params(ModelKind::Ambient);
    p.num_transition_barcodes = 5;
    let selection = select_barcodes(&m, &rank_barcodes(&m), &p).value;
    assert_eq!(selection.barcode_inds, vec![0, 1, 2, 3]);
    assert!(selection.empty_barcode_inds.is_empty());
    assert_eq!(selection.transition_count, 2);
}

#[test]
fn test_empirical_cutoff_wins_over_threshold() {
    let m = matrix(&[1000, 900, 50, 40, 5]);
    let mut p = params(ModelKind::Full);
    p.empty_counts_prior = 100;
    let selection = select_barcodes(&m, &rank_barcodes(&m), &p).value;
    assert_eq!(selection.cutoff, Some(80));
    assert_eq!(selection.barcode_inds, vec![0, 1]);
    assert!(selection.empty_barcode_inds.is_empty());
}

#[test]
fn test_analyzed_and_empty_sets_are_disjoint() {
    let m = matrix(&[40, 500, 35, 900, 60, 0, 45, 800]);
    let mut p = params(ModelKind::Swapping);
    p.num_transition_barcodes = 2;
    let selection = select_barcodes(&m, &rank_barcodes(&m), &p).value;
    assert_eq!(selection.barcode_inds, vec![3, 7, 1, 4]);
    assert_eq!(selection.empty_barcode_inds, vec![6, 0, 2]);
    for b in &selection.empty_barcode_inds {
        assert!(!selection.barcode_inds.contains(b));
    }
}

#[test]
fn test_simple_model_takes_top_cells() {
    let m = matrix(&[5, 1000, 40, 900]);
    let selection = select_barcodes(&m, &rank_barcodes(&m), &params(ModelKind::Simple)).value;
    assert_eq!(selection.barcode_inds, vec![1, 3]);
    assert!(selection.empty_barcode_inds.is_empty());
    assert_eq!(selection.cutoff, None);
}

#[test]
fn test_expected_cells_clamped_to_nonzero_barcodes() {
    let m = matrix(&[3, 0, 8]);
    let mut p = params(ModelKind::Simple);
    p.n_cells_prior = 10;
    let selection = select_barcodes(&m, &rank_barcodes(&m), &p).value;
    assert_eq!(selection.n_cells, 2);
    assert_eq!(selection.barcode_inds, vec![2, 0]);
}

#[test]
fn test_short_ranking_falls_back_to_all_barcodes() {
    let m = matrix(&[1000, 900, 50]);
    let selection = select_barcodes(&m, &[0], &params(ModelKind::Full));
    assert!(selection.is_fallback());
    assert_eq!(selection.value.barcode_inds, vec![0, 1, 2]);
    assert!(selection.value.empty_barcode_inds.is_empty());
}

use super::*;

use crate::observe::RecordingObserver;

#[test]
fn test_median_even_and_odd() {
    assert_eq!(median(&mut [3.0, 1.0, 2.0]), Some(2.0));
    assert_eq!(median(&mut [4.0, 1.0, 3.0, 2.0]), Some(2.5));
    assert_eq!(median(&mut []), None);
}

#[test]
fn test_mode_rounds_to_one_decimal() {
    assert_eq!(mode_one_decimal(&[1.04, 1.01, 2.0, 0.98]), Some(1.0));
    // Tie between 1.0 and 2.0 goes to the smaller value.
    assert_eq!(mode_one_decimal(&[2.0, 1.0, 2.02, 0.96]), Some(1.0));
    assert_eq!(mode_one_decimal(&[]), None);
}

#[test]
fn test_cell_count_prior_simple_uses_all_barcodes() {
    let m = CsrMatrix::<u32>::zeros(7, 2);
    assert_eq!(estimate_cell_count_prior(&m, ModelKind::Simple), 7);
}

#[test]
fn test_cell_count_prior_counts_barcodes_near_top() {
    // With fewer than 100 barcodes the reference is the top barcode itself.
    let rows = [1000u32, 950, 899, 40, 5]
        .iter()
        .map(|&c| vec![(0, c)])
        .collect::<Vec<_>>();
    let m = CsrMatrix::from_rows(1, rows);
    // cutoff 0.9 * 1000 = 900: only 1000 and 950 are above.
    assert_eq!(estimate_cell_count_prior(&m, ModelKind::Full), 2);
}

#[test]
fn test_cell_count_prior_empty_matrix() {
    let m = CsrMatrix::<u32>::zeros(0, 3);
    assert_eq!(estimate_cell_count_prior(&m, ModelKind::Full), 0);
}

#[test]
fn test_simple_prior_is_median_of_top_cells() {
    let raw = [10.0, 400.0, 200.0, 300.0];
    let observer = RecordingObserver::new();
    let priors =
        estimate_count_distribution_priors(&raw, &raw, 30.0, 3, ModelKind::Simple, &observer);
    assert_eq!(
        priors,
        CountPriors {
            cell_counts: 300,
            empty_counts: 0
        }
    );
}

#[test]
fn test_full_prior_from_mode_and_median() {
    // Empties cluster at ln(1 + 49) ~ 3.9; cells sit well above 5x that.
    let mut totals = vec![49.0; 6];
    totals.extend([1999.0, 2999.0, 3999.0]);
    totals.extend([3.0, 0.0]);
    let observer = RecordingObserver::new();
    let priors =
        estimate_count_distribution_priors(&totals, &totals, 30.0, 3, ModelKind::Full, &observer);
    // Mode is 3.9, exp(3.9) - 1 = 48.4 truncates to 48.
    assert_eq!(priors.empty_counts, 48);
    // Median log over cells is ln(3000); truncation may land one below.
    assert!((2999..=3000).contains(&priors.cell_counts));
    assert!(observer.warnings().is_empty());
}

#[test]
fn test_full_prior_without_barcodes_above_cutoff_falls_back() {
    let totals = [5.0, 12.0, 0.0];
    let observer = RecordingObserver::new();
    let priors =
        estimate_count_distribution_priors(&totals, &totals, 30.0, 1, ModelKind::Ambient, &observer);
    assert_eq!(priors.empty_counts, 0);
    // Every nonzero barcode clears 5 * 0, so the median is over 5 and 12.
    let expected = ((5.0f64.ln_1p() + 12.0f64.ln_1p()) / 2.0).exp_m1() as u64;
    assert_eq!(priors.cell_counts, expected);
    assert_eq!(observer.warnings().len(), 1);
}

#[test]
fn test_full_prior_degenerate_counts_are_zero() {
    let totals = [0.0, 0.0];
    let observer = RecordingObserver::new();
    let priors =
        estimate_count_distribution_priors(&totals, &totals, 30.0, 1, ModelKind::Full, &observer);
    assert_eq!(
        priors,
        CountPriors {
            cell_counts: 0,
            empty_counts: 0
        }
    );
    assert_eq!(observer.warnings().len(), 2);
}

use super::*;

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

#[test]
fn test_derive_priors_full_model() {
    let counts = CountPriors {
        cell_counts: 999,
        empty_counts: 9,
    };
    let derived = derive_priors(counts, 4, 2, 0.5, ModelKind::Full).unwrap();
    assert!(close(derived.log_counts_crossover, 100f64.ln()));
    assert!(close(derived.d_std, (1000f64.ln() - 100f64.ln()) / 5.0));
    assert!(close(derived.cell_prob.unwrap(), 0.25));
    assert!(close(derived.cell_logit.unwrap(), (0.25f64 / 0.75).ln()));
}

#[test]
fn test_derive_priors_simple_model() {
    let counts = CountPriors {
        cell_counts: 999,
        empty_counts: 0,
    };
    let derived = derive_priors(counts, 10, 10, 0.5, ModelKind::Simple).unwrap();
    assert!(close(derived.log_counts_crossover, 1000f64.ln() / 2.0));
    assert_eq!(derived.d_std, SIMPLE_D_STD);
    assert_eq!(derived.cell_prob, None);
    assert_eq!(derived.cell_logit, None);
}

#[test]
fn test_cell_prob_outside_unit_interval_is_fatal() {
    let counts = CountPriors {
        cell_counts: 500,
        empty_counts: 20,
    };
    assert!(matches!(
        derive_priors(counts, 4, 10, 0.0, ModelKind::Full),
        Err(PriorError::CellProbOutOfRange(p)) if close(p, 2.5)
    ));
    assert!(matches!(
        derive_priors(counts, 4, 2, 1.0, ModelKind::Ambient),
        Err(PriorError::CellProbOutOfRange(_))
    ));
    // Exactly one is allowed.
    let derived = derive_priors(counts, 4, 4, 0.0, ModelKind::Full).unwrap();
    assert_eq!(derived.cell_prob, Some(1.0));
}

#[test]
fn test_ambient_profile_from_low_count_rows() {
    let trimmed = CsrMatrix::from_rows(2, vec![vec![(0, 60.0), (1, 40.0)], vec![(1, 2.0)]]);
    let full = CsrMatrix::from_rows(
        2,
        vec![vec![(0, 60.0), (1, 40.0)], vec![(1, 2.0)], vec![(0, 1.0), (1, 1.0)]],
    );
    let (chi_ambient, chi_bar) = estimate_ambient_profile(&trimmed, &full, Some(2.0)).unwrap();

    let floor = SIMPLEX_FLOOR;
    assert!(close(chi_ambient[0], floor / (2.0 + 2.0 * floor)));
    assert!(close(chi_ambient[1], (2.0 + floor) / (2.0 + 2.0 * floor)));
    assert!(close(chi_ambient.iter().sum::<f64>(), 1.0));

    assert!(close(chi_bar[0], (61.0 + floor) / (104.0 + 2.0 * floor)));
    assert!(close(chi_bar.iter().sum::<f64>(), 1.0));
}

#[test]
fn test_ambient_profile_without_empties_is_uniform() {
    let trimmed = CsrMatrix::from_rows(3, vec![vec![(0, 500.0)]]);
    let (chi_ambient, _) = estimate_ambient_profile(&trimmed, &trimmed, Some(1.0)).unwrap();
    for v in chi_ambient {
        assert!(close(v, 1.0 / 3.0));
    }
}

#[test]
fn test_ambient_profile_requires_crossover() {
    let m = CsrMatrix::<f64>::zeros(1, 2);
    assert_eq!(
        estimate_ambient_profile(&m, &m, None),
        Err(PriorError::MissingCrossover)
    );
}

#[test]
fn test_ambient_profile_gene_mismatch() {
    let a = CsrMatrix::<f64>::zeros(1, 2);
    let b = CsrMatrix::<f64>::zeros(1, 3);
    assert_eq!(
        estimate_ambient_profile(&a, &b, Some(1.0)),
        Err(PriorError::GeneCountMismatch {
            trimmed: 2,
            full: 3
        })
    );
}

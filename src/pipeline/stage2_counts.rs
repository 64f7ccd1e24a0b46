use std::collections::BTreeMap;

use crate::model::priors::{CountPriors, ModelKind};
use crate::model::sparse::CsrMatrix;
use crate::observe::PipelineObserver;
use crate::pipeline::stage3_barcodes::rank_descending;

/// CellRanger-style estimate of the number of real cells.
pub fn estimate_cell_count_prior(matrix: &CsrMatrix<u32>, model: ModelKind) -> usize {
    if model.is_simple() {
        return matrix.n_rows();
    }

    let totals = matrix.row_sums();
    let order = rank_descending(&totals);
    let rank = (totals.len() as f64 * 0.01) as usize;
    let Some(&barcode) = order.get(rank) else {
        return 0;
    };
    let cutoff = 0.9 * totals[barcode];
    totals.iter().filter(|&&c| c > cutoff).count()
}

// Cutoffs apply to `raw`; the estimates come from `transformed`.
pub fn estimate_count_distribution_priors(
    transformed: &[f64],
    raw: &[f64],
    low_count_cutoff: f64,
    n_cells: usize,
    model: ModelKind,
    observer: &dyn PipelineObserver,
) -> CountPriors {
    let priors = if model.is_simple() {
        let order = rank_descending(raw);
        let mut top = order
            .iter()
            .take(n_cells)
            .map(|&b| transformed[b])
            .collect::<Vec<_>>();
        let cell_counts = match median(&mut top) {
            Some(m) => m as u64,
            None => {
                observer.warn("no barcodes available to estimate cell size; using 0");
                0
            }
        };
        CountPriors {
            cell_counts,
            empty_counts: 0,
        }
    } else {
        // Mode of rounded log counts is robust to the long tail of empties.
        let empty_logs = transformed
            .iter()
            .zip(raw)
            .filter(|&(_, &r)| r > low_count_cutoff)
            .map(|(&t, _)| t.ln_1p())
            .collect::<Vec<_>>();
        let empty_counts = match mode_one_decimal(&empty_logs) {
            Some(m) => m.exp_m1() as u64,
            None => {
                observer.warn(&format!(
                    "no barcodes above {low_count_cutoff} counts; prior on empty droplet counts set to 0"
                ));
                0
            }
        };

        // Median of log counts above 5x the empty size is robust to the cell tail.
        let threshold = 5.0 * empty_counts as f64;
        let mut cell_logs = transformed
            .iter()
            .filter(|&&t| t > threshold)
            .map(|t| t.ln_1p())
            .collect::<Vec<_>>();
        let cell_counts = match median(&mut cell_logs) {
            Some(m) => m.exp_m1() as u64,
            None => {
                observer.warn(&format!(
                    "no barcodes above {threshold} counts; estimating cell size from all nonzero barcodes"
                ));
                let mut nonzero = transformed
                    .iter()
                    .filter(|&&t| t > 0.0)
                    .map(|t| t.ln_1p())
                    .collect::<Vec<_>>();
                median(&mut nonzero).map_or(0, |m| m.exp_m1() as u64)
            }
        };

        observer.info(&format!("prior on counts in empty droplets is {empty_counts}"));
        CountPriors {
            cell_counts,
            empty_counts,
        }
    };

    observer.info(&format!("prior on counts for cells is {}", priors.cell_counts));
    priors
}

pub fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        Some(values[mid])
    } else {
        Some((values[mid - 1] + values[mid]) / 2.0)
    }
}

// Ties go to the smallest value.
pub fn mode_one_decimal(values: &[f64]) -> Option<f64> {
    let mut counts: BTreeMap<i64, usize> = BTreeMap::new();
    for &v in values {
        if !v.is_finite() {
            continue;
        }
        *counts.entry((v * 10.0).round_ties_even() as i64).or_insert(0) += 1;
    }
    let mut best: Option<(i64, usize)> = None;
    for (&key, &count) in &counts {
        if best.is_none_or(|(_, c)| count > c) {
            best = Some((key, count));
        }
    }
    best.map(|(key, _)| key as f64 / 10.0)
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/stage2_counts.rs"]
mod tests;

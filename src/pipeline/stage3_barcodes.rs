use crate::model::indices::Selected;
use crate::model::priors::ModelKind;
use crate::model::sparse::CsrMatrix;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BarcodeSelectionParams {
    pub n_cells_prior: usize,
    pub low_count_threshold: u64,
    pub num_transition_barcodes: usize,
    pub empty_counts_prior: u64,
    pub model: ModelKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BarcodeSelection {
    pub barcode_inds: Vec<usize>,
    pub empty_barcode_inds: Vec<usize>,
    pub n_cells: usize,
    // None for the simple model.
    pub cutoff: Option<u64>,
    pub transition_count: usize,
}

pub fn rank_descending(totals: &[f64]) -> Vec<usize> {
    let mut order = (0..totals.len()).collect::<Vec<_>>();
    order.sort_by(|&a, &b| totals[b].total_cmp(&totals[a]));
    order
}

pub fn rank_barcodes(matrix: &CsrMatrix<u32>) -> Vec<usize> {
    rank_descending(&matrix.row_sums())
}

pub fn select_barcodes(
    matrix: &CsrMatrix<u32>,
    order: &[usize],
    params: &BarcodeSelectionParams,
) -> Selected<BarcodeSelection> {
    let totals = matrix.row_sums();
    let nonzero = totals.iter().filter(|&&c| c > 0.0).count();
    let n_cells = params.n_cells_prior.min(nonzero);

    let default = BarcodeSelection {
        barcode_inds: (0..matrix.n_rows()).collect(),
        empty_barcode_inds: Vec::new(),
        n_cells,
        cutoff: None,
        transition_count: 0,
    };

    if params.model.is_simple() {
        return match order.get(..n_cells) {
            Some(cells) => Selected::ok(BarcodeSelection {
                barcode_inds: cells.to_vec(),
                ..default
            }),
            None => Selected::fallback(
                default,
                format!(
                    "barcode ranking has {} entries, cannot take {n_cells} cells",
                    order.len()
                ),
            ),
        };
    }

    let empirical = (params.empty_counts_prior as f64 * 0.8) as u64;
    let cutoff = params.low_count_threshold.max(empirical);
    let above_cutoff = totals.iter().filter(|&&c| c > cutoff as f64).count();

    let transition_count = params
        .num_transition_barcodes
        .min(above_cutoff.saturating_sub(n_cells));
    let window_start = n_cells + transition_count;

    let Some(analyzed) = order.get(..window_start) else {
        return Selected::fallback(
            default,
            format!(
                "barcode ranking has {} entries, cannot take {window_start} analyzed barcodes",
                order.len()
            ),
        );
    };

    let empties = if transition_count < params.num_transition_barcodes {
        // Cutoff reached before the requested window filled up.
        Some(&[][..])
    } else {
        order.get(window_start..above_cutoff.max(window_start))
    };
    let Some(empties) = empties else {
        return Selected::fallback(
            default,
            format!(
                "barcode ranking has {} entries, cannot take empties up to rank {above_cutoff}",
                order.len()
            ),
        );
    };

    Selected::ok(BarcodeSelection {
        barcode_inds: analyzed.to_vec(),
        empty_barcode_inds: empties.to_vec(),
        n_cells,
        cutoff: Some(cutoff),
        transition_count,
    })
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/stage3_barcodes.rs"]
mod tests;

use crate::model::priors::{CountPriors, ModelKind, PriorError};
use crate::model::sparse::CsrMatrix;

pub const SIMPLEX_FLOOR: f64 = f32::EPSILON as f64;

pub const SIMPLE_D_STD: f64 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DerivedPriors {
    pub log_counts_crossover: f64,
    pub d_std: f64,
    pub cell_prob: Option<f64>,
    pub cell_logit: Option<f64>,
}

pub fn derive_priors(
    counts: CountPriors,
    analyzed_barcode_count: usize,
    n_cells_prior: usize,
    fraction_empties: f64,
    model: ModelKind,
) -> Result<DerivedPriors, PriorError> {
    let log_cell = (counts.cell_counts as f64).ln_1p();
    let log_empty = (counts.empty_counts as f64).ln_1p();
    let log_counts_crossover = (log_cell + log_empty) / 2.0;

    if model.is_simple() {
        return Ok(DerivedPriors {
            log_counts_crossover,
            d_std: SIMPLE_D_STD,
            cell_prob: None,
            cell_logit: None,
        });
    }

    let d_std = (log_cell - log_counts_crossover) / 5.0;
    let cell_prob =
        (1.0 - fraction_empties) * (n_cells_prior as f64 / analyzed_barcode_count as f64);
    if !(cell_prob > 0.0 && cell_prob <= 1.0) {
        return Err(PriorError::CellProbOutOfRange(cell_prob));
    }
    let cell_logit = (cell_prob / (1.0 - cell_prob)).ln();

    Ok(DerivedPriors {
        log_counts_crossover,
        d_std,
        cell_prob: Some(cell_prob),
        cell_logit: Some(cell_logit),
    })
}

/// `trimmed` and `full` must cover the same genes, already transformed.
pub fn estimate_ambient_profile(
    trimmed: &CsrMatrix<f64>,
    full: &CsrMatrix<f64>,
    log_counts_crossover: Option<f64>,
) -> Result<(Vec<f64>, Vec<f64>), PriorError> {
    let crossover = log_counts_crossover.ok_or(PriorError::MissingCrossover)?;
    if trimmed.n_cols() != full.n_cols() {
        return Err(PriorError::GeneCountMismatch {
            trimmed: trimmed.n_cols(),
            full: full.n_cols(),
        });
    }

    let mut ambient = vec![0.0; trimmed.n_cols()];
    for (row, total) in trimmed.row_sums().into_iter().enumerate() {
        if total.ln() < crossover {
            for (gene, v) in trimmed.row(row) {
                ambient[gene] += v;
            }
        }
    }

    Ok((to_simplex(ambient), to_simplex(full.col_sums())))
}

fn to_simplex(mut values: Vec<f64>) -> Vec<f64> {
    for v in values.iter_mut() {
        *v += SIMPLEX_FLOOR;
    }
    let total: f64 = values.iter().sum();
    if total > 0.0 {
        for v in values.iter_mut() {
            *v /= total;
        }
    }
    values
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/stage4_priors.rs"]
mod tests;

use std::path::{Path, PathBuf};

pub mod stage1_genes;
pub mod stage2_counts;
pub mod stage3_barcodes;
pub mod stage4_priors;
pub mod stage5_output;

use crate::input::{InputError, RawData, load_count_matrix};
use crate::model::indices::AnalyzedIndices;
use crate::model::priors::{AmbientPriors, CountPriors, ModelKind, PriorError, Priors};
use crate::model::sparse::{CsrMatrix, SparseError};
use crate::model::transform::{CountTransform, Transformation};
use crate::observe::PipelineObserver;
use stage1_genes::select_genes;
use stage2_counts::{estimate_cell_count_prior, estimate_count_distribution_priors};
use stage3_barcodes::{BarcodeSelectionParams, rank_barcodes, select_barcodes};
use stage4_priors::{derive_priors, estimate_ambient_profile};

pub const DEFAULT_TRANSITION_BARCODES: usize = 7000;
pub const DEFAULT_LOW_COUNT_THRESHOLD: u64 = 30;
pub const DEFAULT_FRACTION_EMPTIES: f64 = 0.5;

#[derive(Debug, Clone, PartialEq)]
pub struct DatasetParams {
    pub expected_cell_count: Option<usize>,
    pub num_transition_barcodes: Option<usize>,
    pub fraction_empties: f64,
    pub model: ModelKind,
    pub gene_blacklist: Vec<usize>,
    pub low_count_threshold: u64,
}

impl DatasetParams {
    pub fn new(model: ModelKind) -> Self {
        Self {
            expected_cell_count: None,
            num_transition_barcodes: None,
            fraction_empties: DEFAULT_FRACTION_EMPTIES,
            model,
            gene_blacklist: Vec::new(),
            low_count_threshold: DEFAULT_LOW_COUNT_THRESHOLD,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("{0}")]
    Input(#[from] InputError),
    #[error("{0}")]
    Prior(#[from] PriorError),
    #[error("{0}")]
    Sparse(#[from] SparseError),
}

/// A count matrix together with the barcode/gene trimming and priors derived
/// from it.
///
/// Counts are kept untransformed; priors are in transformed units. Construction
/// runs the fixed stage order: genes, rough count priors, barcodes, final
/// priors.
#[derive(Debug, Clone)]
pub struct Dataset {
    source: Option<PathBuf>,
    data: RawData,
    params: DatasetParams,
    transformation: CountTransform,
    indices: AnalyzedIndices,
    priors: Priors,
}

impl Dataset {
    pub fn load(
        path: &Path,
        params: DatasetParams,
        transformation: CountTransform,
        observer: &dyn PipelineObserver,
    ) -> Result<Self, DatasetError> {
        let data = load_count_matrix(path, observer)?;
        let mut dataset = Self::from_raw(data, params, transformation, observer)?;
        dataset.source = Some(path.to_path_buf());
        Ok(dataset)
    }

    pub fn from_raw(
        data: RawData,
        params: DatasetParams,
        transformation: CountTransform,
        observer: &dyn PipelineObserver,
    ) -> Result<Self, DatasetError> {
        let n_cells_prior = match params.expected_cell_count {
            Some(n) => n,
            None => {
                let n = estimate_cell_count_prior(&data.matrix, params.model);
                observer.info(&format!("estimated {n} cells from the count distribution"));
                n
            }
        };

        let (indices, counts) =
            trim_for_analysis(&data, &params, &transformation, n_cells_prior, observer)?;
        let priors = estimate_priors(
            &data,
            &params,
            &transformation,
            &indices,
            counts,
            n_cells_prior,
        )?;

        Ok(Self {
            source: None,
            data,
            params,
            transformation,
            indices,
            priors,
        })
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn raw(&self) -> &RawData {
        &self.data
    }

    pub fn params(&self) -> &DatasetParams {
        &self.params
    }

    pub fn model(&self) -> ModelKind {
        self.params.model
    }

    pub fn transformation(&self) -> &CountTransform {
        &self.transformation
    }

    pub fn indices(&self) -> &AnalyzedIndices {
        &self.indices
    }

    pub fn priors(&self) -> &Priors {
        &self.priors
    }

    /// Analyzed barcodes x analyzed genes, transformed.
    pub fn count_matrix(
        &self,
        observer: &dyn PipelineObserver,
    ) -> Result<CsrMatrix<f64>, SparseError> {
        self.trimmed_or_full(&self.indices.barcode_inds, observer, "count matrix")
    }

    /// Empty-droplet barcodes x analyzed genes, transformed.
    pub fn count_matrix_empties(
        &self,
        observer: &dyn PipelineObserver,
    ) -> Result<CsrMatrix<f64>, SparseError> {
        self.trimmed_or_full(&self.indices.empty_barcode_inds, observer, "empty count matrix")
    }

    /// Every barcode x analyzed genes, transformed.
    pub fn count_matrix_all_barcodes(
        &self,
        observer: &dyn PipelineObserver,
    ) -> Result<CsrMatrix<f64>, SparseError> {
        if !self.indices.is_trimmed {
            observer.warn("using full count matrix, without any trimming; could be slow");
            return Ok(self.transformation.transform(&self.data.matrix));
        }
        let genes = self.data.matrix.select_cols(&self.indices.gene_inds)?;
        Ok(self.transformation.transform(&genes))
    }

    fn trimmed_or_full(
        &self,
        barcodes: &[usize],
        observer: &dyn PipelineObserver,
        what: &str,
    ) -> Result<CsrMatrix<f64>, SparseError> {
        if !self.indices.is_trimmed {
            observer.warn(&format!("{what} requested before trimming; using the full matrix"));
            return Ok(self.transformation.transform(&self.data.matrix));
        }
        trimmed_matrix(&self.data.matrix, barcodes, &self.indices.gene_inds, &self.transformation)
    }
}

fn trimmed_matrix(
    matrix: &CsrMatrix<u32>,
    barcodes: &[usize],
    genes: &[usize],
    transformation: &CountTransform,
) -> Result<CsrMatrix<f64>, SparseError> {
    let trimmed = matrix.select_rows(barcodes)?.select_cols(genes)?;
    Ok(transformation.transform(&trimmed))
}

fn trim_for_analysis(
    data: &RawData,
    params: &DatasetParams,
    transformation: &CountTransform,
    n_cells_prior: usize,
    observer: &dyn PipelineObserver,
) -> Result<(AnalyzedIndices, CountPriors), DatasetError> {
    observer.info("trimming dataset for inference");

    let genes = select_genes(&data.matrix, &params.gene_blacklist);
    if let Some(diagnostic) = &genes.diagnostic {
        observer.warn(&format!("something went wrong trying to trim genes: {diagnostic}"));
    }
    let gene_inds = genes.value;

    let restricted = data.matrix.select_cols(&gene_inds)?;
    let counts = estimate_count_distribution_priors(
        &transformation.transform(&restricted).row_sums(),
        &restricted.row_sums(),
        params.low_count_threshold as f64,
        n_cells_prior,
        params.model,
        observer,
    );

    let order = rank_barcodes(&data.matrix);
    let selection = select_barcodes(
        &data.matrix,
        &order,
        &BarcodeSelectionParams {
            n_cells_prior,
            low_count_threshold: params.low_count_threshold,
            num_transition_barcodes: params
                .num_transition_barcodes
                .unwrap_or(DEFAULT_TRANSITION_BARCODES),
            empty_counts_prior: counts.empty_counts,
            model: params.model,
        },
    );
    if let Some(diagnostic) = &selection.diagnostic {
        observer.warn(&format!("something went wrong trying to trim barcodes: {diagnostic}"));
    }
    let selection = selection.value;
    if let Some(cutoff) = selection.cutoff {
        observer.info(&format!("excluding barcodes with counts below {cutoff}"));
        observer.info(&format!(
            "using {} probable cell barcodes, plus an additional {} barcodes, and {} empty droplets",
            selection.n_cells,
            selection.transition_count,
            selection.empty_barcode_inds.len()
        ));
    } else {
        observer.info(&format!(
            "using {} barcodes and {} genes",
            selection.barcode_inds.len(),
            gene_inds.len()
        ));
    }

    let indices = AnalyzedIndices {
        gene_inds,
        barcode_inds: selection.barcode_inds,
        empty_barcode_inds: selection.empty_barcode_inds,
        is_trimmed: true,
    };
    Ok((indices, counts))
}

fn estimate_priors(
    data: &RawData,
    params: &DatasetParams,
    transformation: &CountTransform,
    indices: &AnalyzedIndices,
    counts: CountPriors,
    n_cells_prior: usize,
) -> Result<Priors, DatasetError> {
    let derived = derive_priors(
        counts,
        indices.barcode_inds.len(),
        n_cells_prior,
        params.fraction_empties,
        params.model,
    )?;

    let ambient = match (derived.cell_prob, derived.cell_logit) {
        (Some(cell_prob), Some(cell_logit)) => {
            let trimmed = trimmed_matrix(
                &data.matrix,
                &indices.barcode_inds,
                &indices.gene_inds,
                transformation,
            )?;
            let full = transformation.transform(&data.matrix.select_cols(&indices.gene_inds)?);
            let (chi_ambient, chi_bar) =
                estimate_ambient_profile(&trimmed, &full, Some(derived.log_counts_crossover))?;
            Some(AmbientPriors {
                cell_prob,
                cell_logit,
                chi_ambient,
                chi_bar,
            })
        }
        _ => None,
    };

    let priors = Priors {
        n_cells: n_cells_prior,
        cell_counts: counts.cell_counts,
        empty_counts: counts.empty_counts,
        log_counts_crossover: derived.log_counts_crossover,
        d_std: derived.d_std,
        ambient,
    };
    priors.validate(params.model, indices.gene_inds.len())?;
    Ok(priors)
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/dataset.rs"]
mod tests;

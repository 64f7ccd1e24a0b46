use std::path::{Path, PathBuf};

use crate::inference::{InferenceError, InferenceModel, LatentMatrix};
use crate::input::InputError;
use crate::input::barcodes::write_barcodes;
use crate::input::h5::{write_array, write_array_2d, write_block};
use crate::model::indices::AnalyzedIndices;
use crate::model::sparse::{CscMatrix, SparseError};
use crate::model::transform::Transformation;
use crate::observe::PipelineObserver;
use crate::pipeline::Dataset;

pub const OUTPUT_GROUP: &str = "background_removed";

pub const DATASET_BARCODE_INDICES_FOR_LATENTS: &str = "barcode_indices_for_latents";
pub const DATASET_AMBIENT_EXPRESSION: &str = "ambient_expression";
pub const DATASET_LATENT_GENE_ENCODING: &str = "latent_gene_encoding";
pub const DATASET_LATENT_SCALE: &str = "latent_scale";
pub const DATASET_LATENT_CELL_PROBABILITY: &str = "latent_cell_probability";
pub const DATASET_CONTAMINATION_FRACTION_PARAMS: &str = "contamination_fraction_params";
pub const DATASET_OVERDISPERSION_PARAMS: &str = "overdispersion_params";
pub const DATASET_TRAINING_ELBO_PER_EPOCH: &str = "training_elbo_per_epoch";

pub const CELL_PROBABILITY_CUTOFF: f64 = 0.5;

#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("cannot write output: {0}")]
    Precondition(String),
    #[error("found no cells: no barcode has cell probability above 0.5")]
    NoCells,
    #[error("{0}")]
    Inference(#[from] InferenceError),
    #[error("{0}")]
    Sparse(#[from] SparseError),
}

#[derive(Debug, Clone, Copy)]
pub struct MatrixOutput<'a> {
    pub gene_names: &'a [String],
    pub barcodes: &'a [String],
    /// Barcodes x genes.
    pub matrix: &'a CscMatrix<f64>,
    pub cell_barcode_inds: Option<&'a [usize]>,
    pub ambient_expression: Option<&'a [f64]>,
    pub contamination_params: Option<&'a [f64]>,
    pub overdispersion_params: Option<&'a [f64]>,
    pub latent_z: Option<&'a LatentMatrix>,
    pub latent_d: Option<&'a [f64]>,
    pub latent_p: Option<&'a [f64]>,
    pub training_elbo: Option<&'a [f64]>,
}

impl<'a> MatrixOutput<'a> {
    pub fn new(gene_names: &'a [String], barcodes: &'a [String], matrix: &'a CscMatrix<f64>) -> Self {
        Self {
            gene_names,
            barcodes,
            matrix,
            cell_barcode_inds: None,
            ambient_expression: None,
            contamination_params: None,
            overdispersion_params: None,
            latent_z: None,
            latent_d: None,
            latent_p: None,
            training_elbo: None,
        }
    }
}

/// Writes one result file in CellRanger orientation (genes are rows).
///
/// Shape and name-length mismatches are returned as errors before the file is
/// touched. Failures while writing are logged and reported as `Ok(false)`.
pub fn write_matrix_h5(
    path: &Path,
    output: &MatrixOutput<'_>,
    observer: &dyn PipelineObserver,
) -> Result<bool, OutputError> {
    if output.gene_names.len() != output.matrix.n_cols() {
        return Err(OutputError::Precondition(format!(
            "{} gene names for {} matrix columns",
            output.gene_names.len(),
            output.matrix.n_cols()
        )));
    }
    if output.barcodes.len() != output.matrix.n_rows() {
        return Err(OutputError::Precondition(format!(
            "{} barcodes for {} matrix rows",
            output.barcodes.len(),
            output.matrix.n_rows()
        )));
    }

    match write_matrix_h5_inner(path, output) {
        Ok(()) => {
            observer.info(&format!("succeeded in writing output to file {}", path.display()));
            Ok(true)
        }
        Err(e) => {
            observer.warn(&format!(
                "encountered an error writing output to file {}; output may be incomplete: {e}",
                path.display()
            ));
            Ok(false)
        }
    }
}

fn write_matrix_h5_inner(path: &Path, output: &MatrixOutput<'_>) -> Result<(), InputError> {
    let gene_major = output.matrix.to_csr().transpose();

    let file = hdf5::File::create(path)?;
    let group = file.create_group(OUTPUT_GROUP)?;
    write_block(&group, &gene_major, output.gene_names, output.barcodes)?;

    if let Some(inds) = output.cell_barcode_inds {
        let inds = inds.iter().map(|&i| i as i64).collect::<Vec<_>>();
        write_array(&group, DATASET_BARCODE_INDICES_FOR_LATENTS, &inds)?;
    }
    if let Some(values) = output.ambient_expression {
        write_array(&group, DATASET_AMBIENT_EXPRESSION, values)?;
    }
    if let Some(z) = output.latent_z {
        write_array_2d(&group, DATASET_LATENT_GENE_ENCODING, &z.values, z.n_rows, z.n_cols)?;
    }
    if let Some(values) = output.latent_d {
        write_array(&group, DATASET_LATENT_SCALE, values)?;
    }
    if let Some(values) = output.latent_p {
        write_array(&group, DATASET_LATENT_CELL_PROBABILITY, values)?;
    }
    if let Some(values) = output.contamination_params {
        write_array(&group, DATASET_CONTAMINATION_FRACTION_PARAMS, values)?;
    }
    if let Some(values) = output.overdispersion_params {
        write_array(&group, DATASET_OVERDISPERSION_PARAMS, values)?;
    }
    if let Some(values) = output.training_elbo {
        write_array(&group, DATASET_TRAINING_ELBO_PER_EPOCH, values)?;
    }
    Ok(())
}

pub fn sibling_path(output: &Path, suffix: &str) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let dir = output.parent().unwrap_or_else(|| Path::new(""));
    dir.join(format!("{stem}{suffix}"))
}

/// Returns whether every file was written.
pub fn save_results(
    dataset: &Dataset,
    model: &dyn InferenceModel,
    output: &Path,
    observer: &dyn PipelineObserver,
) -> Result<bool, OutputError> {
    observer.info("preparing to write outputs to file");

    let raw = dataset.raw();
    let indices = dataset.indices();
    let encodings = model.encodings(dataset, true)?;
    check_encoding_len("latent gene encoding", encodings.z.n_rows, indices)?;
    check_encoding_len("latent scale", encodings.d.len(), indices)?;
    if let Some(p) = &encodings.p {
        check_encoding_len("latent cell probability", p.len(), indices)?;
    }

    let inferred = if dataset.model().is_simple() {
        observer.info("simple model: outputting un-altered count matrix");
        dataset.transformation().transform(&raw.matrix).to_csc()
    } else {
        model.count_matrix_from_encodings(&encodings, dataset, true)?
    };
    if inferred.shape() != raw.matrix.shape() {
        return Err(OutputError::Precondition(format!(
            "inferred count matrix is {:?}, expected {:?}",
            inferred.shape(),
            raw.matrix.shape()
        )));
    }

    let ambient_expression = match model.ambient_expression() {
        Some(trimmed) => {
            if trimmed.len() != indices.gene_inds.len() {
                return Err(OutputError::Precondition(format!(
                    "ambient expression has {} genes, expected {}",
                    trimmed.len(),
                    indices.gene_inds.len()
                )));
            }
            let mut full = vec![0.0; raw.n_genes()];
            for (&gene, value) in indices.gene_inds.iter().zip(trimmed) {
                full[gene] = value;
            }
            Some(full)
        }
        None => None,
    };
    let rho = model.contamination_fraction();
    let phi = model.overdispersion();
    let elbo = model.loss().map(|loss| loss.train.elbo.as_slice());

    let p = encodings
        .p
        .as_ref()
        .map(|p| p.iter().map(|&v| if v.is_nan() { 0.0 } else { v }).collect::<Vec<_>>());
    let keep = match &p {
        Some(p) => {
            let keep = p.iter().map(|&v| v > CELL_PROBABILITY_CUTOFF).collect::<Vec<_>>();
            if !keep.iter().any(|&k| k) {
                return Err(OutputError::NoCells);
            }
            keep
        }
        None => vec![true; encodings.d.len()],
    };

    let inferred = dataset.transformation().inverse_transform(&inferred);

    let mut full = MatrixOutput::new(&raw.gene_names, &raw.barcodes, &inferred);
    full.cell_barcode_inds = Some(indices.barcode_inds.as_slice());
    full.ambient_expression = ambient_expression.as_deref();
    full.contamination_params = rho.as_deref();
    full.overdispersion_params = phi.as_deref();
    full.latent_z = Some(&encodings.z);
    full.latent_d = Some(encodings.d.as_slice());
    full.latent_p = p.as_deref();
    full.training_elbo = elbo;
    let mut succeeded = write_matrix_h5(output, &full, observer)?;

    if dataset.model().is_simple() {
        return Ok(succeeded);
    }

    let cell_barcode_inds = indices
        .barcode_inds
        .iter()
        .zip(&keep)
        .filter(|&(_, &k)| k)
        .map(|(&b, _)| b)
        .collect::<Vec<_>>();
    let cell_barcodes = cell_barcode_inds
        .iter()
        .map(|&b| {
            raw.barcodes.get(b).cloned().ok_or_else(|| {
                OutputError::Precondition(format!("no barcode name for row {b}"))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    let filtered_matrix = inferred.select_rows(&cell_barcode_inds)?;
    let filtered_z = encodings.z.select_rows(&keep);
    let filtered_d = select_by_mask(&encodings.d, &keep);
    let filtered_p = p.as_deref().map(|p| select_by_mask(p, &keep));

    let mut filtered = MatrixOutput::new(&raw.gene_names, &cell_barcodes, &filtered_matrix);
    filtered.ambient_expression = ambient_expression.as_deref();
    filtered.contamination_params = rho.as_deref();
    filtered.overdispersion_params = phi.as_deref();
    filtered.latent_z = Some(&filtered_z);
    filtered.latent_d = Some(filtered_d.as_slice());
    filtered.latent_p = filtered_p.as_deref();
    filtered.training_elbo = elbo;
    let filtered_path = sibling_path(output, "_filtered.h5");
    succeeded &= write_matrix_h5(&filtered_path, &filtered, observer)?;

    let csv_path = sibling_path(output, "_cell_barcodes.csv");
    match write_barcodes(&csv_path, &cell_barcodes) {
        Ok(()) => observer.info(&format!(
            "wrote {} cell barcodes to {}",
            cell_barcodes.len(),
            csv_path.display()
        )),
        Err(e) => {
            observer.warn(&format!("unable to write {}: {e}", csv_path.display()));
            succeeded = false;
        }
    }

    Ok(succeeded)
}

fn check_encoding_len(
    what: &str,
    got: usize,
    indices: &AnalyzedIndices,
) -> Result<(), OutputError> {
    let expected = indices.barcode_inds.len();
    if got != expected {
        return Err(OutputError::Precondition(format!(
            "{what} has {got} rows, expected one per analyzed barcode ({expected})"
        )));
    }
    Ok(())
}

fn select_by_mask(values: &[f64], keep: &[bool]) -> Vec<f64> {
    values
        .iter()
        .zip(keep)
        .filter(|&(_, &k)| k)
        .map(|(&v, _)| v)
        .collect()
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/stage5_output.rs"]
mod tests;

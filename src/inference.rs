//! Boundary with the external variational-inference model.
//!
//! Training happens elsewhere; this crate only needs the encodings, the
//! denoised counts and a handful of global parameters. `RecordedInference`
//! provides them from a JSON document written by the training run.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::input::InputError;
use crate::input::gz::open_maybe_gz;
use crate::model::sparse::CscMatrix;
use crate::pipeline::Dataset;

#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("{0}")]
    Input(#[from] InputError),
    #[error("invalid inference document: {0}")]
    Json(#[from] serde_json::Error),
    #[error("latent encoding is ragged: row {row} has {got} values, expected {expected}")]
    RaggedLatent {
        row: usize,
        expected: usize,
        got: usize,
    },
    #[error("{what} has {got} entries, expected {expected}")]
    Length {
        what: &'static str,
        expected: usize,
        got: usize,
    },
    #[error("inference outputs carry no denoised count matrix")]
    MissingCounts,
    #[error("denoised count entry ({row}, {col}) is outside the analyzed {n_rows}x{n_cols} block")]
    CountOutOfRange {
        row: usize,
        col: usize,
        n_rows: usize,
        n_cols: usize,
    },
}

/// Dense row-major matrix of per-barcode latent vectors.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LatentMatrix {
    pub n_rows: usize,
    pub n_cols: usize,
    pub values: Vec<f64>,
}

impl LatentMatrix {
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self, InferenceError> {
        let n_cols = rows.first().map_or(0, Vec::len);
        let mut values = Vec::with_capacity(rows.len() * n_cols);
        for (row, r) in rows.iter().enumerate() {
            if r.len() != n_cols {
                return Err(InferenceError::RaggedLatent {
                    row,
                    expected: n_cols,
                    got: r.len(),
                });
            }
            values.extend_from_slice(r);
        }
        Ok(Self {
            n_rows: rows.len(),
            n_cols,
            values,
        })
    }

    pub fn row(&self, row: usize) -> &[f64] {
        &self.values[row * self.n_cols..(row + 1) * self.n_cols]
    }

    pub fn select_rows(&self, keep: &[bool]) -> Self {
        let mut values = Vec::new();
        let mut n_rows = 0;
        for (row, _) in keep.iter().enumerate().filter(|&(_, &k)| k) {
            values.extend_from_slice(self.row(row));
            n_rows += 1;
        }
        Self {
            n_rows,
            n_cols: self.n_cols,
            values,
        }
    }
}

/// Per-barcode encodings, one row per analyzed barcode.
#[derive(Debug, Clone, PartialEq)]
pub struct Encodings {
    pub z: LatentMatrix,
    pub d: Vec<f64>,
    /// Cell probabilities; absent for models without empty droplets.
    pub p: Option<Vec<f64>>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TrainLoss {
    pub elbo: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TestLoss {
    pub epoch: Vec<usize>,
    pub elbo: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LossHistory {
    pub train: TrainLoss,
    pub test: TestLoss,
}

pub trait InferenceModel {
    fn encodings(&self, dataset: &Dataset, cells_only: bool) -> Result<Encodings, InferenceError>;

    /// Denoised counts over the full barcode x gene universe, transformed space.
    fn count_matrix_from_encodings(
        &self,
        encodings: &Encodings,
        dataset: &Dataset,
        cells_only: bool,
    ) -> Result<CscMatrix<f64>, InferenceError>;

    /// Ambient profile over the analyzed genes.
    fn ambient_expression(&self) -> Option<Vec<f64>>;

    fn contamination_fraction(&self) -> Option<Vec<f64>>;

    fn overdispersion(&self) -> Option<Vec<f64>>;

    fn loss(&self) -> Option<&LossHistory>;
}

/// Denoised counts as triplets in analyzed coordinates: `rows` index the
/// analyzed barcodes, `cols` the analyzed genes.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RecordedCounts {
    pub rows: Vec<usize>,
    pub cols: Vec<usize>,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RecordedInference {
    pub z: Vec<Vec<f64>>,
    pub d: Vec<f64>,
    #[serde(default)]
    pub p: Option<Vec<f64>>,
    #[serde(default)]
    pub counts: Option<RecordedCounts>,
    #[serde(default)]
    pub ambient_expression: Option<Vec<f64>>,
    #[serde(default)]
    pub contamination_fraction: Option<Vec<f64>>,
    #[serde(default)]
    pub overdispersion: Option<Vec<f64>>,
    #[serde(default)]
    pub loss: Option<LossHistory>,
}

impl RecordedInference {
    /// Reads a JSON document, gzip-compressed if the name ends in `.gz`.
    pub fn from_path(path: &Path) -> Result<Self, InferenceError> {
        let reader = open_maybe_gz(path)?;
        Ok(serde_json::from_reader(reader)?)
    }
}

impl InferenceModel for RecordedInference {
    fn encodings(&self, dataset: &Dataset, _cells_only: bool) -> Result<Encodings, InferenceError> {
        let expected = dataset.indices().barcode_inds.len();
        let z = LatentMatrix::from_rows(&self.z)?;
        check_len("latent gene encoding", expected, z.n_rows)?;
        check_len("latent scale", expected, self.d.len())?;
        if let Some(p) = &self.p {
            check_len("latent cell probability", expected, p.len())?;
        }
        Ok(Encodings {
            z,
            d: self.d.clone(),
            p: self.p.clone(),
        })
    }

    fn count_matrix_from_encodings(
        &self,
        _encodings: &Encodings,
        dataset: &Dataset,
        _cells_only: bool,
    ) -> Result<CscMatrix<f64>, InferenceError> {
        let counts = self.counts.as_ref().ok_or(InferenceError::MissingCounts)?;
        check_len("count column indices", counts.rows.len(), counts.cols.len())?;
        check_len("count values", counts.rows.len(), counts.values.len())?;

        let indices = dataset.indices();
        let n_rows = indices.barcode_inds.len();
        let n_cols = indices.gene_inds.len();
        let mut columns: Vec<Vec<(u32, f64)>> = vec![Vec::new(); dataset.raw().n_genes()];
        for ((&row, &col), &value) in counts.rows.iter().zip(&counts.cols).zip(&counts.values) {
            let (Some(&barcode), Some(&gene)) =
                (indices.barcode_inds.get(row), indices.gene_inds.get(col))
            else {
                return Err(InferenceError::CountOutOfRange {
                    row,
                    col,
                    n_rows,
                    n_cols,
                });
            };
            columns[gene].push((barcode as u32, value));
        }
        Ok(CscMatrix::from_cols(dataset.raw().n_barcodes(), columns))
    }

    fn ambient_expression(&self) -> Option<Vec<f64>> {
        self.ambient_expression.clone()
    }

    fn contamination_fraction(&self) -> Option<Vec<f64>> {
        self.contamination_fraction.clone()
    }

    fn overdispersion(&self) -> Option<Vec<f64>> {
        self.overdispersion.clone()
    }

    fn loss(&self) -> Option<&LossHistory> {
        self.loss.as_ref()
    }
}

fn check_len(what: &'static str, expected: usize, got: usize) -> Result<(), InferenceError> {
    if expected == got {
        Ok(())
    } else {
        Err(InferenceError::Length {
            what,
            expected,
            got,
        })
    }
}

#[cfg(test)]
#[path = "../tests/src_inline/inference.rs"]
mod tests;

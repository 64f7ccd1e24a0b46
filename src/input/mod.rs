use std::path::{Path, PathBuf};

pub mod barcodes;
pub mod gz;
pub mod h5;

use crate::model::sparse::{CscMatrix, CsrMatrix, SparseError};
use crate::observe::PipelineObserver;
use h5::{GenomeBlock, read_genome_blocks};

/// Raw counts as loaded from disk: barcodes are rows, genes are columns.
#[derive(Debug, Clone, PartialEq)]
pub struct RawData {
    pub matrix: CsrMatrix<u32>,
    pub barcodes: Vec<String>,
    pub gene_names: Vec<String>,
}

impl RawData {
    pub fn n_barcodes(&self) -> usize {
        self.matrix.n_rows()
    }

    pub fn n_genes(&self) -> usize {
        self.matrix.n_cols()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("unable to open {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: hdf5::Error,
    },
    #[error("hdf5 error: {0}")]
    Hdf5(#[from] hdf5::Error),
    #[error("no genome group with count data found in {}", .0.display())]
    NoGenomes(PathBuf),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("malformed sparse matrix: {0}")]
    Sparse(#[from] SparseError),
}

/// Reads a CellRanger v2 style HDF5 matrix, one group per genome.
///
/// Genome blocks are stacked along the gene axis and the result is returned
/// barcode-major. Dimension disagreements with the name arrays are reported but
/// not fatal.
pub fn load_count_matrix(
    path: &Path,
    observer: &dyn PipelineObserver,
) -> Result<RawData, InputError> {
    observer.info(&format!("loading data from file {}", path.display()));

    let file = hdf5::File::open(path).map_err(|source| InputError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let blocks = read_genome_blocks(&file)?;
    drop(file);

    assemble_blocks(path, blocks, observer)
}

fn assemble_blocks(
    path: &Path,
    blocks: Vec<GenomeBlock>,
    observer: &dyn PipelineObserver,
) -> Result<RawData, InputError> {
    if blocks.is_empty() {
        return Err(InputError::NoGenomes(path.to_path_buf()));
    }

    let mut gene_names = Vec::new();
    let mut barcodes = Vec::new();
    let mut matrices = Vec::with_capacity(blocks.len());
    for block in blocks {
        observer.debug(&format!(
            "genome group {}: {} genes x {} barcodes, {} nonzero",
            block.name,
            block.matrix.n_rows(),
            block.matrix.n_cols(),
            block.matrix.nnz()
        ));
        gene_names.extend(block.gene_names);
        barcodes = block.barcodes;
        matrices.push(block.matrix);
    }

    let stacked = CscMatrix::vstack(&matrices)?;
    let matrix = stacked.transpose();

    if matrix.n_cols() != gene_names.len() {
        observer.warn(&format!(
            "number of gene names in {} ({}) does not match the count matrix ({})",
            path.display(),
            gene_names.len(),
            matrix.n_cols()
        ));
    }
    if matrix.n_rows() != barcodes.len() {
        observer.warn(&format!(
            "number of barcodes in {} ({}) does not match the count matrix ({})",
            path.display(),
            barcodes.len(),
            matrix.n_rows()
        ));
    }

    Ok(RawData {
        matrix,
        barcodes,
        gene_names,
    })
}

#[cfg(test)]
#[path = "../../tests/src_inline/input/tests.rs"]
mod tests;

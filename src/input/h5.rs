use std::str::FromStr;

use hdf5::types::{FixedAscii, FixedUnicode, TypeDescriptor, VarLenAscii, VarLenUnicode};
use hdf5::{Dataset, Group, H5Type};

use crate::input::InputError;
use crate::model::sparse::CscMatrix;

pub const DATASET_GENE_NAMES: &str = "gene_names";
pub const DATASET_GENES: &str = "genes";
pub const DATASET_BARCODES: &str = "barcodes";
pub const DATASET_DATA: &str = "data";
pub const DATASET_INDICES: &str = "indices";
pub const DATASET_INDPTR: &str = "indptr";
pub const DATASET_SHAPE: &str = "shape";

const BLOCK_DATASETS: [&str; 6] = [
    DATASET_GENE_NAMES,
    DATASET_BARCODES,
    DATASET_DATA,
    DATASET_INDICES,
    DATASET_INDPTR,
    DATASET_SHAPE,
];

/// Upper bound for fixed-length string reads; longer names are truncated by HDF5.
const MAX_STRING_LEN: usize = 256;

/// One genome's counts, gene-major as stored on disk.
#[derive(Debug, Clone)]
pub struct GenomeBlock {
    pub name: String,
    /// Genes are rows, barcodes are columns.
    pub matrix: CscMatrix<u32>,
    pub gene_names: Vec<String>,
    pub barcodes: Vec<String>,
}

/// Walks every group depth-first, root included, keeping those that carry a
/// full count block.
pub fn read_genome_blocks(root: &Group) -> Result<Vec<GenomeBlock>, InputError> {
    let mut out = Vec::new();
    walk_groups(root, &mut out)?;
    Ok(out)
}

fn walk_groups(group: &Group, out: &mut Vec<GenomeBlock>) -> Result<(), InputError> {
    if has_block(group) {
        out.push(read_block(group)?);
    }
    let mut children = group.groups()?;
    children.sort_by_key(|g| g.name());
    for child in &children {
        walk_groups(child, out)?;
    }
    Ok(())
}

fn has_block(group: &Group) -> bool {
    BLOCK_DATASETS.iter().all(|name| group.link_exists(name))
}

fn read_block(group: &Group) -> Result<GenomeBlock, InputError> {
    let name = group.name();
    let gene_names = read_strings(&group.dataset(DATASET_GENE_NAMES)?)?;
    let barcodes = read_strings(&group.dataset(DATASET_BARCODES)?)?;
    let data: Vec<u32> = group.dataset(DATASET_DATA)?.read_raw()?;
    let indices = to_u32(group.dataset(DATASET_INDICES)?.read_raw::<i64>()?, &name)?;
    let indptr = to_usize(group.dataset(DATASET_INDPTR)?.read_raw::<i64>()?, &name)?;
    let shape = to_usize(group.dataset(DATASET_SHAPE)?.read_raw::<i64>()?, &name)?;
    let [n_genes, n_barcodes] = shape.as_slice() else {
        return Err(InputError::InvalidInput(format!(
            "{name}/shape must have two entries, found {}",
            shape.len()
        )));
    };
    let matrix = CscMatrix::new(*n_genes, *n_barcodes, indptr, indices, data)?;
    Ok(GenomeBlock {
        name,
        matrix,
        gene_names,
        barcodes,
    })
}

fn to_usize(values: Vec<i64>, group: &str) -> Result<Vec<usize>, InputError> {
    values
        .into_iter()
        .map(|v| {
            usize::try_from(v)
                .map_err(|_| InputError::InvalidInput(format!("negative offset {v} in {group}")))
        })
        .collect()
}

fn to_u32(values: Vec<i64>, group: &str) -> Result<Vec<u32>, InputError> {
    values
        .into_iter()
        .map(|v| {
            u32::try_from(v)
                .map_err(|_| InputError::InvalidInput(format!("invalid index {v} in {group}")))
        })
        .collect()
}

/// Decodes any HDF5 string dataset as UTF-8.
pub fn read_strings(ds: &Dataset) -> Result<Vec<String>, InputError> {
    let strings = match ds.dtype()?.to_descriptor()? {
        TypeDescriptor::FixedAscii(n) | TypeDescriptor::FixedUnicode(n) if n > MAX_STRING_LEN => {
            return Err(InputError::InvalidInput(format!(
                "{} holds {n}-byte strings, at most {MAX_STRING_LEN} are supported",
                ds.name()
            )));
        }
        TypeDescriptor::FixedAscii(_) => ds
            .read_raw::<FixedAscii<MAX_STRING_LEN>>()?
            .iter()
            .map(|s| s.as_str().to_string())
            .collect(),
        TypeDescriptor::FixedUnicode(_) => ds
            .read_raw::<FixedUnicode<MAX_STRING_LEN>>()?
            .iter()
            .map(|s| s.as_str().to_string())
            .collect(),
        TypeDescriptor::VarLenAscii => ds
            .read_raw::<VarLenAscii>()?
            .iter()
            .map(|s| s.as_str().to_string())
            .collect(),
        TypeDescriptor::VarLenUnicode => ds
            .read_raw::<VarLenUnicode>()?
            .iter()
            .map(|s| s.as_str().to_string())
            .collect(),
        other => {
            return Err(InputError::InvalidInput(format!(
                "{} holds {other:?}, expected strings",
                ds.name()
            )));
        }
    };
    Ok(strings)
}

pub fn write_strings(group: &Group, name: &str, values: &[String]) -> Result<(), InputError> {
    let encoded = values
        .iter()
        .map(|s| {
            VarLenUnicode::from_str(s)
                .map_err(|e| InputError::InvalidInput(format!("cannot store {s:?}: {e}")))
        })
        .collect::<Result<Vec<_>, _>>()?;
    write_array(group, name, &encoded)
}

pub fn write_array<T: H5Type>(group: &Group, name: &str, values: &[T]) -> Result<(), InputError> {
    group
        .new_dataset::<T>()
        .shape(values.len())
        .create(name)?
        .write_raw(values)?;
    Ok(())
}

/// Writes a row-major `n_rows x n_cols` array.
pub fn write_array_2d<T: H5Type>(
    group: &Group,
    name: &str,
    values: &[T],
    n_rows: usize,
    n_cols: usize,
) -> Result<(), InputError> {
    if values.len() != n_rows * n_cols {
        return Err(InputError::InvalidInput(format!(
            "{name}: {} values do not fill a {n_rows}x{n_cols} array",
            values.len()
        )));
    }
    group
        .new_dataset::<T>()
        .shape((n_rows, n_cols))
        .create(name)?
        .write_raw(values)?;
    Ok(())
}

/// Writes `matrix` (genes x barcodes) as a CSC block in `group`.
pub fn write_block(
    group: &Group,
    matrix: &CscMatrix<f64>,
    gene_names: &[String],
    barcodes: &[String],
) -> Result<(), InputError> {
    let genes = (0..gene_names.len() as i64).collect::<Vec<_>>();
    let indices = matrix.indices().iter().map(|&i| i as i64).collect::<Vec<_>>();
    let indptr = matrix.indptr().iter().map(|&p| p as i64).collect::<Vec<_>>();
    let shape = [matrix.n_rows() as i64, matrix.n_cols() as i64];

    write_strings(group, DATASET_GENE_NAMES, gene_names)?;
    write_array(group, DATASET_GENES, &genes)?;
    write_strings(group, DATASET_BARCODES, barcodes)?;
    write_array(group, DATASET_DATA, matrix.data())?;
    write_array(group, DATASET_INDICES, &indices)?;
    write_array(group, DATASET_INDPTR, &indptr)?;
    write_array(group, DATASET_SHAPE, &shape)?;
    Ok(())
}

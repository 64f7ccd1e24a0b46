use std::collections::BTreeSet;

use crate::model::indices::Selected;
use crate::model::sparse::CsrMatrix;

pub fn select_genes(matrix: &CsrMatrix<u32>, blacklist: &[usize]) -> Selected<Vec<usize>> {
    let n_genes = matrix.n_cols();
    let full_range = || (0..n_genes).collect::<Vec<_>>();

    let mut sums = vec![0u64; n_genes];
    for (&gene, &count) in matrix.indices().iter().zip(matrix.data()) {
        match sums.get_mut(gene as usize) {
            Some(slot) => *slot += u64::from(count),
            None => {
                return Selected::fallback(
                    full_range(),
                    format!("gene index {gene} exceeds gene count {n_genes}; keeping all genes"),
                );
            }
        }
    }

    let blacklist = blacklist.iter().copied().collect::<BTreeSet<_>>();
    let genes = sums
        .iter()
        .enumerate()
        .filter(|&(gene, &sum)| sum > 0 && !blacklist.contains(&gene))
        .map(|(gene, _)| gene)
        .collect();
    Selected::ok(genes)
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/stage1_genes.rs"]
mod tests;

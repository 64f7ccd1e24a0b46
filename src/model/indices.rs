use serde::Serialize;

/// Barcode and gene subsets chosen for inference, in original index space.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AnalyzedIndices {
    /// Ascending, unique.
    pub gene_inds: Vec<usize>,
    /// Ordered by descending count rank.
    pub barcode_inds: Vec<usize>,
    /// Disjoint from `barcode_inds`.
    pub empty_barcode_inds: Vec<usize>,
    pub is_trimmed: bool,
}

impl AnalyzedIndices {
    pub fn untrimmed(n_barcodes: usize, n_genes: usize) -> Self {
        Self {
            gene_inds: (0..n_genes).collect(),
            barcode_inds: (0..n_barcodes).collect(),
            empty_barcode_inds: Vec::new(),
            is_trimmed: false,
        }
    }
}

/// A selection result that may have fallen back to a default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selected<T> {
    pub value: T,
    pub diagnostic: Option<String>,
}

impl<T> Selected<T> {
    pub fn ok(value: T) -> Self {
        Self {
            value,
            diagnostic: None,
        }
    }

    pub fn fallback(value: T, diagnostic: impl Into<String>) -> Self {
        Self {
            value,
            diagnostic: Some(diagnostic.into()),
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.diagnostic.is_some()
    }
}

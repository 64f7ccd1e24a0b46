pub mod json;
pub mod text;

use std::fs;
use std::path::Path;

use serde::Serialize;

use crate::model::priors::{ModelKind, Priors};
use crate::model::transform::Transformation;
use crate::pipeline::Dataset;
use json::render_summary_json;
use text::render_report_text;

pub const SUMMARY_FILE: &str = "priors.json";
pub const REPORT_FILE: &str = "report.txt";

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("cannot write report: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot encode summary: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrimSummary {
    pub n_genes_analyzed: usize,
    pub n_barcodes_analyzed: usize,
    pub n_empty_barcodes: usize,
    pub gene_inds: Vec<usize>,
    pub barcode_inds: Vec<usize>,
    pub empty_barcode_inds: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub tool: String,
    pub tool_version: String,
    pub input: Option<String>,
    pub model: ModelKind,
    pub transformation: String,
    pub n_barcodes: usize,
    pub n_genes: usize,
    pub fraction_empties: f64,
    pub low_count_threshold: u64,
    pub trimming: TrimSummary,
    pub priors: Priors,
}

pub fn build_summary(dataset: &Dataset) -> RunSummary {
    let indices = dataset.indices();
    let params = dataset.params();
    RunSummary {
        tool: env!("CARGO_PKG_NAME").to_string(),
        tool_version: env!("CARGO_PKG_VERSION").to_string(),
        input: dataset.source().map(|p| p.display().to_string()),
        model: dataset.model(),
        transformation: dataset.transformation().name(),
        n_barcodes: dataset.raw().n_barcodes(),
        n_genes: dataset.raw().n_genes(),
        fraction_empties: params.fraction_empties,
        low_count_threshold: params.low_count_threshold,
        trimming: TrimSummary {
            n_genes_analyzed: indices.gene_inds.len(),
            n_barcodes_analyzed: indices.barcode_inds.len(),
            n_empty_barcodes: indices.empty_barcode_inds.len(),
            gene_inds: indices.gene_inds.clone(),
            barcode_inds: indices.barcode_inds.clone(),
            empty_barcode_inds: indices.empty_barcode_inds.clone(),
        },
        priors: dataset.priors().clone(),
    }
}

/// Writes `priors.json` and `report.txt` into `out_dir`, creating it if needed.
pub fn write_reports(out_dir: &Path, dataset: &Dataset) -> Result<(), ReportError> {
    fs::create_dir_all(out_dir)?;
    let summary = build_summary(dataset);

    let json = render_summary_json(&summary)?;
    fs::write(out_dir.join(SUMMARY_FILE), json)?;
    fs::write(out_dir.join(REPORT_FILE), render_report_text(&summary))?;
    Ok(())
}

pub fn format_f64_6(v: f64) -> String {
    format!("{:.6}", v)
}

#[cfg(test)]
#[path = "../../tests/src_inline/report/mod.rs"]
mod tests;

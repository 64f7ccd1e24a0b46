use crate::report::{RunSummary, format_f64_6};

pub fn render_report_text(summary: &RunSummary) -> String {
    let mut out = String::new();

    out.push_str("Ambient RNA Priors Report\n");
    out.push_str("=========================\n\n");

    out.push_str("1. Input\n");
    out.push_str(&format!(
        "Source: {}\n",
        summary.input.as_deref().unwrap_or("(in memory)")
    ));
    out.push_str(&format!(
        "Count matrix: {} barcodes x {} genes\n",
        summary.n_barcodes, summary.n_genes
    ));
    out.push_str(&format!("Model: {}\n", summary.model));
    out.push_str(&format!("Transformation: {}\n\n", summary.transformation));

    out.push_str("2. Trimming\n");
    let trim = &summary.trimming;
    out.push_str(&format!(
        "Genes analyzed: {} of {}\n",
        trim.n_genes_analyzed, summary.n_genes
    ));
    out.push_str(&format!(
        "Barcodes analyzed: {} of {}\n",
        trim.n_barcodes_analyzed, summary.n_barcodes
    ));
    if summary.model.models_empties() {
        out.push_str(&format!("Empty droplet barcodes: {}\n", trim.n_empty_barcodes));
        out.push_str(&format!("Low count threshold: {}\n", summary.low_count_threshold));
    }
    out.push('\n');

    out.push_str("3. Priors\n");
    let priors = &summary.priors;
    out.push_str(&format!("Expected cells: {}\n", priors.n_cells));
    out.push_str(&format!("Cell counts: {}\n", priors.cell_counts));
    out.push_str(&format!("Empty droplet counts: {}\n", priors.empty_counts));
    out.push_str(&format!(
        "Log counts crossover: {}\n",
        format_f64_6(priors.log_counts_crossover)
    ));
    out.push_str(&format!("d std: {}\n", format_f64_6(priors.d_std)));
    if let Some(ambient) = &priors.ambient {
        out.push_str(&format!(
            "Fraction empties: {}\n",
            format_f64_6(summary.fraction_empties)
        ));
        out.push_str(&format!("Cell probability: {}\n", format_f64_6(ambient.cell_prob)));
        out.push_str(&format!("Cell logit: {}\n", format_f64_6(ambient.cell_logit)));
        out.push_str(&format!(
            "Top ambient genes: {}\n",
            top_genes(&ambient.chi_ambient, &trim.gene_inds)
        ));
    }

    out
}

/// Up to five original gene indices with the largest ambient share.
fn top_genes(profile: &[f64], gene_inds: &[usize]) -> String {
    let mut order = (0..profile.len()).collect::<Vec<_>>();
    order.sort_by(|&a, &b| profile[b].total_cmp(&profile[a]));
    let top = order
        .into_iter()
        .take(5)
        .map(|i| {
            let gene = gene_inds.get(i).copied().unwrap_or(i);
            format!("{gene} ({})", format_f64_6(profile[i]))
        })
        .collect::<Vec<_>>();
    if top.is_empty() {
        "none".to_string()
    } else {
        top.join(", ")
    }
}

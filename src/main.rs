use std::error::Error;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};

use kira_ambient::inference::RecordedInference;
use kira_ambient::input::barcodes::{parse_index_csv, parse_index_list};
use kira_ambient::model::priors::ModelKind;
use kira_ambient::model::transform::CountTransform;
use kira_ambient::observe::{PipelineObserver, TracingObserver, init_subscriber};
use kira_ambient::pipeline::stage5_output::save_results;
use kira_ambient::pipeline::{
    DEFAULT_FRACTION_EMPTIES, DEFAULT_LOW_COUNT_THRESHOLD, Dataset, DatasetParams,
};
use kira_ambient::report::write_reports;

#[derive(Debug, Parser)]
#[command(
    name = "kira-ambient",
    version,
    about = "Barcode/gene trimming and ambient-RNA priors for 10x HDF5 count matrices"
)]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Trim the dataset, estimate priors and write priors.json and report.txt.
    Run(RunArgs),
    /// Combine a dataset with recorded inference outputs and write result files.
    Export(ExportArgs),
}

#[derive(Debug, Args)]
struct DatasetArgs {
    /// CellRanger v2 HDF5 count matrix.
    #[arg(long)]
    input: PathBuf,
    #[arg(long)]
    expected_cells: Option<usize>,
    #[arg(long)]
    transition_barcodes: Option<usize>,
    #[arg(long, default_value_t = DEFAULT_FRACTION_EMPTIES)]
    fraction_empties: f64,
    #[arg(long, default_value = "full")]
    model: ModelKind,
    /// Comma-separated gene indices to exclude.
    #[arg(long)]
    blacklist: Option<String>,
    /// File of gene indices to exclude, one per line or comma separated.
    #[arg(long)]
    blacklist_file: Option<PathBuf>,
    #[arg(long, default_value_t = DEFAULT_LOW_COUNT_THRESHOLD)]
    low_count_threshold: u64,
    /// identity | scale:<factor>
    #[arg(long, default_value = "identity", value_parser = CountTransform::parse)]
    transform: CountTransform,
}

#[derive(Debug, Args)]
struct RunArgs {
    #[command(flatten)]
    dataset: DatasetArgs,
    #[arg(long)]
    out: PathBuf,
}

#[derive(Debug, Args)]
struct ExportArgs {
    #[command(flatten)]
    dataset: DatasetArgs,
    /// Recorded inference outputs, JSON, optionally gzipped.
    #[arg(long)]
    inference: PathBuf,
    /// Full result file; the filtered file and barcode list are written next to it.
    #[arg(long)]
    output: PathBuf,
}

fn main() {
    let cli = Cli::parse();
    init_subscriber(cli.verbose);
    if let Err(err) = run(cli) {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), String> {
    let observer = TracingObserver;
    match cli.command {
        Command::Run(args) => {
            let dataset = load_dataset(&args.dataset, &observer)?;
            write_reports(&args.out, &dataset).map_err(|e| error_chain(&e))?;
            observer.info(&format!("wrote reports to {}", args.out.display()));
            Ok(())
        }
        Command::Export(args) => {
            let dataset = load_dataset(&args.dataset, &observer)?;
            let inference =
                RecordedInference::from_path(&args.inference).map_err(|e| error_chain(&e))?;
            let complete = save_results(&dataset, &inference, &args.output, &observer)
                .map_err(|e| error_chain(&e))?;
            if complete {
                Ok(())
            } else {
                Err(format!(
                    "one or more outputs next to {} could not be written",
                    args.output.display()
                ))
            }
        }
    }
}

fn load_dataset(args: &DatasetArgs, observer: &dyn PipelineObserver) -> Result<Dataset, String> {
    let params = dataset_params(args)?;
    Dataset::load(&args.input, params, args.transform, observer).map_err(|e| error_chain(&e))
}

fn dataset_params(args: &DatasetArgs) -> Result<DatasetParams, String> {
    let mut params = DatasetParams::new(args.model);
    params.expected_cell_count = args.expected_cells;
    params.num_transition_barcodes = args.transition_barcodes;
    params.fraction_empties = args.fraction_empties;
    params.low_count_threshold = args.low_count_threshold;
    params.gene_blacklist = gene_blacklist(args.blacklist.as_deref(), args.blacklist_file.as_deref())?;
    Ok(params)
}

fn gene_blacklist(csv: Option<&str>, file: Option<&Path>) -> Result<Vec<usize>, String> {
    let mut out = match csv {
        Some(raw) => parse_index_csv(raw).map_err(|e| e.to_string())?,
        None => Vec::new(),
    };
    if let Some(path) = file {
        out.extend(parse_index_list(path).map_err(|e| e.to_string())?);
    }
    out.sort_unstable();
    out.dedup();
    Ok(out)
}

fn error_chain(err: &dyn Error) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !out.contains(&text) {
            out.push_str(": ");
            out.push_str(&text);
        }
        source = cause.source();
    }
    out
}

#[cfg(test)]
#[path = "../tests/src_inline/main_inline.rs"]
mod tests;

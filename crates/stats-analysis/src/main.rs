use anyhow::{bail, Result};
use clap::Parser;
use std::path::{Path, PathBuf};

mod batch;
mod export;
mod summary;

use batch::{BatchAnalyzer, ReportInput};
use export::Format;
use simstats::RuleTable;

#[derive(Parser)]
#[command(name = "stats-analysis")]
#[command(about = "Derive performance and energy metrics from simulator statistics reports")]
struct Cli {
    #[arg(help = "Report files, as PATH or LABEL=PATH")]
    inputs: Vec<String>,

    #[arg(
        short = 'd',
        long,
        help = "Directory searched recursively for stats.txt reports"
    )]
    results_dir: Option<PathBuf>,

    #[arg(
        short = 'p',
        long,
        help = "Operating point for every report (default: inferred from the label, else balanced)"
    )]
    operating_point: Option<String>,

    #[arg(long, help = "Workload size used for the efficiency metric (default: sim_insts)")]
    workload_size: Option<f64>,

    #[arg(short = 'f', long, value_enum, default_value = "parquet", help = "Output format")]
    format: Format,

    #[arg(
        short = 'o',
        long,
        help = "Output file (defaults to stats_summary.<ext> in the results directory or current directory)"
    )]
    output: Option<PathBuf>,

    #[arg(short, long, help = "Verbose debug output")]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let mut inputs: Vec<ReportInput> = cli.inputs.iter().map(|a| ReportInput::from_arg(a)).collect();
    if let Some(dir) = &cli.results_dir {
        inputs.extend(batch::discover(dir)?);
    }
    if inputs.is_empty() {
        bail!("No reports given: pass report paths or --results-dir");
    }

    let analyzer = BatchAnalyzer::new(RuleTable::standard())
        .with_operating_point(cli.operating_point.clone())
        .with_workload_size(cli.workload_size);

    let outcome = analyzer.analyze(&inputs);

    print!("{}", summary::render(&outcome, &summary::format_time())?);

    if outcome.reports.is_empty() {
        bail!("None of the {} report(s) could be processed", inputs.len());
    }

    let output = determine_output_filename(cli.output.as_deref(), cli.results_dir.as_deref(), cli.format);
    export::export(&output, &outcome.reports, analyzer.table(), cli.format)?;
    println!("Summary written to: {}", output.display());

    Ok(())
}

fn determine_output_filename(output: Option<&Path>, results_dir: Option<&Path>, format: Format) -> PathBuf {
    if let Some(path) = output {
        return path.to_path_buf();
    }

    let output_filename = format!("stats_summary.{}", format.extension());
    match results_dir {
        Some(dir) => dir.join(output_filename),
        None => PathBuf::from(output_filename),
    }
}

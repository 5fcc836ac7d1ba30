//! Spectral index calculator.
//!
//! Computes vegetation, water and soil indices for directories of
//! Sentinel-2 mosaic tiles and writes one Float32 GeoTIFF per
//! (directory, index) pair, optionally moving each result to the Allas
//! object store.

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use raster_io::GeoTiffDriver;
use spectral_indices::{
    expand_list_argument, IndexBatch, IndexRegistry, ListKind, PipelineSettings, RunReport,
};
use storage::{ObjectStorage, ObjectStorageConfig};
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "index-calculator")]
#[command(about = "Compute spectral indices for Sentinel-2 mosaic tiles")]
struct Args {
    /// Index names, or a single file listing one index per line
    #[arg(long, num_args = 1.., required_unless_present = "list_indices")]
    indices: Vec<String>,

    /// Tile directories, or a single file listing one directory per line
    #[arg(long, num_args = 1.., required_unless_present = "list_indices")]
    directories: Vec<String>,

    /// Root directory for the per-index output folders
    #[arg(long, env = "INDEX_OUTPUT_DIR", default_value = ".")]
    output: PathBuf,

    /// Upload results to Allas and remove the local copies
    #[arg(long)]
    allas: bool,

    /// Maximum number of items processed at once
    #[arg(long)]
    jobs: Option<NonZeroUsize>,

    /// Pipeline settings file (YAML)
    #[arg(long, env = "INDEX_CONFIG")]
    config: Option<PathBuf>,

    /// Write a JSON run report to this path
    #[arg(long)]
    report: Option<PathBuf>,

    /// Log level, used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,

    /// Print the available indices and exit
    #[arg(long)]
    list_indices: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormat {
    Json,
    Pretty,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    if args.list_indices {
        print_indices();
        return ExitCode::SUCCESS;
    }

    init_tracing(&args.log_level, args.log_format);

    let report = match run(&args).await {
        Ok(report) => report,
        Err(e) => {
            error!(error = %format!("{:#}", e), "Invalid request, nothing was processed");
            eprintln!("error: {:#}", e);
            return ExitCode::from(2);
        }
    };

    report.log_summary();

    if let Some(path) = &args.report {
        if let Err(e) = write_report(&report, path) {
            error!(path = %path.display(), error = %format!("{:#}", e), "Failed to write run report");
            return ExitCode::FAILURE;
        }
    }

    if report.is_success() {
        ExitCode::SUCCESS
    } else {
        eprintln!(
            "{} of {} items failed:\n{}",
            report.total() - report.succeeded(),
            report.total(),
            report.failure_listing()
        );
        ExitCode::FAILURE
    }
}

/// Validate the request, then process every item. Errors returned here are
/// configuration errors; item failures are recorded in the report.
async fn run(args: &Args) -> Result<RunReport> {
    let mut settings =
        PipelineSettings::load(args.config.as_deref()).context("loading pipeline settings")?;
    if let Some(jobs) = args.jobs {
        settings.max_concurrency = jobs.get();
    }

    let indices = expand_list_argument(&args.indices, ListKind::Indices)?;
    let directories: Vec<PathBuf> = expand_list_argument(&args.directories, ListKind::Directories)?
        .into_iter()
        .map(PathBuf::from)
        .collect();

    let mut batch = IndexBatch::new(&settings, Arc::new(GeoTiffDriver::new()), &args.output)?;

    if args.allas {
        let config = ObjectStorageConfig::from_env();
        let storage = ObjectStorage::new(&config).context("configuring Allas storage")?;
        info!(endpoint = %config.endpoint, bucket = %storage.bucket(), "Archiving outputs");
        batch = batch.with_archive(Arc::new(storage));
    }

    let items = batch.plan(&directories, &indices)?;

    info!(
        items = items.len(),
        indices = indices.len(),
        directories = directories.len(),
        output = %args.output.display(),
        max_concurrency = batch.max_concurrency(),
        "Starting index calculation"
    );

    Ok(batch.run(items).await)
}

fn print_indices() {
    for spec in IndexRegistry::global().iter() {
        println!(
            "{:<8} {:>2}m  {}",
            spec.name,
            spec.resolution.meters(),
            spec.description
        );
    }
}

fn write_report(report: &RunReport, path: &Path) -> Result<()> {
    let json = report.to_json()?;
    std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
    info!(path = %path.display(), "Wrote run report");
    Ok(())
}

fn init_tracing(log_level: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    let builder = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

//! Mosaic tile reprojector.
//!
//! Reprojects every `*.tif` tile in a directory into another coordinate
//! reference system, either next to the sources or in place.

use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use raster_io::{GeoTiffDriver, WarpReprojector};
use spectral_indices::{PipelineSettings, ReprojectionBatch, ReprojectionPlan, RunReport};
use tile_common::Epsg;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "tile-reprojector")]
#[command(about = "Reproject a directory of mosaic tiles to another CRS")]
struct Args {
    /// Directory containing the tiles
    #[arg(long)]
    dir: PathBuf,

    /// Target EPSG code, e.g. 3067 or EPSG:3067
    #[arg(long, value_parser = parse_epsg)]
    epsg: Epsg,

    /// Replace the source tiles with their reprojected versions
    #[arg(long, conflicts_with = "output")]
    overwrite: bool,

    /// Output directory (default: <dir>/Reprojected)
    #[arg(long)]
    output: Option<PathBuf>,

    /// Maximum number of tiles processed at once
    #[arg(long)]
    jobs: Option<NonZeroUsize>,

    /// Log level, used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormat {
    Json,
    Pretty,
}

fn parse_epsg(value: &str) -> std::result::Result<Epsg, String> {
    Epsg::parse(value).map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();
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

    if report.is_success() {
        ExitCode::SUCCESS
    } else {
        eprintln!(
            "{} of {} tiles failed:\n{}",
            report.total() - report.succeeded(),
            report.total(),
            report.failure_listing()
        );
        ExitCode::FAILURE
    }
}

async fn run(args: &Args) -> Result<RunReport> {
    let settings = PipelineSettings::load(None).context("loading pipeline settings")?;
    let max_concurrency = args
        .jobs
        .map(NonZeroUsize::get)
        .unwrap_or(settings.max_concurrency);

    let plan =
        ReprojectionPlan::discover(&args.dir, args.epsg, args.overwrite, args.output.as_deref())?;

    info!(
        dir = %plan.source_dir.display(),
        output = %plan.output_dir.display(),
        target = %plan.target,
        tiles = plan.tiles.len(),
        max_concurrency,
        "Starting reprojection"
    );

    let reprojector = Arc::new(WarpReprojector::new(GeoTiffDriver::new()));
    Ok(ReprojectionBatch::new(reprojector, max_concurrency).run(&plan).await)
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

//! Reprojection pipeline: every `*.tif` in a directory is one work item.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use raster_io::projection::is_supported;
use raster_io::Reprojector;
use tile_common::Epsg;
use tracing::{info, instrument};

use crate::batch::{blocking, fan_out, WorkItem};
use crate::directory::list_files;
use crate::error::{IndexError, Result};
use crate::output::OutputLocation;
use crate::report::RunReport;

/// Name of the default output directory under the source directory.
pub const DEFAULT_OUTPUT_DIR: &str = "Reprojected";

/// Tiles to reproject and where to put them.
#[derive(Debug, Clone)]
pub struct ReprojectionPlan {
    pub source_dir: PathBuf,
    pub target: Epsg,
    pub output_dir: PathBuf,
    pub tiles: Vec<PathBuf>,
}

impl ReprojectionPlan {
    /// List the tiles in `dir` and settle the output directory.
    ///
    /// With `overwrite` the tiles are replaced in place; otherwise they go to
    /// `output`, or `<dir>/Reprojected` when no output is given. The output
    /// directory is created if missing.
    pub fn discover(dir: &Path, target: Epsg, overwrite: bool, output: Option<&Path>) -> Result<Self> {
        if !is_supported(target) {
            return Err(IndexError::UnsupportedCrs(target));
        }

        let tiles: Vec<PathBuf> = match list_files(dir) {
            Ok(files) => files.into_iter().filter(|p| is_tif(p)).collect(),
            Err(IndexError::DirectoryRead { .. }) => Vec::new(),
            Err(e) => return Err(e),
        };
        if tiles.is_empty() {
            return Err(IndexError::NoTilesFound(dir.to_path_buf()));
        }

        let output_dir = if overwrite {
            dir.to_path_buf()
        } else {
            let output_dir = output
                .map(Path::to_path_buf)
                .unwrap_or_else(|| dir.join(DEFAULT_OUTPUT_DIR));
            fs::create_dir_all(&output_dir).map_err(|source| IndexError::OutputDirectory {
                path: output_dir.clone(),
                source,
            })?;
            output_dir
        };

        info!(
            source_dir = %dir.display(),
            output_dir = %output_dir.display(),
            target = %target,
            tiles = tiles.len(),
            "Planned reprojection"
        );

        Ok(Self {
            source_dir: dir.to_path_buf(),
            target,
            output_dir,
            tiles,
        })
    }

    pub fn items(&self) -> Vec<WorkItem> {
        self.tiles
            .iter()
            .map(|tile| WorkItem::Reproject {
                source: tile.clone(),
                target: self.target,
                output_dir: self.output_dir.clone(),
            })
            .collect()
    }
}

fn is_tif(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("tif")
}

/// Fans tiles out over a [`Reprojector`].
pub struct ReprojectionBatch {
    reprojector: Arc<dyn Reprojector>,
    max_concurrency: usize,
}

impl ReprojectionBatch {
    pub fn new(reprojector: Arc<dyn Reprojector>, max_concurrency: usize) -> Self {
        Self {
            reprojector,
            max_concurrency: max_concurrency.max(1),
        }
    }

    pub async fn run(&self, plan: &ReprojectionPlan) -> RunReport {
        fan_out("reprojection", plan.items(), self.max_concurrency, |item| {
            self.process(item)
        })
        .await
    }

    async fn process(&self, item: WorkItem) -> Result<OutputLocation> {
        match item {
            WorkItem::Reproject {
                source,
                target,
                output_dir,
            } => self.process_tile(source, target, output_dir).await,
            other => Err(IndexError::invalid_argument(format!(
                "{} is not a reprojection work item",
                other
            ))),
        }
    }

    #[instrument(skip(self, output_dir), fields(tile = %source.display(), target = %target))]
    async fn process_tile(
        &self,
        source: PathBuf,
        target: Epsg,
        output_dir: PathBuf,
    ) -> Result<OutputLocation> {
        let reprojector = Arc::clone(&self.reprojector);
        let path = blocking(move || Ok(reprojector.reproject(&source, target, &output_dir)?)).await?;
        Ok(OutputLocation::Local { path })
    }
}

//! Batch execution: plan independent work items, fan them out with a
//! concurrency cap and collect every outcome.

use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use raster_io::RasterDriver;
use storage::RemoteArchive;
use tile_common::Epsg;
use tracing::{error, info, instrument};

use crate::bands::BandLoader;
use crate::directory::TileDirectory;
use crate::error::{IndexError, Result};
use crate::naming::NamingConvention;
use crate::output::{archive_output, ArchiveKey, OutputLayout, OutputLocation, OutputMaterializer};
use crate::registry::IndexRegistry;
use crate::report::{ItemOutcome, RunReport};
use crate::settings::PipelineSettings;

/// One independent unit of work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkItem {
    Index {
        directory: PathBuf,
        index: String,
    },
    Reproject {
        source: PathBuf,
        target: Epsg,
        output_dir: PathBuf,
    },
}

impl fmt::Display for WorkItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkItem::Index { directory, index } => {
                write!(f, "{} :: {}", directory.display(), index)
            }
            WorkItem::Reproject { source, target, .. } => {
                write!(f, "{} -> {}", source.display(), target)
            }
        }
    }
}

/// Run `run` over `items` with at most `max_concurrency` in flight, turning
/// each result into an [`ItemOutcome`].
pub(crate) async fn fan_out<F, Fut>(
    pipeline: &str,
    items: Vec<WorkItem>,
    max_concurrency: usize,
    run: F,
) -> RunReport
where
    F: Fn(WorkItem) -> Fut,
    Fut: Future<Output = Result<OutputLocation>>,
{
    let started_at = Utc::now();
    info!(
        pipeline,
        items = items.len(),
        max_concurrency,
        "Starting batch"
    );

    let outcomes: Vec<ItemOutcome> = stream::iter(items.into_iter().map(|item| {
        let label = item.to_string();
        let task = run(item);
        async move {
            let start = Instant::now();
            match task.await {
                Ok(location) => {
                    info!(item = %label, output = %location, "Item completed");
                    ItemOutcome::succeeded(label, location.to_string(), start.elapsed())
                }
                Err(e) => {
                    error!(item = %label, error = %e, "Item failed");
                    ItemOutcome::failed(label, e.to_string(), start.elapsed())
                }
            }
        }
    }))
    .buffer_unordered(max_concurrency.max(1))
    .collect()
    .await;

    RunReport::new(pipeline, started_at, outcomes)
}

/// Run CPU and file work on the blocking pool; a panic becomes an item error.
pub(crate) async fn blocking<T, F>(work: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(work).await {
        Ok(result) => result,
        Err(e) if e.is_panic() => {
            let payload = e.into_panic();
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            Err(IndexError::TaskFailed(format!("panicked: {}", message)))
        }
        Err(e) => Err(IndexError::TaskFailed(e.to_string())),
    }
}

/// A written index raster, before any archival.
#[derive(Debug, Clone)]
pub struct ComputedOutput {
    pub path: PathBuf,
    pub file_name: String,
    pub timeframe: Option<String>,
}

/// Synchronous per-item work: scan, load, compute, write.
#[derive(Debug)]
pub struct IndexWorker {
    registry: &'static IndexRegistry,
    naming: NamingConvention,
    loader: BandLoader,
    materializer: OutputMaterializer,
}

impl IndexWorker {
    pub fn compute(&self, directory: &Path, index: &str) -> Result<ComputedOutput> {
        let spec = self.registry.get(index)?;
        let tile = TileDirectory::scan(directory, &self.naming)?;
        let bands = self.loader.load_set(&tile, spec)?;
        let grid = spec.compute(&bands)?;
        let path = self
            .materializer
            .write(&grid, spec.name, &tile, spec.resolution)?;

        Ok(ComputedOutput {
            path,
            file_name: OutputLayout::file_name(tile.prefix(), spec.name),
            timeframe: tile.timeframe().map(str::to_string),
        })
    }
}

/// Index pipeline: every (directory, index) pair is one work item.
pub struct IndexBatch {
    worker: Arc<IndexWorker>,
    archive: Option<Arc<dyn RemoteArchive>>,
    max_concurrency: usize,
}

impl IndexBatch {
    pub fn new(
        settings: &PipelineSettings,
        driver: Arc<dyn RasterDriver>,
        output_root: impl Into<PathBuf>,
    ) -> Result<Self> {
        settings.validate()?;
        let loader = BandLoader::new(driver).with_scale_factor(settings.scale_factor);
        let materializer = OutputMaterializer::new(loader.clone(), OutputLayout::new(output_root));

        Ok(Self {
            worker: Arc::new(IndexWorker {
                registry: IndexRegistry::global(),
                naming: settings.naming_convention()?,
                loader,
                materializer,
            }),
            archive: None,
            max_concurrency: settings.max_concurrency,
        })
    }

    /// Upload each output and remove the local copy once uploaded.
    pub fn with_archive(mut self, archive: Arc<dyn RemoteArchive>) -> Self {
        self.archive = Some(archive);
        self
    }

    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Validate the request and build the directory × index product.
    ///
    /// Unknown index names fail here, before anything runs.
    pub fn plan(&self, directories: &[PathBuf], indices: &[String]) -> Result<Vec<WorkItem>> {
        if directories.is_empty() {
            return Err(IndexError::invalid_argument("no directories given"));
        }
        if indices.is_empty() {
            return Err(IndexError::invalid_argument("no indices given"));
        }
        self.worker.registry.validate(indices)?;

        Ok(directories
            .iter()
            .flat_map(|directory| {
                indices.iter().map(move |index| WorkItem::Index {
                    directory: directory.clone(),
                    index: index.clone(),
                })
            })
            .collect())
    }

    /// Execute every item. Failures are collected, never propagated.
    pub async fn run(&self, items: Vec<WorkItem>) -> RunReport {
        fan_out("index", items, self.max_concurrency, |item| self.process(item)).await
    }

    async fn process(&self, item: WorkItem) -> Result<OutputLocation> {
        match item {
            WorkItem::Index { directory, index } => self.process_index(directory, index).await,
            other => Err(IndexError::invalid_argument(format!(
                "{} is not an index work item",
                other
            ))),
        }
    }

    #[instrument(skip(self), fields(directory = %directory.display(), index = %index))]
    async fn process_index(&self, directory: PathBuf, index: String) -> Result<OutputLocation> {
        let worker = Arc::clone(&self.worker);
        let task_index = index.clone();
        let computed = blocking(move || worker.compute(&directory, &task_index)).await?;

        let archive = match &self.archive {
            Some(archive) => archive,
            None => return Ok(OutputLocation::Local { path: computed.path }),
        };

        let timeframe = computed.timeframe.as_deref().ok_or_else(|| {
            IndexError::MissingTimeframe(computed.file_name.clone())
        })?;
        let key = ArchiveKey::new(&index, timeframe, &computed.file_name);
        archive_output(archive.as_ref(), &computed.path, &key).await
    }
}

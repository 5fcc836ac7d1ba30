//! Spectral index and reprojection pipelines for Sentinel-2 mosaic tiles.
//!
//! Both pipelines have the same shape: build a flat list of independent
//! [`WorkItem`]s, fan them out over a bounded number of concurrent tasks and
//! collect a per-item outcome into a [`RunReport`].
//!
//! # Index pipeline
//!
//! ```text
//! directories × indices
//!      │
//!      ▼
//! IndexBatch::plan ──► IndexRegistry::validate (unknown names abort here)
//!      │
//!      ▼
//! IndexBatch::run (buffer_unordered, spawn_blocking per item)
//!      │
//!      ├─► TileDirectory::scan (NamingConvention)
//!      ├─► BandLoader::load_set (DN / scale factor)
//!      ├─► IndexSpec::compute (rayon, NaN-propagating)
//!      ├─► OutputMaterializer::write  <out>/<index>/<prefix>_<index>.tif
//!      └─► archive_output (optional)  <index>/<timeframe>/<file>
//! ```
//!
//! # Reprojection pipeline
//!
//! ```text
//! ReprojectionPlan::discover(dir) ──► ReprojectionBatch::run ──► Reprojector
//! ```

pub mod bands;
pub mod batch;
pub mod directory;
pub mod error;
pub mod formulas;
pub mod inputs;
pub mod naming;
pub mod output;
pub mod registry;
pub mod report;
pub mod reproject;
pub mod settings;

pub use bands::{BandLoader, BandSet, DEFAULT_SCALE_FACTOR};
pub use batch::{IndexBatch, WorkItem};
pub use directory::{BandFile, TileDirectory};
pub use error::{IndexError, Result};
pub use inputs::{expand_list_argument, ListKind};
pub use naming::{BandFileName, NamingConvention};
pub use output::{archive_output, ArchiveKey, OutputLayout, OutputLocation, OutputMaterializer};
pub use registry::{IndexRegistry, IndexSpec};
pub use report::{ItemOutcome, ItemStatus, RunReport};
pub use reproject::{ReprojectionBatch, ReprojectionPlan};
pub use settings::PipelineSettings;

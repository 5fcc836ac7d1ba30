//! Output materialization: local layout, raster writing and archival.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use raster_io::{Compression, DataType, RasterGrid};
use serde::{Deserialize, Serialize};
use storage::RemoteArchive;
use tile_common::Resolution;
use tracing::{debug, info, instrument, warn};

use crate::bands::BandLoader;
use crate::directory::TileDirectory;
use crate::error::{IndexError, Result};

/// Local output layout: `<root>/<index>/<prefix>_<index>.tif`.
#[derive(Debug, Clone)]
pub struct OutputLayout {
    root: PathBuf,
}

impl OutputLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory collecting every tile's output for one index.
    pub fn index_dir(&self, index: &str) -> PathBuf {
        self.root.join(index)
    }

    /// `<prefix>_<index>.tif`
    pub fn file_name(prefix: &str, index: &str) -> String {
        format!("{}_{}.tif", prefix, index)
    }

    pub fn index_path(&self, index: &str, prefix: &str) -> PathBuf {
        self.index_dir(index).join(Self::file_name(prefix, index))
    }
}

/// Remote key of an archived output: `<index>/<timeframe>/<file name>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArchiveKey(String);

impl ArchiveKey {
    pub fn new(index: &str, timeframe: &str, file_name: &str) -> Self {
        Self(format!("{}/{}/{}", index, timeframe, file_name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArchiveKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where a finished output ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OutputLocation {
    Local { path: PathBuf },
    Archived { key: String, location: String },
}

impl fmt::Display for OutputLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputLocation::Local { path } => write!(f, "{}", path.display()),
            OutputLocation::Archived { location, .. } => f.write_str(location),
        }
    }
}

/// Writes index grids as single-band Float32 LZW GeoTIFFs georeferenced like
/// the tile's red band.
#[derive(Debug, Clone)]
pub struct OutputMaterializer {
    loader: BandLoader,
    layout: OutputLayout,
}

impl OutputMaterializer {
    pub fn new(loader: BandLoader, layout: OutputLayout) -> Self {
        Self { loader, layout }
    }

    pub fn layout(&self) -> &OutputLayout {
        &self.layout
    }

    /// Write `grid` for `index` computed from `directory` at `resolution`.
    ///
    /// An existing output is replaced, so re-running an item is idempotent.
    #[instrument(skip(self, grid, directory), fields(directory = %directory.path().display()))]
    pub fn write(
        &self,
        grid: &RasterGrid,
        index: &str,
        directory: &TileDirectory,
        resolution: Resolution,
    ) -> Result<PathBuf> {
        let profile = self
            .loader
            .reference_profile(directory, resolution)?
            .with_data_type(DataType::Float32)
            .with_band_count(1)
            .with_compression(Compression::Lzw);

        let index_dir = self.layout.index_dir(index);
        fs::create_dir_all(&index_dir).map_err(|source| IndexError::OutputDirectory {
            path: index_dir.clone(),
            source,
        })?;

        let path = self.layout.index_path(index, directory.prefix());
        self.loader.driver().write(&path, grid, &profile)?;

        info!(
            path = %path.display(),
            width = profile.width,
            height = profile.height,
            nan_cells = grid.nan_count(),
            "Wrote index raster"
        );
        Ok(path)
    }
}

/// Upload `local` under `key`, then remove the local copy.
///
/// A failed upload leaves `local` in place. The local copy is only removed
/// once the archive has confirmed the upload.
#[instrument(skip(archive, local), fields(local = %local.display(), key = %key))]
pub async fn archive_output(
    archive: &dyn RemoteArchive,
    local: &Path,
    key: &ArchiveKey,
) -> Result<OutputLocation> {
    let size = match archive.upload_file(local, key.as_str()).await {
        Ok(size) => size,
        Err(source) => {
            warn!(error = %source, "Upload failed, keeping local file");
            return Err(IndexError::ArchiveUpload {
                path: local.to_path_buf(),
                key: key.to_string(),
                source,
            });
        }
    };
    debug!(size, "Uploaded output");

    tokio::fs::remove_file(local)
        .await
        .map_err(|source| IndexError::LocalCleanup {
            path: local.to_path_buf(),
            key: key.to_string(),
            source,
        })?;

    Ok(OutputLocation::Archived {
        key: key.to_string(),
        location: archive.location(key.as_str()),
    })
}

//! Raster driver abstraction.

use std::path::Path;

use crate::error::Result;
use crate::grid::RasterGrid;
use crate::profile::RasterProfile;

/// Reads and writes single-band rasters.
///
/// Implementations must be shareable across worker threads: the batch
/// orchestrators hold one driver behind an `Arc` for the whole run.
pub trait RasterDriver: Send + Sync {
    /// Read the first band of a raster as `f32` values, plus its profile.
    fn read(&self, path: &Path) -> Result<(RasterGrid, RasterProfile)>;

    /// Read only the profile of a raster.
    fn read_profile(&self, path: &Path) -> Result<RasterProfile>;

    /// Write `grid` to `path` using `profile`, replacing any existing file.
    fn write(&self, path: &Path, grid: &RasterGrid, profile: &RasterProfile) -> Result<()>;
}

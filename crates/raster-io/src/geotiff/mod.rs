//! Pure-Rust GeoTIFF driver.
//!
//! Handles the single-band rasters produced by the mosaicking pipeline and
//! the Float32 index rasters written by this workspace. Georeferencing is
//! carried in the standard GeoTIFF tags; nodata in the GDAL_NODATA tag so
//! GDAL-based tools read the outputs unchanged.

mod reader;
mod writer;

use std::path::Path;

use crate::driver::RasterDriver;
use crate::error::Result;
use crate::grid::RasterGrid;
use crate::profile::RasterProfile;

// GeoTIFF Tag IDs
pub(crate) const MODEL_PIXEL_SCALE: u16 = 33550;
pub(crate) const MODEL_TIEPOINT: u16 = 33922;
pub(crate) const MODEL_TRANSFORMATION: u16 = 34264;
pub(crate) const GEO_KEY_DIRECTORY: u16 = 34735;
pub(crate) const GDAL_NODATA: u16 = 42113;

// GeoKey IDs
pub(crate) const GT_MODEL_TYPE_GEO_KEY: u16 = 1024;
pub(crate) const GT_RASTER_TYPE_GEO_KEY: u16 = 1025;
pub(crate) const GEOGRAPHIC_TYPE_GEO_KEY: u16 = 2048;
pub(crate) const PROJECTED_CS_TYPE_GEO_KEY: u16 = 3072;

// GeoKey values
pub(crate) const MODEL_TYPE_PROJECTED: u16 = 1;
pub(crate) const MODEL_TYPE_GEOGRAPHIC: u16 = 2;
pub(crate) const RASTER_PIXEL_IS_AREA: u16 = 1;
pub(crate) const USER_DEFINED: u16 = 32767;

/// [`RasterDriver`] for GeoTIFF files.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeoTiffDriver;

impl GeoTiffDriver {
    pub fn new() -> Self {
        Self
    }
}

impl RasterDriver for GeoTiffDriver {
    fn read(&self, path: &Path) -> Result<(RasterGrid, RasterProfile)> {
        reader::read(path)
    }

    fn read_profile(&self, path: &Path) -> Result<RasterProfile> {
        reader::read_profile(path)
    }

    fn write(&self, path: &Path, grid: &RasterGrid, profile: &RasterProfile) -> Result<()> {
        writer::write(path, grid, profile)
    }
}

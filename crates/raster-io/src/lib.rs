//! Raster I/O and reprojection for Sentinel-2 mosaic tiles.
//!
//! This crate hides the on-disk raster format behind two traits so the
//! pipelines never touch file formats directly:
//!
//! - [`RasterDriver`]: read a single-band raster (grid + profile) and write
//!   a grid back out given a profile.
//! - [`Reprojector`]: produce a reprojected copy of a raster file in another
//!   coordinate reference system.
//!
//! # Architecture
//!
//! ```text
//! GeoTIFF file
//!      │
//!      ▼
//! GeoTiffDriver::read(path)
//!      │
//!      ├─► TIFF strips/tiles decoded to f32 (RasterGrid)
//!      │
//!      └─► GeoTIFF tags decoded to RasterProfile
//!               (transform, EPSG, data type, nodata)
//!
//! WarpReprojector::reproject(path, epsg, out_dir)
//!      │
//!      ├─► Sample source edges, project to target bounds
//!      │
//!      ├─► Inverse-project each target pixel center (proj4rs)
//!      │
//!      └─► Nearest-neighbour sample, write with source data type
//! ```

pub mod driver;
pub mod error;
pub mod geotiff;
pub mod grid;
pub mod profile;
pub mod projection;
pub mod reproject;

// Re-export commonly used types at crate root
pub use driver::RasterDriver;
pub use error::{RasterError, Result};
pub use geotiff::GeoTiffDriver;
pub use grid::RasterGrid;
pub use profile::{Compression, DataType, GeoTransform, RasterProfile};
pub use projection::CoordTransformer;
pub use reproject::{Reprojector, WarpReprojector};

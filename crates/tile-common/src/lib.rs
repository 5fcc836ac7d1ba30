//! Common types shared across the spectral tile workspace.

pub mod band;
pub mod crs;
pub mod error;

pub use band::{BandId, Resolution, SpectralBand};
pub use crs::Epsg;
pub use error::{CommonError, CommonResult};

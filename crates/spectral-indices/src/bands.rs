//! Band loading: locate a band file, read it and rescale to reflectance.

use std::collections::BTreeMap;
use std::sync::Arc;

use raster_io::{RasterDriver, RasterGrid, RasterProfile};
use tile_common::{BandId, Resolution, SpectralBand};
use tracing::{debug, instrument};

use crate::directory::TileDirectory;
use crate::error::{IndexError, Result};
use crate::registry::IndexSpec;

/// Divisor turning L2A digital numbers into reflectance.
pub const DEFAULT_SCALE_FACTOR: f32 = 10000.0;

/// The bands loaded for one index evaluation, all on one grid.
#[derive(Debug, Clone)]
pub struct BandSet {
    resolution: Resolution,
    shape: (usize, usize),
    bands: BTreeMap<SpectralBand, RasterGrid>,
}

impl BandSet {
    /// Build a set, checking that every grid has the same shape.
    pub fn new(
        resolution: Resolution,
        grids: impl IntoIterator<Item = (SpectralBand, RasterGrid)>,
    ) -> Result<Self> {
        let mut bands = BTreeMap::new();
        let mut shape = None;

        for (band, grid) in grids {
            match shape {
                None => shape = Some(grid.shape()),
                Some(expected) if expected != grid.shape() => {
                    return Err(IndexError::ShapeMismatch {
                        band: BandId::new(band, resolution),
                        expected,
                        actual: grid.shape(),
                    })
                }
                Some(_) => {}
            }
            bands.insert(band, grid);
        }

        Ok(Self {
            resolution,
            shape: shape.unwrap_or((0, 0)),
            bands,
        })
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// (width, height) shared by every band.
    pub fn shape(&self) -> (usize, usize) {
        self.shape
    }

    /// Reflectance values of a band, row-major.
    pub fn band(&self, band: SpectralBand) -> Result<&[f32]> {
        self.bands
            .get(&band)
            .map(|grid| grid.data())
            .ok_or(IndexError::BandNotLoaded(band))
    }

    pub fn contains(&self, band: SpectralBand) -> bool {
        self.bands.contains_key(&band)
    }
}

/// Reads bands from tile directories through a [`RasterDriver`].
#[derive(Clone)]
pub struct BandLoader {
    driver: Arc<dyn RasterDriver>,
    scale_factor: f32,
}

impl BandLoader {
    pub fn new(driver: Arc<dyn RasterDriver>) -> Self {
        Self {
            driver,
            scale_factor: DEFAULT_SCALE_FACTOR,
        }
    }

    pub fn with_scale_factor(mut self, scale_factor: f32) -> Self {
        self.scale_factor = scale_factor;
        self
    }

    pub fn scale_factor(&self) -> f32 {
        self.scale_factor
    }

    pub fn driver(&self) -> &Arc<dyn RasterDriver> {
        &self.driver
    }

    /// Load one band as reflectance (digital number / scale factor).
    #[instrument(skip(self, directory), fields(directory = %directory.path().display()))]
    pub fn load(
        &self,
        directory: &TileDirectory,
        band: SpectralBand,
        resolution: Resolution,
    ) -> Result<RasterGrid> {
        let path = directory.resolve(BandId::new(band, resolution))?;
        let (grid, _) = self.driver.read(path)?;
        debug!(path = %path.display(), "Loaded band");
        Ok(grid.rescale(self.scale_factor))
    }

    /// Load every band `spec` needs at its resolution.
    pub fn load_set(&self, directory: &TileDirectory, spec: &IndexSpec) -> Result<BandSet> {
        let grids = spec
            .band_ids()
            .map(|id| Ok((id.band, self.load(directory, id.band, id.resolution)?)))
            .collect::<Result<Vec<_>>>()?;
        BandSet::new(spec.resolution, grids)
    }

    /// Profile of the red band at `resolution`; outputs inherit its georeference.
    pub fn reference_profile(
        &self,
        directory: &TileDirectory,
        resolution: Resolution,
    ) -> Result<RasterProfile> {
        let path = directory.resolve(BandId::new(SpectralBand::Red, resolution))?;
        Ok(self.driver.read_profile(path)?)
    }
}

impl std::fmt::Debug for BandLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BandLoader")
            .field("scale_factor", &self.scale_factor)
            .finish_non_exhaustive()
    }
}

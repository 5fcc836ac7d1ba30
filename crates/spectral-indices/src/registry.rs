//! Static registry mapping index names to their bands, resolution and formula.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use raster_io::RasterGrid;
use tile_common::SpectralBand::{self, Blue, Green, NarrowNir, Nir, Red, Swir1, Swir2};
use tile_common::{BandId, Resolution};

use crate::bands::BandSet;
use crate::error::{IndexError, Result};
use crate::formulas;

/// Elementwise formula over loaded bands.
pub type IndexFormula = fn(&BandSet) -> Result<Vec<f32>>;

/// One registered index.
#[derive(Clone)]
pub struct IndexSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub bands: &'static [SpectralBand],
    pub resolution: Resolution,
    formula: IndexFormula,
}

impl IndexSpec {
    /// The band files this index reads.
    pub fn band_ids(&self) -> impl Iterator<Item = BandId> + '_ {
        self.bands
            .iter()
            .map(move |&band| BandId::new(band, self.resolution))
    }

    /// Evaluate the formula, producing a grid with the bands' shape.
    pub fn compute(&self, bands: &BandSet) -> Result<RasterGrid> {
        let (width, height) = bands.shape();
        let data = (self.formula)(bands)?;
        Ok(RasterGrid::new(data, width, height)?)
    }
}

impl std::fmt::Debug for IndexSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexSpec")
            .field("name", &self.name)
            .field("bands", &self.bands)
            .field("resolution", &self.resolution)
            .finish()
    }
}

static SENTINEL2: Lazy<IndexRegistry> = Lazy::new(IndexRegistry::sentinel2);

const RED_NIR: &[SpectralBand] = &[Red, Nir];
const TASSELED_CAP: &[SpectralBand] = &[Blue, Green, Red, NarrowNir, Swir1, Swir2];

/// Lookup table of every supported index.
#[derive(Debug, Clone)]
pub struct IndexRegistry {
    specs: BTreeMap<&'static str, IndexSpec>,
}

impl IndexRegistry {
    /// The Sentinel-2 index set.
    pub fn sentinel2() -> Self {
        use Resolution::{R10m, R20m};

        let mut registry = Self {
            specs: BTreeMap::new(),
        };
        registry.register("ndvi", "Normalized difference vegetation index", RED_NIR, R10m, formulas::ndvi);
        registry.register("ndwi", "Normalized difference water index (McFeeters)", &[Green, Nir], R10m, formulas::ndwi);
        registry.register("savi", "Soil adjusted vegetation index", RED_NIR, R10m, formulas::savi);
        registry.register("ndmi", "Normalized difference moisture index", &[NarrowNir, Swir1], R20m, formulas::ndmi);
        registry.register("tctb", "Tasseled cap brightness", TASSELED_CAP, R20m, formulas::tctb);
        registry.register("tctg", "Tasseled cap greenness", TASSELED_CAP, R20m, formulas::tctg);
        registry.register("tctw", "Tasseled cap wetness", TASSELED_CAP, R20m, formulas::tctw);
        registry.register("rvi", "Ratio vegetation index", RED_NIR, R10m, formulas::rvi);
        registry.register("kndvi", "Kernel NDVI", RED_NIR, R10m, formulas::kndvi);
        registry.register("mndwi", "Modified normalized difference water index", &[Green, Swir1], R20m, formulas::mndwi);
        registry.register("evi", "Enhanced vegetation index", &[Nir, Red, Blue], R10m, formulas::evi);
        registry.register("evi2", "Two-band enhanced vegetation index", RED_NIR, R10m, formulas::evi2);
        registry.register("dvi", "Difference vegetation index", RED_NIR, R10m, formulas::dvi);
        registry.register("cvi", "Chlorophyll vegetation index", &[Nir, Red, Green], R10m, formulas::cvi);
        registry.register("ndsi", "Normalized difference snow index", &[Green, Swir1], R20m, formulas::ndsi);
        registry.register("nbr", "Normalized burn ratio", &[NarrowNir, Swir2], R20m, formulas::nbr);
        registry.register("sci", "Soil composition index", &[Nir, Red, Green, Blue], R10m, formulas::sci);
        registry.register("sm", "Simple ratio NIR/blue", &[Nir, Blue], R10m, formulas::sm);
        registry
    }

    /// Process-wide registry, built on first use.
    pub fn global() -> &'static IndexRegistry {
        &SENTINEL2
    }

    fn register(
        &mut self,
        name: &'static str,
        description: &'static str,
        bands: &'static [SpectralBand],
        resolution: Resolution,
        formula: IndexFormula,
    ) {
        self.specs.insert(
            name,
            IndexSpec {
                name,
                description,
                bands,
                resolution,
                formula,
            },
        );
    }

    /// Exact-match lookup.
    pub fn get(&self, name: &str) -> Result<&IndexSpec> {
        self.specs
            .get(name)
            .ok_or_else(|| IndexError::UnknownIndex(name.to_string()))
    }

    /// Check a whole request, naming every unknown index in one error.
    pub fn validate<S: AsRef<str>>(&self, names: &[S]) -> Result<()> {
        let unknown: Vec<&str> = names
            .iter()
            .map(AsRef::as_ref)
            .filter(|name| !self.specs.contains_key(*name))
            .collect();

        if unknown.is_empty() {
            Ok(())
        } else {
            Err(IndexError::UnknownIndex(unknown.join(", ")))
        }
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&'static str> {
        self.specs.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &IndexSpec> {
        self.specs.values()
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

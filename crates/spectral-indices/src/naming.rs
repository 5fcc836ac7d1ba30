//! Band file naming convention.
//!
//! Mosaic products name each band file `<prefix>_R<res>m_B<band>.tif`, with
//! the acquisition date range (`YYYYMMDD_YYYYMMDD`) somewhere in the prefix.
//! Both patterns are configurable; the band pattern must define the named
//! groups `prefix`, `resolution` and `band`.

use regex::Regex;
use tile_common::{Resolution, SpectralBand};

use crate::error::{IndexError, Result};

/// Default band file pattern.
pub const DEFAULT_BAND_PATTERN: &str =
    r"^(?P<prefix>.+)_R(?P<resolution>\d+)m_B(?P<band>[0-9]{1,2}|8A)\.tif$";

/// Default timeframe token pattern, searched for in the prefix.
pub const DEFAULT_TIMEFRAME_PATTERN: &str = r"\d{8}_\d{8}";

const REQUIRED_GROUPS: [&str; 3] = ["prefix", "resolution", "band"];

/// Tokens extracted from one band file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BandFileName {
    pub prefix: String,
    pub resolution: Resolution,
    pub band: SpectralBand,
}

/// Pattern-based token extraction for band file names.
#[derive(Debug, Clone)]
pub struct NamingConvention {
    band_pattern: Regex,
    timeframe_pattern: Regex,
}

impl NamingConvention {
    pub fn new(band_pattern: &str, timeframe_pattern: &str) -> Result<Self> {
        let band_pattern = Regex::new(band_pattern)
            .map_err(|e| IndexError::invalid_config(format!("band pattern: {}", e)))?;
        let timeframe_pattern = Regex::new(timeframe_pattern)
            .map_err(|e| IndexError::invalid_config(format!("timeframe pattern: {}", e)))?;

        let groups: Vec<&str> = band_pattern.capture_names().flatten().collect();
        for group in REQUIRED_GROUPS {
            if !groups.contains(&group) {
                return Err(IndexError::invalid_config(format!(
                    "band pattern is missing the named group '{}'",
                    group
                )));
            }
        }

        Ok(Self {
            band_pattern,
            timeframe_pattern,
        })
    }

    /// The sen2mosaic convention.
    pub fn sentinel2() -> Result<Self> {
        Self::new(DEFAULT_BAND_PATTERN, DEFAULT_TIMEFRAME_PATTERN)
    }

    /// Parse a file name. Returns `None` for files outside the convention and
    /// for bands or resolutions no index uses (B05, 60 m, ...).
    pub fn parse(&self, file_name: &str) -> Option<BandFileName> {
        let caps = self.band_pattern.captures(file_name)?;
        let resolution = caps["resolution"]
            .parse::<u32>()
            .ok()
            .and_then(|m| Resolution::from_meters(m).ok())?;
        let band = SpectralBand::from_code(&caps["band"]).ok()?;

        Some(BandFileName {
            prefix: caps["prefix"].to_string(),
            resolution,
            band,
        })
    }

    /// First timeframe token in a file prefix.
    pub fn timeframe(&self, prefix: &str) -> Option<String> {
        self.timeframe_pattern
            .find(prefix)
            .map(|m| m.as_str().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_default_convention() {
        let naming = NamingConvention::sentinel2().unwrap();

        let parsed = naming.parse("T35VLG_20230601_20230630_R10m_B04.tif").unwrap();
        assert_eq!(parsed.prefix, "T35VLG_20230601_20230630");
        assert_eq!(parsed.resolution, Resolution::R10m);
        assert_eq!(parsed.band, SpectralBand::Red);

        let parsed = naming.parse("T35VLG_20230601_20230630_R20m_B8A.tif").unwrap();
        assert_eq!(parsed.band, SpectralBand::NarrowNir);
        assert_eq!(parsed.resolution, Resolution::R20m);
    }

    #[test]
    fn test_band_2_never_matches_band_12() {
        let naming = NamingConvention::sentinel2().unwrap();
        let blue = naming.parse("tile_R20m_B02.tif").unwrap();
        let swir2 = naming.parse("tile_R20m_B12.tif").unwrap();
        assert_eq!(blue.band, SpectralBand::Blue);
        assert_eq!(swir2.band, SpectralBand::Swir2);
    }

    #[test]
    fn test_parse_rejects_foreign_files() {
        let naming = NamingConvention::sentinel2().unwrap();
        assert!(naming.parse("tile_R10m_B04.tif.aux.xml").is_none());
        assert!(naming.parse("tile_ndvi.tif").is_none());
        // Valid name, but a band no index uses
        assert!(naming.parse("tile_R20m_B05.tif").is_none());
        assert!(naming.parse("tile_R30m_B04.tif").is_none());
    }

    #[test]
    fn test_timeframe() {
        let naming = NamingConvention::sentinel2().unwrap();
        assert_eq!(
            naming.timeframe("T35VLG_20230601_20230630").as_deref(),
            Some("20230601_20230630")
        );
        assert_eq!(naming.timeframe("T35VLG_summer"), None);
    }

    #[test]
    fn test_custom_pattern_requires_groups() {
        assert!(NamingConvention::new(r"^(?P<prefix>.+)_B(?P<band>\d+)\.tif$", r"\d{8}").is_err());
        assert!(NamingConvention::new(r"(", r"\d{8}").is_err());

        let custom = NamingConvention::new(
            r"^(?P<prefix>.+)-(?P<band>B\d\d)-(?P<resolution>\d+)m\.tif$",
            r"\d{4}-\d{2}",
        )
        .unwrap();
        let parsed = custom.parse("scene_2023-06-B03-10m.tif").unwrap();
        assert_eq!(parsed.prefix, "scene_2023-06");
        assert_eq!(parsed.band, SpectralBand::Green);
        assert_eq!(custom.timeframe(&parsed.prefix).as_deref(), Some("2023-06"));
    }
}

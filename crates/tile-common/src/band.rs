//! Sentinel-2 band and resolution identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CommonError;

/// A Sentinel-2 spectral band used by the index formulas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SpectralBand {
    /// B02, 490 nm
    Blue,
    /// B03, 560 nm
    Green,
    /// B04, 665 nm
    Red,
    /// B08, 842 nm (10 m only)
    Nir,
    /// B8A, 865 nm (20 m and 60 m)
    NarrowNir,
    /// B11, 1610 nm
    Swir1,
    /// B12, 2190 nm
    Swir2,
}

impl SpectralBand {
    pub const ALL: [SpectralBand; 7] = [
        SpectralBand::Blue,
        SpectralBand::Green,
        SpectralBand::Red,
        SpectralBand::Nir,
        SpectralBand::NarrowNir,
        SpectralBand::Swir1,
        SpectralBand::Swir2,
    ];

    /// Band code as it appears after the `B` in file names.
    pub fn code(&self) -> &'static str {
        match self {
            SpectralBand::Blue => "02",
            SpectralBand::Green => "03",
            SpectralBand::Red => "04",
            SpectralBand::Nir => "08",
            SpectralBand::NarrowNir => "8A",
            SpectralBand::Swir1 => "11",
            SpectralBand::Swir2 => "12",
        }
    }

    pub fn common_name(&self) -> &'static str {
        match self {
            SpectralBand::Blue => "blue",
            SpectralBand::Green => "green",
            SpectralBand::Red => "red",
            SpectralBand::Nir => "nir",
            SpectralBand::NarrowNir => "nir_narrow",
            SpectralBand::Swir1 => "swir1",
            SpectralBand::Swir2 => "swir2",
        }
    }

    /// Parse a band token, normalising zero padding and an optional `B` prefix.
    ///
    /// `"2"`, `"02"` and `"B02"` all resolve to [`SpectralBand::Blue`], so band 2
    /// can never be confused with band 12.
    pub fn from_code(token: &str) -> Result<Self, CommonError> {
        let token = token.trim();
        let stripped = token
            .strip_prefix('B')
            .or_else(|| token.strip_prefix('b'))
            .unwrap_or(token);

        if stripped.eq_ignore_ascii_case("8a") {
            return Ok(SpectralBand::NarrowNir);
        }

        match stripped.parse::<u8>() {
            Ok(2) => Ok(SpectralBand::Blue),
            Ok(3) => Ok(SpectralBand::Green),
            Ok(4) => Ok(SpectralBand::Red),
            Ok(8) => Ok(SpectralBand::Nir),
            Ok(11) => Ok(SpectralBand::Swir1),
            Ok(12) => Ok(SpectralBand::Swir2),
            _ => Err(CommonError::UnknownBand(token.to_string())),
        }
    }
}

impl FromStr for SpectralBand {
    type Err = CommonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_code(s)
    }
}

impl fmt::Display for SpectralBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "B{}", self.code())
    }
}

/// Pixel size of a mosaic product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Resolution {
    R10m,
    R20m,
    R60m,
}

impl Resolution {
    pub fn meters(&self) -> u32 {
        match self {
            Resolution::R10m => 10,
            Resolution::R20m => 20,
            Resolution::R60m => 60,
        }
    }

    pub fn from_meters(meters: u32) -> Result<Self, CommonError> {
        match meters {
            10 => Ok(Resolution::R10m),
            20 => Ok(Resolution::R20m),
            60 => Ok(Resolution::R60m),
            other => Err(CommonError::UnsupportedResolution(format!("{}m", other))),
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}m", self.meters())
    }
}

/// A band at a given resolution; the lookup key into a tile directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BandId {
    pub band: SpectralBand,
    pub resolution: Resolution,
}

impl BandId {
    pub fn new(band: SpectralBand, resolution: Resolution) -> Self {
        Self { band, resolution }
    }
}

impl fmt::Display for BandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.band, self.resolution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_band_code_normalisation() {
        assert_eq!(SpectralBand::from_code("2").unwrap(), SpectralBand::Blue);
        assert_eq!(SpectralBand::from_code("02").unwrap(), SpectralBand::Blue);
        assert_eq!(SpectralBand::from_code("B02").unwrap(), SpectralBand::Blue);
        assert_eq!(SpectralBand::from_code("12").unwrap(), SpectralBand::Swir2);
        assert_eq!(SpectralBand::from_code("8A").unwrap(), SpectralBand::NarrowNir);
        assert_eq!(SpectralBand::from_code("b8a").unwrap(), SpectralBand::NarrowNir);
        assert_eq!(SpectralBand::from_code("8").unwrap(), SpectralBand::Nir);
    }

    #[test]
    fn test_unknown_band() {
        assert!(SpectralBand::from_code("01").is_err());
        assert!(SpectralBand::from_code("8B").is_err());
        assert!(SpectralBand::from_code("").is_err());
    }

    #[test]
    fn test_band_codes_roundtrip() {
        for band in SpectralBand::ALL {
            assert_eq!(SpectralBand::from_code(band.code()).unwrap(), band);
        }
    }

    #[test]
    fn test_resolution() {
        assert_eq!(Resolution::from_meters(20).unwrap(), Resolution::R20m);
        assert!(Resolution::from_meters(30).is_err());
        assert_eq!(Resolution::R10m.to_string(), "10m");
        assert_eq!(
            BandId::new(SpectralBand::NarrowNir, Resolution::R20m).to_string(),
            "B8A@20m"
        );
    }
}

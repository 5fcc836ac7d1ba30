//! Coordinate reference system identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CommonError;

/// A numeric EPSG code identifying a coordinate reference system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Epsg(u16);

impl Epsg {
    /// WGS84 geographic.
    pub const WGS84: Epsg = Epsg(4326);
    /// ETRS89 / TM35FIN, the Finnish national grid.
    pub const ETRS_TM35FIN: Epsg = Epsg(3067);

    pub const fn new(code: u16) -> Self {
        Self(code)
    }

    pub const fn code(&self) -> u16 {
        self.0
    }

    /// Parse an EPSG code from user input.
    ///
    /// Accepts formats like:
    /// - "3067"
    /// - "EPSG:3067"
    /// - "epsg:3067"
    pub fn parse(s: &str) -> Result<Self, CommonError> {
        let trimmed = s.trim();
        let digits = match trimmed.split_once(':') {
            Some((authority, code)) if authority.eq_ignore_ascii_case("epsg") => code,
            Some(_) => return Err(CommonError::InvalidEpsg(s.to_string())),
            None => trimmed,
        };

        match digits.parse::<u16>() {
            Ok(0) | Err(_) => Err(CommonError::InvalidEpsg(s.to_string())),
            Ok(code) => Ok(Self(code)),
        }
    }
}

impl FromStr for Epsg {
    type Err = CommonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Epsg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.0)
    }
}

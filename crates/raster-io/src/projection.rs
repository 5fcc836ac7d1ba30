//! EPSG lookups and point transformation using proj4rs (pure Rust).

use proj4rs::proj::Proj;
use proj4rs::transform::transform;
use tile_common::Epsg;

use crate::error::{RasterError, Result};

/// Get the PROJ4 string for an EPSG code from the crs-definitions database.
pub fn proj_string(epsg: Epsg) -> Option<&'static str> {
    crs_definitions::from_code(epsg.code()).map(|def| def.proj4)
}

/// True if the code is known to the crs-definitions database.
pub fn is_supported(epsg: Epsg) -> bool {
    proj_string(epsg).is_some()
}

/// Check if an EPSG code represents a geographic (lon/lat) CRS.
pub fn is_geographic(epsg: Epsg) -> bool {
    match proj_string(epsg) {
        Some(proj) => proj.contains("+proj=longlat"),
        None => epsg.code() == 4326 || (4000..5000).contains(&epsg.code()),
    }
}

/// Transforms points between two EPSG coordinate systems.
///
/// Geographic coordinates are taken and returned in degrees.
pub struct CoordTransformer {
    source_proj: Proj,
    target_proj: Proj,
    source_is_geographic: bool,
    target_is_geographic: bool,
}

impl CoordTransformer {
    pub fn new(source: Epsg, target: Epsg) -> Result<Self> {
        Ok(Self {
            source_proj: build_proj(source)?,
            target_proj: build_proj(target)?,
            source_is_geographic: is_geographic(source),
            target_is_geographic: is_geographic(target),
        })
    }

    /// Transform a point from the source CRS to the target CRS.
    pub fn transform(&self, x: f64, y: f64) -> Result<(f64, f64)> {
        let mut point = if self.source_is_geographic {
            (x.to_radians(), y.to_radians(), 0.0)
        } else {
            (x, y, 0.0)
        };

        transform(&self.source_proj, &self.target_proj, &mut point)
            .map_err(|e| RasterError::projection(format!("transform failed: {:?}", e)))?;

        if self.target_is_geographic {
            Ok((point.0.to_degrees(), point.1.to_degrees()))
        } else {
            Ok((point.0, point.1))
        }
    }
}

fn build_proj(epsg: Epsg) -> Result<Proj> {
    let definition = proj_string(epsg)
        .ok_or_else(|| RasterError::projection(format!("{} is not a known CRS", epsg)))?;
    Proj::from_proj_string(definition)
        .map_err(|e| RasterError::projection(format!("invalid projection {}: {:?}", epsg, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_codes() {
        assert!(is_supported(Epsg::ETRS_TM35FIN));
        assert!(is_supported(Epsg::new(32635)));
        assert!(is_geographic(Epsg::WGS84));
        assert!(!is_geographic(Epsg::ETRS_TM35FIN));
    }

    #[test]
    fn test_identity_like_transform() {
        // UTM 35N and TM35FIN share the central meridian (27E) and scale,
        // differing only in datum (WGS84 vs ETRS89) which is sub-metre.
        let t = CoordTransformer::new(Epsg::new(32635), Epsg::ETRS_TM35FIN).unwrap();
        let (x, y) = t.transform(500000.0, 6700000.0).unwrap();
        assert!((x - 500000.0).abs() < 5.0, "x = {}", x);
        assert!((y - 6700000.0).abs() < 5.0, "y = {}", y);
    }

    #[test]
    fn test_geographic_roundtrip() {
        let forward = CoordTransformer::new(Epsg::WGS84, Epsg::ETRS_TM35FIN).unwrap();
        let back = CoordTransformer::new(Epsg::ETRS_TM35FIN, Epsg::WGS84).unwrap();
        let (x, y) = forward.transform(24.94, 60.17).unwrap();
        let (lon, lat) = back.transform(x, y).unwrap();
        assert!((lon - 24.94).abs() < 1e-6);
        assert!((lat - 60.17).abs() < 1e-6);
    }
}

//! GeoTIFF decoding.

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use tiff::decoder::{Decoder, DecodingResult};
use tiff::tags::Tag;
use tiff::ColorType;
use tile_common::Epsg;
use tracing::debug;

use super::{
    GDAL_NODATA, GEOGRAPHIC_TYPE_GEO_KEY, GEO_KEY_DIRECTORY, MODEL_PIXEL_SCALE, MODEL_TIEPOINT,
    MODEL_TRANSFORMATION, PROJECTED_CS_TYPE_GEO_KEY, USER_DEFINED,
};
use crate::error::{RasterError, Result};
use crate::grid::RasterGrid;
use crate::profile::{Compression, DataType, GeoTransform, RasterProfile};

pub(super) fn read(path: &Path) -> Result<(RasterGrid, RasterProfile)> {
    let mut decoder = open(path)?;
    let profile = decode_profile(&mut decoder)?;

    let (data, data_type) = samples_to_f32(decoder.read_image()?)?;
    let grid = RasterGrid::new(data, profile.width, profile.height)?;

    debug!(
        path = %path.display(),
        width = profile.width,
        height = profile.height,
        data_type = ?data_type,
        "Read raster"
    );

    Ok((grid, profile))
}

pub(super) fn read_profile(path: &Path) -> Result<RasterProfile> {
    let mut decoder = open(path)?;
    decode_profile(&mut decoder)
}

fn open(path: &Path) -> Result<Decoder<BufReader<File>>> {
    let file = File::open(path).map_err(|e| RasterError::open_failed(path, e.to_string()))?;
    Decoder::new(BufReader::new(file)).map_err(|e| RasterError::open_failed(path, e.to_string()))
}

fn decode_profile<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<RasterProfile> {
    let (width, height) = decoder.dimensions()?;
    let data_type = match decoder.colortype()? {
        ColorType::Gray(bits) => sample_data_type(decoder, bits)?,
        other => {
            return Err(RasterError::Unsupported(format!(
                "expected a single-band raster, found {:?}",
                other
            )))
        }
    };

    let transform = decode_transform(decoder)?;
    let crs = decode_crs(decoder)?;
    let nodata = decode_nodata(decoder)?;
    let compression = match tag_u16(decoder, Tag::Compression)? {
        Some(5) => Compression::Lzw,
        Some(8) | Some(32946) => Compression::Deflate,
        _ => Compression::None,
    };

    Ok(RasterProfile {
        width: width as usize,
        height: height as usize,
        transform: transform.unwrap_or_default(),
        crs,
        data_type,
        band_count: 1,
        compression,
        nodata,
    })
}

/// Resolve the sample type from BitsPerSample and SampleFormat.
fn sample_data_type<R: Read + Seek>(decoder: &mut Decoder<R>, bits: u8) -> Result<DataType> {
    // SampleFormat: 1 = unsigned, 2 = signed, 3 = IEEE float
    let format = tag_u16(decoder, Tag::SampleFormat)?.unwrap_or(1);
    match (format, bits) {
        (1, 8) => Ok(DataType::UInt8),
        (1, 16) => Ok(DataType::UInt16),
        (2, 16) => Ok(DataType::Int16),
        (1, 32) => Ok(DataType::UInt32),
        (2, 32) => Ok(DataType::Int32),
        (3, 32) => Ok(DataType::Float32),
        (3, 64) => Ok(DataType::Float64),
        (format, bits) => Err(RasterError::Unsupported(format!(
            "sample format {} with {} bits per sample",
            format, bits
        ))),
    }
}

fn samples_to_f32(result: DecodingResult) -> Result<(Vec<f32>, DataType)> {
    let converted = match result {
        DecodingResult::U8(v) => (v.into_iter().map(f32::from).collect(), DataType::UInt8),
        DecodingResult::U16(v) => (v.into_iter().map(f32::from).collect(), DataType::UInt16),
        DecodingResult::I16(v) => (v.into_iter().map(f32::from).collect(), DataType::Int16),
        DecodingResult::U32(v) => (v.into_iter().map(|x| x as f32).collect(), DataType::UInt32),
        DecodingResult::I32(v) => (v.into_iter().map(|x| x as f32).collect(), DataType::Int32),
        DecodingResult::F32(v) => (v, DataType::Float32),
        DecodingResult::F64(v) => (v.into_iter().map(|x| x as f32).collect(), DataType::Float64),
        _ => {
            return Err(RasterError::Unsupported(
                "sample type has no f32 conversion".to_string(),
            ))
        }
    };
    Ok(converted)
}

fn decode_transform<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<Option<GeoTransform>> {
    if let Some(matrix) = tag_f64_vec(decoder, MODEL_TRANSFORMATION)? {
        if matrix.len() < 8 {
            return Err(RasterError::InvalidGeoreference(format!(
                "ModelTransformation has {} values, expected 16",
                matrix.len()
            )));
        }
        return Ok(Some(GeoTransform([
            matrix[3], matrix[0], matrix[1], matrix[7], matrix[4], matrix[5],
        ])));
    }

    let scale = tag_f64_vec(decoder, MODEL_PIXEL_SCALE)?;
    let tiepoint = tag_f64_vec(decoder, MODEL_TIEPOINT)?;

    match (scale, tiepoint) {
        (Some(scale), Some(tie)) => {
            if scale.len() < 2 || tie.len() < 6 {
                return Err(RasterError::InvalidGeoreference(
                    "truncated ModelPixelScale/ModelTiepoint".to_string(),
                ));
            }
            // Tie raster point (I, J) to model point (X, Y)
            let (sx, sy) = (scale[0], scale[1]);
            let origin_x = tie[3] - tie[0] * sx;
            let origin_y = tie[4] + tie[1] * sy;
            Ok(Some(GeoTransform([origin_x, sx, 0.0, origin_y, 0.0, -sy])))
        }
        _ => Ok(None),
    }
}

fn decode_crs<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<Option<Epsg>> {
    let keys = match tag_u16_vec(decoder, GEO_KEY_DIRECTORY)? {
        Some(keys) => keys,
        None => return Ok(None),
    };
    Ok(crs_from_geo_keys(&keys))
}

/// Find the EPSG code in a GeoKeyDirectory.
///
/// Layout: `[version, revision, minor, count, (key, location, count, value)*]`.
/// Only keys stored inline (location 0) are considered.
pub(crate) fn crs_from_geo_keys(keys: &[u16]) -> Option<Epsg> {
    if keys.len() < 4 {
        return None;
    }
    let count = keys[3] as usize;
    let mut geographic = None;

    for entry in keys[4..].chunks_exact(4).take(count) {
        let (key, location, value) = (entry[0], entry[1], entry[3]);
        if location != 0 || value == 0 || value == USER_DEFINED {
            continue;
        }
        match key {
            PROJECTED_CS_TYPE_GEO_KEY => return Some(Epsg::new(value)),
            GEOGRAPHIC_TYPE_GEO_KEY => geographic = Some(Epsg::new(value)),
            _ => {}
        }
    }

    geographic
}

fn decode_nodata<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<Option<f64>> {
    let value = match decoder.find_tag(Tag::from_u16_exhaustive(GDAL_NODATA))? {
        Some(value) => value,
        None => return Ok(None),
    };
    let text = value.into_string()?;
    let trimmed = text.trim_matches(char::from(0)).trim();
    if trimmed.eq_ignore_ascii_case("nan") {
        return Ok(Some(f64::NAN));
    }
    Ok(trimmed.parse::<f64>().ok())
}

fn tag_u16<R: Read + Seek>(decoder: &mut Decoder<R>, tag: Tag) -> Result<Option<u16>> {
    match decoder.find_tag(tag)? {
        Some(value) => Ok(Some(value.into_u16()?)),
        None => Ok(None),
    }
}

fn tag_u16_vec<R: Read + Seek>(decoder: &mut Decoder<R>, tag: u16) -> Result<Option<Vec<u16>>> {
    match decoder.find_tag(Tag::from_u16_exhaustive(tag))? {
        Some(value) => Ok(Some(value.into_u16_vec()?)),
        None => Ok(None),
    }
}

fn tag_f64_vec<R: Read + Seek>(decoder: &mut Decoder<R>, tag: u16) -> Result<Option<Vec<f64>>> {
    match decoder.find_tag(Tag::from_u16_exhaustive(tag))? {
        Some(value) => Ok(Some(value.into_f64_vec()?)),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crs_from_projected_geo_keys() {
        let keys = [1, 1, 0, 3, 1024, 0, 1, 1, 1025, 0, 1, 1, 3072, 0, 1, 32635];
        assert_eq!(crs_from_geo_keys(&keys), Some(Epsg::new(32635)));
    }

    #[test]
    fn test_crs_from_geographic_geo_keys() {
        let keys = [1, 1, 0, 2, 1024, 0, 1, 2, 2048, 0, 1, 4326];
        assert_eq!(crs_from_geo_keys(&keys), Some(Epsg::WGS84));
    }

    #[test]
    fn test_user_defined_crs_is_ignored() {
        let keys = [1, 1, 0, 1, 3072, 0, 1, USER_DEFINED];
        assert_eq!(crs_from_geo_keys(&keys), None);
        assert_eq!(crs_from_geo_keys(&[1, 1]), None);
    }
}

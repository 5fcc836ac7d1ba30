//! GeoTIFF encoding.

use std::fs::File;
use std::io::{BufWriter, Seek, Write};
use std::path::Path;

use tiff::encoder::colortype::{
    Gray16, Gray32, Gray32Float, Gray64Float, Gray8, GrayI16, GrayI32,
};
use tiff::encoder::{colortype::ColorType, DirectoryEncoder, TiffEncoder, TiffKind};
use tiff::tags::Tag;
use tracing::debug;

use super::{
    GDAL_NODATA, GEOGRAPHIC_TYPE_GEO_KEY, GEO_KEY_DIRECTORY, GT_MODEL_TYPE_GEO_KEY,
    GT_RASTER_TYPE_GEO_KEY, MODEL_PIXEL_SCALE, MODEL_TIEPOINT, MODEL_TRANSFORMATION,
    MODEL_TYPE_GEOGRAPHIC, MODEL_TYPE_PROJECTED, PROJECTED_CS_TYPE_GEO_KEY, RASTER_PIXEL_IS_AREA,
};
use crate::error::{RasterError, Result};
use crate::grid::RasterGrid;
use crate::profile::{Compression, DataType, RasterProfile};
use crate::projection::is_geographic;

/// Write `grid` to `path`.
///
/// The file is encoded into a uniquely named hidden sibling and renamed into
/// place, so readers never see a half-written raster. Concurrent writers of
/// the same path each publish a complete file; the last rename wins.
pub(super) fn write(path: &Path, grid: &RasterGrid, profile: &RasterProfile) -> Result<()> {
    if grid.shape() != profile.shape() {
        return Err(RasterError::ShapeMismatch {
            expected: profile.shape(),
            actual: grid.shape(),
        });
    }
    if grid.is_empty() {
        return Err(RasterError::encode_failed("raster has zero dimensions"));
    }
    if profile.band_count != 1 {
        return Err(RasterError::Unsupported(format!(
            "writing {} bands, only single-band output is supported",
            profile.band_count
        )));
    }

    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let prefix = partial_prefix(path);
    let mut builder = tempfile::Builder::new();
    builder.prefix(&prefix).suffix(".partial");
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(std::fs::Permissions::from_mode(0o644));
    }
    let mut partial = builder.tempfile_in(parent)?;
    encode_to_file(partial.as_file_mut(), grid, profile)?;
    partial.persist(path).map_err(|e| e.error)?;

    debug!(
        path = %path.display(),
        width = profile.width,
        height = profile.height,
        data_type = ?profile.data_type,
        compression = ?profile.compression,
        "Wrote raster"
    );
    Ok(())
}

/// Hidden, per-write name prefix for the temporary sibling of `path`.
fn partial_prefix(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!(".{}.", name)
}

fn encode_to_file(file: &mut File, grid: &RasterGrid, profile: &RasterProfile) -> Result<()> {
    let mut writer = BufWriter::new(file);
    encode(&mut writer, grid, profile)?;
    writer.flush()?;
    Ok(())
}

pub(crate) fn encode<W: Write + Seek>(
    writer: W,
    grid: &RasterGrid,
    profile: &RasterProfile,
) -> Result<()> {
    let compression = match profile.compression {
        Compression::None => tiff::encoder::Compression::Uncompressed,
        Compression::Lzw => tiff::encoder::Compression::Lzw,
        Compression::Deflate => {
            tiff::encoder::Compression::Deflate(tiff::encoder::DeflateLevel::Balanced)
        }
    };
    let encoder = TiffEncoder::new(writer)?.with_compression(compression);
    let values = grid.data();

    match profile.data_type {
        DataType::Float32 => write_image::<_, Gray32Float>(encoder, profile, values),
        DataType::Float64 => {
            let data: Vec<f64> = values.iter().map(|&v| v as f64).collect();
            write_image::<_, Gray64Float>(encoder, profile, &data)
        }
        DataType::UInt8 => {
            let data = quantize(values, profile.nodata, (0.0, u8::MAX as f32), |v| v as u8);
            write_image::<_, Gray8>(encoder, profile, &data)
        }
        DataType::UInt16 => {
            let data = quantize(values, profile.nodata, (0.0, u16::MAX as f32), |v| v as u16);
            write_image::<_, Gray16>(encoder, profile, &data)
        }
        DataType::Int16 => {
            let range = (i16::MIN as f32, i16::MAX as f32);
            let data = quantize(values, profile.nodata, range, |v| v as i16);
            write_image::<_, GrayI16>(encoder, profile, &data)
        }
        DataType::UInt32 => {
            let data = quantize(values, profile.nodata, (0.0, u32::MAX as f32), |v| v as u32);
            write_image::<_, Gray32>(encoder, profile, &data)
        }
        DataType::Int32 => {
            let range = (i32::MIN as f32, i32::MAX as f32);
            let data = quantize(values, profile.nodata, range, |v| v as i32);
            write_image::<_, GrayI32>(encoder, profile, &data)
        }
        other => Err(RasterError::Unsupported(format!(
            "writing {:?} samples",
            other
        ))),
    }
}

/// Round and clamp float cells into an integer range; NaN becomes nodata (or 0).
fn quantize<T, F>(values: &[f32], nodata: Option<f64>, range: (f32, f32), cast: F) -> Vec<T>
where
    F: Fn(f32) -> T,
{
    let (min, max) = range;
    let fill = nodata
        .filter(|n| n.is_finite())
        .map(|n| (n as f32).clamp(min, max))
        .unwrap_or(0.0);
    values
        .iter()
        .map(|&v| {
            if v.is_nan() {
                cast(fill)
            } else {
                cast(v.round().clamp(min, max))
            }
        })
        .collect()
}

fn write_image<W: Write + Seek, C: ColorType>(
    mut encoder: TiffEncoder<W>,
    profile: &RasterProfile,
    data: &[C::Inner],
) -> Result<()>
where
    [C::Inner]: tiff::encoder::TiffValue,
{
    let mut image = encoder.new_image::<C>(profile.width as u32, profile.height as u32)?;
    write_geotiff_tags(image.encoder(), profile)?;
    image
        .write_data(data)
        .map_err(|e| RasterError::encode_failed(e.to_string()))?;
    Ok(())
}

fn write_geotiff_tags<W: Write + Seek, K: TiffKind>(
    dir: &mut DirectoryEncoder<W, K>,
    profile: &RasterProfile,
) -> Result<()> {
    let transform = profile.transform;

    if transform.is_north_up() {
        let (sx, sy) = transform.pixel_size();
        let (origin_x, origin_y) = transform.origin();

        // ModelPixelScale: [ScaleX, ScaleY, ScaleZ]
        let pixel_scale = [sx, sy, 0.0];
        dir.write_tag(Tag::from_u16_exhaustive(MODEL_PIXEL_SCALE), pixel_scale.as_slice())?;

        // ModelTiepoint: ties pixel (0, 0) to the upper-left corner
        let tiepoint = [0.0, 0.0, 0.0, origin_x, origin_y, 0.0];
        dir.write_tag(Tag::from_u16_exhaustive(MODEL_TIEPOINT), tiepoint.as_slice())?;
    } else {
        let c = transform.coefficients();
        let matrix = [
            c[1], c[2], 0.0, c[0], //
            c[4], c[5], 0.0, c[3], //
            0.0, 0.0, 0.0, 0.0, //
            0.0, 0.0, 0.0, 1.0,
        ];
        dir.write_tag(Tag::from_u16_exhaustive(MODEL_TRANSFORMATION), matrix.as_slice())?;
    }

    if let Some(epsg) = profile.crs {
        let keys = build_geo_key_directory(epsg.code(), is_geographic(epsg));
        dir.write_tag(Tag::from_u16_exhaustive(GEO_KEY_DIRECTORY), keys.as_slice())?;
    }

    if let Some(nodata) = profile.nodata {
        let text = if nodata.is_nan() {
            "nan".to_string()
        } else {
            nodata.to_string()
        };
        dir.write_tag(Tag::from_u16_exhaustive(GDAL_NODATA), text.as_str())?;
    }

    Ok(())
}

pub(crate) fn build_geo_key_directory(code: u16, geographic: bool) -> Vec<u16> {
    let mut keys = vec![
        1, // KeyDirectoryVersion
        1, // KeyRevision
        0, // MinorRevision
        3, // NumberOfKeys
    ];

    keys.extend_from_slice(&[
        GT_MODEL_TYPE_GEO_KEY,
        0,
        1,
        if geographic {
            MODEL_TYPE_GEOGRAPHIC
        } else {
            MODEL_TYPE_PROJECTED
        },
    ]);
    keys.extend_from_slice(&[GT_RASTER_TYPE_GEO_KEY, 0, 1, RASTER_PIXEL_IS_AREA]);

    if geographic {
        keys.extend_from_slice(&[GEOGRAPHIC_TYPE_GEO_KEY, 0, 1, code]);
    } else {
        keys.extend_from_slice(&[PROJECTED_CS_TYPE_GEO_KEY, 0, 1, code]);
    }

    keys
}

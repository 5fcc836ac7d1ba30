//! Raster reprojection between coordinate reference systems.

use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tile_common::Epsg;
use tracing::{debug, instrument};

use crate::driver::RasterDriver;
use crate::error::{RasterError, Result};
use crate::grid::RasterGrid;
use crate::profile::{GeoTransform, RasterProfile};
use crate::projection::CoordTransformer;

/// Number of segments sampled along each raster edge when estimating the
/// target extent.
const EDGE_SAMPLES: usize = 32;

/// Produces a reprojected copy of a raster file.
pub trait Reprojector: Send + Sync {
    /// Reproject `source` into `target` and write it to `output_dir` under the
    /// source's file name. Returns the written path.
    fn reproject(&self, source: &Path, target: Epsg, output_dir: &Path) -> Result<PathBuf>;
}

/// Nearest-neighbour warp built on a [`RasterDriver`] and proj4rs.
///
/// The output keeps the source pixel count; its extent is the bounding box of
/// the source edges projected into the target CRS. Target pixels that fall
/// outside the source are set to the source nodata value, or NaN.
#[derive(Debug, Clone)]
pub struct WarpReprojector<D> {
    driver: D,
}

impl<D: RasterDriver> WarpReprojector<D> {
    pub fn new(driver: D) -> Self {
        Self { driver }
    }

    /// Warp an in-memory raster into `target`.
    pub fn warp(
        &self,
        grid: &RasterGrid,
        profile: &RasterProfile,
        target: Epsg,
    ) -> Result<(RasterGrid, RasterProfile)> {
        let source = profile.crs.ok_or_else(|| {
            RasterError::InvalidGeoreference("source raster has no CRS".to_string())
        })?;

        if source == target {
            return Ok((grid.clone(), profile.clone()));
        }

        let forward = CoordTransformer::new(source, target)?;
        // Fail early on a bad inverse; the workers build their own copies.
        CoordTransformer::new(target, source)?;

        let (min_x, min_y, max_x, max_y) = projected_bounds(profile, &forward)?;
        let (width, height) = profile.shape();
        let res_x = (max_x - min_x) / width as f64;
        let res_y = (max_y - min_y) / height as f64;
        let out_transform = GeoTransform::north_up(min_x, max_y, res_x, res_y);

        let fill = profile.nodata.map(|n| n as f32).unwrap_or(f32::NAN);
        let src_transform = profile.transform;
        let src = grid.data();

        let mut out = vec![fill; width * height];
        out.par_chunks_mut(width).enumerate().for_each_init(
            || CoordTransformer::new(target, source).ok(),
            |inverse, (row, line)| {
                let Some(inverse) = inverse.as_ref() else {
                    return;
                };
                for (col, cell) in line.iter_mut().enumerate() {
                    let (x, y) = out_transform.apply(col as f64 + 0.5, row as f64 + 0.5);
                    let Ok((sx, sy)) = inverse.transform(x, y) else {
                        continue;
                    };
                    if let Some((src_col, src_row)) = src_transform.invert(sx, sy) {
                        if let Some(v) = nearest(src, width, height, src_col, src_row) {
                            *cell = v;
                        }
                    }
                }
            },
        );

        let mut out_profile = profile
            .clone()
            .with_transform(out_transform)
            .with_crs(target);
        if out_profile.nodata.is_none() && !out_profile.data_type.is_float() {
            out_profile.nodata = Some(0.0);
        }

        Ok((RasterGrid::new(out, width, height)?, out_profile))
    }
}

impl<D: RasterDriver> Reprojector for WarpReprojector<D> {
    #[instrument(skip(self), fields(source = %source.display(), target = %target))]
    fn reproject(&self, source: &Path, target: Epsg, output_dir: &Path) -> Result<PathBuf> {
        let file_name = source.file_name().ok_or_else(|| {
            RasterError::open_failed(source, "path has no file name")
        })?;
        let output = output_dir.join(file_name);

        let (grid, profile) = self.driver.read(source)?;
        let (warped, warped_profile) = self.warp(&grid, &profile, target)?;
        self.driver.write(&output, &warped, &warped_profile)?;

        debug!(output = %output.display(), "Reprojected raster");
        Ok(output)
    }
}

/// Value of the source pixel containing the fractional position, if any.
fn nearest(data: &[f32], width: usize, height: usize, col: f64, row: f64) -> Option<f32> {
    if !col.is_finite() || !row.is_finite() || col < 0.0 || row < 0.0 {
        return None;
    }
    let (c, r) = (col.floor() as usize, row.floor() as usize);
    if c >= width || r >= height {
        return None;
    }
    data.get(r * width + c).copied()
}

/// Bounding box of the raster edges projected into the target CRS.
fn projected_bounds(
    profile: &RasterProfile,
    forward: &CoordTransformer,
) -> Result<(f64, f64, f64, f64)> {
    let (width, height) = (profile.width as f64, profile.height as f64);
    let mut bounds = (f64::MAX, f64::MAX, f64::MIN, f64::MIN);
    let mut projected = 0usize;

    for i in 0..=EDGE_SAMPLES {
        let t = i as f64 / EDGE_SAMPLES as f64;
        let edge_points = [
            (t * width, 0.0),
            (t * width, height),
            (0.0, t * height),
            (width, t * height),
        ];
        for (col, row) in edge_points {
            let (x, y) = profile.transform.apply(col, row);
            if let Ok((tx, ty)) = forward.transform(x, y) {
                if tx.is_finite() && ty.is_finite() {
                    bounds.0 = bounds.0.min(tx);
                    bounds.1 = bounds.1.min(ty);
                    bounds.2 = bounds.2.max(tx);
                    bounds.3 = bounds.3.max(ty);
                    projected += 1;
                }
            }
        }
    }

    if projected == 0 || bounds.0 >= bounds.2 || bounds.1 >= bounds.3 {
        return Err(RasterError::projection(
            "raster extent could not be projected into the target CRS",
        ));
    }
    Ok(bounds)
}

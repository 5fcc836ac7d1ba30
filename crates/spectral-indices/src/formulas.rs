//! Index formulas over reflectance bands.
//!
//! Every formula is a pure, elementwise function of the bands in a
//! [`BandSet`]. Division follows IEEE-754: 0/0 gives NaN and x/0 gives ±inf,
//! and both flow into the output raster unchanged.

use rayon::prelude::*;
use tile_common::SpectralBand::{Blue, Green, NarrowNir, Nir, Red, Swir1, Swir2};

use crate::bands::BandSet;
use crate::error::Result;

/// Tasseled-cap coefficients for Sentinel-2, ordered
/// blue, green, red, narrow NIR, SWIR1, SWIR2.
pub const TCT_BRIGHTNESS: [f32; 6] = [0.3510, 0.3813, 0.3437, 0.7196, 0.2396, 0.1949];
pub const TCT_GREENNESS: [f32; 6] = [-0.3599, -0.3533, -0.4734, 0.6633, 0.0087, -0.2856];
pub const TCT_WETNESS: [f32; 6] = [0.2578, 0.2305, 0.0883, 0.1071, -0.7611, -0.5308];

/// Apply `f` to each pixel of `N` equally sized bands, in parallel.
pub fn elementwise<const N: usize, F>(bands: [&[f32]; N], f: F) -> Vec<f32>
where
    F: Fn([f32; N]) -> f32 + Sync + Send,
{
    let len = bands.iter().map(|b| b.len()).min().unwrap_or(0);
    (0..len)
        .into_par_iter()
        .map(|i| f(bands.map(|b| b[i])))
        .collect()
}

fn normalized_difference(a: &[f32], b: &[f32]) -> Vec<f32> {
    elementwise([a, b], |[a, b]| (a - b) / (a + b))
}

fn tasseled_cap(set: &BandSet, coefficients: [f32; 6]) -> Result<Vec<f32>> {
    let bands = [
        set.band(Blue)?,
        set.band(Green)?,
        set.band(Red)?,
        set.band(NarrowNir)?,
        set.band(Swir1)?,
        set.band(Swir2)?,
    ];
    Ok(elementwise(bands, |px| {
        px.iter().zip(coefficients.iter()).map(|(v, c)| v * c).sum()
    }))
}

pub fn ndvi(set: &BandSet) -> Result<Vec<f32>> {
    Ok(normalized_difference(set.band(Nir)?, set.band(Red)?))
}

pub fn ndwi(set: &BandSet) -> Result<Vec<f32>> {
    Ok(normalized_difference(set.band(Green)?, set.band(Nir)?))
}

pub fn savi(set: &BandSet) -> Result<Vec<f32>> {
    const L: f32 = 0.5;
    Ok(elementwise([set.band(Nir)?, set.band(Red)?], |[nir, red]| {
        (1.0 + L) * (nir - red) / (nir + red + L)
    }))
}

pub fn ndmi(set: &BandSet) -> Result<Vec<f32>> {
    Ok(normalized_difference(set.band(NarrowNir)?, set.band(Swir1)?))
}

pub fn tctb(set: &BandSet) -> Result<Vec<f32>> {
    tasseled_cap(set, TCT_BRIGHTNESS)
}

pub fn tctg(set: &BandSet) -> Result<Vec<f32>> {
    tasseled_cap(set, TCT_GREENNESS)
}

pub fn tctw(set: &BandSet) -> Result<Vec<f32>> {
    tasseled_cap(set, TCT_WETNESS)
}

pub fn rvi(set: &BandSet) -> Result<Vec<f32>> {
    Ok(elementwise([set.band(Nir)?, set.band(Red)?], |[nir, red]| nir / red))
}

/// Kernel NDVI with the RBF kernel, sigma = mean(nir, red).
pub fn kndvi(set: &BandSet) -> Result<Vec<f32>> {
    Ok(elementwise([set.band(Nir)?, set.band(Red)?], |[nir, red]| {
        let sigma = 0.5 * (nir + red);
        let k = (-(nir - red).powi(2) / (2.0 * sigma.powi(2))).exp();
        (1.0 - k) / (1.0 + k)
    }))
}

pub fn mndwi(set: &BandSet) -> Result<Vec<f32>> {
    Ok(normalized_difference(set.band(Green)?, set.band(Swir1)?))
}

pub fn evi(set: &BandSet) -> Result<Vec<f32>> {
    let bands = [set.band(Nir)?, set.band(Red)?, set.band(Blue)?];
    Ok(elementwise(bands, |[nir, red, blue]| {
        2.5 * (nir - red) / (nir + 6.0 * red - 7.5 * blue + 1.0)
    }))
}

pub fn evi2(set: &BandSet) -> Result<Vec<f32>> {
    Ok(elementwise([set.band(Nir)?, set.band(Red)?], |[nir, red]| {
        2.5 * (nir - red) / (nir + 2.4 * red + 1.0)
    }))
}

pub fn dvi(set: &BandSet) -> Result<Vec<f32>> {
    Ok(elementwise([set.band(Nir)?, set.band(Red)?], |[nir, red]| nir - red))
}

pub fn cvi(set: &BandSet) -> Result<Vec<f32>> {
    let bands = [set.band(Nir)?, set.band(Red)?, set.band(Green)?];
    Ok(elementwise(bands, |[nir, red, green]| {
        nir * red / (green * green)
    }))
}

/// Normalized difference snow index (same ratio as MNDWI).
pub fn ndsi(set: &BandSet) -> Result<Vec<f32>> {
    Ok(normalized_difference(set.band(Green)?, set.band(Swir1)?))
}

pub fn nbr(set: &BandSet) -> Result<Vec<f32>> {
    Ok(normalized_difference(set.band(NarrowNir)?, set.band(Swir2)?))
}

pub fn sci(set: &BandSet) -> Result<Vec<f32>> {
    let bands = [
        set.band(Nir)?,
        set.band(Red)?,
        set.band(Green)?,
        set.band(Blue)?,
    ];
    Ok(elementwise(bands, |[nir, red, green, blue]| {
        3.0 * nir + red - green - 3.0 * blue
    }))
}

pub fn sm(set: &BandSet) -> Result<Vec<f32>> {
    Ok(elementwise([set.band(Nir)?, set.band(Blue)?], |[nir, blue]| nir / blue))
}

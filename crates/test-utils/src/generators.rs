//! Synthetic band generators.
//!
//! Values are Sentinel-2 L2A style digital numbers (reflectance * 10000),
//! returned as `f32` row-major grids so callers can wrap them in whatever
//! grid type they test.

/// Creates a test grid with predictable values.
///
/// Each cell value is calculated as: `col * 1000 + row`
///
/// # Example
///
/// ```
/// use test_utils::create_test_grid;
///
/// let grid = create_test_grid(10, 5);
/// assert_eq!(grid.len(), 50);
/// assert_eq!(grid[1], 1000.0); // col=1, row=0
/// assert_eq!(grid[10], 1.0);   // col=0, row=1
/// ```
pub fn create_test_grid(width: usize, height: usize) -> Vec<f32> {
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            data.push((col * 1000 + row) as f32);
        }
    }
    data
}

/// A grid where every cell holds the same digital number.
pub fn constant_band(width: usize, height: usize, dn: u16) -> Vec<f32> {
    vec![dn as f32; width * height]
}

/// Typical vegetated-surface digital number for a band code ("02", "8A", ...).
///
/// Unknown codes get a flat 1000 so tests never trip over a missing entry.
pub fn typical_dn(code: &str) -> u16 {
    match code {
        "02" => 500,
        "03" => 800,
        "04" => 600,
        "08" => 3000,
        "8A" => 2900,
        "11" => 1800,
        "12" => 1000,
        _ => 1000,
    }
}

/// A deterministic, spatially varying band for `code`.
///
/// Cell value: `typical_dn(code) + col * 10 + row`. Distinct bands never
/// produce identical grids, and every value is positive.
pub fn synthetic_band(code: &str, width: usize, height: usize) -> Vec<f32> {
    let base = typical_dn(code) as usize;
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            data.push((base + col * 10 + row) as f32);
        }
    }
    data
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_test_grid() {
        let grid = create_test_grid(3, 2);
        assert_eq!(grid, vec![0.0, 1000.0, 2000.0, 1.0, 1001.0, 2001.0]);
    }

    #[test]
    fn test_synthetic_bands_differ() {
        let red = synthetic_band("04", 4, 4);
        let nir = synthetic_band("08", 4, 4);
        assert_eq!(red.len(), 16);
        assert_eq!(red[0], 600.0);
        assert_eq!(red[5], 611.0); // col=1, row=1
        assert!(red.iter().zip(&nir).all(|(r, n)| n > r));
    }

    #[test]
    fn test_constant_band() {
        assert!(constant_band(2, 3, 42).iter().all(|&v| v == 42.0));
    }
}

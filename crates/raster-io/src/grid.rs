//! In-memory raster grids.

use rayon::prelude::*;

use crate::error::{RasterError, Result};

/// A single-band grid of values in row-major order (top row first).
#[derive(Debug, Clone, PartialEq)]
pub struct RasterGrid {
    data: Vec<f32>,
    width: usize,
    height: usize,
}

impl RasterGrid {
    /// Create a new grid, checking that `data` holds `width * height` values.
    pub fn new(data: Vec<f32>, width: usize, height: usize) -> Result<Self> {
        if data.len() != width * height {
            return Err(RasterError::ShapeMismatch {
                expected: (width, height),
                actual: (data.len(), 1),
            });
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// Create a grid where every cell holds `value`.
    pub fn filled(value: f32, width: usize, height: usize) -> Self {
        Self {
            data: vec![value; width * height],
            width,
            height,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// (width, height)
    pub fn shape(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Get the value at a specific grid coordinate.
    pub fn get(&self, col: usize, row: usize) -> Option<f32> {
        if col >= self.width || row >= self.height {
            return None;
        }
        self.data.get(row * self.width + col).copied()
    }

    /// Get the total number of cells.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Divide every cell by `factor` (digital numbers to reflectance).
    pub fn rescale(self, factor: f32) -> RasterGrid {
        let mut data = self.data;
        data.par_iter_mut().for_each(|v| *v /= factor);
        RasterGrid {
            data,
            width: self.width,
            height: self.height,
        }
    }

    /// Count cells that are NaN.
    pub fn nan_count(&self) -> usize {
        self.data.iter().filter(|v| v.is_nan()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_checks_length() {
        assert!(RasterGrid::new(vec![0.0; 6], 3, 2).is_ok());
        assert!(matches!(
            RasterGrid::new(vec![0.0; 5], 3, 2),
            Err(RasterError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_get_row_major() {
        let grid = RasterGrid::new(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], 3, 2).unwrap();
        assert_eq!(grid.get(0, 0), Some(1.0));
        assert_eq!(grid.get(2, 0), Some(3.0));
        assert_eq!(grid.get(0, 1), Some(4.0));
        assert_eq!(grid.get(3, 0), None);
        assert_eq!(grid.get(0, 2), None);
    }

    #[test]
    fn test_rescale() {
        let grid = RasterGrid::new(vec![10000.0, 2500.0, 0.0, 1.0], 2, 2).unwrap();
        let scaled = grid.rescale(10000.0);
        assert_eq!(scaled.data(), &[1.0, 0.25, 0.0, 0.0001]);
    }
}

//! Heightfield storage and sampling.
//!
//! A [`HeightField`] is a row-major grid of elevation samples, one sample per
//! integer grid unit. Terrain geometry borrows the sample slice while building
//! patch meshes and never keeps it past the build call.

pub mod loader;

pub use loader::{load_heightfield, HeightmapFormat};

use crate::error::{Result, TerrainError};

/// An immutable grid of height samples.
#[derive(Debug, Clone, PartialEq)]
pub struct HeightField {
    columns: usize,
    rows: usize,
    heights: Vec<f32>,
}

impl HeightField {
    /// Create a flat heightfield of the given size.
    pub fn new(columns: usize, rows: usize) -> Self {
        Self {
            columns,
            rows,
            heights: vec![0.0; columns * rows],
        }
    }

    /// Wrap existing row-major samples.
    pub fn from_heights(columns: usize, rows: usize, heights: Vec<f32>) -> Result<Self> {
        if heights.len() != columns * rows {
            return Err(TerrainError::InvalidHeightField(format!(
                "expected {} samples for {}x{}, got {}",
                columns * rows,
                columns,
                rows,
                heights.len()
            )));
        }
        Ok(Self {
            columns,
            rows,
            heights,
        })
    }

    /// Number of samples along X.
    pub fn columns(&self) -> usize {
        self.columns
    }

    /// Number of samples along Z.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// The raw row-major sample array.
    pub fn heights(&self) -> &[f32] {
        &self.heights
    }

    /// Read the sample at an integer grid coordinate.
    pub fn sample(&self, x: usize, z: usize) -> f32 {
        self.heights[z * self.columns + x]
    }

    /// Bilinearly interpolated height at a fractional grid position.
    ///
    /// Positions outside the grid are clamped to its edges.
    pub fn height(&self, column: f32, row: f32) -> f32 {
        if self.heights.is_empty() {
            return 0.0;
        }

        let max_column = (self.columns - 1) as f32;
        let max_row = (self.rows - 1) as f32;
        let column = column.clamp(0.0, max_column);
        let row = row.clamp(0.0, max_row);

        let x1 = column.floor() as usize;
        let z1 = row.floor() as usize;
        let x2 = x1 + 1;
        let z2 = z1 + 1;
        let x_factor = column - x1 as f32;
        let z_factor = row - z1 as f32;
        let x_factor_inv = 1.0 - x_factor;
        let z_factor_inv = 1.0 - z_factor;

        if x2 >= self.columns && z2 >= self.rows {
            self.sample(x1, z1)
        } else if x2 >= self.columns {
            self.sample(x1, z1) * z_factor_inv + self.sample(x1, z2) * z_factor
        } else if z2 >= self.rows {
            self.sample(x1, z1) * x_factor_inv + self.sample(x2, z1) * x_factor
        } else {
            self.sample(x1, z1) * x_factor_inv * z_factor_inv
                + self.sample(x1, z2) * x_factor_inv * z_factor
                + self.sample(x2, z2) * x_factor * z_factor
                + self.sample(x2, z1) * x_factor * z_factor_inv
        }
    }

    /// Smallest and largest sample.
    pub fn height_range(&self) -> (f32, f32) {
        self.heights
            .iter()
            .fold((f32::MAX, f32::MIN), |(lo, hi), &h| (lo.min(h), hi.max(h)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp() -> HeightField {
        // Heights increase by 1 per column and 10 per row.
        let mut heights = Vec::new();
        for z in 0..3 {
            for x in 0..4 {
                heights.push(x as f32 + 10.0 * z as f32);
            }
        }
        HeightField::from_heights(4, 3, heights).unwrap()
    }

    #[test]
    fn test_from_heights_checks_length() {
        assert!(HeightField::from_heights(2, 2, vec![0.0; 3]).is_err());
        assert!(HeightField::from_heights(2, 2, vec![0.0; 4]).is_ok());
    }

    #[test]
    fn test_exact_at_grid_points() {
        let field = ramp();
        for z in 0..3 {
            for x in 0..4 {
                assert_eq!(field.height(x as f32, z as f32), field.sample(x, z));
            }
        }
    }

    #[test]
    fn test_bilinear_midpoints() {
        let flat = HeightField::from_heights(2, 2, vec![0.0; 4]).unwrap();
        assert_eq!(flat.height(0.5, 0.5), 0.0);

        // Corners {0, 0, 2, 2}: varies along Z only.
        let slope = HeightField::from_heights(2, 2, vec![0.0, 0.0, 2.0, 2.0]).unwrap();
        assert!((slope.height(0.5, 0.5) - 1.0).abs() < 1e-6);
        assert!((slope.height(0.0, 0.5) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_clamps_out_of_range() {
        let field = ramp();
        assert_eq!(field.height(-5.0, -5.0), field.sample(0, 0));
        assert_eq!(field.height(100.0, 100.0), field.sample(3, 2));
        // Far edge interpolates along the remaining axis only.
        assert!((field.height(3.0, 0.5) - 8.0).abs() < 1e-6);
        assert!((field.height(2.5, 2.0) - 22.5).abs() < 1e-6);
    }

    #[test]
    fn test_height_range() {
        assert_eq!(ramp().height_range(), (0.0, 23.0));
    }
}

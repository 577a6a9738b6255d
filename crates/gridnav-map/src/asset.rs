//! Baked navigation grid asset schema

use glam::Vec3;
use gridnav_common::{Error, Result};
use serde::{Deserialize, Serialize};

/// A baked navigation grid, as produced by the offline bake tooling.
///
/// The grid stores walkability classification and slope at half the
/// height resolution: one area cell covers a 2x2 block of height cells.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridAsset {
    /// World-space origin of the grid (minimum corner)
    pub origin: Vec3,
    /// Number of cells along the x-axis (even, >= 2)
    pub xsize: i32,
    /// Number of cells along the z-axis (even, >= 2)
    pub zsize: i32,
    /// Edge length of one cell in world units
    pub square_size: f32,
    /// Area classification at half resolution, `(xsize/2) * (zsize/2)`
    /// entries. Values of -1 and 0 are reserved for unwalkable terrain.
    pub area_type: Vec<i8>,
    /// Corner heights at `(xsize + 1) * (zsize + 1)` resolution
    pub corner_height: Vec<f32>,
}

impl GridAsset {
    /// Creates a flat, uniformly classified asset
    pub fn flat(origin: Vec3, xsize: i32, zsize: i32, square_size: f32, area: i8) -> Self {
        let half = (xsize / 2) as usize * (zsize / 2) as usize;
        let corners = (xsize + 1) as usize * (zsize + 1) as usize;
        Self {
            origin,
            xsize,
            zsize,
            square_size,
            area_type: vec![area; half],
            corner_height: vec![0.0; corners],
        }
    }

    /// Validates dimensions and array lengths, failing fast on a
    /// malformed bake.
    pub fn validate(&self) -> Result<()> {
        if self.xsize < 2 || self.zsize < 2 {
            return Err(Error::InvalidMap(format!(
                "grid size {}x{} is below the 2x2 minimum",
                self.xsize, self.zsize
            )));
        }
        if self.xsize % 2 != 0 || self.zsize % 2 != 0 {
            return Err(Error::InvalidMap(format!(
                "grid size {}x{} must be even in both axes",
                self.xsize, self.zsize
            )));
        }
        if !(self.square_size > 0.0) {
            return Err(Error::InvalidMap(format!(
                "square size {} must be positive",
                self.square_size
            )));
        }

        let expected_half = (self.xsize / 2) as usize * (self.zsize / 2) as usize;
        if self.area_type.len() != expected_half {
            return Err(Error::InvalidMap(format!(
                "area type map has {} entries, expected {}",
                self.area_type.len(),
                expected_half
            )));
        }

        let expected_corners = (self.xsize + 1) as usize * (self.zsize + 1) as usize;
        if self.corner_height.len() != expected_corners {
            return Err(Error::InvalidMap(format!(
                "corner height map has {} entries, expected {}",
                self.corner_height.len(),
                expected_corners
            )));
        }

        Ok(())
    }
}

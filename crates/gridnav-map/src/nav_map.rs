//! Heightfield navigation map
//!
//! The map is a 2D grid of height cells with corner heights stored at
//! `(xsize + 1) * (zsize + 1)` resolution. Center heights, per-triangle
//! face normals and the half-resolution slope map are derived caches that
//! are recomputed over a dirty rectangle whenever corner heights change,
//! so reads never observe stale data.

use glam::{Vec2, Vec3};
use gridnav_common::{triangle_height, Error, Result};

use crate::GridAsset;

/// Area type values at or below this mark a cell as unwalkable
pub const AREA_UNWALKABLE: i8 = 0;

/// Dirty rectangle over full-resolution cells, inclusive bounds
#[derive(Debug, Clone, Copy)]
struct DirtyRect {
    xmin: i32,
    xmax: i32,
    zmin: i32,
    zmax: i32,
}

impl DirtyRect {
    fn grow(&mut self, x: i32, z: i32) {
        self.xmin = self.xmin.min(x);
        self.xmax = self.xmax.max(x);
        self.zmin = self.zmin.min(z);
        self.zmax = self.zmax.max(z);
    }
}

/// Heightfield navigation map
#[derive(Debug, Clone)]
pub struct NavMap {
    /// World-space origin (minimum corner)
    origin: Vec3,
    /// Number of cells along the x-axis
    xsize: i32,
    /// Number of cells along the z-axis
    zsize: i32,
    /// Cell edge length in world units
    square_size: f32,

    /// Corner heights, `(xsize + 1) * (zsize + 1)` entries
    corner_height: Vec<f32>,
    /// Area classification at half resolution
    area_type: Vec<i8>,

    /// Derived: height at each cell center
    center_height: Vec<f32>,
    /// Derived: two face normals per cell (upper-left then lower-right
    /// triangle)
    face_normal: Vec<Vec3>,
    /// Derived: face normals projected onto the ground plane
    face_normal_2d: Vec<Vec2>,
    /// Derived: normalized slope at half resolution, 0 = flat, 1 = vertical
    slope: Vec<f32>,

    /// Pending recompute region, grown by mutations
    dirty: Option<DirtyRect>,
}

impl NavMap {
    /// Creates a flat, uniformly walkable map. Runtime loads should go
    /// through [`NavMap::from_asset`]; this entry point exists for the
    /// bake tool.
    pub fn new(origin: Vec3, xsize: i32, zsize: i32, square_size: f32) -> Result<Self> {
        Self::from_asset(&GridAsset::flat(origin, xsize, zsize, square_size, 1))
    }

    /// Builds a map from a baked asset.
    pub fn from_asset(asset: &GridAsset) -> Result<Self> {
        asset.validate()?;

        let cells = (asset.xsize * asset.zsize) as usize;
        let half = asset.area_type.len();
        let mut map = Self {
            origin: asset.origin,
            xsize: asset.xsize,
            zsize: asset.zsize,
            square_size: asset.square_size,
            corner_height: asset.corner_height.clone(),
            area_type: asset.area_type.clone(),
            center_height: vec![0.0; cells],
            face_normal: vec![Vec3::Y; cells * 2],
            face_normal_2d: vec![Vec2::ZERO; cells * 2],
            slope: vec![0.0; half],
            dirty: None,
        };

        map.recompute_derived(0, asset.xsize - 1, 0, asset.zsize - 1);
        log::debug!(
            "loaded nav map {}x{} cells, square size {}",
            asset.xsize,
            asset.zsize,
            asset.square_size
        );
        Ok(map)
    }

    /// Exports the mutable state back into an asset (bake tool only).
    pub fn to_asset(&self) -> GridAsset {
        GridAsset {
            origin: self.origin,
            xsize: self.xsize,
            zsize: self.zsize,
            square_size: self.square_size,
            area_type: self.area_type.clone(),
            corner_height: self.corner_height.clone(),
        }
    }

    /// Grid origin in world space
    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    /// Cell count along the x-axis
    pub fn xsize(&self) -> i32 {
        self.xsize
    }

    /// Cell count along the z-axis
    pub fn zsize(&self) -> i32 {
        self.zsize
    }

    /// Cell edge length in world units
    pub fn square_size(&self) -> f32 {
        self.square_size
    }

    /// Half-resolution grid width
    pub fn half_xsize(&self) -> i32 {
        self.xsize / 2
    }

    /// Half-resolution grid height
    pub fn half_zsize(&self) -> i32 {
        self.zsize / 2
    }

    fn corner_index(&self, x: i32, z: i32) -> usize {
        (z * (self.xsize + 1) + x) as usize
    }

    /// Flat index of a full-resolution cell
    #[inline]
    pub fn cell_index(&self, x: i32, z: i32) -> usize {
        (z * self.xsize + x) as usize
    }

    /// Corner height at corner coordinates (bounds are
    /// `0..=xsize`, `0..=zsize`)
    pub fn corner_height_at(&self, x: i32, z: i32) -> f32 {
        let x = x.clamp(0, self.xsize);
        let z = z.clamp(0, self.zsize);
        self.corner_height[self.corner_index(x, z)]
    }

    /// Derived cell-center height
    pub fn center_height_at(&self, x: i32, z: i32) -> f32 {
        let (x, z) = self.clamp_cell(x, z);
        self.center_height[self.cell_index(x, z)]
    }

    /// Derived face normal of one cell triangle (`tri` 0 = upper-left,
    /// 1 = lower-right)
    pub fn face_normal_at(&self, x: i32, z: i32, tri: usize) -> Vec3 {
        let (x, z) = self.clamp_cell(x, z);
        self.face_normal[self.cell_index(x, z) * 2 + (tri & 1)]
    }

    /// Derived face normal projected onto the ground plane (debug
    /// overlays; points downhill for a tilted face)
    pub fn face_normal_2d_at(&self, x: i32, z: i32, tri: usize) -> Vec2 {
        let (x, z) = self.clamp_cell(x, z);
        self.face_normal_2d[self.cell_index(x, z) * 2 + (tri & 1)]
    }

    /// Area type of a half-resolution cell
    pub fn area_type_at(&self, hx: i32, hz: i32) -> i8 {
        let hx = hx.clamp(0, self.half_xsize() - 1);
        let hz = hz.clamp(0, self.half_zsize() - 1);
        self.area_type[(hz * self.half_xsize() + hx) as usize]
    }

    /// Area type under a full-resolution cell
    #[inline]
    pub fn area_type_at_cell(&self, x: i32, z: i32) -> i8 {
        self.area_type_at(x / 2, z / 2)
    }

    /// Slope of a half-resolution cell, 0 = flat, 1 = vertical
    pub fn slope_at(&self, hx: i32, hz: i32) -> f32 {
        let hx = hx.clamp(0, self.half_xsize() - 1);
        let hz = hz.clamp(0, self.half_zsize() - 1);
        self.slope[(hz * self.half_xsize() + hx) as usize]
    }

    /// Slope under a full-resolution cell
    #[inline]
    pub fn slope_at_cell(&self, x: i32, z: i32) -> f32 {
        self.slope_at(x / 2, z / 2)
    }

    /// Sets the area type of a half-resolution cell (bake tool only)
    pub fn set_area_type(&mut self, hx: i32, hz: i32, ty: i8) -> Result<()> {
        if hx < 0 || hx >= self.half_xsize() || hz < 0 || hz >= self.half_zsize() {
            return Err(Error::MapBake(format!(
                "area cell ({hx}, {hz}) out of bounds"
            )));
        }
        let idx = (hz * self.half_xsize() + hx) as usize;
        self.area_type[idx] = ty;
        Ok(())
    }

    /// Sets one corner height and marks the touching cells dirty (bake
    /// tool only). Call [`NavMap::flush_dirty`] before reading derived
    /// data.
    pub fn set_corner_height(&mut self, x: i32, z: i32, h: f32) -> Result<()> {
        if x < 0 || x > self.xsize || z < 0 || z > self.zsize {
            return Err(Error::MapBake(format!("corner ({x}, {z}) out of bounds")));
        }
        let idx = self.corner_index(x, z);
        self.corner_height[idx] = h;

        // A corner touches up to four cells
        let (cx0, cx1) = ((x - 1).max(0), x.min(self.xsize - 1));
        let (cz0, cz1) = ((z - 1).max(0), z.min(self.zsize - 1));
        match &mut self.dirty {
            Some(rect) => {
                rect.grow(cx0, cz0);
                rect.grow(cx1, cz1);
            }
            None => {
                self.dirty = Some(DirtyRect {
                    xmin: cx0,
                    xmax: cx1,
                    zmin: cz0,
                    zmax: cz1,
                });
            }
        }
        Ok(())
    }

    /// Recomputes derived caches for the pending dirty rectangle, if any
    pub fn flush_dirty(&mut self) {
        if let Some(rect) = self.dirty.take() {
            self.recompute_derived(rect.xmin, rect.xmax, rect.zmin, rect.zmax);
        }
    }

    /// Recomputes center heights, face normals and slope for the
    /// inclusive cell rectangle.
    pub fn recompute_derived(&mut self, xmin: i32, xmax: i32, zmin: i32, zmax: i32) {
        let xmin = xmin.clamp(0, self.xsize - 1);
        let xmax = xmax.clamp(0, self.xsize - 1);
        let zmin = zmin.clamp(0, self.zsize - 1);
        let zmax = zmax.clamp(0, self.zsize - 1);
        let ss = self.square_size;

        for z in zmin..=zmax {
            for x in xmin..=xmax {
                let h00 = self.corner_height[self.corner_index(x, z)];
                let h10 = self.corner_height[self.corner_index(x + 1, z)];
                let h01 = self.corner_height[self.corner_index(x, z + 1)];
                let h11 = self.corner_height[self.corner_index(x + 1, z + 1)];

                let idx = self.cell_index(x, z);
                self.center_height[idx] = (h00 + h10 + h01 + h11) * 0.25;

                // Upper-left triangle spans (h00, h10, h01)
                let n0 = Vec3::new((h00 - h10) * ss, ss * ss, (h00 - h01) * ss).normalize();
                // Lower-right triangle spans (h11, h10, h01)
                let n1 = Vec3::new((h01 - h11) * ss, ss * ss, (h10 - h11) * ss).normalize();

                self.face_normal[idx * 2] = n0;
                self.face_normal[idx * 2 + 1] = n1;
                self.face_normal_2d[idx * 2] = Vec2::new(n0.x, n0.z);
                self.face_normal_2d[idx * 2 + 1] = Vec2::new(n1.x, n1.z);
            }
        }

        // Refresh the half-resolution slope cells covering the rectangle
        for hz in (zmin / 2)..=(zmax / 2) {
            for hx in (xmin / 2)..=(xmax / 2) {
                self.recompute_slope(hx, hz);
            }
        }
    }

    /// Slope of one half-resolution cell from the face normals of the
    /// 2x2 full-resolution cells beneath it. The steepest face and the
    /// average face are blended as `mn + (avg - mn) * (mn / avg)` on the
    /// normal-y axis, then inverted so 0 is flat.
    fn recompute_slope(&mut self, hx: i32, hz: i32) {
        let mut mn = f32::MAX;
        let mut sum = 0.0;
        let mut count = 0;

        for dz in 0..2 {
            for dx in 0..2 {
                let x = hx * 2 + dx;
                let z = hz * 2 + dz;
                if x >= self.xsize || z >= self.zsize {
                    continue;
                }
                let idx = self.cell_index(x, z);
                for tri in 0..2 {
                    let ny = self.face_normal[idx * 2 + tri].y.clamp(0.0, 1.0);
                    mn = mn.min(ny);
                    sum += ny;
                    count += 1;
                }
            }
        }

        let slope = if count == 0 || mn >= 1.0 - 1e-6 {
            0.0
        } else {
            let avg = sum / count as f32;
            let blend = mn + (avg - mn) * (mn / avg);
            (1.0 - blend).clamp(0.0, 1.0)
        };
        let idx = (hz * self.half_xsize() + hx) as usize;
        self.slope[idx] = slope;
    }

    /// Interpolated terrain height at a world position.
    ///
    /// Queries outside the grid clamp to the edge. Each cell is split
    /// along the h10-h01 diagonal: local `dx + dz < 1` selects the
    /// upper-left triangle, anything else the lower-right one. The two
    /// planes agree along the seam, so the surface is continuous.
    pub fn height_at(&self, world_x: f32, world_z: f32) -> f32 {
        let fx = ((world_x - self.origin.x) / self.square_size)
            .clamp(0.0, self.xsize as f32 - 1e-4);
        let fz = ((world_z - self.origin.z) / self.square_size)
            .clamp(0.0, self.zsize as f32 - 1e-4);

        let cx = fx as i32;
        let cz = fz as i32;
        let dx = fx - cx as f32;
        let dz = fz - cz as f32;

        let h00 = self.corner_height[self.corner_index(cx, cz)];
        let h10 = self.corner_height[self.corner_index(cx + 1, cz)];
        let h01 = self.corner_height[self.corner_index(cx, cz + 1)];

        if dx + dz < 1.0 {
            triangle_height(h00, h10, h01, dx, dz)
        } else {
            let h11 = self.corner_height[self.corner_index(cx + 1, cz + 1)];
            triangle_height(h11, h01, h10, 1.0 - dx, 1.0 - dz)
        }
    }

    /// Full-resolution cell containing a world position, clamped to the
    /// grid bounds. Never fails on out-of-range input.
    pub fn cell_index_of(&self, pos: Vec3) -> (i32, i32) {
        let x = ((pos.x - self.origin.x) / self.square_size).floor() as i32;
        let z = ((pos.z - self.origin.z) / self.square_size).floor() as i32;
        self.clamp_cell(x, z)
    }

    /// Clamps cell coordinates into the grid
    #[inline]
    pub fn clamp_cell(&self, x: i32, z: i32) -> (i32, i32) {
        (x.clamp(0, self.xsize - 1), z.clamp(0, self.zsize - 1))
    }

    /// World position of a cell center, with terrain height
    pub fn center_pos(&self, x: i32, z: i32) -> Vec3 {
        let (x, z) = self.clamp_cell(x, z);
        let wx = self.origin.x + (x as f32 + 0.5) * self.square_size;
        let wz = self.origin.z + (z as f32 + 0.5) * self.square_size;
        Vec3::new(wx, self.height_at(wx, wz), wz)
    }

    /// Clamps a world position into the grid bounds and re-samples its
    /// height
    pub fn clamp_pos(&self, pos: Vec3) -> Vec3 {
        let eps = self.square_size * 1e-3;
        let x = pos.x.clamp(
            self.origin.x,
            self.origin.x + self.xsize as f32 * self.square_size - eps,
        );
        let z = pos.z.clamp(
            self.origin.z,
            self.origin.z + self.zsize as f32 * self.square_size - eps,
        );
        Vec3::new(x, self.height_at(x, z), z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp_map() -> NavMap {
        // 4x4 grid rising along x
        let mut map = NavMap::new(Vec3::ZERO, 4, 4, 1.0).unwrap();
        for z in 0..=4 {
            for x in 0..=4 {
                map.set_corner_height(x, z, x as f32).unwrap();
            }
        }
        map.flush_dirty();
        map
    }

    #[test]
    fn test_height_at_planar_ramp() {
        let map = ramp_map();
        // A plane is reproduced exactly everywhere
        for &(x, z) in &[(0.5, 0.5), (1.25, 2.75), (3.9, 0.1), (2.0, 2.0)] {
            assert!((map.height_at(x, z) - x).abs() < 1e-4, "at ({x}, {z})");
        }
    }

    #[test]
    fn test_height_at_continuous_across_diagonal_seam() {
        let mut map = NavMap::new(Vec3::ZERO, 4, 4, 1.0).unwrap();
        // Non-planar cell: raise a single corner
        map.set_corner_height(1, 1, 2.0).unwrap();
        map.flush_dirty();

        // Walk across the dx + dz = 1 seam of cell (0, 0)
        for i in 0..10 {
            let dx = 0.05 + i as f32 * 0.09;
            let dz = 1.0 - dx;
            let below = map.height_at(dx - 1e-4, dz - 1e-4);
            let above = map.height_at(dx + 1e-4, dz + 1e-4);
            assert!(
                (below - above).abs() < 1e-2,
                "seam discontinuity at dx={dx}: {below} vs {above}"
            );
        }
    }

    #[test]
    fn test_cell_index_of_clamps() {
        let map = NavMap::new(Vec3::ZERO, 4, 4, 1.0).unwrap();
        assert_eq!(map.cell_index_of(Vec3::new(-10.0, 0.0, -10.0)), (0, 0));
        assert_eq!(map.cell_index_of(Vec3::new(100.0, 0.0, 100.0)), (3, 3));
        assert_eq!(map.cell_index_of(Vec3::new(2.5, 0.0, 1.5)), (2, 1));
    }

    #[test]
    fn test_flat_map_slope_zero() {
        let map = NavMap::new(Vec3::ZERO, 4, 4, 1.0).unwrap();
        for hz in 0..2 {
            for hx in 0..2 {
                assert_eq!(map.slope_at(hx, hz), 0.0);
            }
        }
    }

    #[test]
    fn test_ramp_slope_positive_and_below_vertical() {
        let map = ramp_map();
        let s = map.slope_at(0, 0);
        assert!(s > 0.0 && s < 1.0, "slope {s}");
        // 45 degree ramp: normal y is 1/sqrt(2), slope = 1 - that
        let expected = 1.0 - std::f32::consts::FRAC_1_SQRT_2;
        assert!((s - expected).abs() < 1e-3, "slope {s} expected {expected}");
    }

    #[test]
    fn test_face_normal_2d_points_downhill() {
        let map = ramp_map();
        for tri in 0..2 {
            let n = map.face_normal_at(1, 1, tri);
            let n2 = map.face_normal_2d_at(1, 1, tri);
            assert!((n2.x - n.x).abs() < 1e-6 && (n2.y - n.z).abs() < 1e-6);
            // Rising along +x, so the normal tilts toward -x
            assert!(n2.x < 0.0);
            assert!(n2.y.abs() < 1e-6);
        }
    }

    #[test]
    fn test_derived_follow_corner_mutation() {
        let mut map = NavMap::new(Vec3::ZERO, 4, 4, 1.0).unwrap();
        assert_eq!(map.center_height_at(1, 1), 0.0);

        map.set_corner_height(2, 2, 4.0).unwrap();
        map.flush_dirty();
        assert!((map.center_height_at(1, 1) - 1.0).abs() < 1e-5);
        assert!(map.slope_at(0, 0) > 0.0);
    }

    #[test]
    fn test_half_resolution_mapping() {
        let mut map = NavMap::new(Vec3::ZERO, 4, 4, 1.0).unwrap();
        map.set_area_type(1, 0, AREA_UNWALKABLE).unwrap();
        // Half cell (1, 0) covers full cells (2..3, 0..1)
        assert_eq!(map.area_type_at_cell(2, 0), AREA_UNWALKABLE);
        assert_eq!(map.area_type_at_cell(3, 1), AREA_UNWALKABLE);
        assert_eq!(map.area_type_at_cell(1, 0), 1);
    }

    #[test]
    fn test_clamp_pos_bounds() {
        let map = NavMap::new(Vec3::new(1.0, 0.0, 1.0), 4, 4, 2.0).unwrap();
        let p = map.clamp_pos(Vec3::new(-50.0, 0.0, 50.0));
        assert!(p.x >= 1.0);
        assert!(p.z <= 9.0);
    }
}

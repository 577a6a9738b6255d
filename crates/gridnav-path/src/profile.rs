//! Movement profiles
//!
//! A profile captures everything about a unit class that the search and
//! the crowd need: footprint size, kinematic limits and per-terrain
//! speed modifiers. Profiles are cheap to clone; sliced searches keep
//! their own copy so an agent can be reconfigured mid-search without
//! corrupting the in-flight query.

use gridnav_map::NavMap;

/// Movement profile shared by the path engine and the crowd
#[derive(Debug, Clone)]
pub struct MoveProfile {
    /// Footprint diameter in full-resolution cells, at least 1
    pub unit_size: i32,
    /// Maximum speed in world units per second
    pub max_speed: f32,
    /// Acceleration limit in world units per second squared
    pub acceleration: f32,
    /// Deceleration limit in world units per second squared
    pub deceleration: f32,
    /// Maximum angular change in radians per second
    pub turn_rate: f32,
    /// Mass, used for avoidance responsibility weighting
    pub mass: f32,
    /// Push-resistant units hard-block everyone else
    pub push_resistant: bool,
    /// Team tag; cross-team occupiers hard-block
    pub team: u8,
    /// Speed multiplier per area type, indexed by area type value.
    /// Index 0 is the unwalkable area and is ignored.
    pub area_speed_mods: Vec<f32>,
    /// Slopes steeper than this are impassable, 0 = flat, 1 = vertical
    pub max_slope: f32,
    /// Slope cost factor; speed divides by `1 + slope * slope_mod`
    pub slope_mod: f32,
}

impl Default for MoveProfile {
    fn default() -> Self {
        Self {
            unit_size: 1,
            max_speed: 4.0,
            acceleration: 16.0,
            deceleration: 24.0,
            turn_rate: std::f32::consts::PI * 2.0,
            mass: 1.0,
            push_resistant: false,
            team: 0,
            area_speed_mods: vec![0.0, 1.0],
            max_slope: 0.5,
            slope_mod: 2.0,
        }
    }
}

impl MoveProfile {
    /// Speed modifier for a cell with the given area type and slope.
    /// Zero means the cell is impassable for this profile.
    pub fn speed_mod_at(&self, area: i8, slope: f32) -> f32 {
        if area <= 0 || slope > self.max_slope {
            return 0.0;
        }
        let area_mod = self
            .area_speed_mods
            .get(area as usize)
            .copied()
            .unwrap_or(0.0);
        if area_mod <= 0.0 {
            return 0.0;
        }
        area_mod / (1.0 + slope * self.slope_mod)
    }

    /// Speed modifier of one full-resolution map cell
    pub fn cell_speed_mod(&self, map: &NavMap, x: i32, z: i32) -> f32 {
        self.speed_mod_at(map.area_type_at_cell(x, z), map.slope_at_cell(x, z))
    }

    /// Inclusive footprint cell bounds `(xmin, xmax, zmin, zmax)` for a
    /// footprint centered on `(cx, cz)`. Even sizes bias toward the
    /// low corner.
    pub fn footprint(&self, cx: i32, cz: i32) -> (i32, i32, i32, i32) {
        let xmin = cx - self.unit_size / 2;
        let zmin = cz - self.unit_size / 2;
        (xmin, xmin + self.unit_size - 1, zmin, zmin + self.unit_size - 1)
    }

    /// Footprint radius in world units
    pub fn radius(&self, square_size: f32) -> f32 {
        self.unit_size as f32 * 0.5 * square_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_speed_mod_unwalkable_area() {
        let p = MoveProfile::default();
        assert_eq!(p.speed_mod_at(0, 0.0), 0.0);
        assert_eq!(p.speed_mod_at(-1, 0.0), 0.0);
    }

    #[test]
    fn test_speed_mod_slope_cutoff() {
        let p = MoveProfile {
            max_slope: 0.3,
            ..Default::default()
        };
        assert!(p.speed_mod_at(1, 0.2) > 0.0);
        assert_eq!(p.speed_mod_at(1, 0.31), 0.0);
    }

    #[test]
    fn test_speed_mod_slope_penalty() {
        let p = MoveProfile {
            slope_mod: 2.0,
            ..Default::default()
        };
        let flat = p.speed_mod_at(1, 0.0);
        let sloped = p.speed_mod_at(1, 0.25);
        assert!((flat - 1.0).abs() < 1e-6);
        assert!((sloped - 1.0 / 1.5).abs() < 1e-6);
    }

    #[test]
    fn test_footprint_bounds() {
        let p1 = MoveProfile::default();
        assert_eq!(p1.footprint(5, 7), (5, 5, 7, 7));

        let p3 = MoveProfile {
            unit_size: 3,
            ..Default::default()
        };
        assert_eq!(p3.footprint(5, 7), (4, 6, 6, 8));

        let p2 = MoveProfile {
            unit_size: 2,
            ..Default::default()
        };
        assert_eq!(p2.footprint(5, 7), (4, 5, 6, 7));
    }
}

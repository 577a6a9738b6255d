//! Grid line-of-sight
//!
//! Supercover traversal between two cells: the walk steps on whichever
//! axis has accumulated the larger error, and steps both axes at once
//! on a tie. A tied (diagonal) step additionally tests the two cells
//! adjacent to the crossed corner, so a diagonal gap between two
//! blocked cells never passes.

use gridnav_map::NavMap;

use crate::block::{AgentBlockView, OccupancySource};
use crate::profile::MoveProfile;
use crate::query::footprint_passable;

/// Result of a raycast between two cells
#[derive(Debug, Clone)]
pub struct RaycastResult {
    /// Cells crossed by the line, in order, starting at `from`. On a
    /// hit the sequence ends at the last passable cell.
    pub cells: Vec<(i32, i32)>,
    /// First blocking cell, `None` when the ray reached `to`
    pub hit: Option<(i32, i32)>,
}

impl RaycastResult {
    pub fn reached(&self) -> bool {
        self.hit.is_none()
    }
}

/// Walks the supercover line from `from` to `to`, testing every
/// crossed cell for passability.
pub fn raycast(
    map: &NavMap,
    profile: &MoveProfile,
    occupancy: &dyn OccupancySource,
    collider: &AgentBlockView,
    from: (i32, i32),
    to: (i32, i32),
) -> RaycastResult {
    let from = map.clamp_cell(from.0, from.1);
    let to = map.clamp_cell(to.0, to.1);

    let mut cells = vec![from];
    if !footprint_passable(map, profile, occupancy, collider, from.0, from.1) {
        return RaycastResult {
            cells: Vec::new(),
            hit: Some(from),
        };
    }

    let nx = (to.0 - from.0).abs();
    let nz = (to.1 - from.1).abs();
    let sx = (to.0 - from.0).signum();
    let sz = (to.1 - from.1).signum();

    let (mut x, mut z) = from;
    let mut ix = 0;
    let mut iz = 0;
    while ix < nx || iz < nz {
        // Error terms scaled to avoid fractions
        let err_x = (1 + 2 * ix) * nz;
        let err_z = (1 + 2 * iz) * nx;
        if err_x == err_z {
            // Diagonal step; the corner-adjacent cells must pass too
            if !footprint_passable(map, profile, occupancy, collider, x + sx, z)
                || !footprint_passable(map, profile, occupancy, collider, x, z + sz)
            {
                let hit = if !footprint_passable(map, profile, occupancy, collider, x + sx, z) {
                    (x + sx, z)
                } else {
                    (x, z + sz)
                };
                return RaycastResult { cells, hit: Some(hit) };
            }
            x += sx;
            z += sz;
            ix += 1;
            iz += 1;
        } else if err_x < err_z {
            x += sx;
            ix += 1;
        } else {
            z += sz;
            iz += 1;
        }

        if !footprint_passable(map, profile, occupancy, collider, x, z) {
            return RaycastResult {
                cells,
                hit: Some((x, z)),
            };
        }
        cells.push((x, z));
    }

    RaycastResult { cells, hit: None }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::NoOccupancy;
    use glam::Vec3;
    use gridnav_map::{NavMap, AREA_UNWALKABLE};

    fn view() -> AgentBlockView {
        AgentBlockView {
            id: 1,
            team: 0,
            push_resistant: false,
            is_moving: false,
            is_busy: false,
        }
    }

    fn cast(map: &NavMap, from: (i32, i32), to: (i32, i32)) -> RaycastResult {
        let profile = MoveProfile::default();
        raycast(map, &profile, &NoOccupancy, &view(), from, to)
    }

    #[test]
    fn test_axis_ray_crosses_every_cell() {
        let map = NavMap::new(Vec3::ZERO, 8, 8, 1.0).unwrap();
        let r = cast(&map, (0, 3), (6, 3));
        assert!(r.reached());
        assert_eq!(r.cells.len(), 7);
        assert_eq!(r.cells[0], (0, 3));
        assert_eq!(r.cells[6], (6, 3));
    }

    #[test]
    fn test_diagonal_ray() {
        let map = NavMap::new(Vec3::ZERO, 8, 8, 1.0).unwrap();
        let r = cast(&map, (0, 0), (5, 5));
        assert!(r.reached());
        // Pure diagonal visits exactly the diagonal cells
        assert_eq!(r.cells.len(), 6);
        for (i, &c) in r.cells.iter().enumerate() {
            assert_eq!(c, (i as i32, i as i32));
        }
    }

    #[test]
    fn test_supercover_includes_tie_neighbors() {
        let map = NavMap::new(Vec3::ZERO, 8, 8, 1.0).unwrap();
        // Shallow line: no exact ties, supercover visits nx + nz + 1 cells
        let r = cast(&map, (0, 0), (5, 2));
        assert!(r.reached());
        assert_eq!(r.cells.len(), 8);
    }

    #[test]
    fn test_blocked_cell_stops_ray() {
        let mut map = NavMap::new(Vec3::ZERO, 8, 8, 1.0).unwrap();
        map.set_area_type(1, 1, AREA_UNWALKABLE).unwrap(); // full cells (2..3, 2..3)
        let r = cast(&map, (0, 3), (6, 3));
        assert!(!r.reached());
        assert_eq!(r.hit, Some((2, 3)));
        assert_eq!(*r.cells.last().unwrap(), (1, 3));
    }

    #[test]
    fn test_corner_cut_rejected() {
        let mut map = NavMap::new(Vec3::ZERO, 8, 8, 1.0).unwrap();
        // Checker pair of blocked half-res cells touching at a corner:
        // (0,1) covers full (0..1, 2..3), (1,0) covers full (2..3, 0..1)
        map.set_area_type(0, 1, AREA_UNWALKABLE).unwrap();
        map.set_area_type(1, 0, AREA_UNWALKABLE).unwrap();
        // Diagonal through the shared corner at full cell (1,1)->(2,2)
        let r = cast(&map, (0, 0), (4, 4));
        assert!(!r.reached(), "corner cut must not pass");
    }
}

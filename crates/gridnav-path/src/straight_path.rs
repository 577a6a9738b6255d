//! Path simplification
//!
//! Turns a cell path into a short list of world-space waypoints. First
//! collinear runs collapse to their endpoints, then a greedy backward
//! pass deletes every turn point whose neighbors see each other through
//! [`raycast`]. O(n^2) over turn points; cell paths are short relative
//! to the grid.

use gridnav_common::Vec3;
use gridnav_map::NavMap;

use crate::block::{AgentBlockView, OccupancySource};
use crate::profile::MoveProfile;
use crate::raycast::raycast;

/// Drops interior cells of collinear runs
fn collapse_collinear(cells: &[(i32, i32)]) -> Vec<(i32, i32)> {
    if cells.len() <= 2 {
        return cells.to_vec();
    }
    let mut out = vec![cells[0]];
    for i in 1..cells.len() - 1 {
        let prev = out[out.len() - 1];
        let cur = cells[i];
        let next = cells[i + 1];
        let d0 = (cur.0 - prev.0, cur.1 - prev.1);
        let d1 = (next.0 - cur.0, next.1 - cur.1);
        // Cross product of the step directions; zero means no turn
        if d0.0 * d1.1 - d0.1 * d1.0 != 0 {
            out.push(cur);
        }
    }
    out.push(cells[cells.len() - 1]);
    out
}

/// Simplifies a cell path into world-space waypoints at cell centers.
pub fn find_straight_path(
    map: &NavMap,
    profile: &MoveProfile,
    occupancy: &dyn OccupancySource,
    collider: &AgentBlockView,
    cells: &[(i32, i32)],
) -> Vec<Vec3> {
    if cells.is_empty() {
        return Vec::new();
    }
    let mut turns = collapse_collinear(cells);

    // From the end backward, jump to the earliest turn point still in
    // line of sight and drop everything in between
    let mut i = turns.len() - 1;
    while i > 1 {
        let mut jump = None;
        for j in 0..i - 1 {
            if raycast(map, profile, occupancy, collider, turns[j], turns[i]).reached() {
                jump = Some(j);
                break;
            }
        }
        match jump {
            Some(j) => {
                turns.drain(j + 1..i);
                i = j;
            }
            None => i -= 1,
        }
    }

    turns
        .iter()
        .map(|&(x, z)| map.center_pos(x, z))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::NoOccupancy;
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

    #[test]
    fn test_collapse_collinear_runs() {
        let cells = [(0, 0), (1, 0), (2, 0), (3, 1), (4, 2), (5, 2)];
        let out = collapse_collinear(&cells);
        assert_eq!(out, vec![(0, 0), (2, 0), (4, 2), (5, 2)]);
    }

    #[test]
    fn test_straight_run_keeps_endpoints_only() {
        let map = NavMap::new(Vec3::ZERO, 8, 8, 1.0).unwrap();
        let cells: Vec<_> = (0..7).map(|x| (x, 3)).collect();
        let profile = MoveProfile::default();
        let wps = find_straight_path(&map, &profile, &NoOccupancy, &view(), &cells);
        assert_eq!(wps.len(), 2);
        assert!((wps[0].x - 0.5).abs() < 1e-5);
        assert!((wps[1].x - 6.5).abs() < 1e-5);
    }

    #[test]
    fn test_open_detour_is_shortcut_away() {
        // An L-shaped path across open ground collapses to its endpoints
        let map = NavMap::new(Vec3::ZERO, 8, 8, 1.0).unwrap();
        let mut cells: Vec<_> = (0..5).map(|x| (x, 0)).collect();
        cells.extend((1..5).map(|z| (4, z)));
        let profile = MoveProfile::default();
        let wps = find_straight_path(&map, &profile, &NoOccupancy, &view(), &cells);
        assert_eq!(wps.len(), 2);
    }

    #[test]
    fn test_wall_corner_is_kept() {
        let mut map = NavMap::new(Vec3::ZERO, 8, 8, 1.0).unwrap();
        // Block half cell (1,0): full cells (2..3, 0..1)
        map.set_area_type(1, 0, AREA_UNWALKABLE).unwrap();
        // Path around the block: along z=2 then down to z=0
        let cells = [
            (0, 0),
            (0, 1),
            (1, 2),
            (2, 2),
            (3, 2),
            (4, 2),
            (4, 1),
            (4, 0),
            (5, 0),
        ];
        let profile = MoveProfile::default();
        let wps = find_straight_path(&map, &profile, &NoOccupancy, &view(), &cells);
        // Endpoints cannot see each other, so at least one turn survives
        assert!(wps.len() >= 3);
        assert!((wps[0].x - 0.5).abs() < 1e-5);
        assert!((wps[wps.len() - 1].x - 5.5).abs() < 1e-5);
    }
}

//! Local obstacle boundary
//!
//! Collects the wall segments the avoidance pass feeds to
//! [`crate::OrcaQuery`]: edges between cells the profile can stand on
//! and cells it cannot, within a query range around the agent. Edges
//! are merged into maximal collinear runs, linked to their boundary
//! neighbors for the foreign-leg tests, and capped to the nearest few.
//! Segments are oriented with the blocked side on the left.

use glam::Vec2;
use gridnav_common::distance_point_segment_squared;
use gridnav_map::NavMap;
use gridnav_path::MoveProfile;

use crate::orca::ObstacleSegment;

/// Most segments handed to the solver per agent per tick
const MAX_OBSTACLE_SEGMENTS: usize = 8;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Orient {
    /// Edge along the z axis at grid line `line`
    Vertical,
    /// Edge along the x axis at grid line `line`
    Horizontal,
}

/// Merged run of boundary edges in cell coordinates
#[derive(Clone, Copy)]
struct Run {
    orient: Orient,
    line: i32,
    /// +1 walks the axis upward, -1 downward
    sign: i32,
    lo: i32,
    hi: i32,
}

fn blocked(map: &NavMap, profile: &MoveProfile, x: i32, z: i32) -> bool {
    if x < 0 || z < 0 || x >= map.xsize() || z >= map.zsize() {
        // The grid border clamps agents; it is not an obstacle
        return false;
    }
    profile.cell_speed_mod(map, x, z) <= 0.0
}

/// Collects the nearest obstacle segments around a world position.
pub fn collect_obstacle_segments(
    map: &NavMap,
    profile: &MoveProfile,
    pos: Vec2,
    range: f32,
) -> Vec<ObstacleSegment> {
    let ss = map.square_size();
    let origin = Vec2::new(map.origin().x, map.origin().z);
    let inv = 1.0 / ss;
    let xmin = (((pos.x - range) - origin.x) * inv).floor() as i32;
    let xmax = (((pos.x + range) - origin.x) * inv).floor() as i32;
    let zmin = (((pos.y - range) - origin.y) * inv).floor() as i32;
    let zmax = (((pos.y + range) - origin.y) * inv).floor() as i32;

    let mut runs: Vec<Run> = Vec::new();
    let mut add = |orient: Orient, line: i32, sign: i32, at: i32| {
        // Extend an existing collinear run when the new edge touches it
        for run in runs.iter_mut() {
            if run.orient == orient && run.line == line && run.sign == sign {
                if at == run.hi + 1 {
                    run.hi = at;
                    return;
                }
                if at == run.lo - 1 {
                    run.lo = at;
                    return;
                }
            }
        }
        runs.push(Run {
            orient,
            line,
            sign,
            lo: at,
            hi: at,
        });
    };

    for z in zmin.max(0)..=zmax.min(map.zsize() - 1) {
        for x in xmin.max(0)..=xmax.min(map.xsize() - 1) {
            if !blocked(map, profile, x, z) {
                continue;
            }
            if !blocked(map, profile, x + 1, z) && x + 1 < map.xsize() {
                add(Orient::Vertical, x + 1, 1, z);
            }
            if !blocked(map, profile, x - 1, z) && x > 0 {
                add(Orient::Vertical, x, -1, z);
            }
            if !blocked(map, profile, x, z + 1) && z + 1 < map.zsize() {
                add(Orient::Horizontal, z + 1, -1, x);
            }
            if !blocked(map, profile, x, z - 1) && z > 0 {
                add(Orient::Horizontal, z, 1, x);
            }
        }
    }

    // Runs to world-space segments, blocked side on the left
    let to_world = |cx: f32, cz: f32| origin + Vec2::new(cx, cz) * ss;
    let mut segments: Vec<ObstacleSegment> = runs
        .iter()
        .map(|run| {
            let (a, b) = match (run.orient, run.sign) {
                (Orient::Vertical, 1) => (
                    to_world(run.line as f32, run.lo as f32),
                    to_world(run.line as f32, run.hi as f32 + 1.0),
                ),
                (Orient::Vertical, _) => (
                    to_world(run.line as f32, run.hi as f32 + 1.0),
                    to_world(run.line as f32, run.lo as f32),
                ),
                (Orient::Horizontal, 1) => (
                    to_world(run.lo as f32, run.line as f32),
                    to_world(run.hi as f32 + 1.0, run.line as f32),
                ),
                (Orient::Horizontal, _) => (
                    to_world(run.hi as f32 + 1.0, run.line as f32),
                    to_world(run.lo as f32, run.line as f32),
                ),
            };
            ObstacleSegment::standalone(a, b)
        })
        .collect();

    // Link runs sharing endpoints so leg projections know their
    // boundary neighbors
    let eps = ss * 1e-3;
    for i in 0..segments.len() {
        for j in 0..segments.len() {
            if i == j {
                continue;
            }
            if segments[j].p2.distance_squared(segments[i].p1) < eps * eps {
                segments[i].prev_dir = segments[j].unit_dir();
            }
            if segments[j].p1.distance_squared(segments[i].p2) < eps * eps {
                segments[i].next_dir = segments[j].unit_dir();
            }
        }
    }

    segments.sort_by(|a, b| {
        let da = distance_point_segment_squared(pos, a.p1, a.p2);
        let db = distance_point_segment_squared(pos, b.p1, b.p2);
        da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
    });
    segments.truncate(MAX_OBSTACLE_SEGMENTS);
    segments
}

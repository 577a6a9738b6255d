//! Footprint occupancy index
//!
//! Maps full-resolution cells to the agents whose footprints overlap
//! them. It is a candidate-query structure, not a lock: several agents
//! may legitimately share a cell and blocking is decided elsewhere.
//!
//! Invariant: an agent's registered cells always match its last
//! committed footprint. Any position change goes through
//! [`OccupancyIndex::move_agent`], which removes the old footprint and
//! reinserts the new one in one call.

use std::collections::HashMap;

use glam::Vec2;
use gridnav_path::AgentId;

/// Inclusive footprint cell bounds
pub type Footprint = (i32, i32, i32, i32);

/// Cell to agent-set index over footprints
pub struct OccupancyIndex {
    xsize: i32,
    zsize: i32,
    origin: Vec2,
    square_size: f32,
    cells: HashMap<usize, Vec<AgentId>>,
    /// Committed footprint per agent, for matched remove
    committed: HashMap<AgentId, Footprint>,
}

impl OccupancyIndex {
    pub fn new(xsize: i32, zsize: i32, origin: Vec2, square_size: f32) -> Self {
        Self {
            xsize,
            zsize,
            origin,
            square_size,
            cells: HashMap::new(),
            committed: HashMap::new(),
        }
    }

    fn cell_key(&self, x: i32, z: i32) -> usize {
        (z * self.xsize + x) as usize
    }

    /// Footprint as the index commits it, clamped into the grid.
    /// Callers comparing against [`OccupancyIndex::footprint_of`] must
    /// clamp first or a border-hugging footprint never matches.
    pub fn clamp_footprint(&self, fp: Footprint) -> Footprint {
        (
            fp.0.clamp(0, self.xsize - 1),
            fp.1.clamp(0, self.xsize - 1),
            fp.2.clamp(0, self.zsize - 1),
            fp.3.clamp(0, self.zsize - 1),
        )
    }

    /// Registers an agent's footprint. The agent must not already be
    /// registered.
    pub fn insert(&mut self, id: AgentId, footprint: Footprint) {
        debug_assert!(
            !self.committed.contains_key(&id),
            "agent {id} inserted twice"
        );
        let fp = self.clamp_footprint(footprint);
        for z in fp.2..=fp.3 {
            for x in fp.0..=fp.1 {
                self.cells.entry(self.cell_key(x, z)).or_default().push(id);
            }
        }
        self.committed.insert(id, fp);
    }

    /// Deregisters an agent from every cell of its committed footprint
    pub fn remove(&mut self, id: AgentId) {
        let Some(fp) = self.committed.remove(&id) else {
            debug_assert!(false, "agent {id} removed without insert");
            return;
        };
        for z in fp.2..=fp.3 {
            for x in fp.0..=fp.1 {
                let key = self.cell_key(x, z);
                if let Some(list) = self.cells.get_mut(&key) {
                    list.retain(|&a| a != id);
                    if list.is_empty() {
                        self.cells.remove(&key);
                    }
                }
            }
        }
    }

    /// Remove-then-reinsert as one operation
    pub fn move_agent(&mut self, id: AgentId, footprint: Footprint) {
        self.remove(id);
        self.insert(id, footprint);
    }

    /// Agents overlapping one cell
    pub fn query_cell(&self, x: i32, z: i32) -> &[AgentId] {
        if x < 0 || z < 0 || x >= self.xsize || z >= self.zsize {
            return &[];
        }
        self.cells
            .get(&self.cell_key(x, z))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Candidate agents near a world position. Scans the cell range
    /// covering the circle, so edge false positives are expected;
    /// callers filter by exact distance.
    pub fn query_radius(&self, pos: Vec2, radius: f32) -> Vec<AgentId> {
        let inv = 1.0 / self.square_size;
        let xmin = (((pos.x - radius) - self.origin.x) * inv).floor() as i32;
        let xmax = (((pos.x + radius) - self.origin.x) * inv).floor() as i32;
        let zmin = (((pos.y - radius) - self.origin.y) * inv).floor() as i32;
        let zmax = (((pos.y + radius) - self.origin.y) * inv).floor() as i32;

        let mut out = Vec::new();
        for z in zmin.max(0)..=zmax.min(self.zsize - 1) {
            for x in xmin.max(0)..=xmax.min(self.xsize - 1) {
                for &id in self.query_cell(x, z) {
                    if !out.contains(&id) {
                        out.push(id);
                    }
                }
            }
        }
        out
    }

    /// Committed footprint of an agent, if registered
    pub fn footprint_of(&self, id: AgentId) -> Option<Footprint> {
        self.committed.get(&id).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index() -> OccupancyIndex {
        OccupancyIndex::new(16, 16, Vec2::ZERO, 1.0)
    }

    #[test]
    fn test_insert_covers_exact_footprint() {
        let mut idx = index();
        idx.insert(1, (2, 4, 3, 5));
        for z in 3..=5 {
            for x in 2..=4 {
                assert_eq!(idx.query_cell(x, z), &[1]);
            }
        }
        assert!(idx.query_cell(1, 3).is_empty());
        assert!(idx.query_cell(5, 3).is_empty());
        assert!(idx.query_cell(2, 6).is_empty());
    }

    #[test]
    fn test_remove_clears_every_cell() {
        let mut idx = index();
        idx.insert(1, (2, 4, 3, 5));
        idx.remove(1);
        for z in 0..16 {
            for x in 0..16 {
                assert!(idx.query_cell(x, z).is_empty());
            }
        }
        assert!(idx.footprint_of(1).is_none());
    }

    #[test]
    fn test_shared_cells() {
        let mut idx = index();
        idx.insert(1, (2, 3, 2, 3));
        idx.insert(2, (3, 4, 3, 4));
        assert_eq!(idx.query_cell(3, 3), &[1, 2]);
        idx.remove(1);
        assert_eq!(idx.query_cell(3, 3), &[2]);
    }

    #[test]
    fn test_move_agent_is_exact() {
        let mut idx = index();
        idx.insert(1, (0, 0, 0, 0));
        idx.move_agent(1, (5, 5, 5, 5));
        assert!(idx.query_cell(0, 0).is_empty());
        assert_eq!(idx.query_cell(5, 5), &[1]);
        assert_eq!(idx.footprint_of(1), Some((5, 5, 5, 5)));
    }

    #[test]
    fn test_border_footprint_commits_clamped() {
        let mut idx = index();
        // A wide footprint hanging over the border commits clamped, so
        // comparing committed state against the clamped raw footprint
        // is stable across ticks
        let raw = (-1, 1, -1, 1);
        idx.insert(1, raw);
        assert_eq!(idx.footprint_of(1), Some((0, 1, 0, 1)));
        assert_eq!(idx.footprint_of(1), Some(idx.clamp_footprint(raw)));
    }

    #[test]
    fn test_query_radius_candidates() {
        let mut idx = index();
        idx.insert(1, (2, 2, 2, 2));
        idx.insert(2, (10, 10, 10, 10));
        let near = idx.query_radius(Vec2::new(2.5, 2.5), 2.0);
        assert!(near.contains(&1));
        assert!(!near.contains(&2));
    }
}

//! A* path queries
//!
//! One [`PathQuery`] holds the node arena and open list for a single
//! agent. The synchronous entry point is a sliced search driven to
//! completion with an unbounded budget, so both modes share one
//! expansion loop and return identical paths by construction.
//!
//! Soft occupiers (`Moving`/`Idle`/`Busy`) scale edge cost instead of
//! rejecting cells; only `Blocked` invalidates a cell.

use glam::Vec2;
use gridnav_map::NavMap;

use crate::block::{test_block_type, AgentBlockView, BlockType, OccupancySource};
use crate::node_arena::{HeapNode, NodeArena, NodeState, OpenList};
use crate::profile::MoveProfile;
use crate::status::{PathResult, PathStatus, SlicedPathState};

const SQRT2: f32 = std::f32::consts::SQRT_2;

/// Cost multipliers for cells holding soft occupiers
const COST_MULT_MOVING: f32 = 3.0;
const COST_MULT_IDLE: f32 = 2.0;
const COST_MULT_BUSY: f32 = 5.0;

/// Neighbor offsets, axis moves first
const NEIGHBORS: [(i32, i32); 8] = [
    (1, 0),
    (-1, 0),
    (0, 1),
    (0, -1),
    (1, 1),
    (1, -1),
    (-1, 1),
    (-1, -1),
];

/// Minimum footprint speed modifier; zero means some footprint cell is
/// impassable for the profile or outside the grid.
pub fn footprint_speed_mod(map: &NavMap, profile: &MoveProfile, cx: i32, cz: i32) -> f32 {
    let (xmin, xmax, zmin, zmax) = profile.footprint(cx, cz);
    if xmin < 0 || zmin < 0 || xmax >= map.xsize() || zmax >= map.zsize() {
        return 0.0;
    }
    let mut mn = f32::MAX;
    for z in zmin..=zmax {
        for x in xmin..=xmax {
            let m = profile.cell_speed_mod(map, x, z);
            if m <= 0.0 {
                return 0.0;
            }
            mn = mn.min(m);
        }
    }
    mn
}

/// True when every footprint cell is terrain-passable for the profile
pub fn footprint_walkable(map: &NavMap, profile: &MoveProfile, cx: i32, cz: i32) -> bool {
    footprint_speed_mod(map, profile, cx, cz) > 0.0
}

/// Worst block type over all occupiers of the footprint
pub fn footprint_block(
    map: &NavMap,
    profile: &MoveProfile,
    occupancy: &dyn OccupancySource,
    collider: &AgentBlockView,
    cx: i32,
    cz: i32,
) -> BlockType {
    let (xmin, xmax, zmin, zmax) = profile.footprint(cx, cz);
    let mut worst = BlockType::None;
    for z in zmin.max(0)..=zmax.min(map.zsize() - 1) {
        for x in xmin.max(0)..=xmax.min(map.xsize() - 1) {
            occupancy.for_each_occupier(x, z, &mut |occ| {
                worst = worst.max(test_block_type(collider, occ));
            });
            if worst == BlockType::Blocked {
                return worst;
            }
        }
    }
    worst
}

/// True when the footprint is terrain-passable and free of hard
/// blockers. Search and raycast share this notion, so a path the
/// search accepts is never refused by the smoothing raycast.
pub fn footprint_passable(
    map: &NavMap,
    profile: &MoveProfile,
    occupancy: &dyn OccupancySource,
    collider: &AgentBlockView,
    cx: i32,
    cz: i32,
) -> bool {
    footprint_speed_mod(map, profile, cx, cz) > 0.0
        && footprint_block(map, profile, occupancy, collider, cx, cz) != BlockType::Blocked
}

fn block_cost_mult(block: BlockType) -> f32 {
    match block {
        BlockType::None => 1.0,
        BlockType::Moving => COST_MULT_MOVING,
        BlockType::Idle => COST_MULT_IDLE,
        BlockType::Busy => COST_MULT_BUSY,
        BlockType::Blocked => f32::INFINITY,
    }
}

/// Octile distance in cells
fn octile(a: (i32, i32), b: (i32, i32)) -> f32 {
    let dx = (a.0 - b.0).abs() as f32;
    let dz = (a.1 - b.1).abs() as f32;
    dx.max(dz) + (SQRT2 - 1.0) * dx.min(dz)
}

struct SlicedSearch {
    profile: MoveProfile,
    collider: AgentBlockView,
    goal: (i32, i32),
    /// Midpoint of start and goal in cell coordinates
    center: Vec2,
    /// Squared search radius in cells; infinite when unconstrained
    radius_sq: f32,
    best_cell: u32,
    best_h: f32,
    state: SlicedPathState,
    xsize: i32,
}

/// Reusable per-agent path query
pub struct PathQuery {
    arena: NodeArena,
    open: OpenList,
    sliced: Option<SlicedSearch>,
}

impl Default for PathQuery {
    fn default() -> Self {
        Self::new()
    }
}

impl PathQuery {
    pub fn new() -> Self {
        Self {
            arena: NodeArena::new(),
            open: OpenList::new(),
            sliced: None,
        }
    }

    /// Synchronous search, equivalent to a sliced search driven to
    /// completion in one call.
    pub fn find_path(
        &mut self,
        map: &NavMap,
        occupancy: &dyn OccupancySource,
        collider: &AgentBlockView,
        profile: &MoveProfile,
        start: (i32, i32),
        goal: (i32, i32),
    ) -> PathResult {
        let state = self.init_sliced_find_path(map, occupancy, collider, profile, start, goal, None);
        if state == SlicedPathState::InProgress {
            self.update_sliced_find_path(map, occupancy, usize::MAX);
        }
        self.finalize_sliced_find_path()
    }

    /// Begins a resumable search. `search_radius` (world units) bounds
    /// expansion to an ellipse-like disc around the start-goal
    /// midpoint; cells beyond it are never expanded, so callers must
    /// size it generously or distant goals degrade to partial paths.
    #[allow(clippy::too_many_arguments)]
    pub fn init_sliced_find_path(
        &mut self,
        map: &NavMap,
        occupancy: &dyn OccupancySource,
        collider: &AgentBlockView,
        profile: &MoveProfile,
        start: (i32, i32),
        goal: (i32, i32),
        search_radius: Option<f32>,
    ) -> SlicedPathState {
        let start = map.clamp_cell(start.0, start.1);
        let goal = map.clamp_cell(goal.0, goal.1);

        let cell_count = (map.xsize() * map.zsize()) as usize;
        self.arena.begin_search(cell_count);
        self.open.clear();

        let radius_sq = match search_radius {
            Some(r) => {
                let cells = r / map.square_size();
                cells * cells
            }
            None => f32::INFINITY,
        };

        let mut search = SlicedSearch {
            profile: profile.clone(),
            collider: *collider,
            goal,
            center: Vec2::new(
                (start.0 + goal.0) as f32 * 0.5,
                (start.1 + goal.1) as f32 * 0.5,
            ),
            radius_sq,
            best_cell: map.cell_index(start.0, start.1) as u32,
            best_h: octile(start, goal),
            state: SlicedPathState::InProgress,
            xsize: map.xsize(),
        };

        if footprint_speed_mod(map, profile, start.0, start.1) <= 0.0
            || footprint_block(map, profile, occupancy, collider, start.0, start.1)
                == BlockType::Blocked
        {
            log::debug!("path search rejected, start cell {start:?} not passable");
            search.state = SlicedPathState::Failed;
            self.sliced = Some(search);
            return SlicedPathState::Failed;
        }

        let start_idx = map.cell_index(start.0, start.1);
        let node = self.arena.node_mut(start_idx);
        node.clear_parent();
        node.cost = 0.0;
        node.total = search.best_h * map.square_size();
        node.state = NodeState::Open;
        self.open.push(HeapNode {
            total: node.total,
            cell: start_idx as u32,
        });

        let state = if start == goal {
            search.best_cell = start_idx as u32;
            search.state = SlicedPathState::Success;
            SlicedPathState::Success
        } else {
            SlicedPathState::InProgress
        };
        self.sliced = Some(search);
        state
    }

    /// Advances the search by at most `max_nodes` expansions. Returns
    /// the number of nodes expended and the new state.
    pub fn update_sliced_find_path(
        &mut self,
        map: &NavMap,
        occupancy: &dyn OccupancySource,
        max_nodes: usize,
    ) -> (usize, SlicedPathState) {
        let Some(search) = self.sliced.as_mut() else {
            return (0, SlicedPathState::Failed);
        };
        if search.state != SlicedPathState::InProgress {
            return (0, search.state);
        }

        let square_size = map.square_size();
        let mut expended = 0usize;

        while expended < max_nodes {
            let Some(top) = self.open.pop() else {
                // Reachable set exhausted; best node carries the result
                search.state = SlicedPathState::Partial;
                break;
            };
            let cell = top.cell as usize;
            if self.arena.state(cell) != NodeState::Open {
                continue; // stale heap entry
            }
            let cost = {
                let node = self.arena.node_mut(cell);
                node.state = NodeState::Closed;
                node.cost
            };
            expended += 1;

            let cx = cell as i32 % search.xsize;
            let cz = cell as i32 / search.xsize;
            if (cx, cz) == search.goal {
                search.best_cell = cell as u32;
                search.state = SlicedPathState::Success;
                break;
            }

            for (i, &(dx, dz)) in NEIGHBORS.iter().enumerate() {
                let nx = cx + dx;
                let nz = cz + dz;
                if nx < 0 || nz < 0 || nx >= map.xsize() || nz >= map.zsize() {
                    continue;
                }
                let diagonal = i >= 4;
                if diagonal {
                    // No corner cutting: both axis cells must pass
                    if !footprint_passable(
                        map,
                        &search.profile,
                        occupancy,
                        &search.collider,
                        cx + dx,
                        cz,
                    ) || !footprint_passable(
                        map,
                        &search.profile,
                        occupancy,
                        &search.collider,
                        cx,
                        cz + dz,
                    ) {
                        continue;
                    }
                }

                let offset = Vec2::new(nx as f32, nz as f32) - search.center;
                if offset.length_squared() > search.radius_sq {
                    continue;
                }

                let speed_mod = footprint_speed_mod(map, &search.profile, nx, nz);
                if speed_mod <= 0.0 {
                    continue;
                }
                let block = footprint_block(
                    map,
                    &search.profile,
                    occupancy,
                    &search.collider,
                    nx,
                    nz,
                );
                if block == BlockType::Blocked {
                    continue;
                }

                let base = if diagonal {
                    square_size * SQRT2
                } else {
                    square_size
                };
                let step = base / speed_mod * block_cost_mult(block);
                let next_cost = cost + step;
                let ncell = map.cell_index(nx, nz);

                let node = self.arena.node_mut(ncell);
                if node.state != NodeState::New && next_cost >= node.cost {
                    continue;
                }
                node.set_parent(cell as u32);
                node.cost = next_cost;
                let h = octile((nx, nz), search.goal);
                node.total = next_cost + h * square_size;
                node.state = NodeState::Open;
                let total = node.total;
                self.open.push(HeapNode {
                    total,
                    cell: ncell as u32,
                });

                if h < search.best_h {
                    search.best_h = h;
                    search.best_cell = ncell as u32;
                }
            }
        }

        (expended, search.state)
    }

    /// Walks parent links back from the best node and reverses into an
    /// ordered start-to-end path. Ends the sliced search.
    pub fn finalize_sliced_find_path(&mut self) -> PathResult {
        let Some(search) = self.sliced.take() else {
            return PathResult::failed();
        };
        if search.state == SlicedPathState::Failed {
            return PathResult::failed();
        }

        let mut cells = Vec::new();
        let mut cell = search.best_cell as usize;
        let cost = self.arena.node(cell).map(|n| n.cost).unwrap_or(0.0);
        loop {
            cells.push((cell as i32 % search.xsize, cell as i32 / search.xsize));
            match self.arena.node(cell) {
                Some(node) if node.has_parent() => cell = node.parent as usize,
                _ => break,
            }
        }
        cells.reverse();
        self.open.clear();

        let status = match search.state {
            SlicedPathState::Success => PathStatus::Complete,
            _ => PathStatus::Partial,
        };
        log::debug!(
            "path finalized to {:?}: {} cells, cost {cost:.2}, {status:?}",
            search.goal,
            cells.len()
        );
        PathResult {
            status,
            cells,
            cost,
        }
    }

    /// Abandons an in-flight sliced search
    pub fn cancel_sliced_find_path(&mut self) {
        self.sliced = None;
        self.open.clear();
    }

    pub fn sliced_state(&self) -> Option<SlicedPathState> {
        self.sliced.as_ref().map(|s| s.state)
    }
}

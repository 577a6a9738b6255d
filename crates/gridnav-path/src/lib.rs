//! Path query engine for gridnav maps
//!
//! A* search over the full-resolution cell grid with synchronous and
//! sliced (budget-limited, resumable) modes, supercover raycasting and
//! straight-path simplification. Dynamic blockers are consulted through
//! the [`OccupancySource`] seam so the engine stays independent of the
//! crowd simulation that feeds it.

mod block;
mod node_arena;
mod profile;
mod query;
mod raycast;
mod request_queue;
mod status;
mod straight_path;

pub use block::{test_block_type, AgentBlockView, AgentId, BlockType, NoOccupancy, OccupancySource};
pub use profile::MoveProfile;
pub use query::{footprint_block, footprint_passable, footprint_walkable, PathQuery};
pub use raycast::{raycast, RaycastResult};
pub use request_queue::{PathRequestHandle, PathRequestQueue, RequestStatus};
pub use status::{PathResult, PathStatus, SlicedPathState};
pub use straight_path::find_straight_path;

//! Dynamic blocking rules
//!
//! The path engine never looks at live agents directly. The crowd (or a
//! test) exposes occupiers per cell through [`OccupancySource`], and the
//! engine classifies each collider/collidee pair with
//! [`test_block_type`]. Only `Blocked` rejects a cell; the softer kinds
//! feed cost penalties.

/// Agent identifier, allocated by the crowd
pub type AgentId = u32;

/// Blocking severity, ascending. Ordering is used to aggregate the
/// worst occupier of a footprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum BlockType {
    /// No interaction (same agent or empty cell)
    None,
    /// Collidee is on the move; soft, expected to clear
    Moving,
    /// Collidee is stationary with no active order
    Idle,
    /// Collidee has an active non-idle move state
    Busy,
    /// Hard block; the cell is invalid for the collider
    Blocked,
}

/// Snapshot of the blocking-relevant fields of one agent
#[derive(Debug, Clone, Copy)]
pub struct AgentBlockView {
    pub id: AgentId,
    pub team: u8,
    pub push_resistant: bool,
    pub is_moving: bool,
    pub is_busy: bool,
}

/// Classifies how `collidee` blocks `collider`.
pub fn test_block_type(collider: &AgentBlockView, collidee: &AgentBlockView) -> BlockType {
    if collider.id == collidee.id {
        return BlockType::None;
    }
    if collidee.is_moving {
        return BlockType::Moving;
    }
    if collidee.push_resistant || collider.team != collidee.team {
        return BlockType::Blocked;
    }
    if collidee.is_busy {
        return BlockType::Busy;
    }
    BlockType::Idle
}

/// Source of per-cell occupier snapshots
pub trait OccupancySource {
    /// Invokes `f` once per agent occupying the full-resolution cell
    fn for_each_occupier(&self, x: i32, z: i32, f: &mut dyn FnMut(&AgentBlockView));
}

/// Empty occupancy for standalone path queries
pub struct NoOccupancy;

impl OccupancySource for NoOccupancy {
    fn for_each_occupier(&self, _x: i32, _z: i32, _f: &mut dyn FnMut(&AgentBlockView)) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view(id: AgentId) -> AgentBlockView {
        AgentBlockView {
            id,
            team: 0,
            push_resistant: false,
            is_moving: false,
            is_busy: false,
        }
    }

    #[test]
    fn test_same_agent_never_blocks() {
        let a = view(1);
        assert_eq!(test_block_type(&a, &a), BlockType::None);
    }

    #[test]
    fn test_moving_collidee_is_soft() {
        let a = view(1);
        let b = AgentBlockView {
            is_moving: true,
            push_resistant: true,
            ..view(2)
        };
        // Moving takes precedence over push resistance
        assert_eq!(test_block_type(&a, &b), BlockType::Moving);
    }

    #[test]
    fn test_push_resistant_blocks() {
        let a = view(1);
        let b = AgentBlockView {
            push_resistant: true,
            ..view(2)
        };
        assert_eq!(test_block_type(&a, &b), BlockType::Blocked);
    }

    #[test]
    fn test_cross_team_blocks() {
        let a = view(1);
        let b = AgentBlockView { team: 3, ..view(2) };
        assert_eq!(test_block_type(&a, &b), BlockType::Blocked);
    }

    #[test]
    fn test_busy_then_idle() {
        let a = view(1);
        let busy = AgentBlockView {
            is_busy: true,
            ..view(2)
        };
        assert_eq!(test_block_type(&a, &busy), BlockType::Busy);
        assert_eq!(test_block_type(&a, &view(2)), BlockType::Idle);
    }

    #[test]
    fn test_severity_ordering() {
        assert!(BlockType::None < BlockType::Moving);
        assert!(BlockType::Moving < BlockType::Idle);
        assert!(BlockType::Idle < BlockType::Busy);
        assert!(BlockType::Busy < BlockType::Blocked);
    }
}

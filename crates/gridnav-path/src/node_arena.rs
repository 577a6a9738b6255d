//! Search node storage
//!
//! Nodes are stored in a flat arena indexed by cell index. Instead of
//! clearing the arena between searches, every node carries the
//! generation counter of the search that last touched it; a stale
//! generation reads as a fresh `New` node. The open list is a binary
//! heap ordered on total cost with the comparison inverted, so the
//! lowest f-cost pops first.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    New,
    Open,
    Closed,
}

#[derive(Debug, Clone, Copy)]
pub struct Node {
    /// Generation stamp of the owning search
    generation: u32,
    /// Parent cell index, `u32::MAX` for the start node
    pub parent: u32,
    /// Cost from start
    pub cost: f32,
    /// Cost plus heuristic
    pub total: f32,
    pub state: NodeState,
}

const NO_PARENT: u32 = u32::MAX;

impl Node {
    fn fresh(generation: u32) -> Self {
        Self {
            generation,
            parent: NO_PARENT,
            cost: 0.0,
            total: 0.0,
            state: NodeState::New,
        }
    }

    pub fn has_parent(&self) -> bool {
        self.parent != NO_PARENT
    }

    pub fn set_parent(&mut self, parent: u32) {
        self.parent = parent;
    }

    pub fn clear_parent(&mut self) {
        self.parent = NO_PARENT;
    }
}

/// Generation-stamped node arena sized to the cell grid
pub struct NodeArena {
    nodes: Vec<Node>,
    generation: u32,
}

impl NodeArena {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            generation: 0,
        }
    }

    /// Starts a new search over `cell_count` cells. All previously
    /// touched nodes become `New` again without being rewritten.
    pub fn begin_search(&mut self, cell_count: usize) {
        self.generation = self.generation.wrapping_add(1);
        if self.nodes.len() < cell_count {
            self.nodes
                .resize(cell_count, Node::fresh(self.generation.wrapping_sub(1)));
        }
    }

    /// Node for a cell, reset lazily if it belongs to an older search
    pub fn node_mut(&mut self, cell: usize) -> &mut Node {
        let node = &mut self.nodes[cell];
        if node.generation != self.generation {
            *node = Node::fresh(self.generation);
        }
        node
    }

    /// Read-only view; stale nodes read as `New`
    pub fn state(&self, cell: usize) -> NodeState {
        match self.nodes.get(cell) {
            Some(node) if node.generation == self.generation => node.state,
            _ => NodeState::New,
        }
    }

    pub fn node(&self, cell: usize) -> Option<&Node> {
        self.nodes
            .get(cell)
            .filter(|n| n.generation == self.generation)
    }
}

/// Open-list entry; ordering is inverted so [`BinaryHeap`] pops the
/// lowest total cost first
#[derive(Debug, Clone, Copy)]
pub struct HeapNode {
    pub total: f32,
    pub cell: u32,
}

impl PartialEq for HeapNode {
    fn eq(&self, other: &Self) -> bool {
        self.total == other.total
    }
}

impl Eq for HeapNode {}

impl PartialOrd for HeapNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed, NaN-safe
        other
            .total
            .partial_cmp(&self.total)
            .unwrap_or(Ordering::Equal)
    }
}

pub type OpenList = BinaryHeap<HeapNode>;

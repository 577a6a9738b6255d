//! Search status types

/// Outcome of a finished path search
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathStatus {
    /// The goal cell was reached
    Complete,
    /// The open set emptied or the budget ran out before the goal; the
    /// path leads to the lowest-heuristic node seen
    Partial,
    /// Not even a partial path exists (start cell not passable)
    Failed,
}

/// State of a sliced search between budget checkpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlicedPathState {
    /// More node expansions are needed
    InProgress,
    /// The goal was reached; finalize to get the path
    Success,
    /// The search exhausted its reachable set; finalize yields a
    /// best-effort partial path
    Partial,
    /// No usable result; finalize yields an empty failed path
    Failed,
}

/// A finished path as an ordered cell sequence from start to goal
#[derive(Debug, Clone)]
pub struct PathResult {
    pub status: PathStatus,
    /// Full-resolution cells from the start cell to the end of the path
    pub cells: Vec<(i32, i32)>,
    /// Accumulated edge cost of the returned path
    pub cost: f32,
}

impl PathResult {
    pub(crate) fn failed() -> Self {
        Self {
            status: PathStatus::Failed,
            cells: Vec::new(),
            cost: 0.0,
        }
    }

    /// True for complete and partial results alike
    pub fn is_usable(&self) -> bool {
        self.status != PathStatus::Failed && !self.cells.is_empty()
    }
}

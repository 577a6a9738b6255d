//! Shared path request queue
//!
//! Agents enqueue sliced searches here instead of searching inline;
//! `update` spreads one per-tick node budget round-robin across the
//! in-flight searches. Handles are opaque non-zero integers; a finished
//! result is kept alive for a few updates and purged if never claimed,
//! so a caller that disappears cannot leak a slot.

use gridnav_map::NavMap;

use crate::block::{AgentBlockView, OccupancySource};
use crate::profile::MoveProfile;
use crate::query::PathQuery;
use crate::status::{PathResult, SlicedPathState};

/// Opaque request handle; zero is never issued
pub type PathRequestHandle = u32;

const INVALID_HANDLE: PathRequestHandle = 0;
/// Concurrent request slots
const MAX_QUEUE: usize = 8;
/// Node-budget slice handed to one search per update pass
const MAX_NODES_PER_SLICE: usize = 128;
/// Updates an unclaimed result survives before being purged
const KEEP_ALIVE_UPDATES: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestStatus {
    /// Queued, not yet started
    Pending,
    /// Search running across ticks
    InProgress,
    /// Result ready for [`PathRequestQueue::take_result`]
    Done,
    /// Unknown, cancelled or already-claimed handle
    Invalid,
}

enum SlotState {
    Empty,
    Pending,
    Active,
    Done(PathResult),
}

struct Slot {
    handle: PathRequestHandle,
    state: SlotState,
    query: PathQuery,
    profile: MoveProfile,
    collider: AgentBlockView,
    start: (i32, i32),
    goal: (i32, i32),
    search_radius: Option<f32>,
    keep_alive: u32,
}

impl Slot {
    fn empty() -> Self {
        Self {
            handle: INVALID_HANDLE,
            state: SlotState::Empty,
            query: PathQuery::new(),
            profile: MoveProfile::default(),
            collider: AgentBlockView {
                id: 0,
                team: 0,
                push_resistant: false,
                is_moving: false,
                is_busy: false,
            },
            start: (0, 0),
            goal: (0, 0),
            search_radius: None,
            keep_alive: 0,
        }
    }

    fn clear(&mut self) {
        self.handle = INVALID_HANDLE;
        self.state = SlotState::Empty;
        self.query.cancel_sliced_find_path();
    }
}

/// Fixed-capacity queue of sliced path requests
pub struct PathRequestQueue {
    slots: Vec<Slot>,
    next_handle: PathRequestHandle,
    /// Rotates so budget starvation cannot pin one slot
    queue_head: usize,
}

impl Default for PathRequestQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl PathRequestQueue {
    pub fn new() -> Self {
        Self {
            slots: (0..MAX_QUEUE).map(|_| Slot::empty()).collect(),
            next_handle: 1,
            queue_head: 0,
        }
    }

    fn bump_handle(&mut self) -> PathRequestHandle {
        let handle = self.next_handle;
        self.next_handle = self.next_handle.wrapping_add(1);
        if self.next_handle == INVALID_HANDLE {
            self.next_handle = 1;
        }
        handle
    }

    /// Enqueues a search; `None` when all slots are busy (callers retry
    /// next tick).
    pub fn request(
        &mut self,
        start: (i32, i32),
        goal: (i32, i32),
        profile: &MoveProfile,
        collider: &AgentBlockView,
        search_radius: Option<f32>,
    ) -> Option<PathRequestHandle> {
        let slot_idx = self
            .slots
            .iter()
            .position(|s| matches!(s.state, SlotState::Empty))?;
        let handle = self.bump_handle();

        let slot = &mut self.slots[slot_idx];
        slot.handle = handle;
        slot.state = SlotState::Pending;
        slot.profile = profile.clone();
        slot.collider = *collider;
        slot.start = start;
        slot.goal = goal;
        slot.search_radius = search_radius;
        slot.keep_alive = 0;
        Some(handle)
    }

    pub fn status(&self, handle: PathRequestHandle) -> RequestStatus {
        if handle == INVALID_HANDLE {
            return RequestStatus::Invalid;
        }
        for slot in &self.slots {
            if slot.handle == handle {
                return match slot.state {
                    SlotState::Pending => RequestStatus::Pending,
                    SlotState::Active => RequestStatus::InProgress,
                    SlotState::Done(_) => RequestStatus::Done,
                    SlotState::Empty => RequestStatus::Invalid,
                };
            }
        }
        RequestStatus::Invalid
    }

    /// Claims a finished result and frees the slot
    pub fn take_result(&mut self, handle: PathRequestHandle) -> Option<PathResult> {
        if handle == INVALID_HANDLE {
            return None;
        }
        let slot = self.slots.iter_mut().find(|s| s.handle == handle)?;
        if !matches!(slot.state, SlotState::Done(_)) {
            return None;
        }
        let SlotState::Done(result) = std::mem::replace(&mut slot.state, SlotState::Empty) else {
            unreachable!()
        };
        slot.handle = INVALID_HANDLE;
        Some(result)
    }

    /// Cancels a request in any state
    pub fn cancel(&mut self, handle: PathRequestHandle) {
        if handle == INVALID_HANDLE {
            return;
        }
        if let Some(slot) = self.slots.iter_mut().find(|s| s.handle == handle) {
            slot.clear();
        }
    }

    /// Spends up to `max_nodes` expansions across the in-flight
    /// searches, starting pending ones as budget allows.
    pub fn update(&mut self, map: &NavMap, occupancy: &dyn OccupancySource, max_nodes: usize) {
        // Age out unclaimed results first
        for slot in &mut self.slots {
            if matches!(slot.state, SlotState::Done(_)) {
                slot.keep_alive += 1;
                if slot.keep_alive > KEEP_ALIVE_UPDATES {
                    log::warn!("purging unclaimed path result, handle {}", slot.handle);
                    slot.clear();
                }
            }
        }

        let mut remaining = max_nodes;
        let count = self.slots.len();
        for offset in 0..count {
            if remaining == 0 {
                break;
            }
            let idx = (self.queue_head + offset) % count;
            let slot = &mut self.slots[idx];

            if matches!(slot.state, SlotState::Pending) {
                let state = slot.query.init_sliced_find_path(
                    map,
                    occupancy,
                    &slot.collider,
                    &slot.profile,
                    slot.start,
                    slot.goal,
                    slot.search_radius,
                );
                slot.state = match state {
                    SlicedPathState::InProgress => SlotState::Active,
                    _ => SlotState::Done(slot.query.finalize_sliced_find_path()),
                };
            }

            if matches!(slot.state, SlotState::Active) {
                let slice = remaining.min(MAX_NODES_PER_SLICE);
                let (expended, state) =
                    slot.query.update_sliced_find_path(map, occupancy, slice);
                remaining -= expended.min(remaining);
                if state != SlicedPathState::InProgress {
                    slot.state = SlotState::Done(slot.query.finalize_sliced_find_path());
                    slot.keep_alive = 0;
                }
            }
        }
        self.queue_head = (self.queue_head + 1) % count;
    }

    /// Number of slots currently holding a request
    pub fn in_flight(&self) -> usize {
        self.slots
            .iter()
            .filter(|s| !matches!(s.state, SlotState::Empty))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::NoOccupancy;
    use crate::status::PathStatus;
    use glam::Vec3;

    fn view(id: u32) -> AgentBlockView {
        AgentBlockView {
            id,
            team: 0,
            push_resistant: false,
            is_moving: false,
            is_busy: false,
        }
    }

    #[test]
    fn test_request_runs_to_completion() {
        let map = NavMap::new(Vec3::ZERO, 12, 12, 1.0).unwrap();
        let mut queue = PathRequestQueue::new();
        let profile = MoveProfile::default();
        let handle = queue
            .request((0, 0), (11, 11), &profile, &view(1), None)
            .unwrap();
        assert_eq!(queue.status(handle), RequestStatus::Pending);

        let mut guard = 0;
        while queue.status(handle) != RequestStatus::Done {
            queue.update(&map, &NoOccupancy, 16);
            guard += 1;
            assert!(guard < 200, "request never finished");
        }
        let result = queue.take_result(handle).unwrap();
        assert_eq!(result.status, PathStatus::Complete);
        assert_eq!(result.cells.len(), 12);
        // Slot is free again
        assert_eq!(queue.status(handle), RequestStatus::Invalid);
        assert_eq!(queue.in_flight(), 0);
    }

    #[test]
    fn test_budget_shared_across_requests() {
        let map = NavMap::new(Vec3::ZERO, 12, 12, 1.0).unwrap();
        let mut queue = PathRequestQueue::new();
        let profile = MoveProfile::default();
        let a = queue
            .request((0, 0), (11, 11), &profile, &view(1), None)
            .unwrap();
        let b = queue
            .request((11, 0), (0, 11), &profile, &view(2), None)
            .unwrap();

        let mut guard = 0;
        while queue.status(a) != RequestStatus::Done || queue.status(b) != RequestStatus::Done {
            queue.update(&map, &NoOccupancy, 32);
            guard += 1;
            assert!(guard < 400);
        }
        assert!(queue.take_result(a).unwrap().is_usable());
        assert!(queue.take_result(b).unwrap().is_usable());
    }

    #[test]
    fn test_queue_full_and_cancel() {
        let mut queue = PathRequestQueue::new();
        let profile = MoveProfile::default();
        let mut handles = Vec::new();
        for i in 0..MAX_QUEUE {
            handles.push(
                queue
                    .request((0, 0), (11, 11), &profile, &view(i as u32), None)
                    .unwrap(),
            );
        }
        assert!(queue
            .request((0, 0), (1, 1), &profile, &view(99), None)
            .is_none());

        queue.cancel(handles[0]);
        assert_eq!(queue.status(handles[0]), RequestStatus::Invalid);
        assert!(queue
            .request((0, 0), (1, 1), &profile, &view(99), None)
            .is_some());
    }

    #[test]
    fn test_unclaimed_result_is_purged() {
        let map = NavMap::new(Vec3::ZERO, 12, 12, 1.0).unwrap();
        let mut queue = PathRequestQueue::new();
        let profile = MoveProfile::default();
        let handle = queue
            .request((0, 0), (2, 2), &profile, &view(1), None)
            .unwrap();
        queue.update(&map, &NoOccupancy, usize::MAX);
        assert_eq!(queue.status(handle), RequestStatus::Done);

        for _ in 0..=KEEP_ALIVE_UPDATES {
            queue.update(&map, &NoOccupancy, 0);
        }
        assert_eq!(queue.status(handle), RequestStatus::Invalid);
        assert_eq!(queue.in_flight(), 0);
    }
}

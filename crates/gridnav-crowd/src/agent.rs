//! Navigation agents
//!
//! An agent's kinematic state and move-state machine. Agents are owned
//! and mutated by [`crate::Crowd`] only; everything else sees them as
//! read-only snapshots during a tick.

use glam::Vec2;
use gridnav_common::Vec3;
use gridnav_path::{AgentBlockView, AgentId, MoveProfile, PathRequestHandle};

/// Move-state machine: `Idle -> Requesting -> WaitingForPath ->
/// Following -> {Arrived, Failed}`, with `Following -> Requesting` on
/// repath triggers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveState {
    /// No active order
    Idle,
    /// Wants a path, not yet enqueued or re-enqueued
    Requesting,
    /// Path request in flight
    WaitingForPath,
    /// Walking the waypoint list
    Following,
    /// Reached the goal; terminal until the next order
    Arrived,
    /// Gave up; terminal until the next order
    Failed,
}

impl MoveState {
    /// Active order but not currently walking
    pub fn is_busy(self) -> bool {
        matches!(self, MoveState::Requesting | MoveState::WaitingForPath)
    }
}

/// One simulated agent
#[derive(Debug)]
pub struct NavAgent {
    pub id: AgentId,
    pub profile: MoveProfile,

    pub pos: Vec3,
    /// Heading in radians about +Z
    pub heading: f32,
    /// Planar velocity (x, z)
    pub velocity: Vec2,
    pub current_speed: f32,

    pub state: MoveState,
    /// Simplified path, world-space waypoints
    pub waypoints: Vec<Vec3>,
    /// Index of the waypoint currently steered for
    pub waypoint_cursor: usize,
    pub goal: Vec3,
    pub goal_radius: f32,

    /// Consecutive ticks without meaningful progress
    pub idling_ticks: u32,
    pub repath_attempts: u32,
    /// In-flight path request, if any
    pub(crate) request: Option<PathRequestHandle>,
}

impl NavAgent {
    pub fn new(id: AgentId, pos: Vec3, profile: MoveProfile) -> Self {
        Self {
            id,
            profile,
            pos,
            heading: 0.0,
            velocity: Vec2::ZERO,
            current_speed: 0.0,
            state: MoveState::Idle,
            waypoints: Vec::new(),
            waypoint_cursor: 0,
            goal: pos,
            goal_radius: 0.0,
            idling_ticks: 0,
            repath_attempts: 0,
            request: None,
        }
    }

    pub fn pos_2d(&self) -> Vec2 {
        Vec2::new(self.pos.x, self.pos.z)
    }

    pub fn is_moving(&self) -> bool {
        self.state == MoveState::Following && self.current_speed > 1e-4
    }

    /// Blocking-relevant snapshot for the path engine
    pub fn block_view(&self) -> AgentBlockView {
        AgentBlockView {
            id: self.id,
            team: self.profile.team,
            push_resistant: self.profile.push_resistant,
            is_moving: self.is_moving(),
            is_busy: self.state.is_busy(),
        }
    }

    /// Waypoint currently steered for; the goal once the list is
    /// walked off
    pub fn current_waypoint(&self) -> Vec3 {
        self.waypoints
            .get(self.waypoint_cursor)
            .copied()
            .unwrap_or(self.goal)
    }

    /// Drops the active path and any counters tied to it
    pub fn clear_path(&mut self) {
        self.waypoints.clear();
        self.waypoint_cursor = 0;
        self.idling_ticks = 0;
    }
}

//! Crowd manager
//!
//! Owns the agents, the occupancy index, the shared path request queue
//! and the event queue. `update` runs one simulation tick in stable
//! agent-creation order, so occupancy changes made by one agent are
//! visible to every agent processed after it in the same tick.

use std::sync::Arc;

use glam::Vec2;
use gridnav_common::{dir_to_heading, heading_to_dir, wrap_angle, Error, Result, Vec3};
use gridnav_map::NavMap;
use gridnav_path::{
    find_straight_path, footprint_block, AgentBlockView, AgentId, BlockType, MoveProfile,
    OccupancySource, PathRequestQueue, RequestStatus,
};

use crate::agent::{MoveState, NavAgent};
use crate::boundary::collect_obstacle_segments;
use crate::occupancy::OccupancyIndex;
use crate::orca::{OrcaBody, OrcaQuery};

/// Crowd-visible agent state change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrowdEvent {
    /// Agent reached its goal
    Arrived(AgentId),
    /// Agent gave up after bounded retries
    Failed(AgentId),
    /// Agent dropped its path and is requesting a new one
    Repathing(AgentId),
}

/// Tuning knobs for the simulation
#[derive(Debug, Clone)]
pub struct CrowdConfig {
    /// A* node expansions shared by all path searches per tick
    pub node_budget_per_tick: usize,
    /// Neighbor and obstacle query range in world units
    pub neighbor_query_range: f32,
    /// Neighbor agents considered by avoidance
    pub max_neighbors: usize,
    /// Collision anticipation horizon against agents, seconds
    pub time_horizon: f32,
    /// Collision anticipation horizon against walls, seconds
    pub time_horizon_obst: f32,
    /// Repaths before a move degrades to `Failed`
    pub max_repath_attempts: u32,
    /// Optional sliced-search radius around the start-goal midpoint
    pub search_radius: Option<f32>,
    /// Extra no-progress ticks tolerated on top of the turn-rate term
    pub idle_grace_ticks: u32,
}

impl Default for CrowdConfig {
    fn default() -> Self {
        Self {
            node_budget_per_tick: 512,
            neighbor_query_range: 6.0,
            max_neighbors: 8,
            time_horizon: 2.0,
            time_horizon_obst: 1.5,
            max_repath_attempts: 3,
            search_radius: None,
            idle_grace_ticks: 10,
        }
    }
}

/// Read-only agent summary for the driving application
#[derive(Debug, Clone, Copy)]
pub struct AgentState {
    pub pos: Vec3,
    pub heading: f32,
    pub move_state: MoveState,
}

/// Occupancy with live agent snapshots, as the path engine sees it
struct OccupancyView<'a> {
    index: &'a OccupancyIndex,
    agents: &'a [Option<NavAgent>],
}

impl OccupancySource for OccupancyView<'_> {
    fn for_each_occupier(&self, x: i32, z: i32, f: &mut dyn FnMut(&AgentBlockView)) {
        for &id in self.index.query_cell(x, z) {
            if let Some(agent) = self.agents.get(id as usize).and_then(Option::as_ref) {
                f(&agent.block_view());
            }
        }
    }
}

/// Multi-agent simulation over one shared map
pub struct Crowd {
    map: Arc<NavMap>,
    config: CrowdConfig,
    agents: Vec<Option<NavAgent>>,
    occupancy: OccupancyIndex,
    queue: PathRequestQueue,
    orca: OrcaQuery,
    events: Vec<CrowdEvent>,
}

impl Crowd {
    pub fn new(map: Arc<NavMap>, config: CrowdConfig) -> Self {
        let origin = Vec2::new(map.origin().x, map.origin().z);
        let occupancy = OccupancyIndex::new(map.xsize(), map.zsize(), origin, map.square_size());
        Self {
            map,
            config,
            agents: Vec::new(),
            occupancy,
            queue: PathRequestQueue::new(),
            orca: OrcaQuery::new(),
            events: Vec::new(),
        }
    }

    /// Adds an agent at a position (clamped into the grid) and
    /// registers its footprint.
    pub fn add_agent(&mut self, pos: Vec3, profile: MoveProfile) -> Result<AgentId> {
        if profile.unit_size < 1 {
            return Err(Error::Crowd(format!(
                "invalid unit size {}",
                profile.unit_size
            )));
        }
        let slot = self
            .agents
            .iter()
            .position(Option::is_none)
            .unwrap_or_else(|| {
                self.agents.push(None);
                self.agents.len() - 1
            });
        let id = slot as AgentId;
        let pos = self.map.clamp_pos(pos);
        let (cx, cz) = self.map.cell_index_of(pos);
        let agent = NavAgent::new(id, pos, profile);
        self.occupancy.insert(id, agent.profile.footprint(cx, cz));
        self.agents[slot] = Some(agent);
        log::debug!("added agent {id} at cell ({cx}, {cz})");
        Ok(id)
    }

    /// Removes an agent, cancelling its path request and deregistering
    /// its footprint. Other agents' in-flight searches are untouched.
    pub fn remove_agent(&mut self, id: AgentId) -> Result<()> {
        let agent = self
            .agents
            .get_mut(id as usize)
            .and_then(Option::take)
            .ok_or_else(|| Error::Crowd(format!("unknown agent {id}")))?;
        if let Some(handle) = agent.request {
            self.queue.cancel(handle);
        }
        self.occupancy.remove(id);
        Ok(())
    }

    /// Orders an agent to a goal position with an arrival radius.
    pub fn request_move(&mut self, id: AgentId, target: Vec3, goal_radius: f32) -> Result<()> {
        let queue = &mut self.queue;
        let map = &self.map;
        let agent = self
            .agents
            .get_mut(id as usize)
            .and_then(Option::as_mut)
            .ok_or_else(|| Error::Crowd(format!("unknown agent {id}")))?;
        if let Some(handle) = agent.request.take() {
            queue.cancel(handle);
        }
        agent.goal = map.clamp_pos(target);
        agent.goal_radius = goal_radius.max(0.0);
        agent.repath_attempts = 0;
        agent.clear_path();
        agent.state = MoveState::Requesting;
        Ok(())
    }

    pub fn get_agent(&self, id: AgentId) -> Option<&NavAgent> {
        self.agents.get(id as usize).and_then(Option::as_ref)
    }

    pub fn agent_state(&self, id: AgentId) -> Option<AgentState> {
        self.get_agent(id).map(|a| AgentState {
            pos: a.pos,
            heading: a.heading,
            move_state: a.state,
        })
    }

    /// Takes the events emitted since the last drain, oldest first
    pub fn drain_events(&mut self) -> Vec<CrowdEvent> {
        std::mem::take(&mut self.events)
    }

    /// Runs one simulation tick.
    pub fn update(&mut self, dt: f32) {
        let dt = dt.max(1e-4);

        // Drive the shared path searches first so finished requests
        // deliver this tick
        self.queue.update(
            &self.map,
            &OccupancyView {
                index: &self.occupancy,
                agents: &self.agents,
            },
            self.config.node_budget_per_tick,
        );

        // Stable creation order; agents see the occupancy updates of
        // everyone processed before them
        for slot in 0..self.agents.len() {
            let Some(mut agent) = self.agents[slot].take() else {
                continue;
            };
            self.step_agent(&mut agent, dt);
            self.agents[slot] = Some(agent);
        }
    }

    fn step_agent(&mut self, agent: &mut NavAgent, dt: f32) {
        match agent.state {
            MoveState::Requesting => self.enqueue_request(agent),
            MoveState::WaitingForPath => self.poll_request(agent),
            MoveState::Following => self.follow(agent, dt),
            MoveState::Idle | MoveState::Arrived | MoveState::Failed => {}
        }
    }

    fn enqueue_request(&mut self, agent: &mut NavAgent) {
        let start = self.map.cell_index_of(agent.pos);
        let goal = self.map.cell_index_of(agent.goal);
        let handle = self.queue.request(
            start,
            goal,
            &agent.profile,
            &agent.block_view(),
            self.config.search_radius,
        );
        match handle {
            Some(handle) => {
                agent.request = Some(handle);
                agent.state = MoveState::WaitingForPath;
            }
            // Queue full; stay in Requesting and retry next tick
            None => log::debug!("path queue full, agent {} waits", agent.id),
        }
    }

    fn poll_request(&mut self, agent: &mut NavAgent) {
        let Some(handle) = agent.request else {
            agent.state = MoveState::Requesting;
            return;
        };
        match self.queue.status(handle) {
            RequestStatus::Pending | RequestStatus::InProgress => {}
            RequestStatus::Invalid => {
                // Result aged out before we claimed it
                agent.request = None;
                agent.state = MoveState::Requesting;
            }
            RequestStatus::Done => {
                agent.request = None;
                let result = self.queue.take_result(handle);
                match result {
                    Some(result) if result.is_usable() => {
                        let view = OccupancyView {
                            index: &self.occupancy,
                            agents: &self.agents,
                        };
                        let mut waypoints = find_straight_path(
                            &self.map,
                            &agent.profile,
                            &view,
                            &agent.block_view(),
                            &result.cells,
                        );
                        if result.status == gridnav_path::PathStatus::Complete {
                            // Steer for the exact goal, not the cell center
                            waypoints.push(agent.goal);
                        }
                        agent.waypoints = waypoints;
                        agent.waypoint_cursor = 0;
                        agent.idling_ticks = 0;
                        agent.state = MoveState::Following;
                    }
                    _ => self.handle_move_setback(agent),
                }
            }
        }
    }

    /// Repath with bounded retries, then give up
    fn handle_move_setback(&mut self, agent: &mut NavAgent) {
        if let Some(handle) = agent.request.take() {
            self.queue.cancel(handle);
        }
        agent.repath_attempts += 1;
        if agent.repath_attempts > self.config.max_repath_attempts {
            self.fail_agent(agent);
        } else {
            agent.clear_path();
            agent.state = MoveState::Requesting;
            self.events.push(CrowdEvent::Repathing(agent.id));
        }
    }

    fn fail_agent(&mut self, agent: &mut NavAgent) {
        log::warn!("agent {} failed to reach its goal", agent.id);
        agent.clear_path();
        agent.velocity = Vec2::ZERO;
        agent.current_speed = 0.0;
        agent.state = MoveState::Failed;
        self.events.push(CrowdEvent::Failed(agent.id));
    }

    fn arrive_agent(&mut self, agent: &mut NavAgent) {
        agent.clear_path();
        agent.velocity = Vec2::ZERO;
        agent.current_speed = 0.0;
        agent.state = MoveState::Arrived;
        self.events.push(CrowdEvent::Arrived(agent.id));
    }

    fn follow(&mut self, agent: &mut NavAgent, dt: f32) {
        let ss = self.map.square_size();
        let pos2 = agent.pos_2d();

        // Blocked look-ahead on the current waypoint triggers a repath
        let wp = agent.current_waypoint();
        let wp_cell = self.map.cell_index_of(wp);
        let blocked = {
            let view = OccupancyView {
                index: &self.occupancy,
                agents: &self.agents,
            };
            footprint_block(
                &self.map,
                &agent.profile,
                &view,
                &agent.block_view(),
                wp_cell.0,
                wp_cell.1,
            ) == BlockType::Blocked
        };
        if blocked {
            self.handle_move_setback(agent);
            return;
        }

        // Advance the waypoint cursor over reached waypoints
        let reach = ss * 0.5;
        while agent.waypoint_cursor < agent.waypoints.len() {
            let wp = agent.waypoints[agent.waypoint_cursor];
            if pos2.distance(Vec2::new(wp.x, wp.z)) <= reach {
                agent.waypoint_cursor += 1;
            } else {
                break;
            }
        }

        // Preferred velocity toward the current waypoint
        let target = agent.current_waypoint();
        let to_target = Vec2::new(target.x, target.z) - pos2;
        let pref_vel = if to_target.length_squared() > 1e-8 {
            to_target.normalize() * agent.profile.max_speed
        } else {
            Vec2::ZERO
        };

        let new_vel = self.avoid(agent, pref_vel, dt);
        let before = agent.pos_2d();
        self.integrate(agent, new_vel, dt);
        let moved = agent.pos_2d().distance(before);

        // Occupancy follows the committed position
        let (cx, cz) = self.map.cell_index_of(agent.pos);
        let footprint = self
            .occupancy
            .clamp_footprint(agent.profile.footprint(cx, cz));
        if self.occupancy.footprint_of(agent.id) != Some(footprint) {
            self.occupancy.move_agent(agent.id, footprint);
        }

        // Arrival: inside the goal radius, or closing fast enough to
        // overshoot the goal within the next tick
        let to_goal = Vec2::new(agent.goal.x, agent.goal.z) - agent.pos_2d();
        let dist_sq = to_goal.length_squared();
        let within = dist_sq.sqrt() <= agent.goal_radius;
        let overshoot = to_goal.dot(agent.velocity) * dt >= dist_sq;
        if within || overshoot {
            self.arrive_agent(agent);
            return;
        }

        self.track_idling(agent, moved, dt);
    }

    /// ORCA pass against nearby walls and agents
    fn avoid(&mut self, agent: &NavAgent, pref_vel: Vec2, dt: f32) -> Vec2 {
        let range = self.config.neighbor_query_range;
        let pos2 = agent.pos_2d();
        let radius = agent.profile.radius(self.map.square_size());
        let body = OrcaBody {
            pos: pos2,
            velocity: agent.velocity,
            radius,
            mass: agent.profile.mass,
            push_resistant: agent.profile.push_resistant,
            moving: agent.is_moving(),
        };

        self.orca.reset();
        for seg in collect_obstacle_segments(&self.map, &agent.profile, pos2, range) {
            self.orca
                .add_obstacle_segment(&body, &seg, self.config.time_horizon_obst);
        }

        let mut neighbors: Vec<(f32, OrcaBody)> = Vec::new();
        for id in self.occupancy.query_radius(pos2, range) {
            if id == agent.id {
                continue;
            }
            let Some(other) = self.agents.get(id as usize).and_then(Option::as_ref) else {
                continue;
            };
            let other_radius = other.profile.radius(self.map.square_size());
            let dist_sq = pos2.distance_squared(other.pos_2d());
            let reach = range + other_radius;
            if dist_sq > reach * reach {
                continue; // cell-scan false positive
            }
            neighbors.push((
                dist_sq,
                OrcaBody {
                    pos: other.pos_2d(),
                    velocity: other.velocity,
                    radius: other_radius,
                    mass: other.profile.mass,
                    push_resistant: other.profile.push_resistant,
                    moving: other.is_moving(),
                },
            ));
        }
        neighbors.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
        neighbors.truncate(self.config.max_neighbors);
        for (_, other) in &neighbors {
            self.orca
                .add_agent(&body, other, self.config.time_horizon, 1.0 / dt);
        }

        self.orca.solve(agent.profile.max_speed, pref_vel)
    }

    /// Applies acceleration, turn-rate and grid-bound clamps
    fn integrate(&mut self, agent: &mut NavAgent, new_vel: Vec2, dt: f32) {
        let desired_speed = new_vel.length();
        if desired_speed > 1e-5 {
            let desired_heading = dir_to_heading(new_vel);
            let max_turn = agent.profile.turn_rate * dt;
            let delta = wrap_angle(desired_heading - agent.heading);
            agent.heading = wrap_angle(agent.heading + delta.clamp(-max_turn, max_turn));
        }

        let speed_delta = desired_speed - agent.current_speed;
        let limit = if speed_delta >= 0.0 {
            agent.profile.acceleration * dt
        } else {
            agent.profile.deceleration * dt
        };
        agent.current_speed += speed_delta.clamp(-limit, limit);
        agent.current_speed = agent.current_speed.clamp(0.0, agent.profile.max_speed);

        agent.velocity = heading_to_dir(agent.heading) * agent.current_speed;
        let next = Vec3::new(
            agent.pos.x + agent.velocity.x * dt,
            0.0,
            agent.pos.z + agent.velocity.y * dt,
        );
        agent.pos = self.map.clamp_pos(next);
    }

    /// No-progress accounting; the threshold scales with how long a
    /// full turn takes, so slow-turning agents get more slack
    fn track_idling(&mut self, agent: &mut NavAgent, moved: f32, dt: f32) {
        // Displacement, not commanded speed: an agent pinned in place
        // by walls or the grid border is idling even at full throttle
        if moved < agent.profile.max_speed * dt * 0.05 {
            agent.idling_ticks += 1;
        } else {
            agent.idling_ticks = 0;
        }
        let turn_ticks =
            (std::f32::consts::TAU / (agent.profile.turn_rate * dt).max(1e-4)).ceil() as u32;
        if agent.idling_ticks > turn_ticks + self.config.idle_grace_ticks {
            log::debug!("agent {} stuck, repathing", agent.id);
            agent.idling_ticks = 0;
            self.handle_move_setback(agent);
        }
    }
}

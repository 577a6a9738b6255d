//! Multi-agent crowd simulation on grid navigation maps
//!
//! This crate drives many agents over a shared [`gridnav_map::NavMap`]:
//! path requests go through a budgeted request queue, local collision
//! avoidance uses ORCA half-plane constraints, and a footprint-exact
//! occupancy index lets agents see and block each other.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use gridnav_crowd::{Crowd, CrowdConfig};
//! use gridnav_map::NavMap;
//! use gridnav_path::MoveProfile;
//!
//! let map = Arc::new(NavMap::from_asset(&asset)?);
//! let mut crowd = Crowd::new(map, CrowdConfig::default());
//!
//! let id = crowd.add_agent(start_pos, MoveProfile::default())?;
//! crowd.request_move(id, goal_pos, 0.5)?;
//!
//! loop {
//!     crowd.update(1.0 / 30.0);
//!     for event in crowd.drain_events() {
//!         println!("{event:?}");
//!     }
//! }
//! ```

pub mod agent;
pub mod boundary;
pub mod crowd;
pub mod occupancy;
pub mod orca;

pub use agent::*;
pub use boundary::*;
pub use crowd::*;
pub use occupancy::*;
pub use orca::*;

#[cfg(test)]
mod crowd_scenario_tests;

//! Common utilities and data structures shared by the gridnav crates

mod math;
mod vector;

pub use math::*;
pub use vector::*;

/// Represents a 3D position
pub type Vec3 = glam::Vec3;

/// Represents a 2D position or velocity on the ground plane (x, z)
pub type Vec2 = glam::Vec2;

/// Error types for the library
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid navigation map: {0}")]
    InvalidMap(String),

    #[error("map bake failed: {0}")]
    MapBake(String),

    #[error("pathfinding failed: {0}")]
    Pathfinding(String),

    #[error("crowd error: {0}")]
    Crowd(String),
}

/// Result type for gridnav operations
pub type Result<T> = std::result::Result<T, Error>;

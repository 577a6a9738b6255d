//! Navigation map for the gridnav stack
//!
//! This crate contains the heightfield grid representation the pathfinder
//! and crowd layers operate on, plus the baked-asset schema produced by
//! offline bake tooling.

mod asset;
mod nav_map;

pub use asset::GridAsset;
pub use nav_map::{NavMap, AREA_UNWALKABLE};

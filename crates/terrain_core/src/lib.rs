//! Core types shared by the terrain generation and streaming crates:
//! - Heightfield grid
//! - Height curve sampling
//! - LOD ladder
//! - Settings and validation errors

pub mod curve;
pub mod error;
pub mod heightfield;
pub mod lod;
pub mod settings;

pub use curve::*;
pub use error::*;
pub use heightfield::*;
pub use lod::*;
pub use settings::*;

// Re-export commonly used math types
pub use glam::{IVec2, Vec2, Vec3};

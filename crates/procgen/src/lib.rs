//! Pure terrain generation: fractal noise heightfields, edge falloff, and
//! heightfield-to-mesh conversion with seam-matching normals.
//!
//! Everything here is a pure function over its inputs — safe to call from
//! any number of background workers at once.

pub mod falloff;
pub mod mesher;
pub mod noise_field;

// `mesher::generate` and `noise_field::generate` stay module-qualified.
pub use falloff::apply_falloff;
pub use mesher::MeshData;

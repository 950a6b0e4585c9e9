//! Chunk streaming around a moving viewer.
//!
//! Compute-heavy work (noise fields, meshes) runs on a bounded worker pool;
//! finished results cross back over a single mutex-guarded FIFO queue and
//! are applied on the caller's update tick. All chunk state lives on that
//! one thread — workers only ever produce values and enqueue them.

pub mod chunk;
pub mod compute;
pub mod controller;
pub mod dispatch;

pub use chunk::*;
pub use compute::*;
pub use controller::*;
pub use dispatch::*;

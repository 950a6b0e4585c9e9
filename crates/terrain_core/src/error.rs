//! Error taxonomy for terrain configuration.

use thiserror::Error;

/// Fatal settings problems, surfaced before any chunk work starts.
///
/// Generation-time failures are deliberately absent: a background work unit
/// that panics is logged and dropped by the compute layer, leaving its chunk
/// pending (see the streamer crate).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("chunk size must be positive")]
    NonPositiveChunkSize,

    #[error("noise levels must be at least 1")]
    NoOctaves,

    #[error("LOD ladder is empty")]
    EmptyLodLadder,

    #[error(
        "LOD thresholds must be strictly ascending: ladder[{index}] = {value} \
         does not exceed the previous threshold {previous}"
    )]
    NonAscendingThreshold { index: usize, value: f32, previous: f32 },

    #[error("collider LOD index {index} is out of range for a {len}-rung ladder")]
    ColliderLodOutOfRange { index: usize, len: usize },

    #[error(
        "LOD level {level} samples with stride {stride}, which must divide \
         the bordered grid extent chunk_size + 1 = {extent}"
    )]
    LodStrideMismatch { level: u32, stride: usize, extent: u32 },

    #[error("height curve needs at least one key")]
    EmptyHeightCurve,

    #[error("could not read settings file: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not parse settings: {0}")]
    Parse(#[from] ron::error::SpannedError),
}

//! Terrain settings: noise parameters, LOD ladder, chunk geometry.
//! Loaded from RON by the host application; invalid settings are fatal.

use std::path::Path;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::curve::HeightCurve;
use crate::error::ConfigError;
use crate::lod::Lod;

/// How raw accumulated noise heights are remapped before use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NormalizeMode {
    /// Leave accumulated values untouched (may be negative or above 1).
    None,
    /// Remap the observed [min, max] of this field to [0, 1].
    Local,
    /// Remap against the theoretical amplitude sum so adjacent fields agree.
    /// Only the lower bound is clamped; values above 1 can occur.
    Global,
}

/// Fractal noise parameters. Immutable per generation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseParameters {
    /// Octave count; each octave adds finer detail.
    pub levels: u32,
    /// Per-octave amplitude multiplier, in [0, 1].
    pub strength: f32,
    /// Per-octave frequency multiplier, at least 1.
    pub attenuation: f32,
    /// Authored pan offset, combined with the chunk's world offset.
    pub offset: Vec2,
    /// Feature size of the noise; values at or below 0 are coerced to a
    /// small epsilon at generation time.
    pub scale: f32,
    /// Seed for the octave offsets and the Perlin permutation.
    pub seed: u32,
    pub normalize: NormalizeMode,
}

impl Default for NoiseParameters {
    fn default() -> Self {
        Self {
            levels: 4,
            strength: 0.5,
            attenuation: 2.0,
            offset: Vec2::ZERO,
            scale: 50.0,
            seed: 0,
            normalize: NormalizeMode::Global,
        }
    }
}

/// Everything the streaming controller needs to build a world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainSettings {
    pub noise: NoiseParameters,
    /// Vertices per chunk side. The world extent of one chunk is
    /// `chunk_size - 1` units before uniform scaling.
    pub chunk_size: u32,
    /// Remaps normalized heights before the height multiplier is applied.
    pub height_curve: HeightCurve,
    pub height_multiplier: f32,
    /// Subtract a square falloff mask from every heightfield (island worlds).
    pub falloff: bool,
    /// Optional shaping curve for the falloff mask; `None` uses the raw mask.
    pub falloff_curve: Option<HeightCurve>,
    /// Build meshes with a phantom border ring so edge normals match the
    /// neighbouring chunk without its data being resident.
    pub connectable_chunks: bool,
    /// Uniform world scale applied to chunk placement and viewer tracking.
    pub uniform_scale: f32,
    /// LOD ladder, ascending by threshold. The last threshold is the maximum
    /// view distance.
    pub lods: Vec<Lod>,
    /// Index into `lods` of the rung used for the collision mesh.
    pub collider_lod_index: usize,
    /// Viewer travel (squared before use) that triggers a window recompute.
    pub chunk_update_threshold: f32,
    /// Viewer distance below which a chunk wants its collision mesh.
    pub collider_update_threshold: f32,
    /// Background worker threads; 0 means one per logical core.
    pub worker_threads: usize,
}

impl Default for TerrainSettings {
    fn default() -> Self {
        Self {
            noise: NoiseParameters::default(),
            // The bordered grid extent (chunk_size + 1) must be divisible by
            // every ladder stride; 96 divides by the default strides 1/4/8.
            chunk_size: 95,
            height_curve: HeightCurve::linear(),
            height_multiplier: 20.0,
            falloff: false,
            falloff_curve: None,
            connectable_chunks: true,
            uniform_scale: 1.0,
            lods: vec![Lod::new(0, 150.0), Lod::new(2, 300.0), Lod::new(4, 600.0)],
            collider_lod_index: 0,
            chunk_update_threshold: 25.0,
            collider_update_threshold: 200.0,
            worker_threads: 0,
        }
    }
}

impl TerrainSettings {
    /// Check every startup invariant. Called by the controller before any
    /// chunk is constructed; an error here aborts construction entirely.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size == 0 {
            return Err(ConfigError::NonPositiveChunkSize);
        }
        if self.noise.levels == 0 {
            return Err(ConfigError::NoOctaves);
        }
        if self.lods.is_empty() {
            return Err(ConfigError::EmptyLodLadder);
        }
        let mut previous = f32::NEG_INFINITY;
        for (index, lod) in self.lods.iter().enumerate() {
            if lod.threshold_distance <= previous {
                return Err(ConfigError::NonAscendingThreshold {
                    index,
                    value: lod.threshold_distance,
                    previous,
                });
            }
            previous = lod.threshold_distance;
        }
        // The mesher walks the bordered (chunk_size + 2) grid in stride
        // steps and must land exactly on the far edge.
        for lod in &self.lods {
            let stride = lod.stride();
            if (self.chunk_size + 1) % stride as u32 != 0 {
                return Err(ConfigError::LodStrideMismatch {
                    level: lod.level,
                    stride,
                    extent: self.chunk_size + 1,
                });
            }
        }
        if self.collider_lod_index >= self.lods.len() {
            return Err(ConfigError::ColliderLodOutOfRange {
                index: self.collider_lod_index,
                len: self.lods.len(),
            });
        }
        if self.height_curve.is_empty() {
            return Err(ConfigError::EmptyHeightCurve);
        }
        Ok(())
    }

    /// Parse settings from RON text and validate them.
    pub fn from_ron_str(text: &str) -> Result<Self, ConfigError> {
        let settings: Self = ron::from_str(text)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from a RON file and validate them.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_ron_str(&text)
    }

    /// World extent of one chunk before uniform scaling.
    pub fn chunk_extent(&self) -> u32 {
        (self.chunk_size - 1).max(1)
    }

    /// The last ladder threshold: nothing renders beyond it.
    pub fn max_view_distance(&self) -> f32 {
        self.lods.last().map(|lod| lod.threshold_distance).unwrap_or(0.0)
    }
}

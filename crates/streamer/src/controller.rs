//! The streaming controller: owns every chunk, tracks the viewer, drains
//! background results, and maintains the square visible window.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

use glam::{IVec2, Vec2};
use terrain_core::{ConfigError, TerrainSettings};

use crate::chunk::{TerrainChunk, UpdateCtx};
use crate::compute::{ChunkCompute, GenResult};
use crate::dispatch::DispatchQueue;

/// Endless terrain around a moving viewer.
///
/// Call [`update`](Self::update) once per host tick with the viewer's world
/// position. The controller drains completed background work every tick and
/// recomputes the visible window only when the viewer has travelled past the
/// hysteresis threshold. Chunks that leave the window are hidden, never
/// destroyed; re-entering the window costs nothing but a visibility flip.
pub struct EndlessTerrain {
    settings: Arc<TerrainSettings>,
    compute: ChunkCompute,
    results: Arc<DispatchQueue<GenResult>>,
    chunks: HashMap<IVec2, TerrainChunk>,
    /// Coordinates made visible by the last window recompute, hidden in bulk
    /// before the next one.
    last_visible: Vec<IVec2>,
    /// Viewer position in chunk space (world divided by the uniform scale).
    viewer_position: Vec2,
    last_update_position: Vec2,
    sqr_update_threshold: f32,
    /// Half-width of the visible window, in chunks.
    window_radius: i32,
    /// Requests in flight: heightfields and meshes that have been sent to
    /// the pool but whose results have not been drained yet.
    pending: usize,
    started: bool,
}

impl EndlessTerrain {
    /// Validate the settings and start the worker pool. No chunk exists
    /// until the first [`update`](Self::update).
    pub fn new(settings: TerrainSettings) -> Result<Self, ConfigError> {
        settings.validate()?;
        let settings = Arc::new(settings);
        let compute = ChunkCompute::new(Arc::clone(&settings));
        let results = compute.results();

        let extent = settings.chunk_extent() as f32;
        let window_radius = (settings.max_view_distance() / extent).floor() as i32;
        log::info!(
            "endless terrain: window radius {window_radius} chunks, {} LOD rungs",
            settings.lods.len()
        );

        Ok(Self {
            sqr_update_threshold: settings.chunk_update_threshold
                * settings.chunk_update_threshold,
            settings,
            compute,
            results,
            chunks: HashMap::new(),
            last_visible: Vec::new(),
            viewer_position: Vec2::ZERO,
            last_update_position: Vec2::ZERO,
            window_radius,
            pending: 0,
            started: false,
        })
    }

    /// Per-tick drive. `viewer_world` is in host world units; chunk
    /// placement math happens in unscaled chunk space.
    pub fn update(&mut self, viewer_world: Vec2) {
        self.viewer_position = viewer_world / self.settings.uniform_scale;
        self.drain_results();

        if self.started {
            let moved = (self.viewer_position - self.last_update_position).length_squared();
            if moved <= self.sqr_update_threshold {
                return;
            }
        }
        self.started = true;
        self.last_update_position = self.viewer_position;
        self.update_visible_chunks();
    }

    /// Apply every completed background result on this thread, in FIFO
    /// order. Each delivery re-drives its chunk, so a heightfield arriving
    /// here immediately requests the mesh the chunk currently wants.
    fn drain_results(&mut self) {
        let results = Arc::clone(&self.results);
        results.drain(|result| self.apply_result(result));
    }

    fn apply_result(&mut self, result: GenResult) {
        self.pending = self.pending.saturating_sub(1);
        let viewer = self.viewer_position;

        let Self { chunks, compute, settings, pending, last_visible, .. } = self;
        let mut ctx = UpdateCtx {
            compute,
            ladder: &settings.lods,
            collider_distance: settings.collider_update_threshold,
            pending,
        };

        let coord = match &result {
            GenResult::Heightfield { coord, .. } | GenResult::Mesh { coord, .. } => *coord,
        };
        let Some(chunk) = chunks.get_mut(&coord) else {
            // Chunks are never removed, so this can only mean a logic error.
            log::warn!("dropping result for unknown chunk {coord}");
            return;
        };
        match result {
            GenResult::Heightfield { field, .. } => chunk.on_heightfield(field, viewer, &mut ctx),
            GenResult::Mesh { lod_index, mesh, .. } => {
                chunk.on_mesh(lod_index, mesh, viewer, &mut ctx)
            }
        }
        if chunk.is_visible() && !last_visible.contains(&coord) {
            last_visible.push(coord);
        }
    }

    /// Rebuild the square window of chunks around the viewer: hide last
    /// frame's visible set, then create or re-update every coordinate within
    /// the window radius.
    fn update_visible_chunks(&mut self) {
        let viewer = self.viewer_position;
        let extent = self.settings.chunk_extent() as f32;
        let radius = self.window_radius;
        let current_chunk =
            IVec2::new((viewer.x / extent).round() as i32, (viewer.y / extent).round() as i32);
        log::debug!("recomputing visible window around chunk {current_chunk}");

        let Self { chunks, compute, settings, pending, last_visible, .. } = self;
        let settings: &TerrainSettings = settings;

        for coord in last_visible.drain(..) {
            if let Some(chunk) = chunks.get_mut(&coord) {
                chunk.set_visible(false);
            }
        }

        let mut ctx = UpdateCtx {
            compute,
            ladder: &settings.lods,
            collider_distance: settings.collider_update_threshold,
            pending,
        };

        let mut visible = Vec::new();
        for y_offset in -radius..=radius {
            for x_offset in -radius..=radius {
                let coord = current_chunk + IVec2::new(x_offset, y_offset);
                let chunk_visible = match chunks.entry(coord) {
                    Entry::Occupied(mut entry) => entry.get_mut().update(viewer, &mut ctx),
                    Entry::Vacant(entry) => {
                        entry.insert(TerrainChunk::new(coord, settings, &mut ctx)).update(
                            viewer,
                            &mut ctx,
                        )
                    }
                };
                if chunk_visible {
                    visible.push(coord);
                }
            }
        }
        *last_visible = visible;
    }

    /// True once the first window exists and no background work is in
    /// flight. Hosts gate viewer activation on this.
    pub fn all_loaded(&self) -> bool {
        self.started && self.pending == 0
    }

    /// Requests sent to the pool whose results have not been applied yet.
    pub fn pending_requests(&self) -> usize {
        self.pending
    }

    pub fn chunk(&self, coord: IVec2) -> Option<&TerrainChunk> {
        self.chunks.get(&coord)
    }

    /// Every chunk ever created, visible or not.
    pub fn chunks(&self) -> impl Iterator<Item = &TerrainChunk> {
        self.chunks.values()
    }

    /// The chunks shown after the most recent window recompute or result
    /// application.
    pub fn visible_chunks(&self) -> impl Iterator<Item = &TerrainChunk> {
        self.last_visible.iter().filter_map(|coord| self.chunks.get(coord))
    }

    pub fn settings(&self) -> &TerrainSettings {
        &self.settings
    }

    /// Viewer position in chunk space, as of the last update.
    pub fn viewer_position(&self) -> Vec2 {
        self.viewer_position
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use terrain_core::{Lod, NoiseParameters, NormalizeMode};

    fn settings() -> TerrainSettings {
        TerrainSettings {
            noise: NoiseParameters {
                normalize: NormalizeMode::Local,
                ..Default::default()
            },
            chunk_size: 9,
            lods: vec![Lod::new(0, 20.0), Lod::new(1, 40.0)],
            collider_lod_index: 0,
            chunk_update_threshold: 5.0,
            collider_update_threshold: 15.0,
            worker_threads: 2,
            ..Default::default()
        }
    }

    #[test]
    fn invalid_settings_are_rejected_up_front() {
        let bad = TerrainSettings { lods: vec![], ..settings() };
        assert!(EndlessTerrain::new(bad).is_err());
    }

    #[test]
    fn first_update_builds_the_full_window() {
        // Extent 8, max view distance 40: radius floor(40 / 8) = 5, so an
        // 11 x 11 window of chunks appears on the first tick.
        let mut terrain = EndlessTerrain::new(settings()).expect("valid settings");
        assert_eq!(terrain.chunks().count(), 0);

        terrain.update(Vec2::ZERO);
        assert_eq!(terrain.chunks().count(), 121);
        assert_eq!(terrain.pending_requests(), 121, "one heightfield per chunk");
        assert!(!terrain.all_loaded());
    }

    #[test]
    fn small_viewer_movement_does_not_recompute_the_window() {
        let mut terrain = EndlessTerrain::new(settings()).expect("valid settings");
        terrain.update(Vec2::ZERO);
        let created = terrain.chunks().count();

        // 3 units of travel is under the 5-unit hysteresis threshold.
        terrain.update(Vec2::new(3.0, 0.0));
        assert_eq!(terrain.chunks().count(), created);

        // 48 units is not; the window shifts by 6 chunks and new coordinates
        // appear.
        terrain.update(Vec2::new(48.0, 0.0));
        assert!(terrain.chunks().count() > created);
    }

    #[test]
    fn uniform_scale_divides_the_viewer_position() {
        let mut terrain = EndlessTerrain::new(TerrainSettings {
            uniform_scale: 4.0,
            ..settings()
        })
        .expect("valid settings");

        terrain.update(Vec2::new(100.0, -40.0));
        assert_eq!(terrain.viewer_position(), Vec2::new(25.0, -10.0));
    }

    #[test]
    fn corner_chunks_of_the_window_are_not_visible() {
        // The window is square but the view range is radial: the corner
        // chunk (5, 5) sits ~50.9 units away, past the 40-unit maximum, so
        // it exists (and generates) but is hidden.
        let mut terrain = EndlessTerrain::new(settings()).expect("valid settings");
        terrain.update(Vec2::ZERO);

        let corner = terrain.chunk(IVec2::new(5, 5)).expect("corner chunk exists");
        assert!(!corner.is_visible());
        let edge = terrain.chunk(IVec2::new(5, 0)).expect("edge chunk exists");
        assert!(edge.is_visible());
    }
}

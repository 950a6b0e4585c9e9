//! Background generation of heightfields and meshes on a bounded worker
//! pool. Workers never touch chunk state: every completion goes through the
//! dispatch queue and is applied on the controller's tick.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use glam::IVec2;
use procgen::{apply_falloff, mesher, noise_field, MeshData};
use terrain_core::{Heightfield, TerrainSettings};

use crate::dispatch::DispatchQueue;

/// A completed unit of background work, tagged with the chunk it belongs to.
#[derive(Debug)]
pub enum GenResult {
    Heightfield { coord: IVec2, field: Heightfield },
    Mesh { coord: IVec2, lod_index: usize, mesh: MeshData },
}

/// Handle for requesting background terrain work.
///
/// Jobs run on a fixed-size rayon pool rather than one OS thread per
/// request, so a burst of chunk requests queues up behind the pool instead
/// of fanning out into unbounded threads. A unit that panics (pathological
/// parameters) is logged and dropped without a retry; its chunk stays
/// pending.
pub struct ChunkCompute {
    pool: rayon::ThreadPool,
    results: Arc<DispatchQueue<GenResult>>,
    settings: Arc<TerrainSettings>,
}

impl ChunkCompute {
    /// Build the worker pool. `settings.worker_threads == 0` uses one
    /// worker per logical core.
    pub fn new(settings: Arc<TerrainSettings>) -> Self {
        let threads =
            if settings.worker_threads > 0 { settings.worker_threads } else { num_cpus::get() };
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("terrain-worker-{i}"))
            .build()
            .expect("failed to build terrain worker pool");
        log::info!("terrain worker pool started with {threads} threads");

        Self { pool, results: Arc::new(DispatchQueue::new()), settings }
    }

    /// The queue completed work arrives on. The controller drains it once
    /// per tick.
    pub fn results(&self) -> Arc<DispatchQueue<GenResult>> {
        Arc::clone(&self.results)
    }

    /// Generate the bordered heightfield for `coord` in the background,
    /// falloff included when configured. Exactly one request per chunk; the
    /// caller guards against duplicates.
    pub fn request_heightfield(&self, coord: IVec2) {
        let settings = Arc::clone(&self.settings);
        let results = Arc::clone(&self.results);
        log::debug!("chunk {coord}: heightfield requested");

        self.pool.spawn(move || {
            let outcome = catch_unwind(AssertUnwindSafe(|| {
                // One extra sample each side beyond the rendered area, for
                // phantom border geometry at mesh time.
                let bordered = (settings.chunk_size + 2) as usize;
                let world_offset = (coord * settings.chunk_extent() as i32).as_vec2();
                let mut field =
                    noise_field::generate(bordered, bordered, &settings.noise, world_offset);
                if settings.falloff {
                    apply_falloff(&mut field, settings.falloff_curve.as_ref());
                }
                field
            }));

            match outcome {
                Ok(field) => results.push(GenResult::Heightfield { coord, field }),
                Err(_) => {
                    log::error!("chunk {coord}: heightfield generation failed, chunk stays pending")
                }
            }
        });
    }

    /// Mesh `field` at ladder rung `lod_index` in the background. The
    /// heightfield is shared by `Arc` — the chunk keeps ownership while any
    /// number of LOD builds read it.
    pub fn request_mesh(&self, coord: IVec2, field: Arc<Heightfield>, lod_index: usize) {
        let settings = Arc::clone(&self.settings);
        let results = Arc::clone(&self.results);
        log::debug!("chunk {coord}: mesh requested for LOD rung {lod_index}");

        self.pool.spawn(move || {
            let outcome = catch_unwind(AssertUnwindSafe(|| {
                let level = settings.lods[lod_index].level;
                mesher::generate(
                    &field,
                    &settings.height_curve,
                    level,
                    settings.height_multiplier,
                    settings.connectable_chunks,
                )
            }));

            match outcome {
                Ok(mesh) => results.push(GenResult::Mesh { coord, lod_index, mesh }),
                Err(_) => log::error!(
                    "chunk {coord}: mesh generation failed for LOD rung {lod_index}, \
                     chunk stays pending"
                ),
            }
        });
    }
}

//! Per-chunk state: requested/received data, the active LOD mesh, collider
//! assignment and visibility. All methods run on the controller's thread;
//! background completions arrive here only via the controller's drain.

use std::sync::Arc;

use glam::{IVec2, Vec2};
use procgen::MeshData;
use terrain_core::{select_lod, Heightfield, Lod, TerrainSettings};

use crate::compute::ChunkCompute;

/// Everything a chunk needs to drive its own transitions: the injected
/// compute handle, the LOD ladder, and the controller's outstanding-request
/// counter.
pub(crate) struct UpdateCtx<'a> {
    pub compute: &'a ChunkCompute,
    pub ladder: &'a [Lod],
    /// Viewer distance below which the chunk wants its collision mesh.
    pub collider_distance: f32,
    pub pending: &'a mut usize,
}

/// One rung's mesh cache: requested at most once, kept once received.
struct LodMesh {
    requested: bool,
    mesh: Option<Arc<MeshData>>,
}

/// A terrain tile at one grid coordinate. Created when its coordinate first
/// enters the visible window and retained (hidden, never recreated) after
/// the window moves away.
pub struct TerrainChunk {
    coord: IVec2,
    /// Chunk centre in viewer space (world units before uniform scaling).
    position: Vec2,
    half_extent: f32,
    world_scale: f32,
    heightfield: Option<Arc<Heightfield>>,
    lod_meshes: Vec<LodMesh>,
    /// Ladder index of the mesh currently active for rendering. Only ever
    /// set to a rung whose mesh has completed.
    current_lod: Option<usize>,
    collider_lod_index: usize,
    /// One-shot: the first completed collider-rung mesh within collider
    /// distance is kept forever.
    collider_mesh: Option<Arc<MeshData>>,
    visible: bool,
}

impl TerrainChunk {
    /// Create the chunk and immediately request its heightfield — the one
    /// and only heightfield request this chunk will ever make.
    pub(crate) fn new(coord: IVec2, settings: &TerrainSettings, ctx: &mut UpdateCtx) -> Self {
        let extent = settings.chunk_extent() as f32;
        let chunk = Self {
            coord,
            position: coord.as_vec2() * extent,
            half_extent: extent / 2.0,
            world_scale: settings.uniform_scale,
            heightfield: None,
            lod_meshes: settings
                .lods
                .iter()
                .map(|_| LodMesh { requested: false, mesh: None })
                .collect(),
            current_lod: None,
            collider_lod_index: settings.collider_lod_index,
            collider_mesh: None,
            visible: false,
        };
        *ctx.pending += 1;
        ctx.compute.request_heightfield(coord);
        chunk
    }

    /// Re-evaluate distance, visibility, LOD and collider state against the
    /// current viewer position. Returns the new visibility.
    pub(crate) fn update(&mut self, viewer: Vec2, ctx: &mut UpdateCtx) -> bool {
        let distance = self.sqr_distance_to(viewer).sqrt();
        let lod_index = select_lod(ctx.ladder, distance);

        self.visible = lod_index < ctx.ladder.len();
        if self.visible {
            self.update_lod(lod_index, ctx);
        }
        if distance < ctx.collider_distance {
            self.update_collider(lod_index, ctx);
        }
        self.visible
    }

    /// Drive toward rendering at `lod_index`: apply the cached mesh if one
    /// exists, otherwise request it (once). A rung whose build is still in
    /// flight never becomes the active mesh.
    fn update_lod(&mut self, lod_index: usize, ctx: &mut UpdateCtx) {
        if self.current_lod == Some(lod_index) {
            return;
        }
        let Some(heightfield) = &self.heightfield else {
            return;
        };

        let slot = &mut self.lod_meshes[lod_index];
        if slot.mesh.is_some() {
            self.current_lod = Some(lod_index);
        } else if !slot.requested {
            slot.requested = true;
            *ctx.pending += 1;
            ctx.compute.request_mesh(self.coord, Arc::clone(heightfield), lod_index);
        }
    }

    /// Collider policy: only while the viewer is close enough to want full
    /// detail (rung 0) does the chunk take a collision mesh, and the first
    /// one it takes is final.
    fn update_collider(&mut self, lod_index: usize, ctx: &mut UpdateCtx) {
        if self.collider_mesh.is_some() || lod_index != 0 {
            return;
        }
        let Some(heightfield) = &self.heightfield else {
            return;
        };

        let slot = &mut self.lod_meshes[self.collider_lod_index];
        if let Some(mesh) = &slot.mesh {
            self.collider_mesh = Some(Arc::clone(mesh));
            log::debug!("chunk {}: collider assigned", self.coord);
        } else if !slot.requested {
            slot.requested = true;
            *ctx.pending += 1;
            ctx.compute.request_mesh(self.coord, Arc::clone(heightfield), self.collider_lod_index);
        }
    }

    /// Heightfield delivery. A duplicate (impossible under the request-once
    /// guard) would be ignored rather than replace owned data.
    pub(crate) fn on_heightfield(&mut self, field: Heightfield, viewer: Vec2, ctx: &mut UpdateCtx) {
        if self.heightfield.is_some() {
            log::warn!("chunk {}: duplicate heightfield dropped", self.coord);
            return;
        }
        self.heightfield = Some(Arc::new(field));
        self.update(viewer, ctx);
    }

    /// Mesh delivery for one rung. The mesh is always cached; whether it
    /// becomes the active mesh depends on the LOD desired *now*, so a result
    /// that went stale in flight is kept for later without being shown.
    pub(crate) fn on_mesh(
        &mut self,
        lod_index: usize,
        mesh: MeshData,
        viewer: Vec2,
        ctx: &mut UpdateCtx,
    ) {
        let slot = &mut self.lod_meshes[lod_index];
        if slot.mesh.is_none() {
            slot.mesh = Some(Arc::new(mesh));
        }
        self.update(viewer, ctx);
    }

    /// Show or hide the rendered representation. Purely visual: pending
    /// requests and cached data are untouched.
    pub(crate) fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    pub fn coord(&self) -> IVec2 {
        self.coord
    }

    /// Chunk centre in viewer space (before uniform scaling).
    pub fn position(&self) -> Vec2 {
        self.position
    }

    /// Chunk centre in host world units, uniform scale applied. The mesh
    /// itself should be scaled by [`world_scale`](Self::world_scale) at
    /// placement time.
    pub fn world_position(&self) -> Vec2 {
        self.position * self.world_scale
    }

    pub fn world_scale(&self) -> f32 {
        self.world_scale
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn has_heightfield(&self) -> bool {
        self.heightfield.is_some()
    }

    /// The owned heightfield, for texture building by the render collaborator.
    pub fn heightfield(&self) -> Option<&Arc<Heightfield>> {
        self.heightfield.as_ref()
    }

    /// Ladder index of the active render mesh.
    pub fn current_lod(&self) -> Option<usize> {
        self.current_lod
    }

    /// The mesh currently active for rendering, if any rung has completed
    /// and been selected.
    pub fn active_mesh(&self) -> Option<&Arc<MeshData>> {
        self.current_lod.and_then(|index| self.lod_meshes[index].mesh.as_ref())
    }

    /// The assigned collision mesh, if the one-shot assignment has happened.
    pub fn collider_mesh(&self) -> Option<&Arc<MeshData>> {
        self.collider_mesh.as_ref()
    }

    /// Squared distance from `point` to this chunk's bounding square.
    fn sqr_distance_to(&self, point: Vec2) -> f32 {
        let delta = (point - self.position).abs() - Vec2::splat(self.half_extent);
        delta.max(Vec2::ZERO).length_squared()
    }
}

//! Heightfield to indexed triangle mesh, with optional phantom border
//! geometry for seam-matching normals.
//!
//! A chunk's heightfield carries one extra sample on each side beyond the
//! rendered area. In connectable mode that outer ring becomes *phantom*
//! geometry: it forms triangles and feeds normal accumulation at the true
//! boundary, but its vertices never reach the output buffers. Edge normals
//! therefore already account for the first row of the neighbouring chunk,
//! so two chunks built independently meet without a lighting seam.

use glam::{Vec2, Vec3};
use terrain_core::{HeightCurve, Heightfield};

/// Finished chunk mesh. Triangle indices always reference real vertices;
/// phantom geometry exists only inside the builder.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshData {
    pub vertices: Vec<Vec3>,
    pub uvs: Vec<Vec2>,
    /// Flat index triples, counter-clockwise winding.
    pub triangles: Vec<u32>,
    /// One unit normal per vertex; zero for fully degenerate accumulations.
    pub normals: Vec<Vec3>,
}

impl MeshData {
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len() / 3
    }
}

/// Build a mesh from `field` at the given LOD level.
///
/// `lod_level` 0 samples every cell; level `n` samples every `2n`-th cell.
/// Heights pass through `height_curve` (then `height_multiplier`) here and
/// only here — the heightfield itself stays uncurved. When `connectable` is
/// set the outermost sampled ring is phantom (see module docs).
pub fn generate(
    field: &Heightfield,
    height_curve: &HeightCurve,
    lod_level: u32,
    height_multiplier: f32,
    connectable: bool,
) -> MeshData {
    // Each build evaluates a private copy of the curve: authored curves are
    // not safe to share across concurrently meshing workers.
    let curve = height_curve.clone();

    let grid_w = field.width() as i32;
    let grid_h = field.height() as i32;

    let stride = if lod_level == 0 { 1 } else { lod_level as i32 * 2 };
    let border = if connectable { 2 } else { 0 };

    // Settings validation guarantees the stride walk lands on the far edge.
    debug_assert_eq!((grid_w - 1) % stride, 0);
    debug_assert_eq!((grid_h - 1) % stride, 0);

    // Sampled extent, minus the phantom ring when connectable.
    let mesh_w = grid_w - border * stride;
    let mesh_h = grid_h - border * stride;
    // Full-detail extent used for vertex placement, so a simplified mesh
    // occupies exactly the same world rectangle as the LOD-0 mesh.
    let full_w = grid_w - border;
    let full_h = grid_h - border;

    let top_left_x = (full_w - 1) as f32 / -2.0;
    let top_left_z = (full_h - 1) as f32 / 2.0;

    let verts_x = ((mesh_w - 1) / stride + 1) as usize;
    let verts_z = ((mesh_h - 1) / stride + 1) as usize;

    // First pass: number every sampled grid position. Real vertices count up
    // from 0 in scan order; phantom ring positions count down from -1.
    let is_phantom = |x: i32, y: i32| {
        connectable && (x == 0 || y == 0 || x == grid_w - 1 || y == grid_h - 1)
    };

    let mut index_of = vec![0_i32; (grid_w * grid_h) as usize];
    let mut next_real = 0_i32;
    let mut next_phantom = -1_i32;
    let mut y = 0;
    while y < grid_h {
        let mut x = 0;
        while x < grid_w {
            let slot = (y * grid_w + x) as usize;
            if is_phantom(x, y) {
                index_of[slot] = next_phantom;
                next_phantom -= 1;
            } else {
                index_of[slot] = next_real;
                next_real += 1;
            }
            x += stride;
        }
        y += stride;
    }
    debug_assert_eq!(next_real as usize, verts_x * verts_z);

    let phantom_count = (-next_phantom - 1) as usize;
    let mut builder = MeshBuilder::new(verts_x * verts_z, phantom_count);

    // Second pass: place vertices and emit quads.
    let mut y = 0;
    while y < grid_h {
        let mut x = 0;
        while x < grid_w {
            let index = index_of[(y * grid_w + x) as usize];

            // UVs are mapped over the non-phantom extent; the phantom ring
            // lands outside [0, 1] but is never textured. Reusing the UV for
            // placement keeps real vertices at the same world position with
            // and without the phantom ring around them.
            let uv = Vec2::new(
                (x - stride) as f32 / mesh_w as f32,
                (y - stride) as f32 / mesh_h as f32,
            );
            let position = Vec3::new(
                top_left_x + uv.x * full_w as f32,
                curve.evaluate(field.get(x as usize, y as usize)) * height_multiplier,
                top_left_z - uv.y * full_h as f32,
            );
            builder.add_vertex(index, position, uv);

            if x < grid_w - 1 && y < grid_h - 1 {
                //   a - b
                //  / \ /
                // c - d
                let a = index_of[(y * grid_w + x) as usize];
                let b = index_of[(y * grid_w + x + stride) as usize];
                let c = index_of[((y + stride) * grid_w + x) as usize];
                let d = index_of[((y + stride) * grid_w + x + stride) as usize];

                // One diagonal direction across the whole grid; alternating
                // diagonals produce a herringbone shading artifact.
                builder.add_triangle(a, d, c);
                builder.add_triangle(d, a, b);
            }

            x += stride;
        }
        y += stride;
    }

    builder.build()
}

/// Accumulates real and phantom geometry during a build; only real geometry
/// survives into [`MeshData`].
struct MeshBuilder {
    vertices: Vec<Vec3>,
    uvs: Vec<Vec2>,
    triangles: Vec<u32>,
    phantom_vertices: Vec<Vec3>,
    /// Index triples where at least one index is negative (phantom).
    phantom_triangles: Vec<i32>,
}

impl MeshBuilder {
    fn new(real_count: usize, phantom_count: usize) -> Self {
        Self {
            vertices: vec![Vec3::ZERO; real_count],
            uvs: vec![Vec2::ZERO; real_count],
            triangles: Vec::with_capacity(real_count * 6),
            phantom_vertices: vec![Vec3::ZERO; phantom_count],
            phantom_triangles: Vec::new(),
        }
    }

    fn add_vertex(&mut self, index: i32, position: Vec3, uv: Vec2) {
        if index < 0 {
            self.phantom_vertices[(-index - 1) as usize] = position;
        } else {
            self.vertices[index as usize] = position;
            self.uvs[index as usize] = uv;
        }
    }

    fn add_triangle(&mut self, a: i32, b: i32, c: i32) {
        if a < 0 || b < 0 || c < 0 {
            self.phantom_triangles.extend([a, b, c]);
        } else {
            self.triangles.extend([a as u32, b as u32, c as u32]);
        }
    }

    fn position(&self, index: i32) -> Vec3 {
        if index < 0 {
            self.phantom_vertices[(-index - 1) as usize]
        } else {
            self.vertices[index as usize]
        }
    }

    /// Accumulate per-triangle face normals into every *real* vertex they
    /// touch, then normalize. Face normals stay unnormalized so larger
    /// triangles weigh more; a fully degenerate accumulation normalizes to
    /// the zero vector rather than NaN.
    fn bake_normals(&self) -> Vec<Vec3> {
        let mut normals = vec![Vec3::ZERO; self.vertices.len()];

        for tri in self.triangles.chunks_exact(3) {
            let (a, b, c) = (tri[0] as usize, tri[1] as usize, tri[2] as usize);
            let face = face_normal(self.vertices[a], self.vertices[b], self.vertices[c]);
            normals[a] += face;
            normals[b] += face;
            normals[c] += face;
        }

        // Phantom triangles contribute to the real vertices on the boundary;
        // phantom vertices themselves are write-only targets and get no
        // normal of their own.
        for tri in self.phantom_triangles.chunks_exact(3) {
            let face = face_normal(
                self.position(tri[0]),
                self.position(tri[1]),
                self.position(tri[2]),
            );
            for &index in tri {
                if index >= 0 {
                    normals[index as usize] += face;
                }
            }
        }

        for normal in &mut normals {
            *normal = normal.normalize_or_zero();
        }
        normals
    }

    fn build(self) -> MeshData {
        let normals = self.bake_normals();
        MeshData { vertices: self.vertices, uvs: self.uvs, triangles: self.triangles, normals }
    }
}

fn face_normal(a: Vec3, b: Vec3, c: Vec3) -> Vec3 {
    (b - a).cross(c - a)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2 as GVec2;
    use terrain_core::{NoiseParameters, NormalizeMode};

    fn flat_field(width: usize, height: usize) -> Heightfield {
        Heightfield::filled(width, height, 0.5)
    }

    fn noisy_field(width: usize, height: usize, world_x: f32) -> Heightfield {
        let params = NoiseParameters {
            levels: 3,
            strength: 0.5,
            attenuation: 2.0,
            offset: GVec2::ZERO,
            scale: 25.0,
            seed: 7,
            normalize: NormalizeMode::Local,
        };
        crate::noise_field::generate(width, height, &params, GVec2::new(world_x, 0.0))
    }

    #[test]
    fn vertex_and_triangle_counts_without_phantom_ring() {
        let mesh = generate(&flat_field(5, 5), &HeightCurve::linear(), 0, 1.0, false);
        assert_eq!(mesh.vertex_count(), 25);
        assert_eq!(mesh.triangle_count(), 32);
        assert_eq!(mesh.normals.len(), 25);
        assert_eq!(mesh.uvs.len(), 25);
    }

    #[test]
    fn phantom_ring_never_reaches_the_output() {
        let mesh = generate(&flat_field(5, 5), &HeightCurve::linear(), 0, 1.0, true);
        // 5×5 samples minus the border ring leaves a 3×3 real grid.
        assert_eq!(mesh.vertex_count(), 9);
        // Only quads whose four corners are all real survive: 2×2 of them.
        assert_eq!(mesh.triangle_count(), 8);
        for &index in &mesh.triangles {
            assert!((index as usize) < mesh.vertex_count(), "index {index} out of range");
        }
    }

    #[test]
    fn all_indices_valid_at_every_lod() {
        // 13×13 grid: strides 1, 2 and 4 all divide the 12-cell extent.
        let field = flat_field(13, 13);
        for (level, connectable) in
            [(0, false), (0, true), (1, false), (1, true), (2, false), (2, true)]
        {
            let mesh = generate(&field, &HeightCurve::linear(), level, 3.0, connectable);
            assert!(!mesh.vertices.is_empty());
            assert!(!mesh.triangles.is_empty());
            for &index in &mesh.triangles {
                assert!((index as usize) < mesh.vertex_count());
            }
        }
    }

    #[test]
    fn higher_lod_means_fewer_vertices() {
        let field = flat_field(13, 13);
        let full = generate(&field, &HeightCurve::linear(), 0, 1.0, false);
        let coarse = generate(&field, &HeightCurve::linear(), 2, 1.0, false);
        assert!(coarse.vertex_count() < full.vertex_count());
        // Both cover a rectangle of the same width.
        let span = |mesh: &MeshData| {
            let min = mesh.vertices.iter().map(|v| v.x).fold(f32::MAX, f32::min);
            let max = mesh.vertices.iter().map(|v| v.x).fold(f32::MIN, f32::max);
            max - min
        };
        assert!((span(&full) - span(&coarse)).abs() < 1e-4);
    }

    #[test]
    fn generation_is_idempotent() {
        let field = noisy_field(9, 9, 0.0);
        let curve = HeightCurve::new([(0.0, 0.0), (0.4, 0.1), (1.0, 1.0)]);
        let a = generate(&field, &curve, 1, 12.0, true);
        let b = generate(&field, &curve, 1, 12.0, true);
        assert_eq!(a, b);
    }

    #[test]
    fn normals_are_unit_length_or_zero() {
        let mesh = generate(&noisy_field(9, 9, 0.0), &HeightCurve::linear(), 0, 8.0, true);
        for normal in &mesh.normals {
            let len = normal.length();
            assert!(normal == &Vec3::ZERO || (len - 1.0).abs() < 1e-4, "bad normal: {normal:?}");
        }
    }

    #[test]
    fn flat_field_normals_point_up() {
        let mesh = generate(&flat_field(7, 7), &HeightCurve::linear(), 0, 5.0, true);
        for normal in &mesh.normals {
            assert!((normal.y - 1.0).abs() < 1e-5, "expected +Y, got {normal:?}");
        }
    }

    #[test]
    fn curve_applies_at_mesh_time() {
        // A constant curve flattens arbitrary heights; heights were mapped
        // through the curve exactly once, here.
        let constant = HeightCurve::new([(0.0, 0.25), (1.0, 0.25)]);
        let mesh = generate(&noisy_field(7, 7, 0.0), &constant, 0, 4.0, false);
        for vertex in &mesh.vertices {
            assert!((vertex.y - 1.0).abs() < 1e-5);
        }
    }

    /// Two adjacent connectable chunks carved from one continuous field get
    /// matching normals at their shared boundary without either seeing the
    /// other's mesh.
    #[test]
    fn seam_normals_match_between_adjacent_chunks() {
        let chunk_size = 5_usize; // bordered field is 7×7, extent 4
        let bordered = chunk_size + 2;
        let extent = chunk_size - 1;

        let big = noisy_field(bordered + extent, bordered, 0.0);
        let window = |x0: usize| {
            let mut out = Heightfield::filled(bordered, bordered, 0.0);
            for y in 0..bordered {
                for x in 0..bordered {
                    out.set(x, y, big.get(x0 + x, y));
                }
            }
            out
        };

        let left = generate(&window(0), &HeightCurve::linear(), 0, 10.0, true);
        let right = generate(&window(extent), &HeightCurve::linear(), 0, 10.0, true);

        // Real vertices form a chunk_size × chunk_size grid in scan order.
        // The left chunk's last column and the right chunk's first column
        // sit at the same world positions.
        for row in 0..chunk_size {
            let left_normal = left.normals[row * chunk_size + (chunk_size - 1)];
            let right_normal = right.normals[row * chunk_size];
            assert!(
                (left_normal - right_normal).length() < 1e-4,
                "seam mismatch on row {row}: {left_normal:?} vs {right_normal:?}"
            );
        }
    }
}

//! Regular triangulated grid on the x/z plane.
//!
//! Vertices are laid out row-major (`index = iy * (width_segments + 1) + ix`)
//! and centered at the origin with y pointing up. Each cell contributes two
//! triangles, `(a, b, d)` and `(b, c, d)`.

use glam::{Vec2, Vec3};
use tracing::warn;

use crate::utils::math::Aabb;

/// Interleaved vertex layout for renderer upload
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GridVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridParameters {
    pub width: f32,
    pub height: f32,
    pub width_segments: u32,
    pub height_segments: u32,
}

impl GridParameters {
    pub fn half_width(&self) -> f32 {
        self.width / 2.0
    }

    pub fn half_height(&self) -> f32 {
        self.height / 2.0
    }

    pub fn columns(&self) -> usize {
        self.width_segments as usize + 1
    }

    pub fn rows(&self) -> usize {
        self.height_segments as usize + 1
    }

    pub fn vertex_count(&self) -> usize {
        self.columns() * self.rows()
    }

    pub fn index_count(&self) -> usize {
        6 * self.width_segments as usize * self.height_segments as usize
    }
}

#[derive(Debug, Clone)]
pub struct GridMesh {
    parameters: GridParameters,
    positions: Vec<Vec3>,
    normals: Vec<Vec3>,
    uvs: Vec<Vec2>,
    indices: Vec<u32>,
}

impl GridMesh {
    /// Builds a `width` x `height` grid split into the given number of segments.
    ///
    /// Extents that are not positive and finite fall back to 1.0, and segment
    /// counts of zero are raised to 1.
    pub fn new(width: f32, height: f32, width_segments: u32, height_segments: u32) -> Self {
        let parameters = GridParameters {
            width: sanitize_extent(width, "width"),
            height: sanitize_extent(height, "height"),
            width_segments: width_segments.max(1),
            height_segments: height_segments.max(1),
        };

        let mut mesh = Self {
            parameters,
            positions: Vec::new(),
            normals: Vec::new(),
            uvs: Vec::new(),
            indices: Vec::new(),
        };
        mesh.generate();
        mesh
    }

    /// Square tile: the depth matches the width, as do the segment counts.
    pub fn square(width: f32, segments: u32) -> Self {
        Self::new(width, width, segments, segments)
    }

    fn generate(&mut self) {
        let p = self.parameters;
        let grid_x = p.width_segments as usize;
        let grid_y = p.height_segments as usize;
        let grid_x1 = grid_x + 1;
        let grid_y1 = grid_y + 1;

        self.positions = Vec::with_capacity(p.vertex_count());
        self.normals = Vec::with_capacity(p.vertex_count());
        self.uvs = Vec::with_capacity(p.vertex_count());
        self.indices = Vec::with_capacity(p.index_count());

        // Positions go through the normalized fraction so the outer rows and
        // columns land exactly on the half-extents.
        for iy in 0..grid_y1 {
            let fy = iy as f32 / grid_y as f32;
            let z = fy * p.height - p.half_height();

            for ix in 0..grid_x1 {
                let fx = ix as f32 / grid_x as f32;
                let x = fx * p.width - p.half_width();

                self.positions.push(Vec3::new(x, 0.0, z));
                self.normals.push(Vec3::Y);
                self.uvs.push(Vec2::new(fx, 1.0 - fy));
            }
        }

        for iy in 0..grid_y {
            for ix in 0..grid_x {
                let a = (ix + grid_x1 * iy) as u32;
                let b = (ix + grid_x1 * (iy + 1)) as u32;
                let c = (ix + 1 + grid_x1 * (iy + 1)) as u32;
                let d = (ix + 1 + grid_x1 * iy) as u32;

                self.indices.extend_from_slice(&[a, b, d]);
                self.indices.extend_from_slice(&[b, c, d]);
            }
        }
    }

    pub fn parameters(&self) -> &GridParameters {
        &self.parameters
    }

    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    pub fn positions_mut(&mut self) -> &mut [Vec3] {
        &mut self.positions
    }

    pub fn normals(&self) -> &[Vec3] {
        &self.normals
    }

    pub fn normals_mut(&mut self) -> &mut [Vec3] {
        &mut self.normals
    }

    pub fn uvs(&self) -> &[Vec2] {
        &self.uvs
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// True when (x, z) sits exactly on one of the four tile edges.
    pub fn is_edge_vertex(&self, x: f32, z: f32) -> bool {
        let half_width = self.parameters.half_width();
        let half_height = self.parameters.half_height();

        x == half_width || x == -half_width || z == half_height || z == -half_height
    }

    pub fn bounding_box(&self) -> Aabb {
        Aabb::from_points(&self.positions)
    }

    /// Area-weighted smooth normals from adjacent faces.
    pub fn compute_vertex_normals(&mut self) {
        self.normals.clear();
        self.normals.resize(self.positions.len(), Vec3::ZERO);

        for tri in self.indices.chunks_exact(3) {
            let [i0, i1, i2] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
            let v0 = self.positions[i0];
            let v1 = self.positions[i1];
            let v2 = self.positions[i2];

            let normal = (v1 - v0).cross(v2 - v0);

            self.normals[i0] += normal;
            self.normals[i1] += normal;
            self.normals[i2] += normal;
        }

        for normal in &mut self.normals {
            *normal = normal.try_normalize().unwrap_or(Vec3::Y);
        }
    }

    pub fn interleaved(&self) -> Vec<GridVertex> {
        self.positions
            .iter()
            .zip(&self.normals)
            .zip(&self.uvs)
            .map(|((p, n), uv)| GridVertex {
                position: p.to_array(),
                normal: n.to_array(),
                uv: uv.to_array(),
            })
            .collect()
    }
}

fn sanitize_extent(value: f32, name: &str) -> f32 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        warn!("Invalid grid {} {}, using 1.0", name, value);
        1.0
    }
}

//! Heightfield terrain tile.
//!
//! A [`HeightField`] owns a [`GridMesh`] whose vertex heights come from a
//! height function, and answers point queries in world space by locating the
//! triangle under (x, z). The world-space triangles used for those queries are
//! cached and rebuilt lazily whenever the geometry version or the query matrix
//! changes.

use std::cell::RefCell;
use std::fmt;

use glam::{Mat4, Vec3};
use tracing::{debug, trace, warn};

use crate::error::{TerrainError, TerrainResult};
use crate::utils::math::Triangle;
use crate::world::clamp::{CustomClamp, EdgeClamp, RoundClamp, SquareClamp};
use crate::world::grid::{GridMesh, GridParameters, GridVertex};
use crate::world::transform::Transform;

/// Maps a horizontal position (x, z) to an elevation.
///
/// Must be callable anywhere, including outside the tile: edge normal
/// reconstruction samples one stride past the boundary.
pub type HeightFn = Box<dyn Fn(f32, f32) -> f32>;

/// Height function of a field that has not been given one.
pub fn flat(_x: f32, _z: f32) -> f32 {
    0.0
}

/// Result of a point query: the containing triangle, its normal, and the
/// interpolated height.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceInfo {
    pub face: Triangle,
    pub normal: Vec3,
    pub height: f32,
}

/// Buffers modified since the renderer last uploaded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UploadFlags {
    pub positions: bool,
    pub normals: bool,
}

impl UploadFlags {
    pub fn any(&self) -> bool {
        self.positions || self.normals
    }
}

#[derive(Debug, Default)]
struct TriangleCache {
    built_for: Option<(u64, Mat4)>,
    triangles: Vec<Triangle>,
    rebuilds: u64,
}

pub struct HeightField {
    mesh: GridMesh,
    height_fn: HeightFn,
    transform: Transform,
    edge_height: Option<f32>,
    version: u64,
    cache: RefCell<TriangleCache>,
    pending_upload: UploadFlags,
}

impl HeightField {
    /// Wraps a grid with all heights left at zero.
    pub fn new(mesh: GridMesh) -> Self {
        Self {
            mesh,
            height_fn: Box::new(flat),
            transform: Transform::default(),
            edge_height: None,
            version: 0,
            cache: RefCell::new(TriangleCache::default()),
            pending_upload: UploadFlags::default(),
        }
    }

    /// Wraps a grid and immediately applies `height_fn` to it.
    pub fn with_height_function(mesh: GridMesh, height_fn: impl Fn(f32, f32) -> f32 + 'static) -> Self {
        let mut field = Self::new(mesh);
        field.apply_height_function(height_fn);
        field
    }

    pub fn mesh(&self) -> &GridMesh {
        &self.mesh
    }

    pub fn parameters(&self) -> &GridParameters {
        self.mesh.parameters()
    }

    pub fn positions(&self) -> &[Vec3] {
        self.mesh.positions()
    }

    pub fn normals(&self) -> &[Vec3] {
        self.mesh.normals()
    }

    pub fn uvs(&self) -> &[glam::Vec2] {
        self.mesh.uvs()
    }

    pub fn indices(&self) -> &[u32] {
        self.mesh.indices()
    }

    pub fn interleaved(&self) -> Vec<GridVertex> {
        self.mesh.interleaved()
    }

    /// Target height of the last edge clamp, if one has run.
    pub fn edge_height(&self) -> Option<f32> {
        self.edge_height
    }

    /// Incremented by every mutation.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// How many times the query triangle cache has been rebuilt.
    pub fn triangle_cache_rebuilds(&self) -> u64 {
        self.cache.borrow().rebuilds
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    pub fn set_transform(&mut self, transform: Transform) {
        self.transform = transform;
        self.version += 1;
    }

    pub fn matrix(&self) -> Mat4 {
        self.transform.matrix()
    }

    /// Returns and clears the set of buffers that need uploading.
    pub fn take_upload(&mut self) -> UploadFlags {
        std::mem::take(&mut self.pending_upload)
    }

    // ------------------------------------------------------------------
    // Point queries
    // ------------------------------------------------------------------

    /// World-space triangles in index order for an arbitrary matrix.
    pub fn triangles(&self, matrix: &Mat4) -> Vec<Triangle> {
        let positions = self.mesh.positions();
        let mut triangles = Vec::with_capacity(self.mesh.triangle_count());
        triangles.extend(self.mesh.indices().chunks_exact(3).map(|tri| {
            Triangle::new(
                positions[tri[0] as usize],
                positions[tri[1] as usize],
                positions[tri[2] as usize],
            )
            .transformed(matrix)
        }));
        triangles
    }

    pub fn info_at(&self, x: f32, z: f32) -> Option<SurfaceInfo> {
        self.info_at_with(x, z, &self.matrix())
    }

    /// Locates the triangle whose x/z footprint contains the point.
    ///
    /// The first triangle in index order wins, so points on shared edges
    /// resolve to the earlier triangle.
    pub fn info_at_with(&self, x: f32, z: f32, matrix: &Mat4) -> Option<SurfaceInfo> {
        let mut cache = self.cache.borrow_mut();

        if cache.built_for != Some((self.version, *matrix)) {
            cache.triangles = self.triangles(matrix);
            cache.built_for = Some((self.version, *matrix));
            cache.rebuilds += 1;
            trace!(
                "Rebuilt {} query triangles for version {}",
                cache.triangles.len(),
                self.version
            );
        }

        let info = cache.triangles.iter().find_map(|face| {
            face.sample_xz(x, z).map(|height| SurfaceInfo {
                face: *face,
                normal: face.normal(),
                height,
            })
        });
        info
    }

    /// Interpolated height, falling back to the height function off the tile.
    pub fn height_at(&self, x: f32, z: f32) -> f32 {
        self.height_at_with(x, z, &self.matrix())
    }

    pub fn height_at_with(&self, x: f32, z: f32, matrix: &Mat4) -> f32 {
        match self.info_at_with(x, z, matrix) {
            Some(info) => info.height,
            None => self.height_function_at(x, z),
        }
    }

    /// Face normal under the point. `None` off the tile.
    pub fn normal_at(&self, x: f32, z: f32) -> Option<Vec3> {
        self.normal_at_with(x, z, &self.matrix())
    }

    pub fn normal_at_with(&self, x: f32, z: f32, matrix: &Mat4) -> Option<Vec3> {
        self.info_at_with(x, z, matrix).map(|info| info.normal)
    }

    /// Evaluates the active height function directly.
    pub fn height_function_at(&self, x: f32, z: f32) -> f32 {
        (self.height_fn)(x, z)
    }

    // ------------------------------------------------------------------
    // Edge normals
    // ------------------------------------------------------------------

    /// Rebuilds boundary normals from the active height function, sampled
    /// around each edge vertex offset by the field's position.
    pub fn fix_edge_normals(&mut self) {
        let offset = self.transform.position;
        let stride = self.edge_stride();
        let fixed = reconstruct_edge_normals(&mut self.mesh, &*self.height_fn, offset, stride);
        self.pending_upload.normals = true;
        debug!("Reconstructed {} edge normals (stride {})", fixed, stride);
    }

    /// Same as [`fix_edge_normals`](Self::fix_edge_normals) with an explicit
    /// height function and sampling offset.
    pub fn fix_edge_normals_with(&mut self, height_fn: impl Fn(f32, f32) -> f32, offset: Vec3) {
        let stride = self.edge_stride();
        let fixed = reconstruct_edge_normals(&mut self.mesh, &height_fn, offset, stride);
        self.pending_upload.normals = true;
        debug!("Reconstructed {} edge normals (stride {})", fixed, stride);
    }

    /// World-space distance between columns, honoring the transform's scale.
    fn edge_stride(&self) -> f32 {
        let world_box = self.mesh.bounding_box().transformed(&self.matrix());
        world_box.size().x / self.parameters().width_segments as f32
    }

    // ------------------------------------------------------------------
    // Edge clamping
    // ------------------------------------------------------------------

    /// Blends heights near the tile boundary toward the clamp's target height
    /// and records that height as the field's edge height.
    ///
    /// Clamps compound: a second call blends the already clamped heights.
    pub fn clamp_edges(&mut self, clamp: impl Into<EdgeClamp>) {
        let clamp = clamp.into();
        let grid = *self.mesh.parameters();
        let affected = clamp.apply(&grid, self.mesh.positions_mut());
        let height = clamp.height();

        self.update_geometry();
        self.edge_height = Some(height);

        debug!(
            "Applied {} edge clamp to {} vertices (height {}, margin {})",
            clamp.name(),
            affected,
            height,
            clamp.margin()
        );
    }

    pub fn clamp_edge_height_square(&mut self, clamp: SquareClamp) {
        self.clamp_edges(clamp);
    }

    pub fn clamp_edge_height_round(&mut self, clamp: RoundClamp) {
        self.clamp_edges(clamp);
    }

    pub fn clamp_edge_height_custom(&mut self, clamp: CustomClamp) {
        self.clamp_edges(clamp);
    }

    // ------------------------------------------------------------------
    // Bulk height assignment
    // ------------------------------------------------------------------

    /// Samples `height_fn` at every vertex and makes it the active function.
    ///
    /// Only the field's translation is added to the sample coordinates;
    /// rotation and scale are not accounted for.
    pub fn apply_height_function(&mut self, height_fn: impl Fn(f32, f32) -> f32 + 'static) {
        let offset = self.transform.position;
        for p in self.mesh.positions_mut() {
            p.y = height_fn(p.x + offset.x, p.z + offset.z);
        }
        self.height_fn = Box::new(height_fn);
        self.update_geometry();
        debug!("Applied height function to {} vertices", self.mesh.vertex_count());
    }

    /// Assigns heights by grid index: `f(column, row)`.
    pub fn apply_diamond_square(&mut self, f: impl Fn(usize, usize) -> f32) {
        let columns = self.parameters().columns();
        for (index, p) in self.mesh.positions_mut().iter_mut().enumerate() {
            p.y = f(index % columns, index / columns);
        }
        self.update_geometry();
        debug!("Applied indexed heights to {} vertices", self.mesh.vertex_count());
    }

    /// Assigns a row-major array of heights, one per vertex.
    pub fn apply_height_grid(&mut self, heights: &[f32]) -> TerrainResult<()> {
        let expected = self.mesh.vertex_count();
        if heights.len() != expected {
            return Err(TerrainError::GridSizeMismatch {
                expected,
                actual: heights.len(),
            });
        }
        for (p, h) in self.mesh.positions_mut().iter_mut().zip(heights) {
            p.y = *h;
        }
        self.update_geometry();
        Ok(())
    }

    /// Shifts every height so the first corner sits at the recorded edge height.
    pub fn align_edge_height(&mut self) -> TerrainResult<()> {
        let edge_height = self.edge_height.ok_or(TerrainError::EdgeHeightUnset)?;
        let diff = self.shift_corner_to(edge_height);
        self.update_geometry();
        debug!("Aligned edge height to {} (shift {})", edge_height, diff);
        Ok(())
    }

    fn shift_corner_to(&mut self, target: f32) -> f32 {
        let positions = self.mesh.positions_mut();
        let Some(corner) = positions.first() else {
            return 0.0;
        };
        let diff = target - corner.y;
        for p in positions.iter_mut() {
            p.y += diff;
        }
        diff
    }

    /// Vertical extent of the tile: max height minus min height.
    pub fn geometry_depth(&self) -> f32 {
        self.mesh.bounding_box().size().y
    }

    /// Scales heights about y = 0 to reach `depth`, then realigns the edge
    /// height if a clamp has recorded one.
    ///
    /// A flat tile has no extent to scale and is left untouched.
    pub fn set_geometry_depth(&mut self, depth: f32) {
        let current = self.geometry_depth();
        if !depth.is_finite() || !current.is_finite() || current <= 0.0 {
            warn!("Cannot rescale depth {} to {}", current, depth);
            return;
        }

        let scale = depth / current;
        for p in self.mesh.positions_mut() {
            p.y *= scale;
        }
        if let Some(edge_height) = self.edge_height {
            self.shift_corner_to(edge_height);
        }
        self.update_geometry();
        debug!("Rescaled depth {} -> {} (factor {})", current, depth, scale);
    }

    /// Marks buffers for upload, recomputes smooth normals and invalidates
    /// the query triangles.
    fn update_geometry(&mut self) {
        self.mesh.compute_vertex_normals();
        self.pending_upload = UploadFlags {
            positions: true,
            normals: true,
        };
        self.version += 1;
    }
}

impl fmt::Debug for HeightField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HeightField")
            .field("parameters", self.mesh.parameters())
            .field("transform", &self.transform)
            .field("edge_height", &self.edge_height)
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

/// Finite-difference normals for boundary vertices, which lack real
/// neighbours past the edge. Returns the number of normals rewritten.
fn reconstruct_edge_normals(
    mesh: &mut GridMesh,
    height_fn: &dyn Fn(f32, f32) -> f32,
    offset: Vec3,
    stride: f32,
) -> usize {
    let mut fixed = 0;

    for i in 0..mesh.vertex_count() {
        let local = mesh.positions()[i];
        if !mesh.is_edge_vertex(local.x, local.z) {
            continue;
        }

        let p = local + offset;
        let right = p.x + stride;
        let left = p.x - stride;
        let up = p.z - stride;
        let down = p.z + stride;

        let sample = |x: f32, z: f32| Vec3::new(x, height_fn(x, z), z) - p;

        let fan = [
            sample(right, p.z),
            sample(p.x, down),
            sample(left, down),
            sample(left, p.z),
            sample(p.x, up),
            sample(right, up),
        ];

        let mut sum = Vec3::ZERO;
        for k in 0..fan.len() {
            let current = fan[k];
            let next = fan[(k + 1) % fan.len()];
            sum += next.cross(current);
        }

        mesh.normals_mut()[i] = sum.try_normalize().unwrap_or(Vec3::Y);
        fixed += 1;
    }

    fixed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_field() -> HeightField {
        HeightField::new(GridMesh::new(100.0, 100.0, 2, 2))
    }

    #[test]
    fn test_new_field_is_flat() {
        let field = small_field();
        assert!(field.positions().iter().all(|p| p.y == 0.0));
        assert_eq!(field.edge_height(), None);
        assert_eq!(field.height_function_at(12.0, -4.0), 0.0);
    }

    #[test]
    fn test_constructor_applies_height_function() {
        let field = HeightField::with_height_function(GridMesh::square(10.0, 2), |x: f32, _z: f32| x);
        assert_eq!(field.positions()[0].y, -5.0);
        assert_eq!(field.positions()[2].y, 5.0);
        assert_eq!(field.height_function_at(3.0, 0.0), 3.0);
    }

    #[test]
    fn test_cache_is_lazy() {
        let mut field = small_field();
        assert_eq!(field.triangle_cache_rebuilds(), 0);

        field.info_at(0.0, 0.0);
        field.info_at(10.0, 10.0);
        field.height_at(-10.0, 20.0);
        assert_eq!(field.triangle_cache_rebuilds(), 1);

        field.apply_height_function(|_x: f32, _z: f32| 2.0);
        assert_eq!(field.triangle_cache_rebuilds(), 1);
        assert_eq!(field.height_at(5.0, 5.0), 2.0);
        assert_eq!(field.triangle_cache_rebuilds(), 2);
    }

    #[test]
    fn test_cache_tracks_matrix() {
        let field = small_field();
        field.info_at(0.0, 0.0);
        let shifted = Mat4::from_translation(Vec3::new(0.0, 3.0, 0.0));
        assert_eq!(field.height_at_with(0.0, 0.0, &shifted), 3.0);
        assert_eq!(field.triangle_cache_rebuilds(), 2);
        assert_eq!(field.height_at(0.0, 0.0), 0.0);
        assert_eq!(field.triangle_cache_rebuilds(), 3);
    }

    #[test]
    fn test_set_transform_moves_queries() {
        let mut field = small_field();
        field.set_transform(Transform::from_position(Vec3::new(1000.0, 7.0, 0.0)));

        assert_eq!(field.info_at(0.0, 0.0), None);
        let info = field.info_at(1000.0, 0.0).unwrap();
        assert_eq!(info.height, 7.0);
    }

    #[test]
    fn test_edge_stride_follows_world_scale() {
        let mut field = HeightField::new(GridMesh::square(100.0, 10));
        assert_eq!(field.edge_stride(), 10.0);

        field.set_transform(Transform::default().with_scale(Vec3::new(2.0, 1.0, 2.0)));
        assert_eq!(field.edge_stride(), 20.0);
    }

    #[test]
    fn test_upload_flags() {
        let mut field = small_field();
        assert!(!field.take_upload().any());

        field.clamp_edges(SquareClamp::new(-1.0, 5.0));
        let flags = field.take_upload();
        assert!(flags.positions && flags.normals);
        assert!(!field.take_upload().any());

        field.fix_edge_normals();
        let flags = field.take_upload();
        assert!(!flags.positions && flags.normals);
    }

    #[test]
    fn test_align_requires_clamp() {
        let mut field = small_field();
        assert!(matches!(
            field.align_edge_height(),
            Err(TerrainError::EdgeHeightUnset)
        ));
    }

    #[test]
    fn test_height_grid_size_checked() {
        let mut field = small_field();
        let err = field.apply_height_grid(&[1.0; 4]).unwrap_err();
        assert!(matches!(
            err,
            TerrainError::GridSizeMismatch { expected: 9, actual: 4 }
        ));

        field.apply_height_grid(&[1.0; 9]).unwrap();
        assert!(field.positions().iter().all(|p| p.y == 1.0));
    }

    #[test]
    fn test_flat_depth_is_left_alone() {
        let mut field = small_field();
        let version = field.version();
        field.set_geometry_depth(10.0);
        assert_eq!(field.geometry_depth(), 0.0);
        assert_eq!(field.version(), version);
    }
}

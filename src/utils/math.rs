use std::fmt;

use glam::{DVec2, Mat4, Vec3};

/// Footprints whose area is below this fraction of the product of their two
/// edge lengths (the sine of the corner angle) count as degenerate.
pub const DEGENERATE_EPSILON: f64 = 1e-9;

/// Weights down to `-WEIGHT_EPSILON` still count as inside, so points on a
/// shared edge always land in one of its triangles.
pub const WEIGHT_EPSILON: f64 = 1e-9;

/// Linear interpolation between two scalars, exact at `t = 0` and `t = 1`.
#[inline]
pub fn lerp(from: f32, to: f32, t: f32) -> f32 {
    (1.0 - t) * from + t * to
}

/// A triangle in 3D space, vertices in winding order
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Triangle {
    pub a: Vec3,
    pub b: Vec3,
    pub c: Vec3,
}

impl Triangle {
    pub fn new(a: Vec3, b: Vec3, c: Vec3) -> Self {
        Self { a, b, c }
    }

    /// Geometric normal following the winding order. Zero for degenerate triangles.
    pub fn normal(&self) -> Vec3 {
        (self.b - self.a).cross(self.c - self.a).normalize_or_zero()
    }

    pub fn transformed(&self, matrix: &Mat4) -> Self {
        Self {
            a: matrix.transform_point3(self.a),
            b: matrix.transform_point3(self.b),
            c: matrix.transform_point3(self.c),
        }
    }

    /// Barycentric weights of (x, z) against the triangle's footprint on the x/z plane.
    ///
    /// Returns `None` when the footprint has no area.
    pub fn barycentric_xz(&self, x: f32, z: f32) -> Option<[f32; 3]> {
        self.weights_xz(x, z)
            .map(|[w1, w2, w3]| [w1 as f32, w2 as f32, w3 as f32])
    }

    /// Interpolated height at (x, z) if the footprint contains the point.
    pub fn sample_xz(&self, x: f32, z: f32) -> Option<f32> {
        let weights = self.weights_xz(x, z)?;
        if weights.iter().any(|w| *w < -WEIGHT_EPSILON) {
            return None;
        }
        let [_, w2, w3] = weights;

        let (y1, y2, y3) = (self.a.y as f64, self.b.y as f64, self.c.y as f64);
        Some((y1 + w2 * (y2 - y1) + w3 * (y3 - y1)) as f32)
    }

    /// Weights in f64, each taken from the query point's own offsets to the
    /// vertices rather than as `1 - w2 - w3`.
    fn weights_xz(&self, x: f32, z: f32) -> Option<[f64; 3]> {
        let footprint = |v: Vec3| DVec2::new(v.x as f64, v.z as f64);
        let (v1, v2, v3) = (footprint(self.a), footprint(self.b), footprint(self.c));
        let p = DVec2::new(x as f64, z as f64);

        let (e2, e3) = (v2 - v1, v3 - v1);
        let denom = e3.perp_dot(e2);
        let span = (e2.length_squared() * e3.length_squared()).sqrt();
        if !denom.is_finite() || denom.abs() <= DEGENERATE_EPSILON * span {
            return None;
        }

        let w1 = (v3 - p).perp_dot(v2 - p) / denom;
        let w2 = (v1 - p).perp_dot(v3 - p) / denom;
        let w3 = (v2 - p).perp_dot(v1 - p) / denom;
        Some([w1, w2, w3])
    }
}

impl fmt::Display for Triangle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[({}, {}, {}), ({}, {}, {}), ({}, {}, {})]",
            self.a.x, self.a.y, self.a.z,
            self.b.x, self.b.y, self.b.z,
            self.c.x, self.c.y, self.c.z
        )
    }
}

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// An inverted box that any point expands.
    pub fn empty() -> Self {
        Self {
            min: Vec3::splat(f32::INFINITY),
            max: Vec3::splat(f32::NEG_INFINITY),
        }
    }

    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Vec3>) -> Self {
        points.into_iter().fold(Self::empty(), |mut bbox, p| {
            bbox.expand(*p);
            bbox
        })
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    pub fn expand(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    pub fn size(&self) -> Vec3 {
        if self.is_empty() {
            Vec3::ZERO
        } else {
            self.max - self.min
        }
    }

    /// Bounding box of this box's eight corners after transformation.
    pub fn transformed(&self, matrix: &Mat4) -> Self {
        if self.is_empty() {
            return *self;
        }
        let mut out = Self::empty();
        for i in 0..8 {
            let corner = Vec3::new(
                if i & 1 == 0 { self.min.x } else { self.max.x },
                if i & 2 == 0 { self.min.y } else { self.max.y },
                if i & 4 == 0 { self.min.z } else { self.max.z },
            );
            out.expand(matrix.transform_point3(corner));
        }
        out
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_triangle() -> Triangle {
        Triangle::new(
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(0.0, 0.0, 1.0),
            Vec3::new(1.0, 0.0, 0.0),
        )
    }

    #[test]
    fn test_weights_inside_sum_to_one() {
        let tri = unit_triangle();
        let [w1, w2, w3] = tri.barycentric_xz(0.25, 0.25).unwrap();
        assert!(w1 >= 0.0 && w2 >= 0.0 && w3 >= 0.0);
        assert!((w1 + w2 + w3 - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_weights_outside_have_negative() {
        let tri = unit_triangle();
        let weights = tri.barycentric_xz(1.0, 1.0).unwrap();
        assert!(weights.iter().any(|w| *w < 0.0));

        let weights = tri.barycentric_xz(-0.1, 0.5).unwrap();
        assert!(weights.iter().any(|w| *w < 0.0));
    }

    #[test]
    fn test_weights_at_vertices() {
        let tri = unit_triangle();
        let weights = tri.barycentric_xz(0.0, 0.0).unwrap();
        assert!((weights[0] - 1.0).abs() < 1e-6);
        assert!(weights[1].abs() < 1e-6);
        assert!(weights[2].abs() < 1e-6);
    }

    #[test]
    fn test_degenerate_has_no_weights() {
        let collinear = Triangle::new(
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 5.0, 1.0),
            Vec3::new(2.0, 0.0, 2.0),
        );
        assert!(collinear.barycentric_xz(1.0, 1.0).is_none());

        let point = Triangle::new(Vec3::ONE, Vec3::ONE, Vec3::ONE);
        assert!(point.barycentric_xz(1.0, 1.0).is_none());
    }

    #[test]
    fn test_points_on_a_shared_column_edge_hit_both_sides() {
        // Column x = -484.375 of a 1000 wide, 64 segment grid, between rows 0 and 1.
        let (x_left, x, x_right) = (-500.0_f32, -484.375_f32, -468.75_f32);
        let (z0, z1) = (-500.0_f32, -484.375_f32);
        let right_cell = Triangle::new(
            Vec3::new(x, 1.0, z0),
            Vec3::new(x, 2.0, z1),
            Vec3::new(x_right, 3.0, z0),
        );
        let left_cell = Triangle::new(
            Vec3::new(x_left, 4.0, z1),
            Vec3::new(x, 2.0, z1),
            Vec3::new(x, 1.0, z0),
        );

        for i in 0..100 {
            let z = z0 + (z1 - z0) * (i as f32 + 0.5) / 100.0;
            let right = right_cell.sample_xz(x, z).expect("right triangle contains the edge");
            let left = left_cell.sample_xz(x, z).expect("left triangle contains the edge");
            assert!((right - left).abs() < 1e-5);
            assert!((1.0..=2.0).contains(&right));
        }
    }

    #[test]
    fn test_sample_outside_is_none() {
        let tri = unit_triangle();
        assert!(tri.sample_xz(0.75, 0.75).is_none());
        assert!(tri.sample_xz(-0.001, 0.5).is_none());
        assert_eq!(tri.sample_xz(0.25, 0.25), Some(0.0));
    }

    #[test]
    fn test_tiny_footprint_is_not_degenerate() {
        let s = 1e-6_f32;
        let tri = Triangle::new(
            Vec3::new(0.0, 2.0, 0.0),
            Vec3::new(0.0, 2.0, s),
            Vec3::new(s, 2.0, 0.0),
        );
        assert!(tri.barycentric_xz(0.25 * s, 0.25 * s).is_some());
        assert_eq!(tri.sample_xz(0.25 * s, 0.25 * s), Some(2.0));
    }

    #[test]
    fn test_level_triangle_height_is_exact() {
        let h = 3.7_f32;
        let tri = Triangle::new(
            Vec3::new(-1.0, h, -1.0),
            Vec3::new(-1.0, h, 2.0),
            Vec3::new(2.0, h, -1.0),
        );
        assert_eq!(tri.sample_xz(0.1234, 0.4321), Some(h));
    }

    #[test]
    fn test_sloped_interpolation() {
        let tri = Triangle::new(
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(0.0, 0.0, 1.0),
            Vec3::new(1.0, 2.0, 0.0),
        );
        let height = tri.sample_xz(0.5, 0.0).unwrap();
        assert!((height - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_normal_points_up_for_grid_winding() {
        assert_eq!(unit_triangle().normal(), Vec3::Y);
    }

    #[test]
    fn test_aabb_transform() {
        let bbox = Aabb::from_points(&[Vec3::new(-1.0, 0.0, -1.0), Vec3::new(1.0, 2.0, 1.0)]);
        assert_eq!(bbox.size(), Vec3::new(2.0, 2.0, 2.0));

        let scaled = bbox.transformed(&Mat4::from_scale(Vec3::new(3.0, 1.0, 1.0)));
        assert_eq!(scaled.size(), Vec3::new(6.0, 2.0, 2.0));
        assert_eq!(Aabb::empty().size(), Vec3::ZERO);
    }

    #[test]
    fn test_lerp() {
        assert_eq!(lerp(2.0, -4.0, 0.0), 2.0);
        assert_eq!(lerp(2.0, -4.0, 1.0), -4.0);
        assert_eq!(lerp(0.0, 10.0, 0.5), 5.0);
    }
}

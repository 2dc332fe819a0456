//! Edge clamping: blend heights near the tile boundary toward a target.
//!
//! Each variant measures how far a vertex sits past the safe interior and
//! blends its height toward the target by `min(1, distance / margin)`.
//! Options are sanitized rather than rejected: a margin below 1 (or NaN)
//! becomes 1, and non-finite heights and offsets become 0.

use std::fmt;

use glam::Vec3;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::utils::easing::Easing;
use crate::utils::math::lerp;
use crate::world::grid::GridParameters;

pub const MIN_MARGIN: f32 = 1.0;

/// Falloff measured per axis from the tile edges, with rounded corners.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SquareClamp {
    pub height: f32,
    pub margin: f32,
}

impl SquareClamp {
    pub fn new(height: f32, margin: f32) -> Self {
        Self { height, margin }
    }
}

impl Default for SquareClamp {
    fn default() -> Self {
        Self {
            height: 0.0,
            margin: MIN_MARGIN,
        }
    }
}

/// Radial falloff around an optional center, shaped by an easing curve.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct RoundClamp {
    pub height: f32,
    pub margin: f32,
    pub easing: Easing,
    pub offset_x: f32,
    pub offset_z: f32,
}

impl RoundClamp {
    pub fn new(height: f32, margin: f32) -> Self {
        Self {
            height,
            margin,
            ..Self::default()
        }
    }

    pub fn with_easing(mut self, easing: impl Into<Easing>) -> Self {
        self.easing = easing.into();
        self
    }

    pub fn with_offset(mut self, offset_x: f32, offset_z: f32) -> Self {
        self.offset_x = offset_x;
        self.offset_z = offset_z;
        self
    }
}

impl Default for RoundClamp {
    fn default() -> Self {
        Self {
            height: 0.0,
            margin: MIN_MARGIN,
            easing: Easing::Linear,
            offset_x: 0.0,
            offset_z: 0.0,
        }
    }
}

/// Radial falloff whose distance is perturbed by a caller-supplied function,
/// e.g. noise for an irregular coastline.
pub struct CustomClamp {
    pub height: f32,
    pub margin: f32,
    pub offset_x: f32,
    pub offset_z: f32,
    pub distance: Box<dyn Fn(f32, f32) -> f32>,
}

impl CustomClamp {
    pub fn new(distance: impl Fn(f32, f32) -> f32 + 'static) -> Self {
        Self {
            height: 0.0,
            margin: MIN_MARGIN,
            offset_x: 0.0,
            offset_z: 0.0,
            distance: Box::new(distance),
        }
    }

    pub fn with_height(mut self, height: f32) -> Self {
        self.height = height;
        self
    }

    pub fn with_margin(mut self, margin: f32) -> Self {
        self.margin = margin;
        self
    }

    pub fn with_offset(mut self, offset_x: f32, offset_z: f32) -> Self {
        self.offset_x = offset_x;
        self.offset_z = offset_z;
        self
    }
}

impl fmt::Debug for CustomClamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomClamp")
            .field("height", &self.height)
            .field("margin", &self.margin)
            .field("offset_x", &self.offset_x)
            .field("offset_z", &self.offset_z)
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
pub enum EdgeClamp {
    Square(SquareClamp),
    Round(RoundClamp),
    Custom(CustomClamp),
}

impl From<SquareClamp> for EdgeClamp {
    fn from(clamp: SquareClamp) -> Self {
        EdgeClamp::Square(clamp)
    }
}

impl From<RoundClamp> for EdgeClamp {
    fn from(clamp: RoundClamp) -> Self {
        EdgeClamp::Round(clamp)
    }
}

impl From<CustomClamp> for EdgeClamp {
    fn from(clamp: CustomClamp) -> Self {
        EdgeClamp::Custom(clamp)
    }
}

impl EdgeClamp {
    pub fn name(&self) -> &'static str {
        match self {
            EdgeClamp::Square(_) => "square",
            EdgeClamp::Round(_) => "round",
            EdgeClamp::Custom(_) => "custom",
        }
    }

    /// Target height, after sanitizing.
    pub fn height(&self) -> f32 {
        let raw = match self {
            EdgeClamp::Square(c) => c.height,
            EdgeClamp::Round(c) => c.height,
            EdgeClamp::Custom(c) => c.height,
        };
        sanitize_finite(raw, "height")
    }

    /// Blend width, after sanitizing.
    pub fn margin(&self) -> f32 {
        let raw = match self {
            EdgeClamp::Square(c) => c.margin,
            EdgeClamp::Round(c) => c.margin,
            EdgeClamp::Custom(c) => c.margin,
        };
        sanitize_margin(raw)
    }

    fn offset(&self) -> (f32, f32) {
        let (x, z) = match self {
            EdgeClamp::Square(_) => (0.0, 0.0),
            EdgeClamp::Round(c) => (c.offset_x, c.offset_z),
            EdgeClamp::Custom(c) => (c.offset_x, c.offset_z),
        };
        (sanitize_finite(x, "offset_x"), sanitize_finite(z, "offset_z"))
    }

    /// Blends every position in place. Returns how many vertices fell inside the margin.
    pub fn apply(&self, grid: &GridParameters, positions: &mut [Vec3]) -> usize {
        let height = self.height();
        let margin = self.margin();
        let offset = self.offset();

        let mut affected = 0;
        for p in positions.iter_mut() {
            if let Some(amount) = self.blend_amount(grid, margin, offset, p.x, p.z) {
                p.y = lerp(p.y, height, amount);
                affected += 1;
            }
        }
        affected
    }

    /// Eased blend factor toward the target, or `None` inside the safe interior.
    fn blend_amount(
        &self,
        grid: &GridParameters,
        margin: f32,
        (offset_x, offset_z): (f32, f32),
        x: f32,
        z: f32,
    ) -> Option<f32> {
        match self {
            EdgeClamp::Square(_) => {
                let margin_start_x = grid.half_width() - margin;
                let margin_start_z = grid.half_height() - margin;

                let past_x = x.abs() - margin_start_x;
                let past_z = z.abs() - margin_start_z;

                let distance = if past_x > 0.0 && past_z > 0.0 {
                    // rounded corners
                    (past_x * past_x + past_z * past_z).sqrt()
                } else if past_x > 0.0 {
                    past_x
                } else if past_z > 0.0 {
                    past_z
                } else {
                    return None;
                };

                Some((distance / margin).min(1.0))
            }
            EdgeClamp::Round(clamp) => {
                let radius = grid.width.min(grid.height) / 2.0 - margin;
                let dist = radial_distance(x, z, offset_x, offset_z);
                if dist > radius {
                    let amount = ((dist - radius) / margin).min(1.0);
                    Some(clamp.easing.ease(amount))
                } else {
                    None
                }
            }
            EdgeClamp::Custom(clamp) => {
                let radius = grid.width / 2.0 - margin;
                let dist = radial_distance(x, z, offset_x, offset_z) + (clamp.distance)(x, z);
                if dist > radius {
                    Some(((dist - radius) / margin).min(1.0))
                } else {
                    None
                }
            }
        }
    }
}

fn radial_distance(x: f32, z: f32, offset_x: f32, offset_z: f32) -> f32 {
    let dx = x - offset_x;
    let dz = z - offset_z;
    (dx * dx + dz * dz).sqrt()
}

fn sanitize_margin(margin: f32) -> f32 {
    if margin.is_nan() {
        warn!("Clamp margin is NaN, using {}", MIN_MARGIN);
        MIN_MARGIN
    } else {
        margin.max(MIN_MARGIN)
    }
}

fn sanitize_finite(value: f32, name: &str) -> f32 {
    if value.is_finite() {
        value
    } else {
        warn!("Clamp {} {} is not finite, using 0", name, value);
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::grid::GridMesh;

    fn grid(width: f32, segments: u32) -> GridMesh {
        GridMesh::square(width, segments)
    }

    #[test]
    fn test_margin_is_floored() {
        assert_eq!(EdgeClamp::from(SquareClamp::new(0.0, 0.25)).margin(), 1.0);
        assert_eq!(EdgeClamp::from(SquareClamp::new(0.0, -8.0)).margin(), 1.0);
        assert_eq!(EdgeClamp::from(SquareClamp::new(0.0, f32::NAN)).margin(), 1.0);
        assert_eq!(EdgeClamp::from(SquareClamp::new(0.0, 12.0)).margin(), 12.0);
    }

    #[test]
    fn test_non_finite_height_becomes_zero() {
        assert_eq!(EdgeClamp::from(RoundClamp::new(f32::NAN, 5.0)).height(), 0.0);
        assert_eq!(EdgeClamp::from(RoundClamp::new(f32::INFINITY, 5.0)).height(), 0.0);
    }

    #[test]
    fn test_square_corner_and_center() {
        let mut mesh = grid(100.0, 2);
        let params = *mesh.parameters();
        let affected = EdgeClamp::from(SquareClamp::new(-5.0, 10.0)).apply(&params, mesh.positions_mut());

        // Every vertex except the center sits on the edge.
        assert_eq!(affected, 8);
        assert_eq!(mesh.positions()[0].y, -5.0);
        assert_eq!(mesh.positions()[4].y, 0.0);
        assert_eq!(mesh.positions()[1].y, -5.0);
    }

    #[test]
    fn test_square_partial_blend() {
        let params = *grid(100.0, 4).parameters();
        let mut positions = vec![Vec3::new(45.0, 10.0, 0.0)];
        EdgeClamp::from(SquareClamp::new(0.0, 10.0)).apply(&params, &mut positions);
        // 5 units into a 10 unit margin: halfway.
        assert!((positions[0].y - 5.0).abs() < 1e-5);
    }

    #[test]
    fn test_square_rounded_corner() {
        let params = *grid(100.0, 4).parameters();
        let mut positions = vec![Vec3::new(43.0, 10.0, 44.0)];
        EdgeClamp::from(SquareClamp::new(0.0, 10.0)).apply(&params, &mut positions);
        // 3-4-5 triangle from the margin corner at (40, 40).
        assert!((positions[0].y - 5.0).abs() < 1e-5);
    }

    #[test]
    fn test_round_leaves_interior() {
        let params = *grid(100.0, 4).parameters();
        let mut positions = vec![Vec3::new(10.0, 7.0, 10.0)];
        let affected = EdgeClamp::from(RoundClamp::new(-3.0, 20.0)).apply(&params, &mut positions);
        assert_eq!(affected, 0);
        assert_eq!(positions[0].y, 7.0);
    }

    #[test]
    fn test_round_applies_easing() {
        let params = *grid(100.0, 4).parameters();
        // radius = 50 - 20 = 30; x = 40 is halfway through the margin
        let mut linear = vec![Vec3::new(40.0, 10.0, 0.0)];
        let mut eased = linear.clone();
        EdgeClamp::from(RoundClamp::new(0.0, 20.0)).apply(&params, &mut linear);
        EdgeClamp::from(RoundClamp::new(0.0, 20.0).with_easing(Easing::QuadIn))
            .apply(&params, &mut eased);

        assert!((linear[0].y - 5.0).abs() < 1e-5);
        assert!((eased[0].y - 7.5).abs() < 1e-5);
    }

    #[test]
    fn test_round_offset_moves_center() {
        let params = *grid(100.0, 4).parameters();
        let mut positions = vec![Vec3::new(0.0, 10.0, 0.0)];
        EdgeClamp::from(RoundClamp::new(0.0, 10.0).with_offset(45.0, 0.0))
            .apply(&params, &mut positions);
        // radius 40, distance 45 from the shifted center
        assert!((positions[0].y - 5.0).abs() < 1e-5);
    }

    #[test]
    fn test_custom_distance_shifts_boundary() {
        let params = *grid(100.0, 4).parameters();
        let mut untouched = vec![Vec3::new(30.0, 10.0, 0.0)];
        let mut pushed = untouched.clone();

        EdgeClamp::from(CustomClamp::new(|_, _| 0.0).with_margin(10.0)).apply(&params, &mut untouched);
        EdgeClamp::from(CustomClamp::new(|_, _| 15.0).with_margin(10.0)).apply(&params, &mut pushed);

        assert_eq!(untouched[0].y, 10.0);
        // 30 + 15 = 45 against radius 40: halfway.
        assert!((pushed[0].y - 5.0).abs() < 1e-5);
    }

    #[test]
    fn test_custom_radius_uses_width() {
        let params = *GridMesh::new(100.0, 40.0, 2, 2).parameters();
        let mut positions = vec![Vec3::new(0.0, 10.0, 25.0)];
        let affected = EdgeClamp::from(CustomClamp::new(|_, _| 0.0).with_margin(10.0))
            .apply(&params, &mut positions);
        // radius = 100 / 2 - 10 = 40
        assert_eq!(affected, 0);
    }
}

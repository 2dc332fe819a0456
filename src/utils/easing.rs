//! Easing curves for shaping edge falloff.
//!
//! Every named curve maps 0 to 0 and 1 to 1. Caller-supplied curves are
//! applied as-is without validation.

use std::f32::consts::PI;

use serde::{Deserialize, Serialize};

/// Signature of an easing curve.
pub type EaseFn = fn(f32) -> f32;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Easing {
    #[default]
    Linear,
    QuadIn,
    QuadOut,
    QuadInOut,
    CubicIn,
    CubicOut,
    CubicInOut,
    SineIn,
    SineOut,
    SineInOut,
    Smoothstep,
    /// Caller-supplied curve. Not representable in settings files.
    #[serde(skip)]
    Custom(EaseFn),
}

impl Easing {
    pub fn ease(self, t: f32) -> f32 {
        match self {
            Easing::Linear => t,
            Easing::QuadIn => quad_in(t),
            Easing::QuadOut => quad_out(t),
            Easing::QuadInOut => quad_in_out(t),
            Easing::CubicIn => cubic_in(t),
            Easing::CubicOut => cubic_out(t),
            Easing::CubicInOut => cubic_in_out(t),
            Easing::SineIn => sine_in(t),
            Easing::SineOut => sine_out(t),
            Easing::SineInOut => sine_in_out(t),
            Easing::Smoothstep => smoothstep(t),
            Easing::Custom(f) => f(t),
        }
    }
}

impl From<EaseFn> for Easing {
    fn from(f: EaseFn) -> Self {
        Easing::Custom(f)
    }
}

pub fn quad_in(t: f32) -> f32 {
    t * t
}

pub fn quad_out(t: f32) -> f32 {
    1.0 - (1.0 - t) * (1.0 - t)
}

pub fn quad_in_out(t: f32) -> f32 {
    if t < 0.5 {
        2.0 * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
    }
}

pub fn cubic_in(t: f32) -> f32 {
    t * t * t
}

pub fn cubic_out(t: f32) -> f32 {
    1.0 - (1.0 - t).powi(3)
}

pub fn cubic_in_out(t: f32) -> f32 {
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
    }
}

pub fn sine_in(t: f32) -> f32 {
    1.0 - (t * PI / 2.0).cos()
}

pub fn sine_out(t: f32) -> f32 {
    (t * PI / 2.0).sin()
}

pub fn sine_in_out(t: f32) -> f32 {
    -((PI * t).cos() - 1.0) / 2.0
}

pub fn smoothstep(t: f32) -> f32 {
    t * t * (3.0 - 2.0 * t)
}

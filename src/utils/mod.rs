pub mod easing;
pub mod logging;
pub mod math;

pub use easing::{EaseFn, Easing};
pub use math::{lerp, Aabb, Triangle};

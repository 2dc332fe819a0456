// SLV-Heightfield: terrain tiles for the SLV viewer
// Heightfield grids, point queries and edge blending

pub mod config;
pub mod error;
pub mod utils;
pub mod world;

// Re-export commonly used types for convenience
pub use config::{TerrainSettings, load_settings, save_settings};
pub use error::{TerrainError, TerrainResult};
pub use utils::{Easing, Triangle};
pub use world::{
    CustomClamp, EdgeClamp, GridMesh, HeightField, RoundClamp, SquareClamp, SurfaceInfo,
    Transform,
};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");

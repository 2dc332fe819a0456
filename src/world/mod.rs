pub mod clamp;
pub mod grid;
pub mod terrain;
pub mod transform;

// Re-export the terrain surface for easier access
pub use clamp::{CustomClamp, EdgeClamp, RoundClamp, SquareClamp};
pub use grid::{GridMesh, GridParameters, GridVertex};
pub use terrain::{flat, HeightField, HeightFn, SurfaceInfo, UploadFlags};
pub use transform::Transform;

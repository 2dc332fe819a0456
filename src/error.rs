use thiserror::Error;

#[derive(Debug, Error)]
pub enum TerrainError {
    #[error("Edge height is unset: run an edge clamp before aligning")]
    EdgeHeightUnset,

    #[error("Height grid size mismatch: expected {expected} samples, got {actual}")]
    GridSizeMismatch { expected: usize, actual: usize },

    #[error("No platform configuration directory available")]
    NoConfigDir,

    #[error("Settings I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Settings parse failed: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Settings serialize failed: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),
}

pub type TerrainResult<T> = Result<T, TerrainError>;

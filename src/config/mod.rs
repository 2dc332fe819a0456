pub mod settings;

// Re-export commonly used types
pub use settings::{
    ClampSettings, GridSettings, TerrainSettings,
    settings_path, save_settings, load_settings, save_settings_to, load_settings_from,
};

use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{TerrainError, TerrainResult};
use crate::world::clamp::{EdgeClamp, RoundClamp, SquareClamp};
use crate::world::grid::GridMesh;
use crate::world::terrain::HeightField;

const SETTINGS_FILE: &str = "terrain.toml";

// =============================================================================
// Terrain Configuration
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridSettings {
    pub width: f32,
    /// Defaults to `width`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<f32>,
    pub width_segments: u32,
    /// Defaults to `width_segments`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height_segments: Option<u32>,
}

impl Default for GridSettings {
    fn default() -> Self {
        Self {
            width: 1000.0,
            height: None,
            width_segments: 64,
            height_segments: None,
        }
    }
}

impl GridSettings {
    pub fn build(&self) -> GridMesh {
        GridMesh::new(
            self.width,
            self.height.unwrap_or(self.width),
            self.width_segments,
            self.height_segments.unwrap_or(self.width_segments),
        )
    }
}

/// Edge clamp applied after the height function. The custom variant takes a
/// closure and can only be configured in code.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClampSettings {
    None,
    Square(SquareClamp),
    Round(RoundClamp),
}

impl Default for ClampSettings {
    fn default() -> Self {
        ClampSettings::Square(SquareClamp::new(-50.0, 200.0))
    }
}

impl ClampSettings {
    pub fn to_edge_clamp(&self) -> Option<EdgeClamp> {
        match self {
            ClampSettings::None => None,
            ClampSettings::Square(clamp) => Some(EdgeClamp::Square(*clamp)),
            ClampSettings::Round(clamp) => Some(EdgeClamp::Round(*clamp)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainSettings {
    /// Target vertical extent applied after clamping
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depth: Option<f32>,
    pub fix_edge_normals: bool,
    pub grid: GridSettings,
    pub clamp: ClampSettings,
}

impl Default for TerrainSettings {
    fn default() -> Self {
        Self {
            depth: None,
            fix_edge_normals: true,
            grid: GridSettings::default(),
            clamp: ClampSettings::default(),
        }
    }
}

impl TerrainSettings {
    pub fn from_toml_str(data: &str) -> TerrainResult<Self> {
        Ok(toml::from_str(data)?)
    }

    pub fn to_toml_string(&self) -> TerrainResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Builds a field and runs the configured pipeline: height function,
    /// edge clamp, depth rescale, edge normal fix.
    pub fn build_field(&self, height_fn: impl Fn(f32, f32) -> f32 + 'static) -> HeightField {
        let mut field = HeightField::with_height_function(self.grid.build(), height_fn);

        if let Some(clamp) = self.clamp.to_edge_clamp() {
            field.clamp_edges(clamp);
        }
        if let Some(depth) = self.depth {
            field.set_geometry_depth(depth);
        }
        if self.fix_edge_normals {
            field.fix_edge_normals();
        }

        debug!("Built terrain field from settings: {:?}", field);
        field
    }
}

// Settings file management
pub fn settings_path() -> Option<PathBuf> {
    ProjectDirs::from("com", "slv", "slv-heightfield")
        .map(|proj| proj.config_dir().join(SETTINGS_FILE))
}

pub fn save_settings_to(settings: &TerrainSettings, path: &Path) -> TerrainResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, settings.to_toml_string()?)?;
    Ok(())
}

pub fn load_settings_from(path: &Path) -> TerrainResult<TerrainSettings> {
    let data = fs::read_to_string(path)?;
    TerrainSettings::from_toml_str(&data)
}

pub fn save_settings(settings: &TerrainSettings) -> TerrainResult<()> {
    let path = settings_path().ok_or(TerrainError::NoConfigDir)?;
    save_settings_to(settings, &path)
}

/// Loads the user's settings file. A missing or unreadable file yields `None`.
pub fn load_settings() -> Option<TerrainSettings> {
    let path = settings_path()?;
    if !path.exists() {
        return None;
    }
    match load_settings_from(&path) {
        Ok(settings) => Some(settings),
        Err(e) => {
            warn!("Ignoring settings file {}: {}", path.display(), e);
            None
        }
    }
}

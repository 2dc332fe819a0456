use anyhow::Context;
use tracing::info;

use slv_heightfield::config::{load_settings, save_settings, settings_path, TerrainSettings};
use slv_heightfield::utils::logging::{init_logging, log_system_info};
use slv_heightfield::VERSION;

const FRAMES: u32 = 600;
const FRAME_MS: f32 = 1000.0 / 60.0;

/// Rolling hills, always above zero before clamping.
fn rolling_hills(size: f32) -> impl Fn(f32, f32) -> f32 {
    let frequency = 5.0 * std::f32::consts::TAU / size;
    move |x, z| {
        let value = (x * frequency).sin() * (z * frequency * 0.7).cos() + 1.0;
        value.powi(3) * size / 100.0
    }
}

fn main() -> anyhow::Result<()> {
    init_logging();
    log_system_info();
    info!("slv-heightfield {}", VERSION);

    let write_defaults = std::env::args().any(|arg| arg == "--write-settings");

    let settings = match load_settings() {
        Some(settings) => {
            info!("Loaded settings from {:?}", settings_path());
            settings
        }
        None => TerrainSettings::default(),
    };

    if write_defaults {
        save_settings(&settings).context("writing terrain settings")?;
        info!("Wrote settings to {:?}", settings_path());
    }

    let size = settings.grid.width;
    let field = settings.build_field(rolling_hills(size));

    let params = field.parameters();
    info!(
        "Terrain {}x{} with {}x{} segments, depth {:.2}, edge height {:?}",
        params.width,
        params.height,
        params.width_segments,
        params.height_segments,
        field.geometry_depth(),
        field.edge_height()
    );

    // Walk a marker around the tile the way a render loop would each frame.
    for frame in 0..FRAMES {
        let timer = frame as f32 * FRAME_MS;
        let x = (timer / 2000.0).sin() * size / 4.0;
        let z = (timer / 2000.0).cos() * size / 4.0;

        let height = field.height_at(x, z);
        if frame % 60 == 0 {
            let normal = field.normal_at(x, z);
            info!(
                "frame {:>3}: marker at ({:.1}, {:.2}, {:.1}) normal {:?}",
                frame, x, height, z, normal
            );
        }
    }

    info!("Triangle cache rebuilt {} time(s)", field.triangle_cache_rebuilds());
    Ok(())
}

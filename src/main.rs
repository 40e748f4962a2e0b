//! Peg Leg engine headless harness.
//!
//! Runs the engine core without a renderer or mixer:
//! - **configparser** INI settings from `./config.ini`
//! - a JSON asset manifest served by an in-memory resource loader
//! - a JSON level definition spawned through the actor factory
//! - a logging audio thread on the other end of the audio channel
//!
//! # Main Loop
//!
//! 1. Initialize logging and load the configuration (defaults if missing)
//! 2. Load the asset manifest and the level
//! 3. Tick `headless_frames` times at the target frame rate
//! 4. Shut the session down and join the audio thread
//!
//! # Running
//!
//! ```sh
//! RUST_LOG=debug cargo run --release
//! ```

use log::{error, info, warn};
use peglegengine::game::{Game, TickOutcome};
use peglegengine::resources::definition::DefinitionNode;
use peglegengine::resources::gameconfig::GameConfig;
use peglegengine::resources::loader::MemoryLoader;
use peglegengine::resources::palette::Palette;
use peglegengine::systems::audio::spawn_audio_thread;
use std::rc::Rc;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("Peg Leg engine starting");
    let mut config = GameConfig::new();
    if let Err(e) = config.load_from_file() {
        warn!("{}, using defaults", e);
    }

    let loader = match std::fs::read_to_string(&config.manifest_path) {
        Ok(json) => MemoryLoader::from_manifest_str(&json).unwrap_or_else(|e| {
            error!("{}", e);
            MemoryLoader::new()
        }),
        Err(e) => {
            warn!(
                "No asset manifest at {}: {}",
                config.manifest_path.display(),
                e
            );
            MemoryLoader::new()
        }
    };
    info!("{} images available", loader.image_count());

    let frames = config.headless_frames;
    let frame_ms = config.frame_ms();
    let level_path = config.level_path.clone();

    let (mut game, rx_cmd) = Game::new(config, Rc::new(loader), Palette::new());
    let audio_handle = spawn_audio_thread(rx_cmd);

    match std::fs::read_to_string(&level_path)
        .map_err(|e| e.to_string())
        .and_then(|json| DefinitionNode::from_json_str(&json))
    {
        Ok(level) => {
            if let Err(e) = game.load_level(&level) {
                error!("Level {} rejected: {}", level_path.display(), e);
            }
        }
        Err(e) => warn!("No level loaded from {}: {}", level_path.display(), e),
    }

    // --------------- Main loop ---------------
    let mut drawn = 0usize;
    let mut skipped = 0u32;
    for frame in 0..frames {
        match game.tick(frame_ms) {
            TickOutcome::Rendered(items) => drawn = items.len(),
            TickOutcome::Skipped => skipped += 1,
        }
        if frame % 60 == 0 {
            info!(
                "frame {}: {} actors, {} draw items, score {}",
                frame,
                game.actor_count(),
                drawn,
                game.score()
            );
        }
    }
    info!("{} frames run, {} skipped", frames, skipped);

    game.shutdown();
    if let Some(handle) = audio_handle
        && handle.join().is_err()
    {
        error!("Audio thread panicked");
    }
}

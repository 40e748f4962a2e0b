//! Game configuration resource.
//!
//! Manages engine settings loaded from an INI configuration file. Provides
//! defaults for safe startup and methods to load/save configuration.
//!
//! # Configuration File Format
//!
//! ```ini
//! [engine]
//! event_budget_ms = 20
//! max_frame_ms = 1000
//! lag_spike_warning = 10
//! target_fps = 60
//! headless_frames = 600
//!
//! [assets]
//! image_extension = pid
//! manifest = assets/manifest.json
//! level = assets/level.json
//!
//! [audio]
//! sound_volume = 50
//! music_volume = 50
//! sound_on = true
//! music_on = true
//! ```

use configparser::ini::Ini;
use log::info;
use std::path::PathBuf;
use std::time::Duration;

/// Default safe values for startup
const DEFAULT_EVENT_BUDGET_MS: u32 = 20;
const DEFAULT_MAX_FRAME_MS: u32 = 1000;
const DEFAULT_LAG_SPIKE_WARNING: u32 = 10;
const DEFAULT_TARGET_FPS: u32 = 60;
const DEFAULT_HEADLESS_FRAMES: u32 = 600;
const DEFAULT_IMAGE_EXTENSION: &str = "pid";
const DEFAULT_MANIFEST_PATH: &str = "assets/manifest.json";
const DEFAULT_LEVEL_PATH: &str = "assets/level.json";
const DEFAULT_SOUND_VOLUME: u32 = 50;
const DEFAULT_MUSIC_VOLUME: u32 = 50;
const DEFAULT_CONFIG_PATH: &str = "./config.ini";

/// Engine configuration.
///
/// Stores the per-tick budgets, asset locations and audio levels. Values not
/// present in the file keep their defaults.
#[derive(Debug, Clone)]
pub struct GameConfig {
    /// Time budget for draining the event queue each tick.
    pub event_budget_ms: u32,
    /// Frames longer than this are treated as a pause/resume glitch and skipped.
    pub max_frame_ms: u32,
    /// Consecutive skipped frames before an error is logged.
    pub lag_spike_warning: u32,
    pub target_fps: u32,
    /// Number of ticks the headless harness runs.
    pub headless_frames: u32,
    /// Extension render components load images with.
    pub image_extension: String,
    pub manifest_path: PathBuf,
    pub level_path: PathBuf,
    /// Master sound volume, percent.
    pub sound_volume: u32,
    /// Master music volume, percent.
    pub music_volume: u32,
    pub sound_on: bool,
    pub music_on: bool,
    /// Path to the configuration file.
    pub config_path: PathBuf,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl GameConfig {
    /// Create a new configuration with safe default values.
    pub fn new() -> Self {
        Self {
            event_budget_ms: DEFAULT_EVENT_BUDGET_MS,
            max_frame_ms: DEFAULT_MAX_FRAME_MS,
            lag_spike_warning: DEFAULT_LAG_SPIKE_WARNING,
            target_fps: DEFAULT_TARGET_FPS,
            headless_frames: DEFAULT_HEADLESS_FRAMES,
            image_extension: DEFAULT_IMAGE_EXTENSION.to_string(),
            manifest_path: PathBuf::from(DEFAULT_MANIFEST_PATH),
            level_path: PathBuf::from(DEFAULT_LEVEL_PATH),
            sound_volume: DEFAULT_SOUND_VOLUME,
            music_volume: DEFAULT_MUSIC_VOLUME,
            sound_on: true,
            music_on: true,
            config_path: PathBuf::from(DEFAULT_CONFIG_PATH),
        }
    }

    /// Create a new configuration with a custom config file path.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: path.into(),
            ..Self::new()
        }
    }

    pub fn event_budget(&self) -> Duration {
        Duration::from_millis(self.event_budget_ms as u64)
    }

    /// Milliseconds per tick at the target frame rate.
    pub fn frame_ms(&self) -> u32 {
        1000 / self.target_fps.max(1)
    }

    /// Load configuration from the INI file.
    ///
    /// Missing values retain their current (default) values.
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(&mut self) -> Result<(), String> {
        let mut config = Ini::new();
        config
            .load(&self.config_path)
            .map_err(|e| format!("Failed to load config file: {}", e))?;
        self.apply(&config);

        info!(
            "Loaded config: budget={}ms, max_frame={}ms, fps={}, images=*.{}, sound={}%({}), music={}%({})",
            self.event_budget_ms,
            self.max_frame_ms,
            self.target_fps,
            self.image_extension,
            self.sound_volume,
            self.sound_on,
            self.music_volume,
            self.music_on
        );

        Ok(())
    }

    /// Parse configuration from INI text, on top of the current values.
    pub fn load_from_str(&mut self, text: &str) -> Result<(), String> {
        let mut config = Ini::new();
        config
            .read(text.to_string())
            .map_err(|e| format!("Failed to parse config: {}", e))?;
        self.apply(&config);
        Ok(())
    }

    fn apply(&mut self, config: &Ini) {
        let uint = |section: &str, key: &str| {
            config
                .getuint(section, key)
                .ok()
                .flatten()
                .map(|v| v as u32)
        };

        // [engine] section
        if let Some(v) = uint("engine", "event_budget_ms") {
            self.event_budget_ms = v;
        }
        if let Some(v) = uint("engine", "max_frame_ms") {
            self.max_frame_ms = v;
        }
        if let Some(v) = uint("engine", "lag_spike_warning") {
            self.lag_spike_warning = v;
        }
        if let Some(v) = uint("engine", "target_fps") {
            self.target_fps = v;
        }
        if let Some(v) = uint("engine", "headless_frames") {
            self.headless_frames = v;
        }

        // [assets] section
        if let Some(ext) = config.get("assets", "image_extension") {
            self.image_extension = ext.trim_start_matches('.').to_lowercase();
        }
        if let Some(path) = config.get("assets", "manifest") {
            self.manifest_path = PathBuf::from(path);
        }
        if let Some(path) = config.get("assets", "level") {
            self.level_path = PathBuf::from(path);
        }

        // [audio] section
        if let Some(v) = uint("audio", "sound_volume") {
            self.sound_volume = v.min(100);
        }
        if let Some(v) = uint("audio", "music_volume") {
            self.music_volume = v.min(100);
        }
        if let Some(on) = config.getbool("audio", "sound_on").ok().flatten() {
            self.sound_on = on;
        }
        if let Some(on) = config.getbool("audio", "music_on").ok().flatten() {
            self.music_on = on;
        }
    }

    /// Save configuration to the INI file.
    ///
    /// Creates the file if it doesn't exist.
    pub fn save_to_file(&self) -> Result<(), String> {
        let mut config = Ini::new();

        // [engine] section
        config.set("engine", "event_budget_ms", Some(self.event_budget_ms.to_string()));
        config.set("engine", "max_frame_ms", Some(self.max_frame_ms.to_string()));
        config.set("engine", "lag_spike_warning", Some(self.lag_spike_warning.to_string()));
        config.set("engine", "target_fps", Some(self.target_fps.to_string()));
        config.set("engine", "headless_frames", Some(self.headless_frames.to_string()));

        // [assets] section
        config.set("assets", "image_extension", Some(self.image_extension.clone()));
        config.set(
            "assets",
            "manifest",
            Some(self.manifest_path.to_string_lossy().into_owned()),
        );
        config.set(
            "assets",
            "level",
            Some(self.level_path.to_string_lossy().into_owned()),
        );

        // [audio] section
        config.set("audio", "sound_volume", Some(self.sound_volume.to_string()));
        config.set("audio", "music_volume", Some(self.music_volume.to_string()));
        config.set("audio", "sound_on", Some(self.sound_on.to_string()));
        config.set("audio", "music_on", Some(self.music_on.to_string()));

        config
            .write(&self.config_path)
            .map_err(|e| format!("Failed to save config file: {}", e))?;

        info!("Saved config to {:?}", self.config_path);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let c = GameConfig::new();
        assert_eq!(c.event_budget(), Duration::from_millis(20));
        assert_eq!(c.max_frame_ms, 1000);
        assert_eq!(c.image_extension, "pid");
        assert_eq!(c.frame_ms(), 16);
    }

    #[test]
    fn test_partial_ini_keeps_defaults() {
        let mut c = GameConfig::new();
        c.load_from_str("[engine]\nevent_budget_ms = 5\n[audio]\nsound_volume = 180\nsound_on = false\n[assets]\nimage_extension = .PCX\n")
            .unwrap();
        assert_eq!(c.event_budget_ms, 5);
        assert_eq!(c.max_frame_ms, 1000);
        assert_eq!(c.sound_volume, 100);
        assert!(!c.sound_on);
        assert_eq!(c.image_extension, "pcx");
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let mut c = GameConfig::with_path("/definitely/not/here.ini");
        assert!(c.load_from_file().is_err());
    }
}

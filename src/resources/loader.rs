//! Resource-loader collaborator.
//!
//! The core never touches the filesystem or raw asset bytes. It asks a
//! [`ResourceLoader`] for directory listings and decoded assets by path.
//! [`MemoryLoader`] is the in-memory implementation used by the headless
//! harness and the tests; it is fed from a JSON manifest describing each
//! asset's decoded metadata.
//!
//! Paths are matched case-insensitively and listed in lexical order.

use crate::error::{EngineError, EngineResult};
use crate::resources::palette::Rgba;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Decoded image, as far as the core cares about it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageAsset {
    pub width: i32,
    pub height: i32,
    #[serde(default)]
    pub offset_x: i32,
    #[serde(default)]
    pub offset_y: i32,
    /// Set for solid-colour images generated by the engine.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill: Option<Rgba>,
}

impl ImageAsset {
    pub fn new(width: i32, height: i32) -> Self {
        Self {
            width,
            height,
            offset_x: 0,
            offset_y: 0,
            fill: None,
        }
    }

    pub fn with_offset(mut self, offset_x: i32, offset_y: i32) -> Self {
        self.offset_x = offset_x;
        self.offset_y = offset_y;
        self
    }

    pub fn solid(color: Rgba, width: i32, height: i32) -> Self {
        Self {
            fill: Some(color),
            ..Self::new(width, height)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoundAsset {
    pub duration_ms: u32,
}

pub trait ResourceLoader {
    /// Every file directly inside `directory`, in lexical order.
    fn list_files(&self, directory: &str) -> Vec<String>;
    fn load_image(&self, path: &str) -> EngineResult<ImageAsset>;
    fn load_sound(&self, path: &str) -> EngineResult<SoundAsset>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestImage {
    pub path: String,
    #[serde(flatten)]
    pub image: ImageAsset,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestSound {
    pub path: String,
    pub duration_ms: u32,
}

/// On-disk description of the assets a [`MemoryLoader`] serves.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssetManifest {
    #[serde(default)]
    pub images: Vec<ManifestImage>,
    #[serde(default)]
    pub sounds: Vec<ManifestSound>,
}

#[derive(Debug, Default)]
pub struct MemoryLoader {
    images: BTreeMap<String, ImageAsset>,
    sounds: BTreeMap<String, SoundAsset>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_manifest(manifest: &AssetManifest) -> Self {
        let mut loader = Self::new();
        for entry in &manifest.images {
            loader.insert_image(&entry.path, entry.image.clone());
        }
        for entry in &manifest.sounds {
            loader.insert_sound(
                &entry.path,
                SoundAsset {
                    duration_ms: entry.duration_ms,
                },
            );
        }
        loader
    }

    pub fn from_manifest_str(json: &str) -> Result<Self, String> {
        let manifest: AssetManifest = serde_json::from_str(json)
            .map_err(|e| format!("Failed to parse asset manifest: {}", e))?;
        Ok(Self::from_manifest(&manifest))
    }

    pub fn insert_image(&mut self, path: &str, image: ImageAsset) {
        self.images.insert(normalize(path), image);
    }

    pub fn insert_sound(&mut self, path: &str, sound: SoundAsset) {
        self.sounds.insert(normalize(path), sound);
    }

    pub fn image_count(&self) -> usize {
        self.images.len()
    }
}

impl ResourceLoader for MemoryLoader {
    fn list_files(&self, directory: &str) -> Vec<String> {
        let dir = normalize(directory);
        let dir = dir.trim_end_matches('/');
        let mut files: Vec<String> = self
            .images
            .keys()
            .chain(self.sounds.keys())
            .filter(|path| parent_dir(path) == dir)
            .cloned()
            .collect();
        files.sort();
        files
    }

    fn load_image(&self, path: &str) -> EngineResult<ImageAsset> {
        self.images
            .get(&normalize(path))
            .cloned()
            .ok_or_else(|| EngineError::ResourceMissing(format!("image {}", path)))
    }

    fn load_sound(&self, path: &str) -> EngineResult<SoundAsset> {
        self.sounds
            .get(&normalize(path))
            .copied()
            .ok_or_else(|| EngineError::ResourceMissing(format!("sound {}", path)))
    }
}

fn normalize(path: &str) -> String {
    path.replace('\\', "/").to_lowercase()
}

/// Everything before the last `/`, or `""` for a bare file name.
pub fn parent_dir(path: &str) -> &str {
    match path.rfind('/') {
        Some(i) => &path[..i],
        None => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loader() -> MemoryLoader {
        let mut l = MemoryLoader::new();
        l.insert_image("/GAME/IMAGES/COIN/FRAME002.PID", ImageAsset::new(10, 10));
        l.insert_image("/GAME/IMAGES/COIN/FRAME001.PID", ImageAsset::new(10, 10));
        l.insert_image("/GAME/IMAGES/COIN/NESTED/FRAME001.PID", ImageAsset::new(1, 1));
        l.insert_sound("/GAME/SOUNDS/COIN.WAV", SoundAsset { duration_ms: 300 });
        l
    }

    #[test]
    fn test_list_files_is_flat_sorted_and_case_insensitive() {
        let files = loader().list_files("/game/images/Coin");
        assert_eq!(
            files,
            vec![
                "/game/images/coin/frame001.pid".to_string(),
                "/game/images/coin/frame002.pid".to_string()
            ]
        );
    }

    #[test]
    fn test_missing_assets_report_resource_missing() {
        let l = loader();
        assert!(matches!(
            l.load_image("/nope.pid"),
            Err(EngineError::ResourceMissing(_))
        ));
        assert_eq!(l.load_sound("/game/sounds/coin.wav").unwrap().duration_ms, 300);
    }

    #[test]
    fn test_manifest_parsing() {
        let json = r#"{
            "images": [{"path": "/A/B.PID", "width": 4, "height": 8, "offset_x": -1}],
            "sounds": [{"path": "/S.WAV", "duration_ms": 120}]
        }"#;
        let l = MemoryLoader::from_manifest_str(json).unwrap();
        let img = l.load_image("/a/b.pid").unwrap();
        assert_eq!((img.width, img.height, img.offset_x, img.offset_y), (4, 8, -1, 0));
        assert!(MemoryLoader::from_manifest_str("{").is_err());
    }
}

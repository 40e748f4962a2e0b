//! Per-component image cache keyed by canonical frame name.
//!
//! Render components fill an [`ImageStore`] once during init from one or more
//! path patterns (`/LEVEL1/IMAGES/OFFICER/*`). Each loaded file is keyed by
//! [`canonical_image_key`]; the first file to claim a key wins. After init the
//! store is read-only and hands out [`Weak`] handles, ownership stays here.

use crate::resources::loader::{ImageAsset, ResourceLoader, parent_dir};
use log::{debug, warn};
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};

/// Canonical key for animation frame `n`: `frame007`.
pub fn frame_key(n: u32) -> String {
    format!("frame{:03}", n)
}

/// Derive the cache key for an image path.
///
/// Path and extension are stripped and alphabetic characters removed; what is
/// left must be a non-negative number and becomes [`frame_key`]. A file name
/// with no non-alphabetic characters keeps its stem as key. Anything else is
/// malformed and yields `None`.
pub fn canonical_image_key(path: &str) -> Option<String> {
    let file = path.rsplit(['/', '\\']).next().unwrap_or(path);
    let stem = match file.rfind('.') {
        Some(i) if i > 0 => &file[..i],
        _ => file,
    };
    let numeric: String = stem.chars().filter(|c| !c.is_alphabetic()).collect();
    if numeric.is_empty() {
        return Some(stem.to_string());
    }
    numeric.parse::<u32>().ok().map(frame_key)
}

/// Case-insensitive glob match supporting `*` and `?`.
pub fn wildcard_match(pattern: &str, text: &str) -> bool {
    let p: Vec<char> = pattern.to_lowercase().chars().collect();
    let t: Vec<char> = text.to_lowercase().chars().collect();
    let (mut pi, mut ti) = (0usize, 0usize);
    let mut star: Option<(usize, usize)> = None;
    while ti < t.len() {
        if pi < p.len() && (p[pi] == '?' || p[pi] == t[ti]) {
            pi += 1;
            ti += 1;
        } else if pi < p.len() && p[pi] == '*' {
            star = Some((pi, ti));
            pi += 1;
        } else if let Some((sp, st)) = star {
            pi = sp + 1;
            ti = st + 1;
            star = Some((sp, st + 1));
        } else {
            return false;
        }
    }
    p[pi..].iter().all(|&c| c == '*')
}

#[derive(Debug, Default)]
pub struct ImageStore {
    images: BTreeMap<String, Rc<ImageAsset>>,
}

impl ImageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` and keeps the existing image when `key` is taken.
    pub fn insert(&mut self, key: impl Into<String>, image: ImageAsset) -> bool {
        let key = key.into();
        if self.images.contains_key(&key) {
            return false;
        }
        self.images.insert(key, Rc::new(image));
        true
    }

    pub fn get(&self, key: &str) -> Weak<ImageAsset> {
        self.images.get(key).map(Rc::downgrade).unwrap_or_default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.images.contains_key(key)
    }

    pub fn first_key(&self) -> Option<&str> {
        self.images.keys().next().map(String::as_str)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.images.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Load every file matching any of `patterns` with the given extension.
    /// Returns the number of images added.
    pub fn load_patterns(
        &mut self,
        patterns: &[String],
        loader: &dyn ResourceLoader,
        extension: &str,
    ) -> usize {
        let ext_pattern = format!("*.{}", extension);
        let mut added = 0;
        for pattern in patterns {
            let dir = parent_dir(pattern);
            for path in loader.list_files(dir) {
                if !wildcard_match(pattern, &path) || !wildcard_match(&ext_pattern, &path) {
                    continue;
                }
                let Some(key) = canonical_image_key(&path) else {
                    warn!("Skipping image with malformed frame number: {}", path);
                    continue;
                };
                let image = match loader.load_image(&path) {
                    Ok(image) => image,
                    Err(e) => {
                        warn!("Failed to load image {}: {}", path, e);
                        continue;
                    }
                };
                if self.insert(key.clone(), image) {
                    added += 1;
                } else {
                    warn!("Trying to load existing image {} as '{}'", path, key);
                }
            }
        }
        debug!("Loaded {} images from {:?}", added, patterns);
        added
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::loader::MemoryLoader;

    #[test]
    fn test_canonical_keys() {
        assert_eq!(canonical_image_key("/A/B/chest7.pid").as_deref(), Some("frame007"));
        assert_eq!(canonical_image_key("12.pid").as_deref(), Some("frame012"));
        assert_eq!(canonical_image_key("FRAME105.PID").as_deref(), Some("frame105"));
        assert_eq!(canonical_image_key("/x/wave.pid").as_deref(), Some("wave"));
        assert_eq!(canonical_image_key("frame-1.pid"), None);
        assert_eq!(canonical_image_key("frame_07.pid"), None);
    }

    #[test]
    fn test_wildcards() {
        assert!(wildcard_match("/game/images/coin/*", "/GAME/IMAGES/COIN/FRAME001.PID"));
        assert!(wildcard_match("*.pid", "/a/b/frame001.pid"));
        assert!(!wildcard_match("*.pid", "/a/b/frame001.wav"));
        assert!(wildcard_match("/a/fr?me*", "/a/frame001.pid"));
        assert!(!wildcard_match("/a/b*", "/a/c001.pid"));
    }

    #[test]
    fn test_first_insert_wins() {
        let mut store = ImageStore::new();
        assert!(store.insert("frame001", ImageAsset::new(1, 1)));
        assert!(!store.insert("frame001", ImageAsset::new(2, 2)));
        assert_eq!(store.get("frame001").upgrade().unwrap().width, 1);
        assert!(store.get("frame999").upgrade().is_none());
    }

    #[test]
    fn test_load_patterns_filters_and_skips_malformed() {
        let mut loader = MemoryLoader::new();
        loader.insert_image("/G/COIN/COIN1.PID", ImageAsset::new(8, 8));
        loader.insert_image("/G/COIN/COIN2.PID", ImageAsset::new(8, 8));
        loader.insert_image("/G/COIN/COIN_2.PID", ImageAsset::new(8, 8));
        loader.insert_image("/G/COIN/OTHER3.PID", ImageAsset::new(8, 8));
        loader.insert_image("/G/COIN/COIN4.BMP", ImageAsset::new(8, 8));
        let mut store = ImageStore::new();
        let added = store.load_patterns(&["/G/COIN/COIN*".to_string()], &loader, "pid");
        assert_eq!(added, 2);
        assert_eq!(store.keys().collect::<Vec<_>>(), vec!["frame001", "frame002"]);
    }
}

//! 256-colour palette used for solid fill tiles.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }
}

#[derive(Debug, Clone)]
pub struct Palette {
    colors: [Rgba; 256],
}

impl Default for Palette {
    fn default() -> Self {
        Self::new()
    }
}

impl Palette {
    /// Grayscale ramp, index 0 black, index 255 white.
    pub fn new() -> Self {
        let mut colors = [Rgba::default(); 256];
        for (i, c) in colors.iter_mut().enumerate() {
            let v = i as u8;
            *c = Rgba::new(v, v, v, 255);
        }
        Self { colors }
    }

    /// Build from packed RGB triplets (768 bytes, the raw `.pal` layout).
    pub fn from_rgb_bytes(bytes: &[u8]) -> Result<Self, String> {
        if bytes.len() != 256 * 3 {
            return Err(format!(
                "Palette must be 768 bytes of RGB triplets, got {}",
                bytes.len()
            ));
        }
        let mut colors = [Rgba::default(); 256];
        for (c, rgb) in colors.iter_mut().zip(bytes.chunks_exact(3)) {
            *c = Rgba::new(rgb[0], rgb[1], rgb[2], 255);
        }
        Ok(Self { colors })
    }

    pub fn color(&self, index: i32) -> Option<Rgba> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.colors.get(i))
            .copied()
    }
}

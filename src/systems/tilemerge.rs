//! Continuous-tile merge for the main tile plane.
//!
//! The main (action) plane's tiles are handed to the physics collaborator as
//! collideable tiles. The flat tile list is scanned left to right in *runs*:
//! maximal stretches with the same tile id on the same row. Empty tiles
//! ([`EMPTY_TILE`]) never start or extend a run and produce nothing. Every tile
//! of a non-empty run is reported individually, at the position given by
//! [`tile_info`]; physics places one body per tile.

use crate::error::{EngineError, EngineResult};
use log::debug;

pub const EMPTY_TILE: i32 = -1;

/// Pixel geometry of a tile plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaneGeometry {
    pub tile_width: i32,
    pub tile_height: i32,
    pub plane_width: i32,
    pub plane_height: i32,
}

impl PlaneGeometry {
    pub fn new(
        tile_width: i32,
        tile_height: i32,
        plane_width: i32,
        plane_height: i32,
    ) -> EngineResult<Self> {
        if tile_width <= 0 || tile_height <= 0 || plane_width <= 0 || plane_height <= 0 {
            return Err(EngineError::invariant(format!(
                "plane geometry must be positive, got tile {}x{} plane {}x{}",
                tile_width, tile_height, plane_width, plane_height
            )));
        }
        Ok(Self {
            tile_width,
            tile_height,
            plane_width,
            plane_height,
        })
    }

    pub fn tiles_per_row(&self) -> i32 {
        self.plane_width / self.tile_width
    }

    pub fn tiles_per_column(&self) -> i32 {
        self.plane_height / self.tile_height
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileInfo {
    pub tile_id: i32,
    pub x: i32,
    pub y: i32,
}

/// Position of the tile at flat index `idx`; a pure function of the geometry.
pub fn tile_info(tiles: &[i32], idx: usize, geometry: &PlaneGeometry) -> TileInfo {
    let i = idx as i64;
    let tiles_per_row = geometry.tiles_per_row().max(1) as i64;
    let x = (i * geometry.tile_width as i64) % geometry.plane_width as i64;
    let y = ((i / tiles_per_row) * geometry.tile_height as i64) % geometry.plane_height as i64;
    TileInfo {
        tile_id: tiles[idx],
        x: x as i32,
        y: y as i32,
    }
}

/// Length of the run starting at `from`; at least 1.
pub fn continuous_run_len(tiles: &[i32], from: usize, geometry: &PlaneGeometry) -> usize {
    let first = tile_info(tiles, from, geometry);
    let mut len = 1;
    while from + len < tiles.len() {
        let next = tile_info(tiles, from + len, geometry);
        if next.tile_id != first.tile_id || next.y != first.y {
            break;
        }
        len += 1;
    }
    len
}

/// Every non-empty tile, in order, grouped run by run.
pub fn collideable_tiles(tiles: &[i32], geometry: &PlaneGeometry) -> Vec<TileInfo> {
    let mut out = Vec::with_capacity(tiles.len());
    let mut idx = 0;
    while idx < tiles.len() {
        let len = continuous_run_len(tiles, idx, geometry);
        if tiles[idx] != EMPTY_TILE {
            if len > 1 {
                debug!(
                    "Continuous run of {} x tile {} on y={}",
                    len,
                    tiles[idx],
                    tile_info(tiles, idx, geometry).y
                );
            }
            out.extend((idx..idx + len).map(|i| tile_info(tiles, i, geometry)));
        }
        idx += len;
    }
    out
}

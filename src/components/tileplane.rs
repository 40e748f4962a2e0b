//! Tile-plane data for [`RenderKind::TilePlane`](crate::components::render::RenderKind).
//!
//! ```text
//! <TilePlaneRenderComponent>
//!   <ImagePath>/LEVEL1/TILES/ACTION/*</ImagePath>
//!   <PlaneProperties>
//!     <PlaneName>Action</PlaneName>
//!     <MainPlane>true</MainPlane>
//!     <TilePixelSize width="64" height="64"/>
//!     <PlanePixelSize width="640" height="128"/>
//!     ...
//!   </PlaneProperties>
//!   <Tiles><Tile>12</Tile><Tile>-1</Tile>...</Tiles>
//! </TilePlaneRenderComponent>
//! ```
//!
//! Tile id `n` is drawn with image `frame{n:03}`. Ids without an image fall
//! back to a solid fill of the plane's palette colour on the `Background`
//! plane and fail construction anywhere else.

use crate::error::{EngineError, EngineResult};
use crate::geometry::Rect;
use crate::resources::definition::{DefinitionNode, Fields};
use crate::resources::imagestore::{ImageStore, frame_key};
use crate::resources::loader::ImageAsset;
use crate::resources::palette::Palette;
use crate::resources::scenegraph::RenderPass;
use crate::systems::tilemerge::{EMPTY_TILE, PlaneGeometry, TileInfo, collideable_tiles};
use std::rc::Rc;

pub const TILE_PLANE_RENDER_COMPONENT: &str = "TilePlaneRenderComponent";

/// Parsed once at init, immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaneProperties {
    pub name: String,
    pub is_main_plane: bool,
    pub is_drawable: bool,
    pub is_wrapped_x: bool,
    pub is_wrapped_y: bool,
    pub is_tile_autosized: bool,
    pub tile_pixel_width: i32,
    pub tile_pixel_height: i32,
    pub plane_pixel_width: i32,
    pub plane_pixel_height: i32,
    pub movement_percent_x: i32,
    pub movement_percent_y: i32,
    pub fill_color: i32,
    pub z_coord: i32,
}

impl Default for PlaneProperties {
    fn default() -> Self {
        Self {
            name: String::new(),
            is_main_plane: false,
            is_drawable: true,
            is_wrapped_x: false,
            is_wrapped_y: false,
            is_tile_autosized: false,
            tile_pixel_width: 0,
            tile_pixel_height: 0,
            plane_pixel_width: 0,
            plane_pixel_height: 0,
            movement_percent_x: 100,
            movement_percent_y: 100,
            fill_color: 0,
            z_coord: 0,
        }
    }
}

impl PlaneProperties {
    pub fn from_definition(node: &DefinitionNode) -> EngineResult<Self> {
        let f = Fields::new(node, TILE_PLANE_RENDER_COMPONENT);
        let mut p = PlaneProperties {
            name: f.req_text("PlaneName")?.to_string(),
            ..Default::default()
        };
        f.set_bool_if(&mut p.is_main_plane, "MainPlane")?;
        if let Some(no_draw) = f.opt_bool("NoDraw")? {
            p.is_drawable = !no_draw;
        }
        f.set_bool_if(&mut p.is_wrapped_x, "WrappedX")?;
        f.set_bool_if(&mut p.is_wrapped_y, "WrappedY")?;
        f.set_bool_if(&mut p.is_tile_autosized, "TileAutoSized")?;
        p.tile_pixel_width = f.req_attr("TilePixelSize", "width")?;
        p.tile_pixel_height = f.req_attr("TilePixelSize", "height")?;
        p.plane_pixel_width = f.req_attr("PlanePixelSize", "width")?;
        p.plane_pixel_height = f.req_attr("PlanePixelSize", "height")?;
        if let Some(x) = f.attr("MoveSpeedPercentage", "x")? {
            p.movement_percent_x = x;
        }
        if let Some(y) = f.attr("MoveSpeedPercentage", "y")? {
            p.movement_percent_y = y;
        }
        f.set_if(&mut p.fill_color, "FillColor")?;
        f.set_if(&mut p.z_coord, "ZCoord")?;
        Ok(p)
    }

    pub fn to_definition(&self) -> DefinitionNode {
        DefinitionNode::new("PlaneProperties")
            .with_text_child("PlaneName", &self.name)
            .with_text_child("MainPlane", self.is_main_plane)
            .with_text_child("NoDraw", !self.is_drawable)
            .with_text_child("WrappedX", self.is_wrapped_x)
            .with_text_child("WrappedY", self.is_wrapped_y)
            .with_text_child("TileAutoSized", self.is_tile_autosized)
            .with_child(
                DefinitionNode::new("TilePixelSize")
                    .with_attr("width", self.tile_pixel_width)
                    .with_attr("height", self.tile_pixel_height),
            )
            .with_child(
                DefinitionNode::new("PlanePixelSize")
                    .with_attr("width", self.plane_pixel_width)
                    .with_attr("height", self.plane_pixel_height),
            )
            .with_child(
                DefinitionNode::new("MoveSpeedPercentage")
                    .with_attr("x", self.movement_percent_x)
                    .with_attr("y", self.movement_percent_y),
            )
            .with_text_child("FillColor", self.fill_color)
            .with_text_child("ZCoord", self.z_coord)
    }

    pub fn geometry(&self) -> EngineResult<PlaneGeometry> {
        PlaneGeometry::new(
            self.tile_pixel_width,
            self.tile_pixel_height,
            self.plane_pixel_width,
            self.plane_pixel_height,
        )
    }

    pub fn render_pass(&self) -> EngineResult<RenderPass> {
        match self.name.as_str() {
            "Background" => Ok(RenderPass::Background),
            "Action" => Ok(RenderPass::Action),
            "Front" => Ok(RenderPass::Foreground),
            other => Err(EngineError::invariant(format!(
                "unknown plane name '{}', no render pass for it",
                other
            ))),
        }
    }

    pub fn is_background(&self) -> bool {
        self.name == "Background"
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TileImage {
    Empty,
    Image(String),
    Fill,
}

#[derive(Debug)]
pub struct TilePlane {
    pub properties: PlaneProperties,
    pub geometry: PlaneGeometry,
    pub pass: RenderPass,
    tiles: Vec<i32>,
    tile_images: Vec<TileImage>,
    fill_image: Rc<ImageAsset>,
    position_rect: Rect,
}

impl TilePlane {
    pub fn from_definition(
        data: &DefinitionNode,
        images: &ImageStore,
        palette: &Palette,
    ) -> EngineResult<Self> {
        let f = Fields::new(data, TILE_PLANE_RENDER_COMPONENT);
        let properties = PlaneProperties::from_definition(f.req_child("PlaneProperties")?)?;
        let geometry = properties.geometry()?;
        let pass = properties.render_pass()?;

        let fill = palette.color(properties.fill_color).ok_or_else(|| {
            EngineError::invariant(format!(
                "fill colour {} outside the palette",
                properties.fill_color
            ))
        })?;
        let fill_image = Rc::new(ImageAsset::solid(
            fill,
            geometry.tile_width,
            geometry.tile_height,
        ));

        let mut tiles = Vec::new();
        for tile in f.req_child("Tiles")?.children.iter() {
            let raw = tile.text().unwrap_or_default();
            let id = raw.parse::<i32>().map_err(|_| {
                EngineError::malformed(TILE_PLANE_RENDER_COMPONENT, "Tile", raw)
            })?;
            tiles.push(id);
        }
        if tiles.is_empty() {
            return Err(EngineError::missing(TILE_PLANE_RENDER_COMPONENT, "Tile"));
        }

        let tile_images = tiles
            .iter()
            .map(|&id| resolve_tile(id, images, &properties))
            .collect::<EngineResult<Vec<_>>>()?;

        let width = if properties.is_wrapped_x {
            i32::MAX
        } else {
            geometry.plane_width
        };
        let height = if properties.is_wrapped_y {
            i32::MAX
        } else {
            geometry.plane_height
        };

        Ok(Self {
            properties,
            geometry,
            pass,
            tiles,
            tile_images,
            fill_image,
            position_rect: Rect::new(0, 0, width, height),
        })
    }

    pub fn tiles(&self) -> &[i32] {
        &self.tiles
    }

    pub fn tile_image(&self, idx: usize) -> Option<&TileImage> {
        self.tile_images.get(idx)
    }

    pub fn fill_image(&self) -> &Rc<ImageAsset> {
        &self.fill_image
    }

    pub fn position_rect(&self) -> Rect {
        self.position_rect
    }

    /// Collideable tiles for the physics collaborator; only the main plane has any.
    pub fn collideable_tiles(&self) -> Vec<TileInfo> {
        if !self.properties.is_main_plane {
            return Vec::new();
        }
        collideable_tiles(&self.tiles, &self.geometry)
    }

    pub fn definition_children(&self) -> Vec<DefinitionNode> {
        let mut tiles = DefinitionNode::new("Tiles");
        for id in &self.tiles {
            tiles.push_text_child("Tile", id);
        }
        vec![self.properties.to_definition(), tiles]
    }
}

fn resolve_tile(id: i32, images: &ImageStore, properties: &PlaneProperties) -> EngineResult<TileImage> {
    if id == EMPTY_TILE {
        return Ok(TileImage::Empty);
    }
    if let Ok(n) = u32::try_from(id) {
        let key = frame_key(n);
        if images.contains(&key) {
            return Ok(TileImage::Image(key));
        }
    }
    if properties.is_background() {
        return Ok(TileImage::Fill);
    }
    Err(EngineError::ResourceMissing(format!(
        "tile {} on plane '{}'",
        id, properties.name
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plane_definition(name: &str, tiles: &[i32]) -> DefinitionNode {
        let props = PlaneProperties {
            name: name.to_string(),
            is_main_plane: name == "Action",
            tile_pixel_width: 20,
            tile_pixel_height: 20,
            plane_pixel_width: 100,
            plane_pixel_height: 20,
            fill_color: 3,
            ..Default::default()
        };
        let mut tiles_node = DefinitionNode::new("Tiles");
        for t in tiles {
            tiles_node.push_text_child("Tile", t);
        }
        DefinitionNode::new(TILE_PLANE_RENDER_COMPONENT)
            .with_child(props.to_definition())
            .with_child(tiles_node)
    }

    fn store(ids: &[u32]) -> ImageStore {
        let mut s = ImageStore::new();
        for id in ids {
            s.insert(frame_key(*id), ImageAsset::new(20, 20));
        }
        s
    }

    #[test]
    fn test_properties_roundtrip() {
        let p = PlaneProperties {
            name: "Front".to_string(),
            is_drawable: false,
            is_wrapped_x: true,
            tile_pixel_width: 64,
            tile_pixel_height: 64,
            plane_pixel_width: 640,
            plane_pixel_height: 128,
            movement_percent_x: 150,
            movement_percent_y: 50,
            fill_color: 12,
            z_coord: 5000,
            ..Default::default()
        };
        assert_eq!(PlaneProperties::from_definition(&p.to_definition()).unwrap(), p);
    }

    #[test]
    fn test_background_falls_back_to_fill() {
        let plane = TilePlane::from_definition(
            &plane_definition("Background", &[5, 9, -1]),
            &store(&[5]),
            &Palette::new(),
        )
        .unwrap();
        assert_eq!(plane.tile_image(0), Some(&TileImage::Image("frame005".into())));
        assert_eq!(plane.tile_image(1), Some(&TileImage::Fill));
        assert_eq!(plane.tile_image(2), Some(&TileImage::Empty));
        assert_eq!(plane.fill_image().fill.map(|c| c.r), Some(3));
        assert!(plane.collideable_tiles().is_empty());
    }

    #[test]
    fn test_missing_tile_fails_outside_background() {
        let err = TilePlane::from_definition(
            &plane_definition("Action", &[5, 9]),
            &store(&[5]),
            &Palette::new(),
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::ResourceMissing(_)));
    }

    #[test]
    fn test_unknown_plane_name_is_invariant_violation() {
        let err = TilePlane::from_definition(
            &plane_definition("Middle", &[5]),
            &store(&[5]),
            &Palette::new(),
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::InvariantViolation(_)));
    }

    #[test]
    fn test_wrapped_plane_rect_is_unbounded() {
        let mut def = plane_definition("Front", &[5]);
        let props = def.children.iter_mut().find(|c| c.name == "PlaneProperties").unwrap();
        props.children.retain(|c| c.name != "WrappedX");
        props.push_text_child("WrappedX", true);
        let plane = TilePlane::from_definition(&def, &store(&[5]), &Palette::new()).unwrap();
        assert_eq!(plane.position_rect(), Rect::new(0, 0, i32::MAX, 20));
    }
}

//! Render components: actor sprites, tile planes and HUD elements.
//!
//! One [`RenderComponent`] type covers the three variants of [`RenderKind`];
//! the variant decides the capability name, how the definition subtree is
//! read, the on-screen rectangle and the render pass of the scene node.
//!
//! Every variant loads its images the same way: each `<ImagePath>` pattern is
//! expanded through the resource loader and the matching files are stored
//! under their canonical key (see [`crate::resources::imagestore`]).
//!
//! # Scene nodes
//!
//! [`RenderComponent::scene_node`] builds the renderer-facing node on first
//! call and returns the cached node afterwards. `post_init` announces it with
//! `NewRenderComponent`; HUD elements additionally announce `NewHudElement`
//! when their node is built. The main tile plane reports its collideable
//! tiles in `post_init` as well.

use crate::actors::actor::Owner;
use crate::components::position::PositionComponent;
use crate::components::tileplane::{TILE_PLANE_RENDER_COMPONENT, TileImage, TilePlane};
use crate::components::{Component, InitContext};
use crate::error::EngineResult;
use crate::events::GameEvent;
use crate::geometry::Rect;
use crate::resources::definition::{DefinitionNode, Fields};
use crate::resources::imagestore::ImageStore;
use crate::resources::loader::ImageAsset;
use crate::resources::scenegraph::{NodeHandle, RenderPass, create_node};
use log::{debug, error, warn};
use std::rc::{Rc, Weak};

pub const ACTOR_RENDER_COMPONENT: &str = "ActorRenderComponent";
pub const HUD_RENDER_COMPONENT: &str = "HUDRenderComponent";

/// HUD elements are always on screen.
const HUD_RECT: Rect = Rect {
    x: 0,
    y: 0,
    w: 1_000_000,
    h: 1_000_000,
};

/// Image set with no frame zero; asking for it is expected and harmless.
const HARMLESS_MISSING_IMAGE: &str = "frame000";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sprite {
    pub visible: bool,
    pub mirrored: bool,
    pub inverted: bool,
    pub z_coord: i32,
    current_image: Option<String>,
}

impl Default for Sprite {
    fn default() -> Self {
        Self {
            visible: true,
            mirrored: false,
            inverted: false,
            z_coord: 0,
            current_image: None,
        }
    }
}

impl Sprite {
    fn parse(&mut self, f: &Fields) -> EngineResult<()> {
        f.set_bool_if(&mut self.visible, "Visible")?;
        f.set_bool_if(&mut self.mirrored, "Mirrored")?;
        f.set_bool_if(&mut self.inverted, "Inverted")?;
        f.set_if(&mut self.z_coord, "ZCoord")?;
        Ok(())
    }

    fn emit(&self, node: &mut DefinitionNode) {
        node.push_text_child("Visible", self.visible);
        node.push_text_child("Mirrored", self.mirrored);
        node.push_text_child("Inverted", self.inverted);
        node.push_text_child("ZCoord", self.z_coord);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HudElement {
    pub anchor_right: bool,
    pub anchor_bottom: bool,
    pub key: String,
}

#[derive(Debug)]
pub enum RenderKind {
    Actor(Sprite),
    /// Filled in by `init`.
    TilePlane(Option<TilePlane>),
    Hud { sprite: Sprite, hud: HudElement },
}

pub struct RenderComponent {
    owner: Owner,
    image_paths: Vec<String>,
    images: ImageStore,
    kind: RenderKind,
    scene_node: Option<NodeHandle>,
}

impl RenderComponent {
    pub fn actor(owner: Owner) -> Self {
        Self::with_kind(owner, RenderKind::Actor(Sprite::default()))
    }

    pub fn tile_plane(owner: Owner) -> Self {
        Self::with_kind(owner, RenderKind::TilePlane(None))
    }

    pub fn hud(owner: Owner) -> Self {
        Self::with_kind(
            owner,
            RenderKind::Hud {
                sprite: Sprite::default(),
                hud: HudElement::default(),
            },
        )
    }

    fn with_kind(owner: Owner, kind: RenderKind) -> Self {
        Self {
            owner,
            image_paths: Vec::new(),
            images: ImageStore::new(),
            kind,
            scene_node: None,
        }
    }

    pub fn kind(&self) -> &RenderKind {
        &self.kind
    }

    pub fn tile_plane_data(&self) -> Option<&TilePlane> {
        match &self.kind {
            RenderKind::TilePlane(plane) => plane.as_ref(),
            _ => None,
        }
    }

    pub fn hud_element(&self) -> Option<&HudElement> {
        match &self.kind {
            RenderKind::Hud { hud, .. } => Some(hud),
            _ => None,
        }
    }

    fn sprite(&self) -> Option<&Sprite> {
        match &self.kind {
            RenderKind::Actor(sprite) | RenderKind::Hud { sprite, .. } => Some(sprite),
            RenderKind::TilePlane(_) => None,
        }
    }

    fn sprite_mut(&mut self) -> Option<&mut Sprite> {
        match &mut self.kind {
            RenderKind::Actor(sprite) | RenderKind::Hud { sprite, .. } => Some(sprite),
            RenderKind::TilePlane(_) => None,
        }
    }

    pub fn image(&self, key: &str) -> Weak<ImageAsset> {
        self.images.get(key)
    }

    pub fn has_image(&self, key: &str) -> bool {
        self.images.contains(key)
    }

    pub fn image_keys(&self) -> impl Iterator<Item = &str> {
        self.images.keys()
    }

    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    pub fn current_image(&self) -> Option<&str> {
        self.sprite().and_then(|s| s.current_image.as_deref())
    }

    /// Image drawn for tile `idx` of a tile plane.
    pub fn tile_image(&self, idx: usize) -> Option<Weak<ImageAsset>> {
        let plane = self.tile_plane_data()?;
        match plane.tile_image(idx)? {
            TileImage::Empty => None,
            TileImage::Image(key) => Some(self.images.get(key)),
            TileImage::Fill => Some(Rc::downgrade(plane.fill_image())),
        }
    }

    pub fn set_image(&mut self, key: &str) {
        if !self.images.contains(key) {
            if key != HARMLESS_MISSING_IMAGE {
                error!(
                    "Trying to set nonexistent image '{}' on actor {} ({})",
                    key,
                    self.owner.id(),
                    self.owner.type_name()
                );
            }
            return;
        }
        match self.sprite_mut() {
            Some(sprite) => sprite.current_image = Some(key.to_string()),
            None => warn!("Tile planes have no current image"),
        }
    }

    pub fn is_visible(&self) -> bool {
        match &self.kind {
            RenderKind::TilePlane(plane) => plane.as_ref().is_some_and(|p| p.properties.is_drawable),
            _ => self.sprite().is_some_and(|s| s.visible),
        }
    }

    pub fn set_visible(&mut self, visible: bool) {
        if let Some(sprite) = self.sprite_mut() {
            sprite.visible = visible;
        }
    }

    pub fn is_mirrored(&self) -> bool {
        self.sprite().is_some_and(|s| s.mirrored)
    }

    pub fn set_mirrored(&mut self, mirrored: bool) {
        if let Some(sprite) = self.sprite_mut() {
            sprite.mirrored = mirrored;
        }
    }

    pub fn z_order(&self) -> i32 {
        match &self.kind {
            RenderKind::TilePlane(plane) => plane.as_ref().map_or(0, |p| p.properties.z_coord),
            _ => self.sprite().map_or(0, |s| s.z_coord),
        }
    }

    pub fn render_pass(&self) -> Option<RenderPass> {
        match &self.kind {
            RenderKind::Actor(_) => Some(RenderPass::Actor),
            RenderKind::TilePlane(plane) => plane.as_ref().map(|p| p.pass),
            RenderKind::Hud { .. } => Some(RenderPass::Hud),
        }
    }

    /// On-screen bounding rectangle; empty when there is nothing to draw.
    pub fn position_rect(&self) -> Rect {
        match &self.kind {
            RenderKind::Hud { .. } => HUD_RECT,
            RenderKind::TilePlane(plane) => plane
                .as_ref()
                .map(|p| p.position_rect())
                .unwrap_or_default(),
            RenderKind::Actor(sprite) => {
                if !sprite.visible {
                    return Rect::default();
                }
                let Some(position) = self.owner.component::<PositionComponent>() else {
                    return Rect::default();
                };
                let Ok(position) = position.try_borrow() else {
                    return Rect::default();
                };
                let Some(image) = sprite
                    .current_image
                    .as_deref()
                    .and_then(|key| self.images.get(key).upgrade())
                else {
                    return Rect::default();
                };
                Rect::new(
                    position.x() as i32 - image.width / 2 + image.offset_x,
                    position.y() as i32 - image.height / 2 + image.offset_y,
                    image.width,
                    image.height,
                )
            }
        }
    }

    /// Build the scene node on first call, return the cached one afterwards.
    /// `None` while the actor has no position.
    pub fn scene_node(&mut self) -> Option<NodeHandle> {
        if let Some(node) = &self.scene_node {
            return Some(Rc::clone(node));
        }
        let position = self
            .owner
            .component::<PositionComponent>()?
            .try_borrow()
            .ok()?
            .position();
        let pass = self.render_pass()?;
        let renderer = self
            .owner
            .component::<RenderComponent>()
            .map(|rc| Rc::downgrade(&rc))
            .unwrap_or_default();
        let node = create_node(self.owner.id(), renderer, pass, position, self.z_order());

        if let RenderKind::Hud { hud, .. } = &self.kind {
            self.owner.bus().publish(GameEvent::NewHudElement {
                actor: self.owner.id(),
                key: hud.key.clone(),
                node: Rc::clone(&node),
            });
        }
        self.scene_node = Some(Rc::clone(&node));
        Some(node)
    }
}

impl Component for RenderComponent {
    fn name(&self) -> &'static str {
        match self.kind {
            RenderKind::Actor(_) => ACTOR_RENDER_COMPONENT,
            RenderKind::TilePlane(_) => TILE_PLANE_RENDER_COMPONENT,
            RenderKind::Hud { .. } => HUD_RENDER_COMPONENT,
        }
    }

    fn owner(&self) -> &Owner {
        &self.owner
    }

    fn init(&mut self, data: &DefinitionNode, ctx: &InitContext) -> EngineResult<()> {
        let name = self.name();
        let f = Fields::new(data, name);

        self.image_paths = data
            .children_named("ImagePath")
            .filter_map(|n| n.text())
            .map(str::to_string)
            .collect();
        self.images
            .load_patterns(&self.image_paths, ctx.loader, ctx.image_extension);
        if self.images.is_empty() {
            warn!(
                "Image map for render component is empty. Actor type: {}",
                ctx.actor_type
            );
        }

        match &mut self.kind {
            RenderKind::Actor(sprite) => sprite.parse(&f)?,
            RenderKind::Hud { sprite, hud } => {
                sprite.parse(&f)?;
                f.set_bool_if(&mut hud.anchor_right, "AnchorRight")?;
                f.set_bool_if(&mut hud.anchor_bottom, "AnchorBottom")?;
                f.set_if(&mut hud.key, "HUDElementKey")?;
            }
            RenderKind::TilePlane(plane) => {
                *plane = Some(TilePlane::from_definition(data, &self.images, ctx.palette)?);
            }
        }

        let first = self.images.first_key().map(str::to_string);
        if let Some(sprite) = self.sprite_mut() {
            if sprite.visible {
                sprite.current_image = first;
            }
        }
        Ok(())
    }

    fn post_init(&mut self) -> EngineResult<()> {
        if let Some(plane) = self.tile_plane_data() {
            let tiles = plane.collideable_tiles();
            debug!(
                "Plane '{}' reports {} collideable tiles",
                plane.properties.name,
                tiles.len()
            );
            for tile in tiles {
                self.owner.bus().publish(GameEvent::CollideableTileCreated {
                    tile_id: tile.tile_id,
                    x: tile.x,
                    y: tile.y,
                });
            }
        }

        if let Some(node) = self.scene_node() {
            self.owner.bus().publish(GameEvent::NewRenderComponent {
                actor: self.owner.id(),
                node,
            });
        }
        Ok(())
    }

    fn to_definition(&self) -> DefinitionNode {
        let mut node = DefinitionNode::new(self.name());
        for path in &self.image_paths {
            node.push_text_child("ImagePath", path);
        }
        match &self.kind {
            RenderKind::Actor(sprite) => sprite.emit(&mut node),
            RenderKind::Hud { sprite, hud } => {
                sprite.emit(&mut node);
                node.push_text_child("AnchorRight", hud.anchor_right);
                node.push_text_child("AnchorBottom", hud.anchor_bottom);
                node.push_text_child("HUDElementKey", &hud.key);
            }
            RenderKind::TilePlane(Some(plane)) => {
                for child in plane.definition_children() {
                    node.push_child(child);
                }
            }
            RenderKind::TilePlane(None) => {}
        }
        node
    }

    fn on_destroy(&mut self) {
        self.scene_node = None;
    }
}

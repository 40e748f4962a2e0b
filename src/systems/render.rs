//! Render sweep.
//!
//! Walks the scene graph once per tick and produces the ordered draw list an
//! external renderer consumes: background planes first, HUD last, and by
//! z-coordinate within a pass. Nodes whose component is gone, invisible, or
//! has nothing to show are skipped.

use crate::actors::actor::ActorId;
use crate::geometry::Rect;
use crate::resources::scenegraph::{RenderPass, SceneGraph};

#[derive(Debug, Clone, PartialEq)]
pub struct DrawItem {
    pub actor: ActorId,
    pub pass: RenderPass,
    pub z_order: i32,
    pub rect: Rect,
    /// Current image for sprites and HUD elements; `None` for tile planes.
    pub image: Option<String>,
    pub mirrored: bool,
}

pub fn render_sweep(graph: &SceneGraph) -> Vec<DrawItem> {
    let mut items: Vec<DrawItem> = graph
        .nodes()
        .iter()
        .filter_map(|node| {
            let renderer = node.renderer.upgrade()?;
            let renderer = renderer.try_borrow().ok()?;
            if !renderer.is_visible() {
                return None;
            }
            let rect = renderer.position_rect();
            if rect.is_empty() {
                return None;
            }
            Some(DrawItem {
                actor: node.owner,
                pass: node.pass,
                z_order: renderer.z_order(),
                rect,
                image: renderer.current_image().map(str::to_string),
                mirrored: renderer.is_mirrored(),
            })
        })
        .collect();
    items.sort_by_key(|item| (item.pass, item.z_order, item.actor));
    items
}

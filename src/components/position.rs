use crate::actors::actor::Owner;
use crate::components::{Component, InitContext};
use crate::error::EngineResult;
use crate::geometry::Point;
use crate::resources::definition::{DefinitionNode, Fields};

pub const POSITION_COMPONENT: &str = "PositionComponent";

/// World-space position of an actor (its pivot, usually the sprite centre).
///
/// ```text
/// <PositionComponent><Position x="120" y="340"/></PositionComponent>
/// ```
pub struct PositionComponent {
    owner: Owner,
    position: Point,
}

impl PositionComponent {
    pub fn new(owner: Owner) -> Self {
        Self {
            owner,
            position: Point::default(),
        }
    }

    pub fn position(&self) -> Point {
        self.position
    }

    pub fn set_position(&mut self, position: Point) {
        self.position = position;
    }

    pub fn x(&self) -> f32 {
        self.position.x
    }

    pub fn y(&self) -> f32 {
        self.position.y
    }

    pub fn translate(&mut self, dx: f32, dy: f32) {
        self.position = self.position.offset(dx, dy);
    }
}

impl Component for PositionComponent {
    fn name(&self) -> &'static str {
        POSITION_COMPONENT
    }

    fn owner(&self) -> &Owner {
        &self.owner
    }

    fn init(&mut self, data: &DefinitionNode, _ctx: &InitContext) -> EngineResult<()> {
        let f = Fields::new(data, POSITION_COMPONENT);
        self.position = Point::new(f.req_attr("Position", "x")?, f.req_attr("Position", "y")?);
        Ok(())
    }

    fn to_definition(&self) -> DefinitionNode {
        position_definition(self.position)
    }
}

/// `<PositionComponent>` subtree for templates.
pub fn position_definition(position: Point) -> DefinitionNode {
    DefinitionNode::new(POSITION_COMPONENT).with_child(
        DefinitionNode::new("Position")
            .with_attr("x", position.x)
            .with_attr("y", position.y),
    )
}

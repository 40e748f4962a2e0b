//! Physics body description and kinematic movement.
//!
//! Collision resolution belongs to the physics collaborator. This component
//! carries the body and fixture definitions that collaborator needs, integrates
//! the actor's velocity into its [`PositionComponent`] each tick, and can be
//! switched off with [`PhysicsComponent::destroy`] (a reached checkpoint stops
//! colliding, for example).

use crate::actors::actor::Owner;
use crate::components::position::PositionComponent;
use crate::components::{Component, InitContext};
use crate::error::{EngineError, EngineResult};
use crate::geometry::Point;
use crate::resources::definition::{DefinitionNode, Fields};
use std::fmt;
use std::str::FromStr;

pub const PHYSICS_COMPONENT: &str = "PhysicsComponent";

/// Collision category bits.
pub mod collision_flag {
    pub const NONE: u32 = 0x0;
    pub const SOLID: u32 = 0x1;
    pub const CONTROLLER: u32 = 0x2;
    pub const PICKUP: u32 = 0x4;
    pub const TRIGGER: u32 = 0x8;
    pub const PROJECTILE: u32 = 0x10;
    pub const ENEMY: u32 = 0x20;
    pub const DAMAGE_AURA: u32 = 0x40;
    pub const ALL: u32 = 0xFFFF;
}

macro_rules! string_enum {
    ($name:ident { $($variant:ident),+ $(,)? }) => {
        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                match self {
                    $($name::$variant => write!(f, stringify!($variant)),)+
                }
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $(stringify!($variant) => Ok($name::$variant),)+
                    other => Err(format!("unknown {} '{}'", stringify!($name), other)),
                }
            }
        }
    };
}
pub(crate) use string_enum;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BodyType {
    #[default]
    Static,
    Kinematic,
    Dynamic,
}
string_enum!(BodyType { Static, Kinematic, Dynamic });

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FixtureType {
    #[default]
    Solid,
    Ground,
    Climb,
    Death,
    Trigger,
    Projectile,
    DamageAura,
}
string_enum!(FixtureType {
    Solid,
    Ground,
    Climb,
    Death,
    Trigger,
    Projectile,
    DamageAura
});

#[derive(Debug, Clone, PartialEq)]
pub struct FixtureDef {
    pub fixture_type: FixtureType,
    pub collision_shape: String,
    pub is_sensor: bool,
    pub size: Point,
    pub offset: Point,
    pub collision_flag: u32,
    pub collision_mask: u32,
}

impl Default for FixtureDef {
    fn default() -> Self {
        Self {
            fixture_type: FixtureType::Solid,
            collision_shape: "Rectangle".to_string(),
            is_sensor: false,
            size: Point::default(),
            offset: Point::default(),
            collision_flag: collision_flag::NONE,
            collision_mask: collision_flag::NONE,
        }
    }
}

impl FixtureDef {
    pub fn to_definition(&self) -> DefinitionNode {
        DefinitionNode::new("ActorFixture")
            .with_text_child("Type", self.fixture_type)
            .with_text_child("CollisionShape", &self.collision_shape)
            .with_text_child("IsSensor", self.is_sensor)
            .with_child(size_node("Size", self.size))
            .with_child(point_node("Offset", self.offset))
            .with_text_child("CollisionFlag", self.collision_flag)
            .with_text_child("CollisionMask", self.collision_mask)
    }

    pub fn from_definition(node: &DefinitionNode, component: &str) -> EngineResult<Self> {
        let f = Fields::new(node, component);
        let mut def = FixtureDef {
            fixture_type: f.req("Type")?,
            ..FixtureDef::default()
        };
        f.set_if(&mut def.collision_shape, "CollisionShape")?;
        f.set_bool_if(&mut def.is_sensor, "IsSensor")?;
        def.size = read_size(&f, "Size")?.unwrap_or_default();
        def.offset = read_point(&f, "Offset")?.unwrap_or_default();
        f.set_if(&mut def.collision_flag, "CollisionFlag")?;
        f.set_if(&mut def.collision_mask, "CollisionMask")?;
        Ok(def)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BodyDef {
    pub body_type: BodyType,
    pub size: Point,
    pub gravity_scale: f32,
    pub is_bullet: bool,
    pub collision_flag: u32,
    pub collision_mask: u32,
    pub linear_velocity: Point,
    pub fixtures: Vec<FixtureDef>,
}

impl Default for BodyDef {
    fn default() -> Self {
        Self {
            body_type: BodyType::Static,
            size: Point::default(),
            gravity_scale: 1.0,
            is_bullet: false,
            collision_flag: collision_flag::NONE,
            collision_mask: collision_flag::NONE,
            linear_velocity: Point::default(),
            fixtures: Vec::new(),
        }
    }
}

impl BodyDef {
    pub fn to_definition(&self) -> DefinitionNode {
        let mut node = DefinitionNode::new(PHYSICS_COMPONENT)
            .with_text_child("BodyType", self.body_type)
            .with_child(size_node("CollisionSize", self.size))
            .with_text_child("GravityScale", self.gravity_scale)
            .with_text_child("IsBullet", self.is_bullet)
            .with_text_child("CollisionFlag", self.collision_flag)
            .with_text_child("CollisionMask", self.collision_mask)
            .with_child(point_node("LinearVelocity", self.linear_velocity));
        for fixture in &self.fixtures {
            node.push_child(fixture.to_definition());
        }
        node
    }

    pub fn from_definition(node: &DefinitionNode) -> EngineResult<Self> {
        let f = Fields::new(node, PHYSICS_COMPONENT);
        let mut def = BodyDef {
            body_type: f.req("BodyType")?,
            ..BodyDef::default()
        };
        def.size = read_size(&f, "CollisionSize")?.unwrap_or_default();
        f.set_if(&mut def.gravity_scale, "GravityScale")?;
        f.set_bool_if(&mut def.is_bullet, "IsBullet")?;
        f.set_if(&mut def.collision_flag, "CollisionFlag")?;
        f.set_if(&mut def.collision_mask, "CollisionMask")?;
        def.linear_velocity = read_point(&f, "LinearVelocity")?.unwrap_or_default();
        for fixture in node.children_named("ActorFixture") {
            def.fixtures
                .push(FixtureDef::from_definition(fixture, PHYSICS_COMPONENT)?);
        }
        Ok(def)
    }
}

pub(crate) fn size_node(name: &str, size: Point) -> DefinitionNode {
    DefinitionNode::new(name)
        .with_attr("width", size.x)
        .with_attr("height", size.y)
}

pub(crate) fn point_node(name: &str, p: Point) -> DefinitionNode {
    DefinitionNode::new(name).with_attr("x", p.x).with_attr("y", p.y)
}

pub(crate) fn read_size(f: &Fields, name: &str) -> EngineResult<Option<Point>> {
    match (f.attr::<f32>(name, "width")?, f.attr::<f32>(name, "height")?) {
        (Some(w), Some(h)) => Ok(Some(Point::new(w, h))),
        (None, None) => Ok(None),
        _ => Err(EngineError::missing(PHYSICS_COMPONENT, name)),
    }
}

pub(crate) fn read_point(f: &Fields, name: &str) -> EngineResult<Option<Point>> {
    match (f.attr::<f32>(name, "x")?, f.attr::<f32>(name, "y")?) {
        (Some(x), Some(y)) => Ok(Some(Point::new(x, y))),
        (None, None) => Ok(None),
        _ => Err(EngineError::missing(PHYSICS_COMPONENT, name)),
    }
}

pub struct PhysicsComponent {
    owner: Owner,
    body: BodyDef,
    velocity: Point,
    active: bool,
}

impl PhysicsComponent {
    pub fn new(owner: Owner) -> Self {
        Self {
            owner,
            body: BodyDef::default(),
            velocity: Point::default(),
            active: true,
        }
    }

    pub fn body(&self) -> &BodyDef {
        &self.body
    }

    /// Pixels per second.
    pub fn velocity(&self) -> Point {
        self.velocity
    }

    pub fn set_velocity(&mut self, velocity: Point) {
        if self.active {
            self.velocity = velocity;
        }
    }

    pub fn stop(&mut self) {
        self.velocity = Point::default();
    }

    /// Remove the body from the simulation. Irreversible.
    pub fn destroy(&mut self) {
        self.active = false;
        self.stop();
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn has_fixture(&self, fixture_type: FixtureType) -> bool {
        self.body
            .fixtures
            .iter()
            .any(|f| f.fixture_type == fixture_type)
    }
}

impl Component for PhysicsComponent {
    fn name(&self) -> &'static str {
        PHYSICS_COMPONENT
    }

    fn owner(&self) -> &Owner {
        &self.owner
    }

    fn init(&mut self, data: &DefinitionNode, _ctx: &InitContext) -> EngineResult<()> {
        self.body = BodyDef::from_definition(data)?;
        self.velocity = self.body.linear_velocity;
        Ok(())
    }

    fn wants_update(&self) -> bool {
        self.active && self.body.body_type != BodyType::Static
    }

    fn update(&mut self, delta_ms: u32) {
        if self.velocity.is_zero() {
            return;
        }
        let Some(position) = self.owner.component::<PositionComponent>() else {
            return;
        };
        let dt = delta_ms as f32 / 1000.0;
        if let Ok(mut position) = position.try_borrow_mut() {
            position.translate(self.velocity.x * dt, self.velocity.y * dt);
        }
    }

    fn to_definition(&self) -> DefinitionNode {
        self.body.to_definition()
    }
}

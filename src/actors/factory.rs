//! Builds actors from definition trees.
//!
//! Every actor, loaded from a level file or synthesized by
//! [`super::templates`], goes through [`ActorFactory::create_actor`]:
//!
//! 1. The root must be `<Actor Type="...">`.
//! 2. Each child element names a component. The [`ComponentRegistry`] maps
//!    that name to a constructor; unknown names fail the actor.
//! 3. Every component's `init` runs on its subtree, in document order.
//! 4. Once all of them succeeded, the actor's `post_init` wires siblings.
//!
//! A failure in 1-3 discards the half-built actor without anyone noticing.
//! A failure in 4 destroys it, since components may already have announced
//! themselves on the bus. Either way the error is logged and returned; other
//! actors are untouched.

use super::actor::{Actor, ActorId, Owner};
use crate::components::ambientsound::{
    GLOBAL_AMBIENT_SOUND_COMPONENT, GlobalAmbientSoundComponent,
};
use crate::components::ammo::{AMMO_COMPONENT, AmmoComponent};
use crate::components::animation::{ANIMATION_COMPONENT, AnimationComponent};
use crate::components::checkpoint::{CHECKPOINT_COMPONENT, CheckpointComponent};
use crate::components::controllable::{
    PLAYER_CONTROLLABLE_COMPONENT, PlayerControllableComponent,
};
use crate::components::crumblingpeg::{CRUMBLING_PEG_COMPONENT, CrumblingPegComponent};
use crate::components::damageaura::{DAMAGE_AURA_COMPONENT, DamageAuraComponent};
use crate::components::destroyable::{DESTROYABLE_COMPONENT, DestroyableComponent};
use crate::components::followable::{FOLLOWABLE_COMPONENT, FollowableComponent};
use crate::components::glitter::{GLITTER_COMPONENT, GlitterComponent};
use crate::components::health::{HEALTH_COMPONENT, HealthComponent};
use crate::components::physics::{PHYSICS_COMPONENT, PhysicsComponent};
use crate::components::pickup::{PICKUP_COMPONENT, PickupComponent};
use crate::components::position::{POSITION_COMPONENT, PositionComponent};
use crate::components::powerup::{POWERUP_COMPONENT, PowerupComponent};
use crate::components::predefinedmove::{PREDEFINED_MOVE_COMPONENT, PredefinedMoveComponent};
use crate::components::projectile::{PROJECTILE_COMPONENT, ProjectileComponent};
use crate::components::render::{ACTOR_RENDER_COMPONENT, HUD_RENDER_COMPONENT, RenderComponent};
use crate::components::soundtrigger::{SOUND_TRIGGER_COMPONENT, SoundTriggerComponent};
use crate::components::tileplane::TILE_PLANE_RENDER_COMPONENT;
use crate::components::trigger::{TRIGGER_COMPONENT, TriggerComponent};
use crate::components::{ComponentSlot, InitContext};
use crate::error::{EngineError, EngineResult};
use crate::events::bus::EventBus;
use crate::resources::definition::DefinitionNode;
use crate::resources::loader::ResourceLoader;
use crate::resources::palette::Palette;
use log::{debug, error};
use rustc_hash::FxHashMap;
use std::cell::Cell;
use std::rc::Rc;

pub const ACTOR_ELEMENT: &str = "Actor";

pub type ComponentCtor = fn(Owner) -> ComponentSlot;

/// Component name → constructor.
#[derive(Default)]
pub struct ComponentRegistry {
    ctors: FxHashMap<&'static str, ComponentCtor>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every component this crate provides.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(POSITION_COMPONENT, |o| {
            ComponentSlot::new(PositionComponent::new(o))
        });
        registry.register(PHYSICS_COMPONENT, |o| ComponentSlot::new(PhysicsComponent::new(o)));
        registry.register(ANIMATION_COMPONENT, |o| {
            ComponentSlot::new(AnimationComponent::new(o))
        });
        registry.register(ACTOR_RENDER_COMPONENT, |o| {
            ComponentSlot::new(RenderComponent::actor(o))
        });
        registry.register(TILE_PLANE_RENDER_COMPONENT, |o| {
            ComponentSlot::new(RenderComponent::tile_plane(o))
        });
        registry.register(HUD_RENDER_COMPONENT, |o| ComponentSlot::new(RenderComponent::hud(o)));
        registry.register(HEALTH_COMPONENT, |o| ComponentSlot::new(HealthComponent::new(o)));
        registry.register(AMMO_COMPONENT, |o| ComponentSlot::new(AmmoComponent::new(o)));
        registry.register(POWERUP_COMPONENT, |o| ComponentSlot::new(PowerupComponent::new(o)));
        registry.register(PLAYER_CONTROLLABLE_COMPONENT, |o| {
            ComponentSlot::new(PlayerControllableComponent::new(o))
        });
        registry.register(TRIGGER_COMPONENT, |o| ComponentSlot::new(TriggerComponent::new(o)));
        registry.register(PICKUP_COMPONENT, |o| ComponentSlot::new(PickupComponent::new(o)));
        registry.register(CHECKPOINT_COMPONENT, |o| {
            ComponentSlot::new(CheckpointComponent::new(o))
        });
        registry.register(GLOBAL_AMBIENT_SOUND_COMPONENT, |o| {
            ComponentSlot::new(GlobalAmbientSoundComponent::new(o))
        });
        registry.register(PROJECTILE_COMPONENT, |o| {
            ComponentSlot::new(ProjectileComponent::new(o))
        });
        registry.register(DAMAGE_AURA_COMPONENT, |o| {
            ComponentSlot::new(DamageAuraComponent::new(o))
        });
        registry.register(SOUND_TRIGGER_COMPONENT, |o| {
            ComponentSlot::new(SoundTriggerComponent::new(o))
        });
        registry.register(GLITTER_COMPONENT, |o| ComponentSlot::new(GlitterComponent::new(o)));
        registry.register(PREDEFINED_MOVE_COMPONENT, |o| {
            ComponentSlot::new(PredefinedMoveComponent::new(o))
        });
        registry.register(DESTROYABLE_COMPONENT, |o| {
            ComponentSlot::new(DestroyableComponent::new(o))
        });
        registry.register(CRUMBLING_PEG_COMPONENT, |o| {
            ComponentSlot::new(CrumblingPegComponent::new(o))
        });
        registry.register(FOLLOWABLE_COMPONENT, |o| {
            ComponentSlot::new(FollowableComponent::new(o))
        });
        registry
    }

    /// Returns `false` if `name` was already registered; the new constructor
    /// replaces the old one.
    pub fn register(&mut self, name: &'static str, ctor: ComponentCtor) -> bool {
        self.ctors.insert(name, ctor).is_none()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.ctors.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.ctors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ctors.is_empty()
    }

    fn ctor(&self, name: &str) -> Option<ComponentCtor> {
        self.ctors.get(name).copied()
    }
}

/// Something that turns a definition into a live actor.
///
/// [`ActorFactory`] only builds; the game session also registers the actor
/// in its table and announces it.
pub trait ActorSpawner {
    fn spawn_actor(&self, definition: &DefinitionNode) -> EngineResult<Rc<Actor>>;
}

pub struct ActorFactory {
    registry: ComponentRegistry,
    bus: Rc<EventBus>,
    loader: Rc<dyn ResourceLoader>,
    palette: Palette,
    image_extension: String,
    last_actor_id: Cell<u32>,
}

impl ActorFactory {
    pub fn new(
        bus: Rc<EventBus>,
        loader: Rc<dyn ResourceLoader>,
        palette: Palette,
        image_extension: impl Into<String>,
    ) -> Self {
        Self::with_registry(
            ComponentRegistry::with_defaults(),
            bus,
            loader,
            palette,
            image_extension,
        )
    }

    pub fn with_registry(
        registry: ComponentRegistry,
        bus: Rc<EventBus>,
        loader: Rc<dyn ResourceLoader>,
        palette: Palette,
        image_extension: impl Into<String>,
    ) -> Self {
        Self {
            registry,
            bus,
            loader,
            palette,
            image_extension: image_extension.into(),
            last_actor_id: Cell::new(0),
        }
    }

    pub fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut ComponentRegistry {
        &mut self.registry
    }

    pub fn bus(&self) -> &Rc<EventBus> {
        &self.bus
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    fn next_actor_id(&self) -> ActorId {
        let id = self.last_actor_id.get() + 1;
        self.last_actor_id.set(id);
        ActorId(id)
    }

    pub fn create_actor(&self, definition: &DefinitionNode) -> EngineResult<Rc<Actor>> {
        self.build(definition).inspect_err(|e| {
            error!(
                "Failed to create actor '{}': {}",
                definition.attr("Type").unwrap_or("?"),
                e
            );
        })
    }

    fn build(&self, definition: &DefinitionNode) -> EngineResult<Rc<Actor>> {
        if definition.name != ACTOR_ELEMENT {
            return Err(EngineError::malformed(
                ACTOR_ELEMENT,
                "root",
                &definition.name,
            ));
        }
        let type_name = definition
            .attr("Type")
            .ok_or_else(|| EngineError::missing(ACTOR_ELEMENT, "Type"))?;

        let actor = Actor::new(self.next_actor_id(), type_name, Rc::clone(&self.bus));
        if let Err(e) = self.init_components(&actor, definition) {
            actor.discard();
            return Err(e);
        }
        if let Err(e) = actor.post_init() {
            actor.destroy();
            return Err(e);
        }
        debug!(
            "Created actor {} ({}) with {:?}",
            actor.id(),
            actor.type_name(),
            actor.component_names()
        );
        Ok(actor)
    }

    fn init_components(&self, actor: &Rc<Actor>, definition: &DefinitionNode) -> EngineResult<()> {
        let ctx = InitContext {
            loader: self.loader.as_ref(),
            palette: &self.palette,
            image_extension: &self.image_extension,
            actor_type: actor.type_name(),
        };
        for data in &definition.children {
            let ctor = self
                .registry
                .ctor(&data.name)
                .ok_or_else(|| EngineError::UnknownComponent(data.name.clone()))?;
            let slot = ctor(actor.owner());
            slot.dynamic().borrow_mut().init(data, &ctx)?;
            actor.add_component(slot)?;
        }
        Ok(())
    }
}

impl ActorSpawner for ActorFactory {
    fn spawn_actor(&self, definition: &DefinitionNode) -> EngineResult<Rc<Actor>> {
        self.create_actor(definition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::position::position_definition;
    use crate::events::EventType;
    use crate::geometry::Point;
    use crate::resources::loader::MemoryLoader;

    fn factory() -> ActorFactory {
        ActorFactory::new(
            Rc::new(EventBus::new()),
            Rc::new(MemoryLoader::new()),
            Palette::default(),
            "pid",
        )
    }

    #[test]
    fn test_create_positioned_actor() {
        let f = factory();
        let def = DefinitionNode::new("Actor")
            .with_attr("Type", "Marker")
            .with_child(position_definition(Point::new(10.0, 20.0)));
        let actor = f.create_actor(&def).expect("actor");
        assert_eq!(actor.type_name(), "Marker");
        let position = actor.component::<PositionComponent>().expect("position");
        assert_eq!(position.borrow().position(), Point::new(10.0, 20.0));
    }

    #[test]
    fn test_unknown_component_fails() {
        let f = factory();
        let def = DefinitionNode::new("Actor")
            .with_attr("Type", "Broken")
            .with_child(DefinitionNode::new("TeleportComponent"));
        assert_eq!(
            f.create_actor(&def).err(),
            Some(EngineError::UnknownComponent("TeleportComponent".into()))
        );
    }

    #[test]
    fn test_missing_type_and_wrong_root() {
        let f = factory();
        assert!(matches!(
            f.create_actor(&DefinitionNode::new("Actor")),
            Err(EngineError::MissingField { .. })
        ));
        assert!(matches!(
            f.create_actor(&DefinitionNode::new("Level").with_attr("Type", "x")),
            Err(EngineError::MalformedField { .. })
        ));
    }

    #[test]
    fn test_duplicate_component_fails() {
        let f = factory();
        let def = DefinitionNode::new("Actor")
            .with_attr("Type", "Twice")
            .with_child(position_definition(Point::new(1.0, 1.0)))
            .with_child(position_definition(Point::new(2.0, 2.0)));
        assert!(matches!(
            f.create_actor(&def),
            Err(EngineError::DuplicateComponent(_))
        ));
    }

    #[test]
    fn test_failed_init_publishes_nothing() {
        let f = factory();
        let receiver = f.bus().new_receiver();
        let seen = Rc::new(Cell::new(0));
        let sink = seen.clone();
        f.bus().subscribe(receiver, EventType::ActorDestroyed, move |_| {
            sink.set(sink.get() + 1)
        });
        let def = DefinitionNode::new("Actor")
            .with_attr("Type", "Bad")
            .with_child(DefinitionNode::new(POSITION_COMPONENT));
        assert!(f.create_actor(&def).is_err());
        assert_eq!(seen.get(), 0);
    }
}

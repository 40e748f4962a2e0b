//! Breakables: crates that drop loot and kegs that blow up.
//!
//! When the sibling health drops to zero the component queues, in order, one
//! falling pickup per `<Loot>` entry, an explosion (area damage plus its
//! animation) if `<ExplosionDamage>` is set, and finally the removal of its
//! own actor. It reacts once.
//!
//! ```text
//! <DestroyableComponent>
//!   <Loot>TreasureCoin</Loot>
//!   <Loot>PotionSmall</Loot>
//!   <DeathSound>/GAME/SOUNDS/CRATEBREAK.WAV</DeathSound>
//!   <ExplosionDamage>20</ExplosionDamage>
//!   <ExplosionSize width="120" height="120"/>
//! </DestroyableComponent>
//! ```

use crate::actors::actor::Owner;
use crate::actors::templates::{self, PickupType};
use crate::components::health::{DamageType, HealthObserver, observe_health, unobserve_health};
use crate::components::physics::{PhysicsComponent, collision_flag, read_size};
use crate::components::position::PositionComponent;
use crate::components::{Component, InitContext};
use crate::error::{EngineError, EngineResult};
use crate::events::GameEvent;
use crate::geometry::Point;
use crate::resources::definition::{DefinitionNode, Fields};
use log::{debug, warn};
use std::rc::Rc;

pub const DESTROYABLE_COMPONENT: &str = "DestroyableComponent";
pub const DEFAULT_EXPLOSION_SIZE: Point = Point { x: 120.0, y: 120.0 };

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Explosion {
    pub damage: i32,
    pub size: Point,
}

pub struct DestroyableComponent {
    owner: Owner,
    loot: Vec<PickupType>,
    death_sound: Option<String>,
    explosion: Option<Explosion>,
    destroyed: bool,
}

impl DestroyableComponent {
    pub fn new(owner: Owner) -> Self {
        Self {
            owner,
            loot: Vec::new(),
            death_sound: None,
            explosion: None,
            destroyed: false,
        }
    }

    pub fn loot(&self) -> &[PickupType] {
        &self.loot
    }

    pub fn explosion(&self) -> Option<Explosion> {
        self.explosion
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    fn position(&self) -> Point {
        self.owner
            .component::<PositionComponent>()
            .and_then(|p| p.try_borrow().ok().map(|p| p.position()))
            .unwrap_or_default()
    }

    fn request(&self, definition: DefinitionNode) {
        self.owner.bus().publish_queued(GameEvent::RequestNewActor {
            definition: Rc::new(definition),
            requester: Some(self.owner.id()),
        });
    }

    fn break_apart(&mut self) {
        self.destroyed = true;
        let at = self.position();
        debug!(
            "Actor {} breaks at {:?}, dropping {} pickups",
            self.owner.id(),
            at,
            self.loot.len()
        );

        if let Some(physics) = self.owner.component::<PhysicsComponent>() {
            match physics.try_borrow_mut() {
                Ok(mut physics) => physics.destroy(),
                Err(_) => warn!("Physics of actor {} is busy, body kept", self.owner.id()),
            }
        }
        for pickup in &self.loot {
            self.request(templates::pickup_definition(*pickup, at, false));
        }
        if let Some(explosion) = self.explosion {
            self.request(templates::area_damage_definition(
                at,
                explosion.size,
                explosion.damage,
                collision_flag::CONTROLLER | collision_flag::ENEMY,
                "Circle",
                DamageType::Explosion,
                Point::default(),
                None,
                0,
            ));
            self.request(templates::single_animation_definition(
                at,
                templates::SingleAnimation::Explosion,
            ));
        }

        let bus = self.owner.bus();
        if let Some(sound) = &self.death_sound {
            bus.publish(GameEvent::play_sound(sound.as_str(), 100));
        }
        bus.publish_queued(GameEvent::RequestDestroyActor {
            actor: self.owner.id(),
        });
    }
}

impl HealthObserver for DestroyableComponent {
    fn on_health_below_zero(&mut self, _damage_type: DamageType) {
        if !self.destroyed {
            self.break_apart();
        }
    }
}

impl Component for DestroyableComponent {
    fn name(&self) -> &'static str {
        DESTROYABLE_COMPONENT
    }

    fn owner(&self) -> &Owner {
        &self.owner
    }

    fn init(&mut self, data: &DefinitionNode, _ctx: &InitContext) -> EngineResult<()> {
        let f = Fields::new(data, DESTROYABLE_COMPONENT);
        for node in data.children_named("Loot") {
            let text = node.text().unwrap_or_default();
            let pickup = text
                .parse::<PickupType>()
                .map_err(|_| EngineError::malformed(DESTROYABLE_COMPONENT, "Loot", text))?;
            self.loot.push(pickup);
        }
        self.death_sound = f.text("DeathSound").map(str::to_string);
        if let Some(damage) = f.opt::<i32>("ExplosionDamage")? {
            if damage <= 0 {
                return Err(EngineError::malformed(
                    DESTROYABLE_COMPONENT,
                    "ExplosionDamage",
                    &damage.to_string(),
                ));
            }
            let size = read_size(&f, "ExplosionSize")?.unwrap_or(DEFAULT_EXPLOSION_SIZE);
            self.explosion = Some(Explosion { damage, size });
        }
        Ok(())
    }

    fn post_init(&mut self) -> EngineResult<()> {
        observe_health::<DestroyableComponent>(&self.owner)
    }

    fn to_definition(&self) -> DefinitionNode {
        templates::destroyable_component_definition(
            &self.loot,
            self.death_sound.as_deref(),
            self.explosion,
        )
    }

    fn on_destroy(&mut self) {
        unobserve_health::<DestroyableComponent>(&self.owner);
    }
}

//! Collectible items.
//!
//! A pickup sits on a [`TriggerComponent`] and applies its effect to the first
//! eligible actor that enters. After a successful pickup it plays its sound
//! and asks the session to destroy its actor. Pickups an actor cannot use
//! (health when already full, ammo without an ammo component) stay in place.
//!
//! ```text
//! <PickupComponent>
//!   <PickupSound>/GAME/SOUNDS/COIN.WAV</PickupSound>
//!   <Treasure points="100"/>
//! </PickupComponent>
//! ```
//!
//! The effect element is one of `Treasure points`, `Health amount`,
//! `Ammo type count` or `Powerup type duration`.

use crate::actors::actor::{Actor, Owner};
use crate::actors::templates;
use crate::components::ammo::{AmmoComponent, AmmoType};
use crate::components::health::{DamageType, HealthComponent};
use crate::components::position::PositionComponent;
use crate::components::powerup::{PowerupComponent, PowerupType};
use crate::components::trigger::{TriggerObserver, observe_trigger, unobserve_trigger};
use crate::components::{Component, InitContext};
use crate::error::{EngineError, EngineResult};
use crate::events::GameEvent;
use crate::geometry::Point;
use crate::resources::definition::{DefinitionNode, Fields};
use log::debug;
use std::rc::Rc;

pub const PICKUP_COMPONENT: &str = "PickupComponent";

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PickupEffect {
    Treasure { points: i32 },
    Health { amount: i32 },
    Ammo { ammo: AmmoType, count: i32 },
    Powerup { powerup: PowerupType, duration_ms: u32 },
}

impl PickupEffect {
    pub fn to_definition(&self) -> DefinitionNode {
        match *self {
            PickupEffect::Treasure { points } => {
                DefinitionNode::new("Treasure").with_attr("points", points)
            }
            PickupEffect::Health { amount } => {
                DefinitionNode::new("Health").with_attr("amount", amount)
            }
            PickupEffect::Ammo { ammo, count } => DefinitionNode::new("Ammo")
                .with_attr("type", ammo)
                .with_attr("count", count),
            PickupEffect::Powerup {
                powerup,
                duration_ms,
            } => DefinitionNode::new("Powerup")
                .with_attr("type", powerup)
                .with_attr("duration", duration_ms),
        }
    }

    fn from_fields(f: &Fields) -> EngineResult<Self> {
        if f.node().child("Treasure").is_some() {
            return Ok(PickupEffect::Treasure {
                points: f.req_attr("Treasure", "points")?,
            });
        }
        if f.node().child("Health").is_some() {
            return Ok(PickupEffect::Health {
                amount: f.req_attr("Health", "amount")?,
            });
        }
        if f.node().child("Ammo").is_some() {
            return Ok(PickupEffect::Ammo {
                ammo: f.req_attr("Ammo", "type")?,
                count: f.req_attr("Ammo", "count")?,
            });
        }
        if f.node().child("Powerup").is_some() {
            return Ok(PickupEffect::Powerup {
                powerup: f.req_attr("Powerup", "type")?,
                duration_ms: f.req_attr("Powerup", "duration")?,
            });
        }
        Err(EngineError::missing(
            PICKUP_COMPONENT,
            "Treasure|Health|Ammo|Powerup",
        ))
    }
}

pub struct PickupComponent {
    owner: Owner,
    effect: PickupEffect,
    pickup_sound: String,
    picked_up: bool,
}

impl PickupComponent {
    pub fn new(owner: Owner) -> Self {
        Self {
            owner,
            effect: PickupEffect::Treasure { points: 0 },
            pickup_sound: String::new(),
            picked_up: false,
        }
    }

    pub fn effect(&self) -> PickupEffect {
        self.effect
    }

    pub fn is_picked_up(&self) -> bool {
        self.picked_up
    }

    fn position(&self) -> Point {
        self.owner
            .component::<PositionComponent>()
            .and_then(|p| p.try_borrow().ok().map(|p| p.position()))
            .unwrap_or_default()
    }

    /// Apply the effect to `other`. `false` if it has no use for it.
    fn apply(&self, other: &Rc<Actor>) -> bool {
        match self.effect {
            PickupEffect::Treasure { points } => {
                let bus = self.owner.bus();
                bus.publish(GameEvent::ScoreGained {
                    actor: other.id(),
                    points,
                });
                if let Some(popup) = templates::score_popup_definition(self.position(), points) {
                    bus.publish_queued(GameEvent::RequestNewActor {
                        definition: Rc::new(popup),
                        requester: Some(self.owner.id()),
                    });
                }
                true
            }
            PickupEffect::Health { amount } => {
                let Some(health) = other.component::<HealthComponent>() else {
                    return false;
                };
                if health.borrow().is_full() {
                    return false;
                }
                HealthComponent::add_health(&health, amount, DamageType::None, self.position())
            }
            PickupEffect::Ammo { ammo, count } => {
                let Some(component) = other.component::<AmmoComponent>() else {
                    return false;
                };
                component.borrow_mut().add_ammo(ammo, count);
                true
            }
            PickupEffect::Powerup {
                powerup,
                duration_ms,
            } => {
                let Some(component) = other.component::<PowerupComponent>() else {
                    return false;
                };
                component.borrow_mut().apply_powerup(powerup, duration_ms);
                true
            }
        }
    }
}

impl TriggerObserver for PickupComponent {
    fn on_actor_entered(&mut self, other: &Rc<Actor>) {
        if self.picked_up || !self.apply(other) {
            return;
        }
        debug!(
            "Actor {} picked up {:?} from actor {}",
            other.id(),
            self.effect,
            self.owner.id()
        );
        self.picked_up = true;
        let bus = self.owner.bus();
        if !self.pickup_sound.is_empty() {
            bus.publish(GameEvent::play_sound(self.pickup_sound.as_str(), 100));
        }
        bus.publish_queued(GameEvent::RequestDestroyActor {
            actor: self.owner.id(),
        });
    }
}

impl Component for PickupComponent {
    fn name(&self) -> &'static str {
        PICKUP_COMPONENT
    }

    fn owner(&self) -> &Owner {
        &self.owner
    }

    fn init(&mut self, data: &DefinitionNode, _ctx: &InitContext) -> EngineResult<()> {
        let f = Fields::new(data, PICKUP_COMPONENT);
        f.set_if(&mut self.pickup_sound, "PickupSound")?;
        self.effect = PickupEffect::from_fields(&f)?;
        Ok(())
    }

    fn post_init(&mut self) -> EngineResult<()> {
        observe_trigger::<PickupComponent>(&self.owner)
    }

    fn to_definition(&self) -> DefinitionNode {
        let mut node = DefinitionNode::new(PICKUP_COMPONENT);
        if !self.pickup_sound.is_empty() {
            node.push_text_child("PickupSound", &self.pickup_sound);
        }
        node.push_child(self.effect.to_definition());
        node
    }

    fn on_destroy(&mut self) {
        unobserve_trigger::<PickupComponent>(&self.owner);
    }
}

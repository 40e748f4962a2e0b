//! Damage auras: hurt actors standing inside a trigger volume.
//!
//! An aura either hits actors once as they enter (`ApplyAuraOnEnter`), pulses
//! every `PulseInterval` ms, or both. A group pulse hits everyone inside at
//! the same moment; otherwise each actor is on its own timer, started when it
//! entered. `RemoveActorAfterPulse` destroys the aura's actor after its first
//! pulse.

use crate::actors::actor::{Actor, ActorId, Owner};
use crate::components::health::{DamageType, HealthComponent};
use crate::components::physics::{FixtureDef, FixtureType};
use crate::components::position::PositionComponent;
use crate::components::trigger::{TriggerObserver, observe_trigger, unobserve_trigger};
use crate::components::{Component, InitContext};
use crate::error::{EngineError, EngineResult};
use crate::events::GameEvent;
use crate::geometry::Point;
use crate::resources::definition::{DefinitionNode, Fields};
use log::debug;
use std::rc::{Rc, Weak};

pub const DAMAGE_AURA_COMPONENT: &str = "DamageAuraComponent";

/// Shared aura settings.
#[derive(Debug, Clone, PartialEq)]
pub struct BaseAuraComponentDef {
    pub aura_fixture: FixtureDef,
    pub is_pulsating: bool,
    pub is_group_pulse: bool,
    pub apply_aura_on_enter: bool,
    pub remove_actor_after_pulse: bool,
    pub pulse_interval: u32,
}

impl Default for BaseAuraComponentDef {
    fn default() -> Self {
        Self {
            aura_fixture: FixtureDef {
                fixture_type: FixtureType::DamageAura,
                is_sensor: true,
                ..FixtureDef::default()
            },
            is_pulsating: false,
            is_group_pulse: false,
            apply_aura_on_enter: true,
            remove_actor_after_pulse: false,
            pulse_interval: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DamageAuraComponentDef {
    pub base: BaseAuraComponentDef,
    pub damage: i32,
    pub damage_type: DamageType,
}

impl DamageAuraComponentDef {
    pub fn to_definition(&self) -> DefinitionNode {
        let base = &self.base;
        DefinitionNode::new(DAMAGE_AURA_COMPONENT)
            .with_text_child("Damage", self.damage)
            .with_text_child("DamageType", self.damage_type)
            .with_text_child("IsPulsating", base.is_pulsating)
            .with_text_child("IsGroupPulse", base.is_group_pulse)
            .with_text_child("ApplyAuraOnEnter", base.apply_aura_on_enter)
            .with_text_child("RemoveActorAfterPulse", base.remove_actor_after_pulse)
            .with_text_child("PulseInterval", base.pulse_interval)
            .with_child(base.aura_fixture.to_definition())
    }

    pub fn from_definition(node: &DefinitionNode) -> EngineResult<Self> {
        let f = Fields::new(node, DAMAGE_AURA_COMPONENT);
        let mut def = DamageAuraComponentDef::default();
        f.set_if(&mut def.damage, "Damage")?;
        f.set_if(&mut def.damage_type, "DamageType")?;
        let base = &mut def.base;
        f.set_bool_if(&mut base.is_pulsating, "IsPulsating")?;
        f.set_bool_if(&mut base.is_group_pulse, "IsGroupPulse")?;
        f.set_bool_if(&mut base.apply_aura_on_enter, "ApplyAuraOnEnter")?;
        f.set_bool_if(&mut base.remove_actor_after_pulse, "RemoveActorAfterPulse")?;
        f.set_if(&mut base.pulse_interval, "PulseInterval")?;
        if let Some(fixture) = node.child("ActorFixture") {
            base.aura_fixture = FixtureDef::from_definition(fixture, DAMAGE_AURA_COMPONENT)?;
        }
        if def.damage < 0 {
            return Err(EngineError::malformed(
                DAMAGE_AURA_COMPONENT,
                "Damage",
                &def.damage.to_string(),
            ));
        }
        let base = &def.base;
        if base.is_pulsating && base.pulse_interval == 0 {
            return Err(EngineError::malformed(DAMAGE_AURA_COMPONENT, "PulseInterval", "0"));
        }
        Ok(def)
    }
}

struct Victim {
    id: ActorId,
    actor: Weak<Actor>,
    elapsed_ms: u32,
}

pub struct DamageAuraComponent {
    owner: Owner,
    def: DamageAuraComponentDef,
    inside: Vec<Victim>,
    group_elapsed_ms: u32,
    pulsed: bool,
}

impl DamageAuraComponent {
    pub fn new(owner: Owner) -> Self {
        Self {
            owner,
            def: DamageAuraComponentDef::default(),
            inside: Vec::new(),
            group_elapsed_ms: 0,
            pulsed: false,
        }
    }

    pub fn def(&self) -> &DamageAuraComponentDef {
        &self.def
    }

    pub fn actors_inside(&self) -> usize {
        self.inside.len()
    }

    fn origin(&self) -> Point {
        self.owner
            .component::<PositionComponent>()
            .and_then(|p| p.try_borrow().ok().map(|p| p.position()))
            .unwrap_or_default()
    }

    fn apply(&self, actor: &Rc<Actor>) {
        let Some(health) = actor.component::<HealthComponent>() else {
            return;
        };
        debug!(
            "Aura of actor {} hits actor {} for {}",
            self.owner.id(),
            actor.id(),
            self.def.damage
        );
        HealthComponent::add_health(
            &health,
            self.def.damage.saturating_neg(),
            self.def.damage_type,
            self.origin(),
        );
    }

    fn after_pulse(&mut self) {
        self.pulsed = true;
        if self.def.base.remove_actor_after_pulse {
            self.owner
                .bus()
                .publish_queued(GameEvent::RequestDestroyActor {
                    actor: self.owner.id(),
                });
        }
    }
}

impl TriggerObserver for DamageAuraComponent {
    fn on_actor_entered(&mut self, other: &Rc<Actor>) {
        if self.def.base.apply_aura_on_enter {
            self.apply(other);
        }
        self.inside.push(Victim {
            id: other.id(),
            actor: Rc::downgrade(other),
            elapsed_ms: 0,
        });
    }

    fn on_actor_left(&mut self, other: &Rc<Actor>) {
        self.inside.retain(|v| v.id != other.id());
    }
}

impl Component for DamageAuraComponent {
    fn name(&self) -> &'static str {
        DAMAGE_AURA_COMPONENT
    }

    fn owner(&self) -> &Owner {
        &self.owner
    }

    fn init(&mut self, data: &DefinitionNode, _ctx: &InitContext) -> EngineResult<()> {
        self.def = DamageAuraComponentDef::from_definition(data)?;
        Ok(())
    }

    fn post_init(&mut self) -> EngineResult<()> {
        observe_trigger::<DamageAuraComponent>(&self.owner)
    }

    fn wants_update(&self) -> bool {
        self.def.base.is_pulsating && !(self.pulsed && self.def.base.remove_actor_after_pulse)
    }

    fn update(&mut self, delta_ms: u32) {
        self.inside.retain(|v| v.actor.strong_count() > 0);
        let interval = self.def.base.pulse_interval;

        if self.def.base.is_group_pulse {
            self.group_elapsed_ms += delta_ms;
            if self.group_elapsed_ms < interval {
                return;
            }
            self.group_elapsed_ms -= interval;
            let victims: Vec<Rc<Actor>> =
                self.inside.iter().filter_map(|v| v.actor.upgrade()).collect();
            for victim in &victims {
                self.apply(victim);
            }
            self.after_pulse();
            return;
        }

        let mut due = Vec::new();
        for victim in &mut self.inside {
            victim.elapsed_ms += delta_ms;
            if victim.elapsed_ms >= interval {
                victim.elapsed_ms -= interval;
                if let Some(actor) = victim.actor.upgrade() {
                    due.push(actor);
                }
            }
        }
        if due.is_empty() {
            return;
        }
        for victim in &due {
            self.apply(victim);
        }
        self.after_pulse();
    }

    fn to_definition(&self) -> DefinitionNode {
        self.def.to_definition()
    }

    fn on_destroy(&mut self) {
        unobserve_trigger::<DamageAuraComponent>(&self.owner);
        self.inside.clear();
    }
}

//! Timed powerups.
//!
//! One powerup is active at a time. Picking up the active type again extends
//! its remaining time; a different type replaces it. Invulnerability is
//! mirrored onto the sibling [`HealthComponent`] while it lasts.

use crate::actors::actor::Owner;
use crate::components::health::HealthComponent;
use crate::components::physics::string_enum;
use crate::components::{Component, InitContext};
use crate::error::EngineResult;
use crate::resources::definition::{DefinitionNode, Fields};
use log::debug;
use std::fmt;
use std::str::FromStr;

pub const POWERUP_COMPONENT: &str = "PowerupComponent";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PowerupType {
    Invulnerability,
    Catnip,
    Invisibility,
    FireSword,
    IceSword,
    LightningSword,
}
string_enum!(PowerupType {
    Invulnerability,
    Catnip,
    Invisibility,
    FireSword,
    IceSword,
    LightningSword
});

pub struct PowerupComponent {
    owner: Owner,
    active: Option<PowerupType>,
    remaining_ms: u32,
}

impl PowerupComponent {
    pub fn new(owner: Owner) -> Self {
        Self {
            owner,
            active: None,
            remaining_ms: 0,
        }
    }

    pub fn active_powerup(&self) -> Option<PowerupType> {
        self.active
    }

    pub fn has_powerup(&self, powerup: PowerupType) -> bool {
        self.active == Some(powerup)
    }

    pub fn remaining_ms(&self) -> u32 {
        self.remaining_ms
    }

    pub fn apply_powerup(&mut self, powerup: PowerupType, duration_ms: u32) {
        if self.active == Some(powerup) {
            self.remaining_ms += duration_ms;
            return;
        }
        if self.active.is_some() {
            self.expire();
        }
        debug!(
            "Actor {} gains {} for {} ms",
            self.owner.id(),
            powerup,
            duration_ms
        );
        self.active = Some(powerup);
        self.remaining_ms = duration_ms;
        if powerup == PowerupType::Invulnerability {
            self.set_invulnerable(true);
        }
    }

    pub fn clear(&mut self) {
        if self.active.is_some() {
            self.expire();
        }
    }

    fn expire(&mut self) {
        if self.active.take() == Some(PowerupType::Invulnerability) {
            self.set_invulnerable(false);
        }
        self.remaining_ms = 0;
    }

    fn set_invulnerable(&self, invulnerable: bool) {
        if let Some(health) = self.owner.component::<HealthComponent>() {
            if let Ok(mut health) = health.try_borrow_mut() {
                health.set_invulnerable(invulnerable);
            }
        }
    }
}

impl Component for PowerupComponent {
    fn name(&self) -> &'static str {
        POWERUP_COMPONENT
    }

    fn owner(&self) -> &Owner {
        &self.owner
    }

    fn init(&mut self, data: &DefinitionNode, _ctx: &InitContext) -> EngineResult<()> {
        let f = Fields::new(data, POWERUP_COMPONENT);
        self.active = f.opt("ActivePowerup")?;
        if self.active.is_some() {
            self.remaining_ms = f.req("RemainingMs")?;
        }
        Ok(())
    }

    fn post_init(&mut self) -> EngineResult<()> {
        if self.active == Some(PowerupType::Invulnerability) {
            self.set_invulnerable(true);
        }
        Ok(())
    }

    fn wants_update(&self) -> bool {
        self.active.is_some()
    }

    fn update(&mut self, delta_ms: u32) {
        self.remaining_ms = self.remaining_ms.saturating_sub(delta_ms);
        if self.remaining_ms == 0 {
            debug!("Powerup of actor {} expired", self.owner.id());
            self.expire();
        }
    }

    fn to_definition(&self) -> DefinitionNode {
        let mut node = DefinitionNode::new(POWERUP_COMPONENT);
        if let Some(active) = self.active {
            node.push_text_child("ActivePowerup", active);
            node.push_text_child("RemainingMs", self.remaining_ms);
        }
        node
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actors::actor::ActorId;
    use crate::events::bus::EventBus;
    use std::rc::Rc;

    fn powerup() -> PowerupComponent {
        PowerupComponent::new(Owner::detached(ActorId(1), Rc::new(EventBus::new())))
    }

    #[test]
    fn test_same_type_extends() {
        let mut p = powerup();
        p.apply_powerup(PowerupType::Catnip, 1000);
        p.apply_powerup(PowerupType::Catnip, 500);
        assert_eq!(p.remaining_ms(), 1500);
    }

    #[test]
    fn test_expires_after_duration() {
        let mut p = powerup();
        p.apply_powerup(PowerupType::FireSword, 100);
        p.update(60);
        assert!(p.has_powerup(PowerupType::FireSword));
        p.update(40);
        assert_eq!(p.active_powerup(), None);
        assert!(!p.wants_update());
    }

    #[test]
    fn test_other_type_replaces() {
        let mut p = powerup();
        p.apply_powerup(PowerupType::Catnip, 1000);
        p.apply_powerup(PowerupType::IceSword, 200);
        assert_eq!(p.active_powerup(), Some(PowerupType::IceSword));
        assert_eq!(p.remaining_ms(), 200);
    }
}

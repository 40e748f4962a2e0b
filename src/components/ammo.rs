//! Per-type ammunition counts and the active weapon.

use crate::actors::actor::Owner;
use crate::components::physics::string_enum;
use crate::components::{Component, InitContext};
use crate::error::EngineResult;
use crate::events::GameEvent;
use crate::resources::definition::{DefinitionNode, Fields};
use std::fmt;
use std::str::FromStr;

pub const AMMO_COMPONENT: &str = "AmmoComponent";
pub const MAX_AMMO: i32 = 99;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AmmoType {
    #[default]
    Pistol,
    Magic,
    Dynamite,
}
string_enum!(AmmoType {
    Pistol,
    Magic,
    Dynamite
});

impl AmmoType {
    pub const ALL: [AmmoType; 3] = [AmmoType::Pistol, AmmoType::Magic, AmmoType::Dynamite];

    fn index(self) -> usize {
        self as usize
    }

    pub fn next(self) -> Self {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }
}

pub struct AmmoComponent {
    owner: Owner,
    counts: [i32; 3],
    active: AmmoType,
}

impl AmmoComponent {
    pub fn new(owner: Owner) -> Self {
        Self {
            owner,
            counts: [0; 3],
            active: AmmoType::Pistol,
        }
    }

    pub fn ammo(&self, ammo: AmmoType) -> i32 {
        self.counts[ammo.index()]
    }

    pub fn active_ammo(&self) -> AmmoType {
        self.active
    }

    pub fn set_active_ammo(&mut self, ammo: AmmoType) {
        self.active = ammo;
        self.announce(ammo);
    }

    pub fn cycle_active_ammo(&mut self) -> AmmoType {
        self.set_active_ammo(self.active.next());
        self.active
    }

    pub fn can_fire(&self) -> bool {
        self.ammo(self.active) > 0
    }

    /// Add (or remove, when negative) ammunition, clamped to `0..=MAX_AMMO`.
    pub fn add_ammo(&mut self, ammo: AmmoType, count: i32) {
        let slot = &mut self.counts[ammo.index()];
        *slot = (*slot + count).clamp(0, MAX_AMMO);
        self.announce(ammo);
    }

    /// Spend one unit of the active ammunition. `false` when out of it.
    pub fn consume_ammo(&mut self) -> bool {
        if !self.can_fire() {
            return false;
        }
        self.add_ammo(self.active, -1);
        true
    }

    fn announce(&self, ammo: AmmoType) {
        self.owner.bus().publish(GameEvent::AmmoUpdated {
            actor: self.owner.id(),
            ammo,
            count: self.ammo(ammo),
        });
    }
}

impl Component for AmmoComponent {
    fn name(&self) -> &'static str {
        AMMO_COMPONENT
    }

    fn owner(&self) -> &Owner {
        &self.owner
    }

    fn init(&mut self, data: &DefinitionNode, _ctx: &InitContext) -> EngineResult<()> {
        let f = Fields::new(data, AMMO_COMPONENT);
        for ammo in AmmoType::ALL {
            if let Some(count) = f.opt::<i32>(&ammo.to_string())? {
                self.counts[ammo.index()] = count.clamp(0, MAX_AMMO);
            }
        }
        f.set_if(&mut self.active, "ActiveAmmo")?;
        Ok(())
    }

    fn to_definition(&self) -> DefinitionNode {
        let mut node = DefinitionNode::new(AMMO_COMPONENT);
        for ammo in AmmoType::ALL {
            node.push_text_child(ammo.to_string(), self.ammo(ammo));
        }
        node.push_text_child("ActiveAmmo", self.active);
        node
    }
}

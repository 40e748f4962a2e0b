//! Projectiles: deal damage to the first actor they hit, then disappear.

use crate::actors::actor::{Actor, Owner};
use crate::components::health::{DamageType, HealthComponent};
use crate::components::position::PositionComponent;
use crate::components::{Component, InitContext};
use crate::error::EngineResult;
use crate::events::GameEvent;
use crate::resources::definition::{DefinitionNode, Fields};
use log::debug;
use std::cell::RefCell;
use std::rc::Rc;

pub const PROJECTILE_COMPONENT: &str = "ProjectileComponent";

pub struct ProjectileComponent {
    owner: Owner,
    damage: i32,
    damage_type: DamageType,
    spent: bool,
}

impl ProjectileComponent {
    pub fn new(owner: Owner) -> Self {
        Self {
            owner,
            damage: 0,
            damage_type: DamageType::Bullet,
            spent: false,
        }
    }

    pub fn damage(&self) -> i32 {
        self.damage
    }

    pub fn damage_type(&self) -> DamageType {
        self.damage_type
    }

    pub fn is_spent(&self) -> bool {
        self.spent
    }

    /// Damage `target` and request this projectile's removal. A projectile
    /// hits once; later calls return `false`.
    pub fn hit(this: &Rc<RefCell<Self>>, target: &Rc<Actor>) -> bool {
        let (damage, damage_type, owner) = {
            let mut me = this.borrow_mut();
            if me.spent {
                return false;
            }
            me.spent = true;
            (me.damage, me.damage_type, me.owner.clone())
        };
        let impact = owner
            .component::<PositionComponent>()
            .map(|p| p.borrow().position())
            .unwrap_or_default();
        if let Some(health) = target.component::<HealthComponent>() {
            debug!(
                "Projectile {} hits actor {} for {} ({})",
                owner.id(),
                target.id(),
                damage,
                damage_type
            );
            HealthComponent::add_health(&health, -damage, damage_type, impact);
        }
        owner
            .bus()
            .publish_queued(GameEvent::RequestDestroyActor { actor: owner.id() });
        true
    }
}

impl Component for ProjectileComponent {
    fn name(&self) -> &'static str {
        PROJECTILE_COMPONENT
    }

    fn owner(&self) -> &Owner {
        &self.owner
    }

    fn init(&mut self, data: &DefinitionNode, _ctx: &InitContext) -> EngineResult<()> {
        let f = Fields::new(data, PROJECTILE_COMPONENT);
        self.damage = f.req("Damage")?;
        f.set_if(&mut self.damage_type, "DamageType")?;
        Ok(())
    }

    fn to_definition(&self) -> DefinitionNode {
        DefinitionNode::new(PROJECTILE_COMPONENT)
            .with_text_child("Damage", self.damage)
            .with_text_child("DamageType", self.damage_type)
    }
}

//! Entry points for the physics collaborator.
//!
//! Physics detects overlaps; these functions turn them into component calls.
//! Both sides are passed as actors so the trigger's observers can inspect the
//! entering actor's components (health, ammo, controllable).

use crate::actors::actor::Actor;
use crate::components::projectile::ProjectileComponent;
use crate::components::trigger::TriggerComponent;
use log::debug;
use std::rc::Rc;

/// `other` started overlapping `trigger`'s trigger fixture.
/// Returns `false` if `trigger` has no trigger component or ignored the entry.
pub fn actor_entered(trigger: &Rc<Actor>, other: &Rc<Actor>) -> bool {
    let Some(component) = trigger.component::<TriggerComponent>() else {
        debug!("Actor {} has no trigger", trigger.id());
        return false;
    };
    TriggerComponent::actor_entered(&component, other)
}

pub fn actor_left(trigger: &Rc<Actor>, other: &Rc<Actor>) -> bool {
    match trigger.component::<TriggerComponent>() {
        Some(component) => TriggerComponent::actor_left(&component, other),
        None => false,
    }
}

/// A projectile touched `target`. Returns `true` if damage was dealt.
pub fn projectile_hit(projectile: &Rc<Actor>, target: &Rc<Actor>) -> bool {
    match projectile.component::<ProjectileComponent>() {
        Some(component) => ProjectileComponent::hit(&component, target),
        None => false,
    }
}

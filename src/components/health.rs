//! Hit points and the observers that react to them.
//!
//! Changes go through [`HealthComponent::add_health`], which takes the shared
//! handle so observers are called after the component's own borrow ends. An
//! observer may therefore read the health it is being told about.

use crate::actors::actor::Owner;
use crate::components::physics::string_enum;
use crate::components::{Component, Deferred, InitContext, ObserverList, notify_each};
use crate::error::{EngineError, EngineResult};
use crate::geometry::Point;
use crate::resources::definition::{DefinitionNode, Fields};
use log::debug;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use std::str::FromStr;

pub const HEALTH_COMPONENT: &str = "HealthComponent";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DamageType {
    #[default]
    None,
    Melee,
    Bullet,
    Explosion,
    Magic,
    Fire,
    Lightning,
    Ice,
    Spikes,
    Death,
}
string_enum!(DamageType {
    None,
    Melee,
    Bullet,
    Explosion,
    Magic,
    Fire,
    Lightning,
    Ice,
    Spikes,
    Death
});

pub trait HealthObserver {
    fn on_health_changed(
        &mut self,
        _old_health: i32,
        _new_health: i32,
        _damage_type: DamageType,
        _impact: Point,
    ) {
    }
    fn on_health_below_zero(&mut self, _damage_type: DamageType) {}
}

#[derive(Debug, Clone, Copy)]
enum Notice {
    Changed {
        old: i32,
        new: i32,
        damage_type: DamageType,
        impact: Point,
    },
    BelowZero(DamageType),
}

pub struct HealthComponent {
    owner: Owner,
    health: i32,
    max_health: i32,
    invulnerable: bool,
    observers: ObserverList<dyn HealthObserver>,
    pending: Vec<Notice>,
}

impl HealthComponent {
    pub fn new(owner: Owner) -> Self {
        Self {
            owner,
            health: 0,
            max_health: 0,
            invulnerable: false,
            observers: ObserverList::new(),
            pending: Vec::new(),
        }
    }

    pub fn health(&self) -> i32 {
        self.health
    }

    pub fn max_health(&self) -> i32 {
        self.max_health
    }

    pub fn is_full(&self) -> bool {
        self.health >= self.max_health
    }

    pub fn is_alive(&self) -> bool {
        self.health > 0
    }

    pub fn is_invulnerable(&self) -> bool {
        self.invulnerable
    }

    pub fn set_invulnerable(&mut self, invulnerable: bool) {
        self.invulnerable = invulnerable;
    }

    pub fn add_observer(&mut self, observer: Weak<RefCell<dyn HealthObserver>>) -> bool {
        self.observers.add(observer)
    }

    pub fn remove_observer(&mut self, observer: &Weak<RefCell<dyn HealthObserver>>) {
        self.observers.remove(observer);
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    /// Apply `delta` (negative for damage) and notify observers. Returns
    /// `false` when nothing changed: full health, invulnerable or already dead.
    pub fn add_health(
        this: &Rc<RefCell<Self>>,
        delta: i32,
        damage_type: DamageType,
        impact: Point,
    ) -> bool {
        let (changed, deferred) = {
            let mut me = this.borrow_mut();
            let changed = me.change(delta, damage_type, impact);
            (changed, me.take_deferred())
        };
        for work in deferred {
            work();
        }
        changed
    }

    fn change(&mut self, delta: i32, damage_type: DamageType, impact: Point) -> bool {
        if delta < 0 && self.invulnerable {
            debug!("Actor {} is invulnerable, damage ignored", self.owner.id());
            return false;
        }
        if !self.is_alive() {
            return false;
        }
        let old = self.health;
        let new = (old + delta).min(self.max_health);
        if new == old {
            return false;
        }
        self.health = new;
        self.pending.push(Notice::Changed {
            old,
            new,
            damage_type,
            impact,
        });
        if new <= 0 {
            self.pending.push(Notice::BelowZero(damage_type));
        }
        true
    }

    /// Back to full health without notifying anyone, e.g. on respawn.
    pub fn restore(&mut self) {
        self.health = self.max_health;
    }
}

impl Component for HealthComponent {
    fn name(&self) -> &'static str {
        HEALTH_COMPONENT
    }

    fn owner(&self) -> &Owner {
        &self.owner
    }

    fn init(&mut self, data: &DefinitionNode, _ctx: &InitContext) -> EngineResult<()> {
        let f = Fields::new(data, HEALTH_COMPONENT);
        self.health = f.req("Health")?;
        self.max_health = f.opt("MaxHealth")?.unwrap_or(self.health);
        f.set_bool_if(&mut self.invulnerable, "IsInvulnerable")?;
        if self.max_health <= 0 || self.health > self.max_health {
            return Err(EngineError::malformed(
                HEALTH_COMPONENT,
                "MaxHealth",
                &self.max_health.to_string(),
            ));
        }
        Ok(())
    }

    fn take_deferred(&mut self) -> Vec<Deferred> {
        if self.pending.is_empty() {
            return Vec::new();
        }
        let notices = std::mem::take(&mut self.pending);
        let observers = self.observers.snapshot();
        if observers.is_empty() {
            return Vec::new();
        }
        let work: Deferred = Box::new(move || {
            for notice in notices {
                notify_each(&observers, |o| match notice {
                    Notice::Changed {
                        old,
                        new,
                        damage_type,
                        impact,
                    } => o.on_health_changed(old, new, damage_type, impact),
                    Notice::BelowZero(damage_type) => o.on_health_below_zero(damage_type),
                });
            }
        });
        vec![work]
    }

    fn to_definition(&self) -> DefinitionNode {
        DefinitionNode::new(HEALTH_COMPONENT)
            .with_text_child("Health", self.health)
            .with_text_child("MaxHealth", self.max_health)
            .with_text_child("IsInvulnerable", self.invulnerable)
    }
}

/// Helper for observers registering themselves from `post_init`.
pub fn observe_health<T: HealthObserver + Component>(owner: &Owner) -> EngineResult<()> {
    let health = owner
        .component::<HealthComponent>()
        .ok_or_else(|| EngineError::invariant(format!("actor {} has no health", owner.id())))?;
    let me = owner
        .component::<T>()
        .ok_or_else(|| EngineError::invariant("observer is not attached to its actor"))?;
    let me: Rc<RefCell<dyn HealthObserver>> = me;
    health.borrow_mut().add_observer(Rc::downgrade(&me));
    Ok(())
}

pub fn unobserve_health<T: HealthObserver + Component>(owner: &Owner) {
    let (Some(health), Some(me)) = (owner.component::<HealthComponent>(), owner.component::<T>())
    else {
        return;
    };
    let me: Rc<RefCell<dyn HealthObserver>> = me;
    if let Ok(mut health) = health.try_borrow_mut() {
        health.remove_observer(&Rc::downgrade(&me));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actors::actor::ActorId;
    use crate::events::bus::EventBus;

    #[derive(Default)]
    struct Recorder {
        changes: Vec<(i32, i32)>,
        deaths: u32,
    }

    impl HealthObserver for Recorder {
        fn on_health_changed(&mut self, old: i32, new: i32, _: DamageType, _: Point) {
            self.changes.push((old, new));
        }
        fn on_health_below_zero(&mut self, _: DamageType) {
            self.deaths += 1;
        }
    }

    fn health(current: i32, max: i32) -> Rc<RefCell<HealthComponent>> {
        let owner = Owner::detached(ActorId(1), Rc::new(EventBus::new()));
        let mut h = HealthComponent::new(owner);
        h.health = current;
        h.max_health = max;
        Rc::new(RefCell::new(h))
    }

    fn observed(h: &Rc<RefCell<HealthComponent>>) -> Rc<RefCell<Recorder>> {
        let recorder = Rc::new(RefCell::new(Recorder::default()));
        let dyn_rec: Rc<RefCell<dyn HealthObserver>> = recorder.clone();
        h.borrow_mut().add_observer(Rc::downgrade(&dyn_rec));
        recorder
    }

    #[test]
    fn test_heal_is_capped_at_max() {
        let h = health(90, 100);
        let rec = observed(&h);
        assert!(HealthComponent::add_health(&h, 25, DamageType::None, Point::default()));
        assert_eq!(h.borrow().health(), 100);
        assert_eq!(rec.borrow().changes, vec![(90, 100)]);
        assert!(!HealthComponent::add_health(&h, 5, DamageType::None, Point::default()));
    }

    #[test]
    fn test_lethal_damage_notifies_below_zero_once() {
        let h = health(10, 100);
        let rec = observed(&h);
        HealthComponent::add_health(&h, -30, DamageType::Melee, Point::default());
        HealthComponent::add_health(&h, -30, DamageType::Melee, Point::default());
        assert_eq!(rec.borrow().deaths, 1);
        assert_eq!(rec.borrow().changes, vec![(10, -20)]);
    }

    #[test]
    fn test_invulnerable_ignores_damage_but_heals() {
        let h = health(50, 100);
        h.borrow_mut().set_invulnerable(true);
        assert!(!HealthComponent::add_health(&h, -10, DamageType::Bullet, Point::default()));
        assert!(HealthComponent::add_health(&h, 10, DamageType::None, Point::default()));
        assert_eq!(h.borrow().health(), 60);
    }

    #[test]
    fn test_observer_can_read_health_during_notification() {
        struct Reader {
            health: Rc<RefCell<HealthComponent>>,
            seen: i32,
        }
        impl HealthObserver for Reader {
            fn on_health_changed(&mut self, _: i32, _: i32, _: DamageType, _: Point) {
                self.seen = self.health.borrow().health();
            }
        }
        let h = health(50, 100);
        let reader = Rc::new(RefCell::new(Reader {
            health: h.clone(),
            seen: 0,
        }));
        let dyn_reader: Rc<RefCell<dyn HealthObserver>> = reader.clone();
        h.borrow_mut().add_observer(Rc::downgrade(&dyn_reader));
        HealthComponent::add_health(&h, -5, DamageType::Melee, Point::default());
        assert_eq!(reader.borrow().seen, 45);
    }
}

//! Enter/leave notifications for trigger volumes.
//!
//! The physics collaborator detects overlaps and reports them through
//! [`crate::systems::triggers`], which calls [`TriggerComponent::actor_entered`]
//! and [`TriggerComponent::actor_left`]. Sibling components (pickups,
//! checkpoints, sound triggers, auras) subscribe as [`TriggerObserver`]s.
//!
//! `EnterCount` limits how many entries fire; `-1` (the default) never runs
//! out. An exhausted trigger ignores further entries.

use crate::actors::actor::{Actor, ActorId, Owner};
use crate::components::{Component, InitContext, ObserverList, notify_each};
use crate::error::{EngineError, EngineResult};
use crate::resources::definition::{DefinitionNode, Fields};
use log::debug;
use rustc_hash::FxHashSet;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

pub const TRIGGER_COMPONENT: &str = "TriggerComponent";

pub const UNLIMITED_ENTRIES: i32 = -1;

pub trait TriggerObserver {
    fn on_actor_entered(&mut self, _other: &Rc<Actor>) {}
    fn on_actor_left(&mut self, _other: &Rc<Actor>) {}
}

pub struct TriggerComponent {
    owner: Owner,
    enter_count: i32,
    times_entered: i32,
    inside: FxHashSet<ActorId>,
    observers: ObserverList<dyn TriggerObserver>,
}

impl TriggerComponent {
    pub fn new(owner: Owner) -> Self {
        Self {
            owner,
            enter_count: UNLIMITED_ENTRIES,
            times_entered: 0,
            inside: FxHashSet::default(),
            observers: ObserverList::new(),
        }
    }

    pub fn add_observer(&mut self, observer: Weak<RefCell<dyn TriggerObserver>>) -> bool {
        self.observers.add(observer)
    }

    pub fn remove_observer(&mut self, observer: &Weak<RefCell<dyn TriggerObserver>>) {
        self.observers.remove(observer);
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    pub fn is_exhausted(&self) -> bool {
        self.enter_count != UNLIMITED_ENTRIES && self.times_entered >= self.enter_count
    }

    pub fn times_entered(&self) -> i32 {
        self.times_entered
    }

    pub fn is_inside(&self, actor: ActorId) -> bool {
        self.inside.contains(&actor)
    }

    /// Returns `true` if the entry fired observers.
    pub fn actor_entered(this: &Rc<RefCell<Self>>, other: &Rc<Actor>) -> bool {
        let observers = {
            let mut me = this.borrow_mut();
            if me.is_exhausted() || !me.inside.insert(other.id()) {
                return false;
            }
            me.times_entered += 1;
            debug!(
                "Actor {} entered trigger of actor {} ({}/{})",
                other.id(),
                me.owner.id(),
                me.times_entered,
                me.enter_count
            );
            me.observers.snapshot()
        };
        notify_each(&observers, |o| o.on_actor_entered(other));
        true
    }

    pub fn actor_left(this: &Rc<RefCell<Self>>, other: &Rc<Actor>) -> bool {
        let observers = {
            let mut me = this.borrow_mut();
            if !me.inside.remove(&other.id()) {
                return false;
            }
            me.observers.snapshot()
        };
        notify_each(&observers, |o| o.on_actor_left(other));
        true
    }
}

impl Component for TriggerComponent {
    fn name(&self) -> &'static str {
        TRIGGER_COMPONENT
    }

    fn owner(&self) -> &Owner {
        &self.owner
    }

    fn init(&mut self, data: &DefinitionNode, _ctx: &InitContext) -> EngineResult<()> {
        let f = Fields::new(data, TRIGGER_COMPONENT);
        f.set_if(&mut self.enter_count, "EnterCount")?;
        if self.enter_count < UNLIMITED_ENTRIES || self.enter_count == 0 {
            return Err(EngineError::malformed(
                TRIGGER_COMPONENT,
                "EnterCount",
                &self.enter_count.to_string(),
            ));
        }
        Ok(())
    }

    fn to_definition(&self) -> DefinitionNode {
        DefinitionNode::new(TRIGGER_COMPONENT).with_text_child("EnterCount", self.enter_count)
    }
}

/// Helper for observers registering themselves from `post_init`.
pub fn observe_trigger<T: TriggerObserver + Component>(owner: &Owner) -> EngineResult<()> {
    let trigger = owner
        .component::<TriggerComponent>()
        .ok_or_else(|| EngineError::invariant(format!("actor {} has no trigger", owner.id())))?;
    let me = owner
        .component::<T>()
        .ok_or_else(|| EngineError::invariant("observer is not attached to its actor"))?;
    let me: Rc<RefCell<dyn TriggerObserver>> = me;
    trigger.borrow_mut().add_observer(Rc::downgrade(&me));
    Ok(())
}

pub fn unobserve_trigger<T: TriggerObserver + Component>(owner: &Owner) {
    let (Some(trigger), Some(me)) = (owner.component::<TriggerComponent>(), owner.component::<T>())
    else {
        return;
    };
    let me: Rc<RefCell<dyn TriggerObserver>> = me;
    if let Ok(mut trigger) = trigger.try_borrow_mut() {
        trigger.remove_observer(&Rc::downgrade(&me));
    }
}

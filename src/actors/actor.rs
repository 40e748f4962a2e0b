//! Actors: typed bags of components.
//!
//! An [`Actor`] owns its components exclusively, at most one per capability
//! name. Components reach their actor and the event bus through an [`Owner`],
//! which holds the actor weakly.
//!
//! # Lifecycle
//!
//! `Created → Initializing → Active → Destroying → Destroyed`
//!
//! The factory drives the first three. [`Actor::destroy`] publishes
//! `ActorDestroyed` exactly once, then tears every component down and drops
//! them, so nothing reachable from the actor keeps a component alive.

use crate::components::{Component, ComponentSlot, Deferred};
use crate::error::{EngineError, EngineResult};
use crate::events::GameEvent;
use crate::events::bus::EventBus;
use crate::resources::definition::DefinitionNode;
use log::{debug, warn};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ActorId(pub u32);

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActorState {
    Created,
    Initializing,
    Active,
    Destroying,
    Destroyed,
}

/// A component's handle on the actor that owns it.
#[derive(Clone)]
pub struct Owner {
    id: ActorId,
    actor: Weak<Actor>,
    bus: Rc<EventBus>,
}

impl Owner {
    /// An owner with no actor behind it, for exercising components alone.
    pub fn detached(id: ActorId, bus: Rc<EventBus>) -> Self {
        Self {
            id,
            actor: Weak::new(),
            bus,
        }
    }

    pub fn id(&self) -> ActorId {
        self.id
    }

    pub fn bus(&self) -> &Rc<EventBus> {
        &self.bus
    }

    pub fn actor(&self) -> Option<Rc<Actor>> {
        self.actor.upgrade()
    }

    /// Sibling component lookup, including the caller's own type.
    pub fn component<T: Component>(&self) -> Option<Rc<RefCell<T>>> {
        self.actor.upgrade().and_then(|a| a.component::<T>())
    }

    pub fn type_name(&self) -> String {
        self.actor
            .upgrade()
            .map(|a| a.type_name().to_string())
            .unwrap_or_default()
    }
}

pub struct Actor {
    id: ActorId,
    type_name: String,
    state: Cell<ActorState>,
    components: RefCell<Vec<ComponentSlot>>,
    bus: Rc<EventBus>,
    self_ref: Weak<Actor>,
}

impl fmt::Debug for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Actor")
            .field("id", &self.id)
            .field("type_name", &self.type_name)
            .field("state", &self.state.get())
            .field("components", &self.component_names())
            .finish()
    }
}

impl Actor {
    pub fn new(id: ActorId, type_name: impl Into<String>, bus: Rc<EventBus>) -> Rc<Actor> {
        let type_name = type_name.into();
        Rc::new_cyclic(|self_ref| Actor {
            id,
            type_name,
            state: Cell::new(ActorState::Created),
            components: RefCell::new(Vec::new()),
            bus,
            self_ref: self_ref.clone(),
        })
    }

    pub fn id(&self) -> ActorId {
        self.id
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn state(&self) -> ActorState {
        self.state.get()
    }

    pub fn owner(&self) -> Owner {
        Owner {
            id: self.id,
            actor: self.self_ref.clone(),
            bus: Rc::clone(&self.bus),
        }
    }

    pub fn add_component(&self, slot: ComponentSlot) -> EngineResult<()> {
        if self.state.get() == ActorState::Created {
            self.state.set(ActorState::Initializing);
        }
        let mut components = self.components.borrow_mut();
        if components.iter().any(|c| c.name() == slot.name()) {
            return Err(EngineError::DuplicateComponent(slot.name().to_string()));
        }
        components.push(slot);
        Ok(())
    }

    pub fn component<T: Component>(&self) -> Option<Rc<RefCell<T>>> {
        self.components
            .borrow()
            .iter()
            .find_map(|slot| slot.downcast::<T>())
    }

    pub fn component_by_name(&self, name: &str) -> Option<ComponentSlot> {
        self.components
            .borrow()
            .iter()
            .find(|slot| slot.name() == name)
            .cloned()
    }

    pub fn component_names(&self) -> Vec<&'static str> {
        self.components.borrow().iter().map(|c| c.name()).collect()
    }

    pub fn component_count(&self) -> usize {
        self.components.borrow().len()
    }

    fn slots(&self) -> SmallVec<[ComponentSlot; 8]> {
        self.components.borrow().iter().cloned().collect()
    }

    /// Second init phase: every component already passed `init`.
    pub fn post_init(&self) -> EngineResult<()> {
        for slot in self.slots() {
            let deferred = {
                let mut component = slot.dynamic().borrow_mut();
                component.post_init()?;
                component.take_deferred()
            };
            run_deferred(deferred);
        }
        self.state.set(ActorState::Active);
        Ok(())
    }

    /// Tick every component that asked for updates, in insertion order.
    pub fn update(&self, delta_ms: u32) {
        if self.state.get() != ActorState::Active {
            return;
        }
        for slot in self.slots() {
            let deferred = match slot.dynamic().try_borrow_mut() {
                Ok(mut component) => {
                    if component.wants_update() {
                        component.update(delta_ms);
                    }
                    component.take_deferred()
                }
                Err(_) => {
                    warn!("{} on actor {} is busy, skipping update", slot.name(), self.id);
                    continue;
                }
            };
            run_deferred(deferred);
        }
    }

    /// Publish `ActorDestroyed` and tear the components down.
    ///
    /// Returns `false` if the actor was already being destroyed.
    pub fn destroy(&self) -> bool {
        match self.state.get() {
            ActorState::Destroying | ActorState::Destroyed => return false,
            _ => {}
        }
        self.state.set(ActorState::Destroying);
        debug!("Destroying actor {} ({})", self.id, self.type_name);
        self.bus.publish(GameEvent::ActorDestroyed { actor: self.id });
        self.teardown();
        true
    }

    /// Tear down an actor that never became visible to anyone.
    pub fn discard(&self) {
        self.state.set(ActorState::Destroying);
        self.teardown();
    }

    fn teardown(&self) {
        // Siblings stay reachable while components unregister from each other.
        for slot in self.slots() {
            match slot.dynamic().try_borrow_mut() {
                Ok(mut component) => component.on_destroy(),
                Err(_) => warn!("{} busy during destroy of actor {}", slot.name(), self.id),
            }
        }
        self.components.borrow_mut().clear();
        self.state.set(ActorState::Destroyed);
    }

    /// `<Actor Type="..">` with every component's subtree, in insertion order.
    pub fn to_definition(&self) -> DefinitionNode {
        let mut node = DefinitionNode::new("Actor").with_attr("Type", &self.type_name);
        for slot in self.slots() {
            node.push_child(slot.dynamic().borrow().to_definition());
        }
        node
    }
}

fn run_deferred(deferred: Vec<Deferred>) {
    for work in deferred {
        work();
    }
}

/// Live actors of a session, updated in id order.
#[derive(Default)]
pub struct ActorTable {
    actors: FxHashMap<ActorId, Rc<Actor>>,
    order: Vec<ActorId>,
}

impl ActorTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, actor: Rc<Actor>) {
        let id = actor.id();
        if self.actors.insert(id, actor).is_none() {
            let at = self.order.partition_point(|other| *other < id);
            self.order.insert(at, id);
        }
    }

    pub fn remove(&mut self, id: ActorId) -> Option<Rc<Actor>> {
        let actor = self.actors.remove(&id)?;
        self.order.retain(|other| *other != id);
        Some(actor)
    }

    pub fn get(&self, id: ActorId) -> Option<Rc<Actor>> {
        self.actors.get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.actors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actors.is_empty()
    }

    pub fn ids(&self) -> &[ActorId] {
        &self.order
    }

    /// Actors in id order, detached from the table so it can change meanwhile.
    pub fn snapshot(&self) -> Vec<Rc<Actor>> {
        self.order
            .iter()
            .filter_map(|id| self.actors.get(id).cloned())
            .collect()
    }

    pub fn find_by_type(&self, type_name: &str) -> Vec<Rc<Actor>> {
        self.snapshot()
            .into_iter()
            .filter(|a| a.type_name() == type_name)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::InitContext;
    use crate::events::EventType;

    struct Counter {
        owner: Owner,
        ticks: Rc<Cell<u32>>,
        destroyed: Rc<Cell<bool>>,
    }

    impl Component for Counter {
        fn name(&self) -> &'static str {
            "Counter"
        }
        fn owner(&self) -> &Owner {
            &self.owner
        }
        fn init(&mut self, _: &DefinitionNode, _: &InitContext) -> EngineResult<()> {
            Ok(())
        }
        fn wants_update(&self) -> bool {
            true
        }
        fn update(&mut self, _delta_ms: u32) {
            self.ticks.set(self.ticks.get() + 1);
        }
        fn to_definition(&self) -> DefinitionNode {
            DefinitionNode::new("Counter")
        }
        fn on_destroy(&mut self) {
            self.destroyed.set(true);
        }
    }

    fn counter(actor: &Actor) -> (Rc<Cell<u32>>, Rc<Cell<bool>>) {
        let ticks = Rc::new(Cell::new(0));
        let destroyed = Rc::new(Cell::new(false));
        actor
            .add_component(ComponentSlot::new(Counter {
                owner: actor.owner(),
                ticks: Rc::clone(&ticks),
                destroyed: Rc::clone(&destroyed),
            }))
            .unwrap();
        (ticks, destroyed)
    }

    #[test]
    fn test_update_only_when_active() {
        let bus = Rc::new(EventBus::new());
        let actor = Actor::new(ActorId(1), "Test", bus);
        let (ticks, _) = counter(&actor);
        assert_eq!(actor.state(), ActorState::Initializing);
        actor.update(16);
        assert_eq!(ticks.get(), 0);
        actor.post_init().unwrap();
        actor.update(16);
        assert_eq!(ticks.get(), 1);
    }

    #[test]
    fn test_duplicate_component_rejected() {
        let bus = Rc::new(EventBus::new());
        let actor = Actor::new(ActorId(1), "Test", bus);
        counter(&actor);
        let err = actor
            .add_component(ComponentSlot::new(Counter {
                owner: actor.owner(),
                ticks: Rc::new(Cell::new(0)),
                destroyed: Rc::new(Cell::new(false)),
            }))
            .unwrap_err();
        assert_eq!(err, EngineError::DuplicateComponent("Counter".to_string()));
    }

    #[test]
    fn test_destroy_publishes_once_and_drops_components() {
        let bus = Rc::new(EventBus::new());
        let count = Rc::new(Cell::new(0));
        let c = Rc::clone(&count);
        let r = bus.new_receiver();
        bus.subscribe(r, EventType::ActorDestroyed, move |_| c.set(c.get() + 1));

        let actor = Actor::new(ActorId(7), "Test", Rc::clone(&bus));
        let (_, destroyed) = counter(&actor);
        actor.post_init().unwrap();
        let weak = Rc::downgrade(&actor.component::<Counter>().unwrap());

        assert!(actor.destroy());
        assert!(!actor.destroy());
        assert_eq!(count.get(), 1);
        assert!(destroyed.get());
        assert_eq!(actor.state(), ActorState::Destroyed);
        assert_eq!(actor.component_count(), 0);
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn test_owner_lookup_follows_actor() {
        let bus = Rc::new(EventBus::new());
        let actor = Actor::new(ActorId(3), "Test", bus);
        counter(&actor);
        let owner = actor.owner();
        assert_eq!(owner.id(), ActorId(3));
        assert!(owner.component::<Counter>().is_some());
        assert_eq!(owner.type_name(), "Test");
        drop(actor);
        assert!(owner.actor().is_none());
    }

    #[test]
    fn test_table_keeps_id_order() {
        let bus = Rc::new(EventBus::new());
        let mut table = ActorTable::new();
        for id in [5, 2, 9] {
            table.insert(Actor::new(ActorId(id), "T", Rc::clone(&bus)));
        }
        assert_eq!(table.ids(), &[ActorId(2), ActorId(5), ActorId(9)]);
        assert!(table.remove(ActorId(5)).is_some());
        assert!(table.remove(ActorId(5)).is_none());
        assert_eq!(table.snapshot().len(), 2);
    }
}

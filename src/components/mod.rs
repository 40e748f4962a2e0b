//! Components: the behavioural units actors are assembled from.
//!
//! Every component implements [`Component`] and is stored in its actor behind
//! a [`ComponentSlot`], which keeps both a dynamic handle (for lifecycle
//! dispatch) and a typed handle (for `actor.component::<T>()` lookups).
//!
//! Lifecycle, driven by the actor and the factory:
//! 1. `init` parses the component's definition subtree. No events, no sibling
//!    access.
//! 2. `post_init` runs once every component of the actor passed `init`.
//!    Siblings can be looked up and observed here.
//! 3. `update` every tick while the actor is active, if `wants_update`.
//! 4. `on_destroy` when the actor is torn down: unregister from publishers and
//!    the bus.
//!
//! Notifications to observers are never delivered while the publishing
//! component is borrowed. Publishers queue them and hand them out through
//! `take_deferred`, which the actor runs after releasing the borrow.
//!
//! Submodules overview:
//! - [`position`] – world position
//! - [`physics`] – body/fixture definitions and kinematic movement
//! - [`animation`] – frame sequencing and animation observers
//! - [`render`] – actor sprite, tile plane and HUD render variants
//! - [`tileplane`] – plane properties and tile resolution for tile planes
//! - [`health`], [`ammo`], [`powerup`] – player/enemy stats
//! - [`controllable`] – the player state machine
//! - [`trigger`] – enter/leave notifications from the physics collaborator
//! - [`pickup`], [`checkpoint`], [`projectile`], [`damageaura`], [`soundtrigger`]
//! - [`ambientsound`] – global ambient sound emitter
//! - [`glitter`] – spawns and follows a glitter effect actor
//! - [`followable`] – on-demand marker actor hovering over its owner
//! - [`destroyable`] – loot drops and explosions when health runs out
//! - [`crumblingpeg`] – platforms that give way after being stepped on
//! - [`predefinedmove`] – scripted movement sequences

pub mod ambientsound;
pub mod ammo;
pub mod animation;
pub mod checkpoint;
pub mod controllable;
pub mod crumblingpeg;
pub mod damageaura;
pub mod destroyable;
pub mod followable;
pub mod glitter;
pub mod health;
pub mod physics;
pub mod pickup;
pub mod position;
pub mod powerup;
pub mod predefinedmove;
pub mod projectile;
pub mod render;
pub mod soundtrigger;
pub mod tileplane;
pub mod trigger;

use crate::actors::actor::Owner;
use crate::error::EngineResult;
use crate::resources::definition::DefinitionNode;
use crate::resources::loader::ResourceLoader;
use crate::resources::palette::Palette;
use log::warn;
use smallvec::SmallVec;
use std::any::Any;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// Work a component hands back to its actor, run after the component's
/// borrow is released.
pub type Deferred = Box<dyn FnOnce()>;

/// What component `init` may use besides its own subtree.
pub struct InitContext<'a> {
    pub loader: &'a dyn ResourceLoader,
    pub palette: &'a Palette,
    pub image_extension: &'a str,
    pub actor_type: &'a str,
}

pub trait Component: Any {
    /// Capability name, also the element name in the definition tree.
    fn name(&self) -> &'static str;

    fn owner(&self) -> &Owner;

    fn init(&mut self, data: &DefinitionNode, ctx: &InitContext) -> EngineResult<()>;

    fn post_init(&mut self) -> EngineResult<()> {
        Ok(())
    }

    fn wants_update(&self) -> bool {
        false
    }

    fn update(&mut self, _delta_ms: u32) {}

    fn take_deferred(&mut self) -> Vec<Deferred> {
        Vec::new()
    }

    /// Emit this component's subtree; parsing it back yields the same component.
    fn to_definition(&self) -> DefinitionNode;

    fn on_destroy(&mut self) {}
}

#[derive(Clone)]
pub struct ComponentSlot {
    name: &'static str,
    dynamic: Rc<RefCell<dyn Component>>,
    typed: Rc<dyn Any>,
}

impl ComponentSlot {
    pub fn new<T: Component>(component: T) -> Self {
        let name = component.name();
        let rc = Rc::new(RefCell::new(component));
        Self {
            name,
            dynamic: rc.clone(),
            typed: rc,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn dynamic(&self) -> &Rc<RefCell<dyn Component>> {
        &self.dynamic
    }

    pub fn downcast<T: Component>(&self) -> Option<Rc<RefCell<T>>> {
        Rc::clone(&self.typed).downcast::<RefCell<T>>().ok()
    }
}

/// Subscribers of a publishing component, held weakly.
///
/// Dead entries are pruned on every snapshot.
pub struct ObserverList<O: ?Sized> {
    observers: SmallVec<[Weak<RefCell<O>>; 2]>,
}

impl<O: ?Sized> Default for ObserverList<O> {
    fn default() -> Self {
        Self::new()
    }
}

impl<O: ?Sized> ObserverList<O> {
    pub fn new() -> Self {
        Self {
            observers: SmallVec::new(),
        }
    }

    /// Returns `false` if the observer is already registered.
    pub fn add(&mut self, observer: Weak<RefCell<O>>) -> bool {
        if self.observers.iter().any(|o| Weak::ptr_eq(o, &observer)) {
            return false;
        }
        self.observers.push(observer);
        true
    }

    pub fn remove(&mut self, observer: &Weak<RefCell<O>>) {
        self.observers.retain(|o| !Weak::ptr_eq(o, observer));
    }

    pub fn len(&self) -> usize {
        self.observers.iter().filter(|o| o.strong_count() > 0).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn snapshot(&mut self) -> Vec<Rc<RefCell<O>>> {
        self.observers.retain(|o| o.strong_count() > 0);
        self.observers.iter().filter_map(Weak::upgrade).collect()
    }
}

/// Call `f` on every observer that is not currently borrowed.
pub fn notify_each<O: ?Sized>(observers: &[Rc<RefCell<O>>], mut f: impl FnMut(&mut O)) {
    for observer in observers {
        match observer.try_borrow_mut() {
            Ok(mut o) => f(&mut o),
            Err(_) => warn!("Observer busy, notification dropped"),
        }
    }
}

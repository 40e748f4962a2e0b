//! Publish/subscribe event bus.
//!
//! One [`EventBus`] is created per game session and shared as
//! `Rc<EventBus>` with the factory, every component and every collaborator.
//!
//! Delivery modes:
//! - [`EventBus::publish`] dispatches synchronously to every listener currently
//!   registered for the event's [`EventType`]. Handlers may publish again; the
//!   listener table is not borrowed while handlers run.
//! - [`EventBus::publish_queued`] appends to a FIFO queue that is only drained
//!   by [`EventBus::process_queue`]. Events queued while a drain is running
//!   wait for the next drain.
//!
//! Listeners are keyed by `(ReceiverId, EventType)`: subscribing the same pair
//! twice is refused, and removing a pair that is not registered is a no-op.
//!
//! # Related
//! - [`crate::game::Game::tick`] drains the queue once per tick, before updates.

use super::{EventType, GameEvent};
use log::{debug, warn};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Identity of a subscriber. Obtain one per listener owner with
/// [`EventBus::new_receiver`].
pub type ReceiverId = u32;

pub type Handler = Rc<dyn Fn(&GameEvent)>;

type ListenerList = SmallVec<[(ReceiverId, Handler); 4]>;

pub struct EventBus {
    listeners: RefCell<FxHashMap<EventType, ListenerList>>,
    queue: RefCell<VecDeque<GameEvent>>,
    next_receiver: Cell<ReceiverId>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            listeners: RefCell::new(FxHashMap::default()),
            queue: RefCell::new(VecDeque::new()),
            next_receiver: Cell::new(1),
        }
    }

    pub fn new_receiver(&self) -> ReceiverId {
        let id = self.next_receiver.get();
        self.next_receiver.set(id + 1);
        id
    }

    /// Register `handler` for `event_type`. Returns `false` if this receiver
    /// already listens to that type.
    pub fn subscribe(
        &self,
        receiver: ReceiverId,
        event_type: EventType,
        handler: impl Fn(&GameEvent) + 'static,
    ) -> bool {
        let mut listeners = self.listeners.borrow_mut();
        let list = listeners.entry(event_type).or_default();
        if list.iter().any(|(r, _)| *r == receiver) {
            warn!(
                "Receiver {} already subscribed to {:?}, ignoring",
                receiver, event_type
            );
            return false;
        }
        list.push((receiver, Rc::new(handler)));
        true
    }

    /// Returns `true` if a listener was removed.
    pub fn unsubscribe(&self, receiver: ReceiverId, event_type: EventType) -> bool {
        let mut listeners = self.listeners.borrow_mut();
        let Some(list) = listeners.get_mut(&event_type) else {
            return false;
        };
        let before = list.len();
        list.retain(|(r, _)| *r != receiver);
        before != list.len()
    }

    pub fn unsubscribe_all(&self, receiver: ReceiverId) {
        for list in self.listeners.borrow_mut().values_mut() {
            list.retain(|(r, _)| *r != receiver);
        }
    }

    pub fn listener_count(&self, event_type: EventType) -> usize {
        self.listeners
            .borrow()
            .get(&event_type)
            .map_or(0, |list| list.len())
    }

    /// Deliver `event` now. Returns `true` if at least one listener saw it.
    pub fn publish(&self, event: GameEvent) -> bool {
        self.dispatch(&event)
    }

    pub fn publish_queued(&self, event: GameEvent) {
        self.queue.borrow_mut().push_back(event);
    }

    pub fn queued_len(&self) -> usize {
        self.queue.borrow().len()
    }

    /// Drop every queued event of `event_type`. Returns how many were dropped.
    pub fn abort_queued(&self, event_type: EventType) -> usize {
        let mut queue = self.queue.borrow_mut();
        let before = queue.len();
        queue.retain(|e| e.event_type() != event_type);
        before - queue.len()
    }

    /// Drain queued events in FIFO order until the queue is empty or `budget`
    /// is spent.
    ///
    /// At least one event is dispatched per call so a zero budget still makes
    /// progress. The event being dispatched when the budget runs out finishes;
    /// the rest stay queued, ahead of anything queued during this drain.
    /// Returns `true` when everything that was queued at entry got dispatched.
    pub fn process_queue(&self, budget: Duration) -> bool {
        let mut pending = std::mem::take(&mut *self.queue.borrow_mut());
        if pending.is_empty() {
            return true;
        }

        let start = Instant::now();
        let mut processed = 0usize;
        while let Some(event) = pending.pop_front() {
            self.dispatch(&event);
            processed += 1;
            if start.elapsed() >= budget {
                break;
            }
        }

        if pending.is_empty() {
            return true;
        }

        debug!(
            "Event budget of {:?} spent after {} events, {} carried over",
            budget,
            processed,
            pending.len()
        );
        let mut queue = self.queue.borrow_mut();
        while let Some(event) = pending.pop_back() {
            queue.push_front(event);
        }
        false
    }

    fn dispatch(&self, event: &GameEvent) -> bool {
        let handlers: SmallVec<[Handler; 4]> = match self.listeners.borrow().get(&event.event_type())
        {
            Some(list) => list.iter().map(|(_, h)| Rc::clone(h)).collect(),
            None => SmallVec::new(),
        };
        for handler in &handlers {
            handler(event);
        }
        !handlers.is_empty()
    }
}

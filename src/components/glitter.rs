//! Sparkle effect attached to an actor.
//!
//! The glitter is a separate actor. This component requests it from the
//! session (queued `RequestNewActor` with itself as requester), learns its id
//! from the matching `NewActor` (or gives up on `NewActorFailed`), keeps it on top of its owner when
//! `FollowOwner` is set, and asks for its removal when deactivated or
//! destroyed.

use crate::actors::actor::{ActorId, Owner};
use crate::actors::templates;
use crate::components::position::PositionComponent;
use crate::components::{Component, InitContext};
use crate::error::{EngineError, EngineResult};
use crate::events::bus::ReceiverId;
use crate::events::{EventType, GameEvent};
use crate::geometry::Point;
use crate::resources::definition::{DefinitionNode, Fields};
use log::{debug, warn};
use std::rc::Rc;

pub const GLITTER_COMPONENT: &str = "GlitterComponent";

pub struct GlitterComponent {
    owner: Owner,
    glitter_type: String,
    spawn_immediate: bool,
    follow_owner: bool,
    requested: bool,
    glitter: Option<ActorId>,
    last_position: Option<Point>,
    receiver: Option<ReceiverId>,
}

impl GlitterComponent {
    pub fn new(owner: Owner) -> Self {
        Self {
            owner,
            glitter_type: String::new(),
            spawn_immediate: true,
            follow_owner: false,
            requested: false,
            glitter: None,
            last_position: None,
            receiver: None,
        }
    }

    pub fn glitter_type(&self) -> &str {
        &self.glitter_type
    }

    pub fn glitter(&self) -> Option<ActorId> {
        self.glitter
    }

    pub fn is_active(&self) -> bool {
        self.requested
    }

    fn position(&self) -> Point {
        self.owner
            .component::<PositionComponent>()
            .and_then(|p| p.try_borrow().ok().map(|p| p.position()))
            .unwrap_or_default()
    }

    /// Request the glitter actor. Does nothing while one is requested or alive.
    pub fn activate(&mut self) {
        if self.requested {
            return;
        }
        let position = self.position();
        let Some(definition) =
            templates::glitter_definition(&self.glitter_type, position, templates::GLITTER_Z)
        else {
            warn!("Unknown glitter type '{}'", self.glitter_type);
            return;
        };
        self.requested = true;
        self.last_position = Some(position);
        self.owner.bus().publish_queued(GameEvent::RequestNewActor {
            definition: Rc::new(definition),
            requester: Some(self.owner.id()),
        });
    }

    pub fn deactivate(&mut self) {
        if let Some(glitter) = self.glitter.take() {
            debug!("Removing glitter {} of actor {}", glitter, self.owner.id());
            self.owner
                .bus()
                .publish_queued(GameEvent::RequestDestroyActor { actor: glitter });
        }
        self.requested = false;
    }

    fn listen(&mut self) -> EngineResult<()> {
        let me = self
            .owner
            .component::<GlitterComponent>()
            .ok_or_else(|| EngineError::invariant("glitter is not attached to its actor"))?;
        let me = Rc::downgrade(&me);
        let owner_id = self.owner.id();
        let bus = self.owner.bus();
        let receiver = bus.new_receiver();

        let on_new = me.clone();
        bus.subscribe(receiver, EventType::NewActor, move |event| {
            let GameEvent::NewActor {
                actor,
                type_name,
                requester,
            } = event
            else {
                return;
            };
            if *requester != Some(owner_id) {
                return;
            }
            if let Some(me) = on_new.upgrade()
                && let Ok(mut me) = me.try_borrow_mut()
                && me.requested
                && me.glitter.is_none()
                && *type_name == me.glitter_type
            {
                me.glitter = Some(*actor);
            }
        });
        let on_failed = me.clone();
        bus.subscribe(receiver, EventType::NewActorFailed, move |event| {
            let GameEvent::NewActorFailed {
                requester,
                type_name,
            } = event
            else {
                return;
            };
            if *requester != owner_id {
                return;
            }
            if let Some(me) = on_failed.upgrade()
                && let Ok(mut me) = me.try_borrow_mut()
                && me.glitter.is_none()
                && *type_name == me.glitter_type
            {
                warn!("Glitter '{}' of actor {} was not created", type_name, owner_id);
                me.requested = false;
            }
        });
        bus.subscribe(receiver, EventType::ActorDestroyed, move |event| {
            let GameEvent::ActorDestroyed { actor } = event else {
                return;
            };
            if let Some(me) = me.upgrade() {
                if let Ok(mut me) = me.try_borrow_mut() {
                    if me.glitter == Some(*actor) {
                        me.glitter = None;
                        me.requested = false;
                    }
                }
            }
        });
        self.receiver = Some(receiver);
        Ok(())
    }
}

impl Component for GlitterComponent {
    fn name(&self) -> &'static str {
        GLITTER_COMPONENT
    }

    fn owner(&self) -> &Owner {
        &self.owner
    }

    fn init(&mut self, data: &DefinitionNode, _ctx: &InitContext) -> EngineResult<()> {
        let f = Fields::new(data, GLITTER_COMPONENT);
        self.glitter_type = f.req("GlitterType")?;
        f.set_bool_if(&mut self.spawn_immediate, "SpawnImmediate")?;
        f.set_bool_if(&mut self.follow_owner, "FollowOwner")?;
        Ok(())
    }

    fn post_init(&mut self) -> EngineResult<()> {
        self.listen()?;
        if self.spawn_immediate {
            self.activate();
        }
        Ok(())
    }

    fn wants_update(&self) -> bool {
        self.follow_owner && self.glitter.is_some()
    }

    fn update(&mut self, _delta_ms: u32) {
        let Some(glitter) = self.glitter else {
            return;
        };
        let position = self.position();
        if self.last_position == Some(position) {
            return;
        }
        self.last_position = Some(position);
        self.owner.bus().publish(GameEvent::MoveActor {
            actor: glitter,
            position,
        });
    }

    fn to_definition(&self) -> DefinitionNode {
        templates::glitter_component_definition(
            &self.glitter_type,
            self.spawn_immediate,
            self.follow_owner,
        )
    }

    fn on_destroy(&mut self) {
        self.deactivate();
        if let Some(receiver) = self.receiver.take() {
            self.owner.bus().unsubscribe_all(receiver);
        }
    }
}

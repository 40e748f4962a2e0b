//! Marker that hovers over an actor, like the exclamation mark above a guard
//! who spotted the player.
//!
//! [`FollowableComponent::activate`] requests a separate `Followable` actor at
//! the owner's position plus `Offset`, with `ImagePath` cycled every
//! `FrameDuration` ms. The marker follows the owner while it exists and is
//! removed on [`FollowableComponent::deactivate`], when an activation
//! duration runs out, or when the owner is destroyed.
//!
//! ```text
//! <FollowableComponent>
//!   <Offset x="0" y="-80"/>
//!   <ImagePath>/GAME/IMAGES/EXCLAMATION/*</ImagePath>
//!   <FrameDuration>100</FrameDuration>
//! </FollowableComponent>
//! ```

use crate::actors::actor::{ActorId, Owner};
use crate::actors::templates;
use crate::components::physics::read_point;
use crate::components::position::PositionComponent;
use crate::components::{Component, InitContext};
use crate::error::{EngineError, EngineResult};
use crate::events::bus::ReceiverId;
use crate::events::{EventType, GameEvent};
use crate::geometry::Point;
use crate::resources::definition::{DefinitionNode, Fields};
use log::{debug, warn};
use std::rc::Rc;

pub const FOLLOWABLE_COMPONENT: &str = "FollowableComponent";
pub const FOLLOWER_TYPE: &str = "Followable";
pub const FOLLOWER_Z: i32 = 9000;

pub struct FollowableComponent {
    owner: Owner,
    offset: Point,
    image_set: String,
    frame_ms: u32,
    requested: bool,
    follower: Option<ActorId>,
    /// `None` while active means "until deactivated".
    left_ms: Option<u32>,
    last_position: Option<Point>,
    receiver: Option<ReceiverId>,
}

impl FollowableComponent {
    pub fn new(owner: Owner) -> Self {
        Self {
            owner,
            offset: Point::default(),
            image_set: String::new(),
            frame_ms: 100,
            requested: false,
            follower: None,
            left_ms: None,
            last_position: None,
            receiver: None,
        }
    }

    pub fn offset(&self) -> Point {
        self.offset
    }

    pub fn follower(&self) -> Option<ActorId> {
        self.follower
    }

    pub fn is_active(&self) -> bool {
        self.requested
    }

    fn marker_position(&self) -> Point {
        let at = self
            .owner
            .component::<PositionComponent>()
            .and_then(|p| p.try_borrow().ok().map(|p| p.position()))
            .unwrap_or_default();
        at.offset(self.offset.x, self.offset.y)
    }

    /// Show the marker for `duration_ms`, or until deactivated when `None`.
    /// While already active only the duration is replaced.
    pub fn activate(&mut self, duration_ms: Option<u32>) {
        self.left_ms = duration_ms;
        if self.requested {
            return;
        }
        let at = self.marker_position();
        self.requested = true;
        self.last_position = Some(at);
        self.owner.bus().publish_queued(GameEvent::RequestNewActor {
            definition: Rc::new(templates::follower_definition(
                &self.image_set,
                self.frame_ms,
                at,
            )),
            requester: Some(self.owner.id()),
        });
    }

    pub fn deactivate(&mut self) {
        if let Some(follower) = self.follower.take() {
            debug!("Removing marker {} of actor {}", follower, self.owner.id());
            self.owner
                .bus()
                .publish_queued(GameEvent::RequestDestroyActor { actor: follower });
        }
        self.requested = false;
        self.left_ms = None;
    }

    fn listen(&mut self) -> EngineResult<()> {
        let me = self
            .owner
            .component::<FollowableComponent>()
            .ok_or_else(|| EngineError::invariant("followable is not attached to its actor"))?;
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
            if *requester != Some(owner_id) || type_name != FOLLOWER_TYPE {
                return;
            }
            if let Some(me) = on_new.upgrade()
                && let Ok(mut me) = me.try_borrow_mut()
            {
                if me.requested && me.follower.is_none() {
                    me.follower = Some(*actor);
                } else {
                    // Deactivated before the marker was built.
                    me.owner
                        .bus()
                        .publish_queued(GameEvent::RequestDestroyActor { actor: *actor });
                }
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
            if *requester != owner_id || type_name != FOLLOWER_TYPE {
                return;
            }
            if let Some(me) = on_failed.upgrade()
                && let Ok(mut me) = me.try_borrow_mut()
                && me.follower.is_none()
            {
                warn!("Marker of actor {} was not created", owner_id);
                me.requested = false;
            }
        });
        bus.subscribe(receiver, EventType::ActorDestroyed, move |event| {
            let GameEvent::ActorDestroyed { actor } = event else {
                return;
            };
            if let Some(me) = me.upgrade()
                && let Ok(mut me) = me.try_borrow_mut()
                && me.follower == Some(*actor)
            {
                me.follower = None;
                me.requested = false;
            }
        });
        self.receiver = Some(receiver);
        Ok(())
    }
}

impl Component for FollowableComponent {
    fn name(&self) -> &'static str {
        FOLLOWABLE_COMPONENT
    }

    fn owner(&self) -> &Owner {
        &self.owner
    }

    fn init(&mut self, data: &DefinitionNode, _ctx: &InitContext) -> EngineResult<()> {
        let f = Fields::new(data, FOLLOWABLE_COMPONENT);
        self.offset = read_point(&f, "Offset")?.unwrap_or_default();
        self.image_set = f.req("ImagePath")?;
        f.set_if(&mut self.frame_ms, "FrameDuration")?;
        if self.frame_ms == 0 {
            return Err(EngineError::malformed(FOLLOWABLE_COMPONENT, "FrameDuration", "0"));
        }
        Ok(())
    }

    fn post_init(&mut self) -> EngineResult<()> {
        self.listen()
    }

    fn wants_update(&self) -> bool {
        self.requested
    }

    fn update(&mut self, delta_ms: u32) {
        if let Some(left_ms) = self.left_ms {
            if left_ms <= delta_ms {
                self.deactivate();
                return;
            }
            self.left_ms = Some(left_ms - delta_ms);
        }
        let Some(follower) = self.follower else {
            return;
        };
        let at = self.marker_position();
        if self.last_position == Some(at) {
            return;
        }
        self.last_position = Some(at);
        self.owner.bus().publish(GameEvent::MoveActor {
            actor: follower,
            position: at,
        });
    }

    fn to_definition(&self) -> DefinitionNode {
        templates::followable_component_definition(self.offset, &self.image_set, self.frame_ms)
    }

    fn on_destroy(&mut self) {
        self.deactivate();
        if let Some(receiver) = self.receiver.take() {
            self.owner.bus().unsubscribe_all(receiver);
        }
    }
}

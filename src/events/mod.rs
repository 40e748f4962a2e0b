//! Event catalogue and the event bus.
//!
//! Components, the scene graph, the audio forwarder and the game session talk
//! to each other only through [`GameEvent`]s published on an
//! [`bus::EventBus`]. Listeners subscribe per [`EventType`], so every variant
//! maps to exactly one type tag.
//!
//! Submodules:
//! - [`bus`] – the publish/subscribe channel with immediate and queued delivery
//! - [`audio`] – commands sent over the channel to the audio thread
//!
//! Requests (`Request*`, `MoveActor`) are how components ask the session to
//! change the actor table; components never hold the table themselves.

pub mod audio;
pub mod bus;

use crate::actors::actor::ActorId;
use crate::components::ammo::AmmoType;
use crate::geometry::{Direction, Point};
use crate::resources::definition::DefinitionNode;
use crate::resources::scenegraph::NodeHandle;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventType {
    NewActor,
    NewActorFailed,
    ActorDestroyed,
    RequestNewActor,
    RequestDestroyActor,
    MoveActor,
    CheckpointReached,
    CollideableTileCreated,
    NewRenderComponent,
    NewHudElement,
    RequestPlaySound,
    ActorAttack,
    ActorFire,
    AmmoUpdated,
    ScoreGained,
    ControllableDied,
}

#[derive(Debug, Clone)]
pub enum GameEvent {
    /// An actor finished construction and joined the actor table.
    NewActor {
        actor: ActorId,
        type_name: String,
        requester: Option<ActorId>,
    },
    /// A `RequestNewActor` made on behalf of `requester` could not be built.
    NewActorFailed {
        requester: ActorId,
        type_name: String,
    },
    /// Published once, before the actor's components are torn down.
    ActorDestroyed { actor: ActorId },
    RequestNewActor {
        definition: Rc<DefinitionNode>,
        requester: Option<ActorId>,
    },
    RequestDestroyActor { actor: ActorId },
    MoveActor { actor: ActorId, position: Point },
    CheckpointReached {
        actor: ActorId,
        spawn_position: Point,
        is_save_checkpoint: bool,
        checkpoint_number: u32,
    },
    CollideableTileCreated { tile_id: i32, x: i32, y: i32 },
    NewRenderComponent { actor: ActorId, node: NodeHandle },
    NewHudElement {
        actor: ActorId,
        key: String,
        node: NodeHandle,
    },
    /// `loop_count` of -1 loops until stopped.
    RequestPlaySound {
        sound: String,
        volume: i32,
        looping: bool,
        loop_count: i32,
    },
    ActorAttack { actor: ActorId, direction: Direction },
    ActorFire {
        actor: ActorId,
        direction: Direction,
        ammo: AmmoType,
    },
    AmmoUpdated {
        actor: ActorId,
        ammo: AmmoType,
        count: i32,
    },
    ScoreGained { actor: ActorId, points: i32 },
    ControllableDied { actor: ActorId },
}

impl GameEvent {
    pub fn event_type(&self) -> EventType {
        match self {
            GameEvent::NewActor { .. } => EventType::NewActor,
            GameEvent::NewActorFailed { .. } => EventType::NewActorFailed,
            GameEvent::ActorDestroyed { .. } => EventType::ActorDestroyed,
            GameEvent::RequestNewActor { .. } => EventType::RequestNewActor,
            GameEvent::RequestDestroyActor { .. } => EventType::RequestDestroyActor,
            GameEvent::MoveActor { .. } => EventType::MoveActor,
            GameEvent::CheckpointReached { .. } => EventType::CheckpointReached,
            GameEvent::CollideableTileCreated { .. } => EventType::CollideableTileCreated,
            GameEvent::NewRenderComponent { .. } => EventType::NewRenderComponent,
            GameEvent::NewHudElement { .. } => EventType::NewHudElement,
            GameEvent::RequestPlaySound { .. } => EventType::RequestPlaySound,
            GameEvent::ActorAttack { .. } => EventType::ActorAttack,
            GameEvent::ActorFire { .. } => EventType::ActorFire,
            GameEvent::AmmoUpdated { .. } => EventType::AmmoUpdated,
            GameEvent::ScoreGained { .. } => EventType::ScoreGained,
            GameEvent::ControllableDied { .. } => EventType::ControllableDied,
        }
    }

    /// Immediate sound request, the way most components fire one-shot effects.
    pub fn play_sound(sound: impl Into<String>, volume: i32) -> Self {
        GameEvent::RequestPlaySound {
            sound: sound.into(),
            volume,
            looping: false,
            loop_count: 0,
        }
    }
}

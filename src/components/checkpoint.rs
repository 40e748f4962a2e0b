//! Checkpoint flags.
//!
//! Entering the flag's trigger raises it once: the flag animation resumes,
//! its body leaves the simulation, `CheckpointReached` is queued for the
//! session and the rise sound plays. When the rise animation reaches its last
//! frame the flag switches to its `wave` animation.

use crate::actors::actor::{Actor, Owner};
use crate::components::animation::{
    AnimationComponent, AnimationObserver, observe_animation, unobserve_animation,
};
use crate::components::physics::{PhysicsComponent, point_node, read_point};
use crate::components::trigger::{TriggerObserver, observe_trigger, unobserve_trigger};
use crate::components::{Component, InitContext};
use crate::error::{EngineError, EngineResult};
use crate::events::GameEvent;
use crate::geometry::Point;
use crate::resources::definition::{DefinitionNode, Fields};
use log::{info, warn};
use std::rc::Rc;

pub const CHECKPOINT_COMPONENT: &str = "CheckpointComponent";
pub const SOUND_FLAG_RISE: &str = "/GAME/SOUNDS/FLAGRISE.WAV";
pub const SOUND_FLAG_WAVE: &str = "/GAME/SOUNDS/FLAGWAVE.WAV";
const WAVE_ANIMATION: &str = "wave";

pub struct CheckpointComponent {
    owner: Owner,
    spawn_position: Point,
    is_save_checkpoint: bool,
    checkpoint_number: u32,
    reached: bool,
}

impl CheckpointComponent {
    pub fn new(owner: Owner) -> Self {
        Self {
            owner,
            spawn_position: Point::default(),
            is_save_checkpoint: false,
            checkpoint_number: 0,
            reached: false,
        }
    }

    pub fn spawn_position(&self) -> Point {
        self.spawn_position
    }

    pub fn is_save_checkpoint(&self) -> bool {
        self.is_save_checkpoint
    }

    pub fn checkpoint_number(&self) -> u32 {
        self.checkpoint_number
    }

    pub fn is_reached(&self) -> bool {
        self.reached
    }

    fn apply(&mut self, other: &Rc<Actor>) {
        self.reached = true;
        if let Some(animation) = self.owner.component::<AnimationComponent>() {
            animation.borrow_mut().resume();
        }
        if let Err(e) = observe_animation::<CheckpointComponent>(&self.owner) {
            warn!("Checkpoint {} cannot follow its animation: {}", self.owner.id(), e);
        }
        if let Some(physics) = self.owner.component::<PhysicsComponent>() {
            physics.borrow_mut().destroy();
        }

        info!(
            "Actor {} reached checkpoint {} (save: {})",
            other.id(),
            self.checkpoint_number,
            self.is_save_checkpoint
        );
        let bus = self.owner.bus();
        bus.publish_queued(GameEvent::CheckpointReached {
            actor: other.id(),
            spawn_position: self.spawn_position,
            is_save_checkpoint: self.is_save_checkpoint,
            checkpoint_number: self.checkpoint_number,
        });
        bus.publish(GameEvent::play_sound(SOUND_FLAG_RISE, 100));
    }
}

impl TriggerObserver for CheckpointComponent {
    fn on_actor_entered(&mut self, other: &Rc<Actor>) {
        if !self.reached {
            self.apply(other);
        }
    }
}

impl AnimationObserver for CheckpointComponent {
    fn on_animation_at_last_frame(&mut self, animation: &str) {
        if animation == WAVE_ANIMATION {
            return;
        }
        let Some(component) = self.owner.component::<AnimationComponent>() else {
            return;
        };
        if !component.borrow_mut().set_animation(WAVE_ANIMATION) {
            warn!("Checkpoint {} has no '{}' animation", self.owner.id(), WAVE_ANIMATION);
            return;
        }
        self.owner
            .bus()
            .publish(GameEvent::play_sound(SOUND_FLAG_WAVE, 100));
    }
}

impl Component for CheckpointComponent {
    fn name(&self) -> &'static str {
        CHECKPOINT_COMPONENT
    }

    fn owner(&self) -> &Owner {
        &self.owner
    }

    fn init(&mut self, data: &DefinitionNode, _ctx: &InitContext) -> EngineResult<()> {
        let f = Fields::new(data, CHECKPOINT_COMPONENT);
        self.spawn_position = read_point(&f, "SpawnPosition")?
            .ok_or_else(|| EngineError::missing(CHECKPOINT_COMPONENT, "SpawnPosition"))?;
        f.set_bool_if(&mut self.is_save_checkpoint, "IsSaveCheckpoint")?;
        f.set_if(&mut self.checkpoint_number, "SaveCheckpointNumber")?;
        if self.spawn_position.is_zero() {
            return Err(EngineError::invariant(format!(
                "checkpoint of {} has a zero spawn position",
                self.owner.type_name()
            )));
        }
        Ok(())
    }

    fn post_init(&mut self) -> EngineResult<()> {
        observe_trigger::<CheckpointComponent>(&self.owner)
    }

    fn to_definition(&self) -> DefinitionNode {
        DefinitionNode::new(CHECKPOINT_COMPONENT)
            .with_child(point_node("SpawnPosition", self.spawn_position))
            .with_text_child("IsSaveCheckpoint", self.is_save_checkpoint)
            .with_text_child("SaveCheckpointNumber", self.checkpoint_number)
    }

    fn on_destroy(&mut self) {
        unobserve_trigger::<CheckpointComponent>(&self.owner);
        unobserve_animation::<CheckpointComponent>(&self.owner);
    }
}

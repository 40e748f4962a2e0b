//! Plays a sound when an actor walks into the trigger volume.

use crate::actors::actor::{Actor, Owner};
use crate::components::trigger::{TriggerObserver, observe_trigger, unobserve_trigger};
use crate::components::{Component, InitContext};
use crate::error::EngineResult;
use crate::events::GameEvent;
use crate::resources::definition::{DefinitionNode, Fields};
use std::rc::Rc;

pub const SOUND_TRIGGER_COMPONENT: &str = "SoundTriggerComponent";

pub struct SoundTriggerComponent {
    owner: Owner,
    sound: String,
    volume: i32,
}

impl SoundTriggerComponent {
    pub fn new(owner: Owner) -> Self {
        Self {
            owner,
            sound: String::new(),
            volume: 100,
        }
    }

    pub fn sound(&self) -> &str {
        &self.sound
    }
}

impl TriggerObserver for SoundTriggerComponent {
    fn on_actor_entered(&mut self, _other: &Rc<Actor>) {
        self.owner
            .bus()
            .publish(GameEvent::play_sound(self.sound.as_str(), self.volume));
    }
}

impl Component for SoundTriggerComponent {
    fn name(&self) -> &'static str {
        SOUND_TRIGGER_COMPONENT
    }

    fn owner(&self) -> &Owner {
        &self.owner
    }

    fn init(&mut self, data: &DefinitionNode, _ctx: &InitContext) -> EngineResult<()> {
        let f = Fields::new(data, SOUND_TRIGGER_COMPONENT);
        self.sound = f.req("Sound")?;
        f.set_if(&mut self.volume, "Volume")?;
        Ok(())
    }

    fn post_init(&mut self) -> EngineResult<()> {
        observe_trigger::<SoundTriggerComponent>(&self.owner)
    }

    fn to_definition(&self) -> DefinitionNode {
        DefinitionNode::new(SOUND_TRIGGER_COMPONENT)
            .with_text_child("Sound", &self.sound)
            .with_text_child("Volume", self.volume)
    }

    fn on_destroy(&mut self) {
        unobserve_trigger::<SoundTriggerComponent>(&self.owner);
    }
}

//! Level-wide ambient sound emitter.
//!
//! A looping emitter starts its sound once, looping forever. Otherwise the
//! emitter stays silent for a random `MinTimeOff..=MaxTimeOff`, then plays the
//! sound for about `MinTimeOn..=MaxTimeOn` (whole loops of the sound) and
//! starts the next silent period after the sound has finished.

use crate::actors::actor::Owner;
use crate::components::{Component, InitContext};
use crate::error::{EngineError, EngineResult};
use crate::events::GameEvent;
use crate::resources::definition::{DefinitionNode, Fields};
use log::debug;

pub const GLOBAL_AMBIENT_SOUND_COMPONENT: &str = "GlobalAmbientSoundComponent";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AmbientSoundDef {
    pub sound: String,
    pub volume: i32,
    pub min_time_off: i32,
    pub max_time_off: i32,
    pub min_time_on: i32,
    pub max_time_on: i32,
    pub is_looping: bool,
}

impl AmbientSoundDef {
    pub fn to_definition(&self) -> DefinitionNode {
        DefinitionNode::new(GLOBAL_AMBIENT_SOUND_COMPONENT)
            .with_text_child("Sound", &self.sound)
            .with_text_child("SoundVolume", self.volume)
            .with_text_child("MinTimeOff", self.min_time_off)
            .with_text_child("MaxTimeOff", self.max_time_off)
            .with_text_child("MinTimeOn", self.min_time_on)
            .with_text_child("MaxTimeOn", self.max_time_on)
            .with_text_child("IsLooping", self.is_looping)
    }

    pub fn from_definition(node: &DefinitionNode) -> EngineResult<Self> {
        let f = Fields::new(node, GLOBAL_AMBIENT_SOUND_COMPONENT);
        let mut def = AmbientSoundDef {
            sound: f.req("Sound")?,
            ..AmbientSoundDef::default()
        };
        f.set_if(&mut def.volume, "SoundVolume")?;
        f.set_if(&mut def.min_time_off, "MinTimeOff")?;
        f.set_if(&mut def.max_time_off, "MaxTimeOff")?;
        f.set_if(&mut def.min_time_on, "MinTimeOn")?;
        f.set_if(&mut def.max_time_on, "MaxTimeOn")?;
        f.set_bool_if(&mut def.is_looping, "IsLooping")?;
        Ok(def)
    }

    fn validate(&self) -> EngineResult<()> {
        if self.is_looping {
            return Ok(());
        }
        if [
            self.min_time_off,
            self.max_time_off,
            self.min_time_on,
            self.max_time_on,
        ]
        .contains(&0)
        {
            return Err(EngineError::invariant(format!(
                "non-looping ambient sound '{}' needs non-zero on/off times",
                self.sound
            )));
        }
        if self.min_time_off > self.max_time_off || self.min_time_on > self.max_time_on {
            return Err(EngineError::malformed(
                GLOBAL_AMBIENT_SOUND_COMPONENT,
                "MinTime*",
                &self.sound,
            ));
        }
        Ok(())
    }
}

pub struct GlobalAmbientSoundComponent {
    owner: Owner,
    def: AmbientSoundDef,
    sound_duration_ms: i32,
    time_off: i32,
    current_time_off: i32,
    rng: fastrand::Rng,
}

impl GlobalAmbientSoundComponent {
    pub fn new(owner: Owner) -> Self {
        Self::with_rng(owner, fastrand::Rng::new())
    }

    pub fn with_rng(owner: Owner, rng: fastrand::Rng) -> Self {
        Self {
            owner,
            def: AmbientSoundDef::default(),
            sound_duration_ms: 0,
            time_off: 0,
            current_time_off: 0,
            rng,
        }
    }

    pub fn def(&self) -> &AmbientSoundDef {
        &self.def
    }

    /// Silence left before the next play.
    pub fn time_until_play(&self) -> i32 {
        (self.time_off - self.current_time_off).max(0)
    }

    fn random_time_off(&mut self) -> i32 {
        self.rng.i32(self.def.min_time_off..=self.def.max_time_off)
    }
}

impl Component for GlobalAmbientSoundComponent {
    fn name(&self) -> &'static str {
        GLOBAL_AMBIENT_SOUND_COMPONENT
    }

    fn owner(&self) -> &Owner {
        &self.owner
    }

    fn init(&mut self, data: &DefinitionNode, ctx: &InitContext) -> EngineResult<()> {
        self.def = AmbientSoundDef::from_definition(data)?;
        self.def.validate()?;

        let sound = ctx.loader.load_sound(&self.def.sound)?;
        self.sound_duration_ms = i32::try_from(sound.duration_ms).unwrap_or(i32::MAX);
        if self.sound_duration_ms <= 0 {
            return Err(EngineError::invariant(format!(
                "ambient sound '{}' has no duration",
                self.def.sound
            )));
        }
        if !self.def.is_looping {
            self.time_off = self.random_time_off();
        }
        Ok(())
    }

    fn post_init(&mut self) -> EngineResult<()> {
        if self.def.is_looping {
            self.owner.bus().publish(GameEvent::RequestPlaySound {
                sound: self.def.sound.clone(),
                volume: self.def.volume,
                looping: false,
                loop_count: -1,
            });
        }
        Ok(())
    }

    fn wants_update(&self) -> bool {
        !self.def.is_looping
    }

    fn update(&mut self, delta_ms: u32) {
        self.current_time_off += delta_ms as i32;
        if self.current_time_off < self.time_off {
            return;
        }
        let time_on = self.rng.i32(self.def.min_time_on..=self.def.max_time_on);
        let loops = time_on / self.sound_duration_ms;
        debug!(
            "Ambient '{}' plays with {} loops ({} ms on)",
            self.def.sound, loops, time_on
        );
        self.owner.bus().publish(GameEvent::RequestPlaySound {
            sound: self.def.sound.clone(),
            volume: self.def.volume,
            looping: false,
            loop_count: loops,
        });
        self.time_off = self.random_time_off() + loops * self.sound_duration_ms;
        self.current_time_off = 0;
    }

    fn to_definition(&self) -> DefinitionNode {
        self.def.to_definition()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actors::actor::ActorId;
    use crate::events::EventType;
    use crate::events::bus::EventBus;
    use crate::resources::loader::{MemoryLoader, SoundAsset};
    use crate::resources::palette::Palette;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn def(looping: bool) -> AmbientSoundDef {
        AmbientSoundDef {
            sound: "/LEVEL1/SOUNDS/BIRDS.WAV".to_string(),
            volume: 40,
            min_time_off: 1000,
            max_time_off: 1000,
            min_time_on: 2500,
            max_time_on: 2500,
            is_looping: looping,
        }
    }

    fn run(def: &AmbientSoundDef) -> (GlobalAmbientSoundComponent, Rc<RefCell<Vec<i32>>>) {
        let bus = Rc::new(EventBus::new());
        let loops = Rc::new(RefCell::new(Vec::new()));
        let sink = loops.clone();
        let receiver = bus.new_receiver();
        bus.subscribe(receiver, EventType::RequestPlaySound, move |e| {
            if let GameEvent::RequestPlaySound { loop_count, .. } = e {
                sink.borrow_mut().push(*loop_count);
            }
        });
        let mut loader = MemoryLoader::new();
        loader.insert_sound(
            "/LEVEL1/SOUNDS/BIRDS.WAV",
            SoundAsset { duration_ms: 1000 },
        );
        let palette = Palette::default();
        let ctx = InitContext {
            loader: &loader,
            palette: &palette,
            image_extension: "pid",
            actor_type: "Ambient",
        };
        let mut component = GlobalAmbientSoundComponent::with_rng(
            Owner::detached(ActorId(1), bus),
            fastrand::Rng::with_seed(7),
        );
        component.init(&def.to_definition(), &ctx).expect("init");
        component.post_init().expect("post_init");
        (component, loops)
    }

    #[test]
    fn test_looping_plays_forever_once() {
        let (component, loops) = run(&def(true));
        assert_eq!(*loops.borrow(), vec![-1]);
        assert!(!component.wants_update());
    }

    #[test]
    fn test_timed_plays_after_time_off() {
        let (mut component, loops) = run(&def(false));
        component.update(999);
        assert!(loops.borrow().is_empty());
        component.update(1);
        assert_eq!(*loops.borrow(), vec![2]);
        // next silence also covers the time the sound plays
        assert_eq!(component.time_until_play(), 3000);
    }

    #[test]
    fn test_non_looping_requires_times() {
        let mut d = def(false);
        d.min_time_on = 0;
        assert!(matches!(
            d.validate(),
            Err(EngineError::InvariantViolation(_))
        ));
    }
}

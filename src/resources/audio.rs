//! Bridge between the game thread and the background audio thread.
//!
//! The mixer itself is an external collaborator. The engine only sends
//! [`AudioCmd`]s over a crossbeam channel; whoever owns the receiving end
//! plays them. Volumes are scaled by the configured master volume before they
//! leave the game thread.
//!
//! See also: [`crate::systems::audio`] for the bus forwarder and the headless
//! audio thread.

use crate::events::audio::AudioCmd;
use crate::resources::gameconfig::GameConfig;
use crossbeam_channel::{Receiver, Sender, unbounded};
use log::debug;
use std::cell::Cell;

pub struct AudioBridge {
    /// Sender for [`AudioCmd`] messages (game -> audio thread).
    pub tx_cmd: Sender<AudioCmd>,
    sound_volume: Cell<u32>,
    music_volume: Cell<u32>,
    sound_on: Cell<bool>,
    music_on: Cell<bool>,
}

impl AudioBridge {
    /// Create the bridge and the receiving end for the audio thread.
    pub fn new(config: &GameConfig) -> (Self, Receiver<AudioCmd>) {
        let (tx_cmd, rx_cmd) = unbounded::<AudioCmd>();
        let bridge = Self {
            tx_cmd,
            sound_volume: Cell::new(config.sound_volume.min(100)),
            music_volume: Cell::new(config.music_volume.min(100)),
            sound_on: Cell::new(config.sound_on),
            music_on: Cell::new(config.music_on),
        };
        (bridge, rx_cmd)
    }

    /// Effective volume of a sound requested at `volume` percent.
    pub fn scaled_sound_volume(&self, volume: i32) -> f32 {
        let requested = volume.clamp(0, 100) as f32 / 100.0;
        requested * (self.sound_volume.get() as f32 / 100.0)
    }

    /// Returns `false` when sound is off or the audio thread is gone.
    pub fn play_sound(&self, id: &str, volume: i32, loops: i32) -> bool {
        if !self.sound_on.get() {
            debug!("Sound off, dropping '{}'", id);
            return false;
        }
        self.send(AudioCmd::PlaySound {
            id: id.to_string(),
            volume: self.scaled_sound_volume(volume),
            loops,
        })
    }

    pub fn play_music(&self, id: &str, looped: bool) -> bool {
        if !self.music_on.get() {
            return false;
        }
        self.send(AudioCmd::PlayMusic {
            id: id.to_string(),
            looped,
        })
    }

    pub fn set_sound_volume(&self, percent: u32) {
        let percent = percent.min(100);
        self.sound_volume.set(percent);
        self.send(AudioCmd::SetSoundVolume {
            vol: percent as f32 / 100.0,
        });
    }

    pub fn set_music_volume(&self, percent: u32) {
        let percent = percent.min(100);
        self.music_volume.set(percent);
        self.send(AudioCmd::SetMusicVolume {
            vol: percent as f32 / 100.0,
        });
    }

    pub fn set_sound_on(&self, on: bool) {
        self.sound_on.set(on);
        if !on {
            self.send(AudioCmd::StopAll);
        }
    }

    pub fn set_music_on(&self, on: bool) {
        self.music_on.set(on);
        if !on {
            self.send(AudioCmd::StopMusic);
        }
    }

    /// Ask the audio thread to stop. Join its handle afterwards.
    pub fn shutdown(&self) {
        let _ = self.tx_cmd.send(AudioCmd::Shutdown);
    }

    fn send(&self, cmd: AudioCmd) -> bool {
        self.tx_cmd.send(cmd).is_ok()
    }
}

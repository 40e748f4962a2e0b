//! Audio forwarding and the headless audio thread.
//!
//! - [`attach_audio`] subscribes to `RequestPlaySound` and forwards each
//!   request through the [`AudioBridge`].
//! - [`audio_thread`] is the receiving end used when no mixer is attached: it
//!   logs every command until [`AudioCmd::Shutdown`].
//!
//! The game thread never blocks on audio; commands travel over an unbounded
//! crossbeam channel.

use crate::events::audio::AudioCmd;
use crate::events::bus::{EventBus, ReceiverId};
use crate::events::{EventType, GameEvent};
use crate::resources::audio::AudioBridge;
use crossbeam_channel::Receiver;
use log::{debug, info, warn};
use std::rc::Rc;
use std::thread::JoinHandle;

/// Forward sound requests from `bus` to `bridge`. Returns the receiver id so
/// the caller can detach later.
pub fn attach_audio(bus: &Rc<EventBus>, bridge: Rc<AudioBridge>) -> ReceiverId {
    let receiver = bus.new_receiver();
    bus.subscribe(receiver, EventType::RequestPlaySound, move |event| {
        if let GameEvent::RequestPlaySound {
            sound,
            volume,
            looping,
            loop_count,
        } = event
        {
            let loops = if *looping { -1 } else { *loop_count };
            if !bridge.play_sound(sound, *volume, loops) {
                debug!("Sound '{}' not forwarded", sound);
            }
        }
    });
    receiver
}

/// Drain commands until shutdown or until every sender is gone.
pub fn audio_thread(rx_cmd: Receiver<AudioCmd>) {
    info!("audio thread starting (id={:?})", std::thread::current().id());
    let mut played = 0u64;
    for cmd in rx_cmd.iter() {
        match cmd {
            AudioCmd::Shutdown => break,
            AudioCmd::PlaySound { id, volume, loops } => {
                played += 1;
                debug!("play '{}' vol={:.2} loops={}", id, volume, loops);
            }
            AudioCmd::PlayMusic { id, looped } => debug!("music '{}' looped={}", id, looped),
            other => debug!("{:?}", other),
        }
    }
    info!("audio thread exiting after {} sounds", played);
}

pub fn spawn_audio_thread(rx_cmd: Receiver<AudioCmd>) -> Option<JoinHandle<()>> {
    match std::thread::Builder::new()
        .name("audio".to_string())
        .spawn(move || audio_thread(rx_cmd))
    {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!("Could not start audio thread: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::gameconfig::GameConfig;

    #[test]
    fn test_play_requests_reach_the_channel() {
        let bus = Rc::new(EventBus::new());
        let (bridge, rx) = AudioBridge::new(&GameConfig::new());
        attach_audio(&bus, Rc::new(bridge));
        bus.publish(GameEvent::RequestPlaySound {
            sound: "/GAME/SOUNDS/RAIN.WAV".to_string(),
            volume: 100,
            looping: true,
            loop_count: 0,
        });
        match rx.try_recv() {
            Ok(AudioCmd::PlaySound { id, loops, .. }) => {
                assert_eq!(id, "/GAME/SOUNDS/RAIN.WAV");
                assert_eq!(loops, -1);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_thread_stops_on_shutdown() {
        let (bridge, rx) = AudioBridge::new(&GameConfig::new());
        let handle = spawn_audio_thread(rx).expect("thread");
        bridge.play_sound("x", 50, 0);
        bridge.shutdown();
        handle.join().expect("join");
    }
}

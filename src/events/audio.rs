/// Commands sent *to* the audio thread.
///
/// Volumes are already scaled by the master volume, in `0.0..=1.0`.
#[derive(Debug, Clone, PartialEq)]
pub enum AudioCmd {
    PlaySound { id: String, volume: f32, loops: i32 },
    PlayMusic { id: String, looped: bool },
    StopMusic,
    SetSoundVolume { vol: f32 },
    SetMusicVolume { vol: f32 },
    StopAll,
    Shutdown,
}

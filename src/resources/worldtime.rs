use log::{error, warn};

/// Frame clock with the lag-spike guard.
///
/// A frame whose elapsed time exceeds `max_frame_ms` is treated as a
/// pause/resume glitch: [`WorldTime::advance`] refuses it and the caller skips
/// that frame's update instead of applying a huge delta.
#[derive(Debug, Clone, Copy)]
pub struct WorldTime {
    pub elapsed_ms: u64,
    pub delta_ms: u32,
    pub frame_count: u64,
    pub max_frame_ms: u32,
    pub lag_spike_warning: u32,
    consecutive_spikes: u32,
}

impl Default for WorldTime {
    fn default() -> Self {
        WorldTime::new(1000, 10)
    }
}

impl WorldTime {
    pub fn new(max_frame_ms: u32, lag_spike_warning: u32) -> Self {
        WorldTime {
            elapsed_ms: 0,
            delta_ms: 0,
            frame_count: 0,
            max_frame_ms,
            lag_spike_warning,
            consecutive_spikes: 0,
        }
    }

    /// Returns `true` if the frame should be updated.
    pub fn advance(&mut self, frame_ms: u32) -> bool {
        if frame_ms > self.max_frame_ms {
            self.consecutive_spikes += 1;
            warn!("Lag spike of {}ms, skipping frame", frame_ms);
            if self.consecutive_spikes > self.lag_spike_warning {
                error!(
                    "{} consecutive lag spikes, the game loop cannot keep up",
                    self.consecutive_spikes
                );
            }
            return false;
        }
        self.consecutive_spikes = 0;
        self.delta_ms = frame_ms;
        self.elapsed_ms += frame_ms as u64;
        self.frame_count += 1;
        true
    }

    pub fn consecutive_spikes(&self) -> u32 {
        self.consecutive_spikes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spike_is_skipped_and_counted() {
        let mut t = WorldTime::new(1000, 2);
        assert!(t.advance(16));
        assert!(!t.advance(1001));
        assert!(!t.advance(5000));
        assert_eq!(t.consecutive_spikes(), 2);
        assert_eq!(t.elapsed_ms, 16);
        assert!(t.advance(1000));
        assert_eq!(t.consecutive_spikes(), 0);
        assert_eq!((t.frame_count, t.delta_ms), (2, 1000));
    }
}

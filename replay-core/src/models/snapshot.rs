use std::time::Duration;

use chrono::{DateTime, Utc};

use super::config::AudioConfig;

/// An owned point-in-time copy of the replay buffer.
///
/// `data` is raw mono PCM in the layout `config.bit_depth` describes,
/// oldest audio first. A snapshot never aliases the live ring; the
/// capture loop keeps writing after the copy is taken.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub data: Vec<u8>,
    pub config: AudioConfig,
    pub taken_at: DateTime<Utc>,
}

impl Snapshot {
    pub fn new(data: Vec<u8>, config: AudioConfig) -> Self {
        Self {
            data,
            config,
            taken_at: Utc::now(),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Playback duration of the captured audio.
    pub fn duration(&self) -> Duration {
        self.config.duration_for(self.data.len())
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::config::BitDepth;

    #[test]
    fn duration_tracks_byte_length() {
        let config = AudioConfig {
            sample_rate_hz: 1000,
            bit_depth: BitDepth::pcm_int(8),
            buffer_duration_s: 10,
        };
        let snapshot = Snapshot::new(vec![0u8; 2500], config);
        assert_eq!(snapshot.len(), 2500);
        assert!((snapshot.duration().as_secs_f64() - 2.5).abs() < 1e-9);
    }

    #[test]
    fn empty_snapshot() {
        let snapshot = Snapshot::new(Vec::new(), AudioConfig::default());
        assert!(snapshot.is_empty());
        assert_eq!(snapshot.duration(), Duration::ZERO);
    }
}

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::config::{AudioConfig, SampleEncoding};

/// Result returned when a snapshot has been persisted as a WAV clip.
#[derive(Debug, Clone, PartialEq)]
pub struct SavedClip {
    pub file_path: PathBuf,
    pub duration_secs: f64,
    pub checksum: String,
    pub metadata: ClipMetadata,
}

/// Metadata stored alongside a saved clip as a JSON sidecar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipMetadata {
    pub id: String,
    pub created_at: String,
    pub duration_secs: f64,
    pub sample_rate_hz: u32,
    pub bits_per_sample: u8,
    pub encoding: SampleEncoding,
    /// SHA-256 hex digest of the encoded WAV bytes.
    pub checksum: String,
    /// Whether voice-activity trimming removed anything before save.
    pub trimmed: bool,
}

impl ClipMetadata {
    pub fn new(config: &AudioConfig, duration_secs: f64, checksum: &str, trimmed: bool) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
            duration_secs,
            sample_rate_hz: config.sample_rate_hz,
            bits_per_sample: config.bit_depth.bits,
            encoding: config.bit_depth.encoding,
            checksum: checksum.to_string(),
            trimmed,
        }
    }
}

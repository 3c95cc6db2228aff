use std::sync::Arc;

use log::info;
use sha2::{Digest, Sha256};

use crate::models::clip::{ClipMetadata, SavedClip};
use crate::models::error::CaptureError;
use crate::models::snapshot::Snapshot;
use crate::processing::trimmer::VoiceActivityTrimmer;
use crate::processing::wav;
use crate::storage::metadata;
use crate::traits::persist_target::PersistTarget;

/// Turns a snapshot into a saved WAV clip.
///
/// Pipeline: optional voice-activity trim → WAV encode → hand the bytes
/// and a timestamped file name to the persist target → SHA-256 checksum
/// and JSON metadata sidecar. The saver never touches directory policy;
/// that belongs to the target.
pub struct ClipSaver {
    target: Arc<dyn PersistTarget>,
    trimmer: Option<VoiceActivityTrimmer>,
    write_sidecar: bool,
}

impl ClipSaver {
    pub fn new(target: Arc<dyn PersistTarget>) -> Self {
        Self {
            target,
            trimmer: None,
            write_sidecar: true,
        }
    }

    /// Trim silence out of snapshots before encoding.
    pub fn with_trimmer(mut self, trimmer: VoiceActivityTrimmer) -> Self {
        self.trimmer = Some(trimmer);
        self
    }

    /// Toggle the `<clip>.metadata.json` sidecar (on by default).
    pub fn with_metadata_sidecar(mut self, enabled: bool) -> Self {
        self.write_sidecar = enabled;
        self
    }

    /// Persist `snapshot` and return where it landed.
    pub fn save(&self, snapshot: &Snapshot) -> Result<SavedClip, CaptureError> {
        if snapshot.is_empty() {
            return Err(CaptureError::Storage("nothing buffered yet".into()));
        }

        let clip = match &self.trimmer {
            Some(trimmer) => trimmer.trim(snapshot),
            None => snapshot.clone(),
        };
        let was_trimmed = clip.len() != snapshot.len();

        let bytes = wav::encode(&clip.data, &clip.config)
            .map_err(|e| CaptureError::Storage(format!("failed to encode WAV: {e}")))?;

        let file_name = suggested_file_name(&clip);
        let file_path = self.target.persist(&file_name, &bytes)?;

        let checksum = sha256_hex(&bytes);
        let duration_secs = clip.duration().as_secs_f64();
        let clip_metadata = ClipMetadata::new(&clip.config, duration_secs, &checksum, was_trimmed);

        if self.write_sidecar {
            metadata::write_sidecar(self.target.as_ref(), &file_name, &clip_metadata)?;
        }

        info!(
            "saved clip {} ({:.1} s, {} bytes{})",
            file_path.display(),
            duration_secs,
            bytes.len(),
            if was_trimmed { ", trimmed" } else { "" }
        );
        Ok(SavedClip {
            file_path,
            duration_secs,
            checksum,
            metadata: clip_metadata,
        })
    }
}

/// Timestamped file name for a snapshot, derived from its capture
/// instant: `replay_YYYYMMDD_HHMMSS_mmm.wav`.
pub fn suggested_file_name(snapshot: &Snapshot) -> String {
    format!("replay_{}.wav", snapshot.taken_at.format("%Y%m%d_%H%M%S_%3f"))
}

/// SHA-256 hex digest of a byte slice.
fn sha256_hex(bytes: &[u8]) -> String {
    hex_encode(&Sha256::digest(bytes))
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

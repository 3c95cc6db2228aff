use std::fs;
use std::path::{Path, PathBuf};

use crate::models::clip::ClipMetadata;
use crate::models::error::CaptureError;
use crate::traits::persist_target::PersistTarget;

/// Sidecar file name for a clip: `replay_x.wav` → `replay_x.metadata.json`.
pub fn sidecar_name(clip_name: &str) -> String {
    Path::new(clip_name)
        .with_extension("metadata.json")
        .to_string_lossy()
        .into_owned()
}

/// Write clip metadata as a JSON sidecar through the same persist
/// target as the clip itself, so directory policy stays in one place.
pub fn write_sidecar(
    target: &dyn PersistTarget,
    clip_name: &str,
    metadata: &ClipMetadata,
) -> Result<PathBuf, CaptureError> {
    let json = serde_json::to_string_pretty(metadata)
        .map_err(|e| CaptureError::Storage(format!("failed to serialize metadata: {e}")))?;
    target.persist(&sidecar_name(clip_name), json.as_bytes())
}

/// Read the metadata sidecar belonging to a saved clip.
pub fn read_metadata(clip_path: &Path) -> Result<ClipMetadata, CaptureError> {
    let metadata_path = clip_path.with_extension("metadata.json");
    let json = fs::read_to_string(&metadata_path)
        .map_err(|e| CaptureError::Storage(format!("failed to read metadata: {e}")))?;
    let metadata: ClipMetadata = serde_json::from_str(&json)
        .map_err(|e| CaptureError::Storage(format!("failed to parse metadata: {e}")))?;
    Ok(metadata)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::config::AudioConfig;
    use crate::storage::dir_target::DirectoryTarget;

    #[test]
    fn sidecar_name_swaps_the_extension() {
        assert_eq!(
            sidecar_name("replay_20240101_120000_000.wav"),
            "replay_20240101_120000_000.metadata.json"
        );
    }

    #[test]
    fn sidecar_round_trips_through_a_directory_target() {
        let dir = tempfile::tempdir().unwrap();
        let target = DirectoryTarget::new(dir.path());
        let metadata = ClipMetadata::new(&AudioConfig::default(), 1.5, "abc123", false);

        let path = write_sidecar(&target, "clip.wav", &metadata).unwrap();
        assert_eq!(path, dir.path().join("clip.metadata.json"));

        let back = read_metadata(&dir.path().join("clip.wav")).unwrap();
        assert_eq!(back, metadata);
    }
}

use std::path::PathBuf;

use crate::models::error::CaptureError;

/// The external file-writing collaborator.
///
/// The core hands over a suggested file name and the finished bytes;
/// directory resolution, permissions and collision policy belong to the
/// implementation. `DirectoryTarget` is the bundled reference
/// implementation.
pub trait PersistTarget: Send + Sync {
    /// Write `bytes` under `file_name` and return the final path.
    fn persist(&self, file_name: &str, bytes: &[u8]) -> Result<PathBuf, CaptureError>;
}

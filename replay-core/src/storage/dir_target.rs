use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::debug;

use crate::models::error::CaptureError;
use crate::traits::persist_target::PersistTarget;

/// Persist target writing clips into one already-resolved directory.
///
/// Bytes land in `<file_name>.part` first and are renamed into place,
/// so readers never observe a half-written clip. The directory is
/// created on first use.
pub struct DirectoryTarget {
    directory: PathBuf,
}

impl DirectoryTarget {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }
}

impl PersistTarget for DirectoryTarget {
    fn persist(&self, file_name: &str, bytes: &[u8]) -> Result<PathBuf, CaptureError> {
        if file_name.is_empty() {
            return Err(CaptureError::Storage("empty file name".into()));
        }
        if file_name.contains('/') || file_name.contains('\\') {
            return Err(CaptureError::Storage(format!(
                "file name must not contain path separators: {file_name}"
            )));
        }

        fs::create_dir_all(&self.directory).map_err(|error| {
            CaptureError::Storage(format!(
                "failed to create {}: {error}",
                self.directory.display()
            ))
        })?;

        let final_path = self.directory.join(file_name);
        let part_path = self.directory.join(format!("{file_name}.part"));

        fs::write(&part_path, bytes).map_err(|error| {
            CaptureError::Storage(format!("failed to write {}: {error}", part_path.display()))
        })?;

        // Windows cannot rename over an existing file.
        if cfg!(windows) {
            match fs::remove_file(&final_path) {
                Ok(()) => {}
                Err(error) if error.kind() == io::ErrorKind::NotFound => {}
                Err(error) => {
                    return Err(CaptureError::Storage(format!(
                        "failed to replace {}: {error}",
                        final_path.display()
                    )))
                }
            }
        }
        fs::rename(&part_path, &final_path).map_err(|error| {
            CaptureError::Storage(format!(
                "failed to move {} into place: {error}",
                part_path.display()
            ))
        })?;

        debug!("persisted {} bytes to {}", bytes.len(), final_path.display());
        Ok(final_path)
    }
}

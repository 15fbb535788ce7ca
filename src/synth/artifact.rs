//! Transient audio files produced by a synthesizer.

use std::path::{Path, PathBuf};

/// A synthesized WAV file that is deleted exactly once.
///
/// Call [`AudioArtifact::release`] when the audio is no longer needed; if the
/// handle is dropped without being released the file is removed anyway.
/// Deletion failures are logged, never returned.
#[derive(Debug)]
pub struct AudioArtifact {
    path: PathBuf,
    released: bool,
}

impl AudioArtifact {
    /// Take ownership of the file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            released: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the file.
    pub fn release(mut self) {
        self.remove();
    }

    fn remove(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        match std::fs::remove_file(&self.path) {
            Ok(()) => log::debug!("removed audio artifact {}", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("audio artifact {} already gone", self.path.display());
            }
            Err(e) => log::warn!(
                "could not remove audio artifact {}: {e}",
                self.path.display()
            ),
        }
    }
}

impl Drop for AudioArtifact {
    fn drop(&mut self) {
        self.remove();
    }
}

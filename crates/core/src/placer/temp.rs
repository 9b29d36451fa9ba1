//! Exclusively owned temporary output file.

use std::path::{Path, PathBuf};

/// A temp output path owned by one job.
///
/// The file is removed by [`TempOutput::cleanup`] or, if the owner never got
/// that far (e.g. the task was aborted), when the value is dropped. Removal
/// failures are logged and otherwise ignored.
#[derive(Debug)]
pub struct TempOutput {
    path: PathBuf,
    armed: bool,
}

impl TempOutput {
    pub(crate) fn new(path: PathBuf) -> Self {
        Self { path, armed: true }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Removes the file if it still exists.
    pub async fn cleanup(&mut self) {
        self.armed = false;
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => tracing::debug!("Removed temp file {}", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                "Failed to remove temp file {}: {}",
                self.path.display(),
                e
            ),
        }
    }
}

impl Drop for TempOutput {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                "Failed to remove temp file {}: {}",
                self.path.display(),
                e
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_cleanup_removes_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("partial.mp4");
        std::fs::write(&path, b"partial").unwrap();

        let mut temp = TempOutput::new(path.clone());
        temp.cleanup().await;
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_cleanup_tolerates_missing_file() {
        let dir = TempDir::new().unwrap();
        let mut temp = TempOutput::new(dir.path().join("never-written.mp4"));
        temp.cleanup().await;
    }

    #[test]
    fn test_drop_removes_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("aborted.mp4");
        std::fs::write(&path, b"partial").unwrap();

        drop(TempOutput::new(path.clone()));
        assert!(!path.exists());
    }
}

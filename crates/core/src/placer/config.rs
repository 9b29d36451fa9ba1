//! Placement settings.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// How outputs and displaced files are moved around on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacerConfig {
    /// Folder next to each output that receives the file it replaces.
    pub backup_dir_name: String,

    /// Read/write chunk used when an output has to be copied across devices.
    pub copy_buffer_bytes: usize,

    /// Try a hard link or rename first. When off, promotion always copies.
    pub link_before_copy: bool,

    /// Re-hash the destination after a copy and compare it with the source.
    pub verify_checksums: bool,
}

impl Default for PlacerConfig {
    fn default() -> Self {
        Self {
            backup_dir_name: "backup".to_string(),
            copy_buffer_bytes: 1024 * 1024,
            link_before_copy: true,
            verify_checksums: false,
        }
    }
}

impl PlacerConfig {
    pub fn with_backup_dir_name(mut self, name: impl Into<String>) -> Self {
        self.backup_dir_name = name.into();
        self
    }

    /// Always promote by copy, as if source and destination were on
    /// different devices.
    pub fn copy_only(mut self) -> Self {
        self.link_before_copy = false;
        self
    }

    pub fn verifying_copies(mut self) -> Self {
        self.verify_checksums = true;
        self
    }

    pub fn with_copy_buffer(mut self, bytes: usize) -> Self {
        self.copy_buffer_bytes = bytes;
        self
    }

    /// True if the backup folder name is a single relative path component.
    pub fn backup_dir_is_plain(&self) -> bool {
        let mut components = Path::new(&self.backup_dir_name).components();
        matches!(
            (components.next(), components.next()),
            (Some(std::path::Component::Normal(_)), None)
        )
    }
}

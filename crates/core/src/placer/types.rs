//! Types for the placer module.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A pre-existing output that was moved aside.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupRecord {
    /// Where the file used to be.
    pub original: PathBuf,
    /// Where it lives now.
    pub backup: PathBuf,
}

/// How a file reached its destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlacementMethod {
    /// Hard link to the destination, then unlink of the source.
    Linked,
    /// Plain rename after confirming the destination is free.
    Renamed,
    /// Copy into a sibling staging file, then link/rename into place.
    Copied,
}

/// Result of promoting a finished temp file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Promotion {
    /// Final path.
    pub destination: PathBuf,
    /// Size in bytes.
    pub size_bytes: u64,
    /// Placement strategy that succeeded.
    pub method: PlacementMethod,
    /// SHA-256 of the copied bytes (copy path with verification only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
}

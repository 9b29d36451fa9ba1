//! Placement errors.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Why an output, backup or temp file could not be put where it belongs.
#[derive(Debug, Error)]
pub enum PlacerError {
    /// The target path is taken. Nothing on disk is ever overwritten.
    #[error("Destination already exists: {path}")]
    DestinationExists { path: PathBuf },

    #[error("Cannot create directory {path}: {source}")]
    DirectoryCreationFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The previous output could not be moved aside, so the job must not
    /// proceed.
    #[error("Cannot back up {original} to {backup}: {source}")]
    BackupFailed {
        original: PathBuf,
        backup: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Cannot allocate temp output in {dir}: {reason}")]
    TempAllocationFailed { dir: PathBuf, reason: String },

    #[error("Copy {from} -> {to} failed: {source}")]
    CopyFailed {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Move {from} -> {to} failed: {source}")]
    MoveFailed {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The bytes read back after a copy hash differently from the source.
    #[error("Checksum mismatch for {path}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl PlacerError {
    pub fn copy_failed(from: PathBuf, to: PathBuf, source: io::Error) -> Self {
        Self::CopyFailed { from, to, source }
    }

    pub fn move_failed(from: PathBuf, to: PathBuf, source: io::Error) -> Self {
        Self::MoveFailed { from, to, source }
    }
}

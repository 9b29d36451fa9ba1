//! Types for the converter module.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Output class chosen from the input's extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputKind {
    /// Audio-only input, encoded to an audio container.
    Audio,
    /// Anything else, encoded to a video container.
    Video,
}

/// A single encode request handed to an [`Encoder`](super::Encoder).
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeRequest {
    /// Source media.
    pub input_path: PathBuf,
    /// Where the encoder writes (the job's temp file).
    pub output_path: PathBuf,
    /// Output class.
    pub kind: OutputKind,
}

/// Exit status of an encoder process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeExit {
    /// Exit code, `None` if the process was terminated by a signal.
    pub code: Option<i32>,
}

impl EncodeExit {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

impl From<std::process::ExitStatus> for EncodeExit {
    fn from(status: std::process::ExitStatus) -> Self {
        Self {
            code: status.code(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_success() {
        assert!(EncodeExit { code: Some(0) }.success());
        assert!(!EncodeExit { code: Some(1) }.success());
        assert!(!EncodeExit { code: None }.success());
    }

    #[test]
    fn test_output_kind_serialization() {
        assert_eq!(serde_json::to_string(&OutputKind::Audio).unwrap(), "\"audio\"");
        assert_eq!(serde_json::to_string(&OutputKind::Video).unwrap(), "\"video\"");
    }
}

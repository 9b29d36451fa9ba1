//! Error types for the converter module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while talking to the external encoder.
#[derive(Debug, Error)]
pub enum ConverterError {
    /// The encoder binary is missing or does not answer its version command.
    #[error("Encoder not available at {path}: {reason}")]
    ToolUnavailable { path: PathBuf, reason: String },

    /// Probe output did not carry a usable duration.
    #[error("Failed to probe media file: {reason}")]
    ProbeFailed { reason: String },

    /// The encoder exited unsuccessfully.
    #[error("Encoding failed ({status}): {stderr}")]
    EncodeFailed {
        status: String,
        code: Option<i32>,
        stderr: String,
    },

    /// The encoder ran longer than the configured limit.
    #[error("Encoding timed out after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },

    /// I/O error while driving the encoder process.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConverterError {
    /// Creates a tool unavailable error.
    pub fn tool_unavailable(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::ToolUnavailable {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Creates a probe failed error.
    pub fn probe_failed(reason: impl Into<String>) -> Self {
        Self::ProbeFailed {
            reason: reason.into(),
        }
    }

    /// Creates an encode failed error from an exit code and captured diagnostics.
    pub fn encode_failed(code: Option<i32>, stderr: impl Into<String>) -> Self {
        let status = match code {
            Some(code) => format!("exit code {}", code),
            None => "terminated by signal".to_string(),
        };
        Self::EncodeFailed {
            status,
            code,
            stderr: stderr.into(),
        }
    }
}

//! Events a job reports to its observer.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Failure class carried by [`JobEvent::Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobErrorKind {
    /// Encoder binary missing or not answering its version check.
    ToolUnavailable,
    /// Duration could not be read from the probe output.
    ProbeParseFailure,
    /// Encoder exited unsuccessfully or its output stream failed.
    EncodeFailure,
    /// Backup, temp allocation or promotion failed.
    FilesystemError,
    /// Encode exceeded the configured limit.
    Timeout,
    /// Anything else, including a panicking job task.
    UnexpectedException,
}

impl JobErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ToolUnavailable => "tool_unavailable",
            Self::ProbeParseFailure => "probe_parse_failure",
            Self::EncodeFailure => "encode_failure",
            Self::FilesystemError => "filesystem_error",
            Self::Timeout => "timeout",
            Self::UnexpectedException => "unexpected_exception",
        }
    }
}

impl fmt::Display for JobErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle notification from a running job.
///
/// Per job: `StreamReady` at most once, `Progress` any number of times, then
/// exactly one of `Finished` or `Error`, after which nothing else is sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JobEvent {
    /// The temp output is being written and can be opened for playback.
    StreamReady { path: PathBuf },
    /// Encode progress, 0 to 100.
    Progress { percent: u8 },
    /// The output is at its final path.
    Finished { path: PathBuf, message: String },
    /// The job failed.
    Error { kind: JobErrorKind, message: String },
}

impl JobEvent {
    /// Whether this is the last event of a job.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished { .. } | Self::Error { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let event = JobEvent::Progress { percent: 42 };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "progress");
        assert_eq!(json["percent"], 42);

        let event = JobEvent::Error {
            kind: JobErrorKind::ToolUnavailable,
            message: "ffmpeg not found".to_string(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "error");
        assert_eq!(json["kind"], "tool_unavailable");

        let parsed: JobEvent = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, event);
    }

    #[test]
    fn test_terminal_events() {
        assert!(!JobEvent::StreamReady {
            path: PathBuf::from("/tmp/x.mp4")
        }
        .is_terminal());
        assert!(!JobEvent::Progress { percent: 100 }.is_terminal());
        assert!(JobEvent::Finished {
            path: PathBuf::from("/v/x.mp4"),
            message: String::new(),
        }
        .is_terminal());
        assert!(JobEvent::Error {
            kind: JobErrorKind::Timeout,
            message: String::new(),
        }
        .is_terminal());
    }

    #[test]
    fn test_kind_display_matches_serde() {
        for kind in [
            JobErrorKind::ToolUnavailable,
            JobErrorKind::ProbeParseFailure,
            JobErrorKind::EncodeFailure,
            JobErrorKind::FilesystemError,
            JobErrorKind::Timeout,
            JobErrorKind::UnexpectedException,
        ] {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind));
        }
    }
}

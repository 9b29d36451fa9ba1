//! Error type for job execution.

use thiserror::Error;

use crate::converter::ConverterError;
use crate::placer::PlacerError;

use super::events::JobErrorKind;

/// Fault that ends a job.
#[derive(Debug, Error)]
pub enum JobError {
    /// Encoder error.
    #[error(transparent)]
    Converter(#[from] ConverterError),

    /// Filesystem placement error.
    #[error(transparent)]
    Placer(#[from] PlacerError),

    /// Anything not covered above (panic, closed semaphore, join failure).
    #[error("Unexpected failure: {0}")]
    Unexpected(String),
}

impl JobError {
    /// Failure class reported to observers.
    pub fn kind(&self) -> JobErrorKind {
        match self {
            Self::Converter(ConverterError::ToolUnavailable { .. }) => JobErrorKind::ToolUnavailable,
            Self::Converter(ConverterError::ProbeFailed { .. }) => JobErrorKind::ProbeParseFailure,
            Self::Converter(ConverterError::EncodeFailed { .. }) => JobErrorKind::EncodeFailure,
            Self::Converter(ConverterError::Timeout { .. }) => JobErrorKind::Timeout,
            Self::Converter(ConverterError::Io(_)) => JobErrorKind::EncodeFailure,
            Self::Placer(_) => JobErrorKind::FilesystemError,
            Self::Unexpected(_) => JobErrorKind::UnexpectedException,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_kind_mapping() {
        let err: JobError = ConverterError::tool_unavailable("ffmpeg", "not found").into();
        assert_eq!(err.kind(), JobErrorKind::ToolUnavailable);

        let err: JobError = ConverterError::encode_failed(Some(1), "boom").into();
        assert_eq!(err.kind(), JobErrorKind::EncodeFailure);

        let err: JobError = ConverterError::Timeout { timeout_secs: 5 }.into();
        assert_eq!(err.kind(), JobErrorKind::Timeout);

        let err: JobError = PlacerError::DestinationExists {
            path: PathBuf::from("/v/clip.mp4"),
        }
        .into();
        assert_eq!(err.kind(), JobErrorKind::FilesystemError);

        let err = JobError::Unexpected("panic".to_string());
        assert_eq!(err.kind(), JobErrorKind::UnexpectedException);
    }

    #[test]
    fn test_message_is_transparent() {
        let err: JobError = ConverterError::encode_failed(Some(1), "Invalid data found").into();
        assert_eq!(
            err.to_string(),
            "Encoding failed (exit code 1): Invalid data found"
        );
    }
}

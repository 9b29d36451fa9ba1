//! Per-job data and state machine.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::converter::{ConverterConfig, OutputKind};

/// Job lifecycle.
///
/// `Created -> Probing -> Encoding -> Finalizing -> Completed`, with any
/// non-terminal state able to move to `Failed`. There are no retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// Accepted, waiting for a slot or running preflight and backup.
    Created,
    /// Reading the input's duration.
    Probing,
    /// Encoder running.
    Encoding,
    /// Moving the finished temp file into place.
    Finalizing,
    Completed,
    Failed,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Probing => "probing",
            Self::Encoding => "encoding",
            Self::Finalizing => "finalizing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One input-to-output conversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionJob {
    /// Unique job ID.
    pub job_id: String,
    /// Source media.
    pub input_path: PathBuf,
    /// Output class derived from the input extension.
    pub output_kind: OutputKind,
    /// Extension of the produced file, without dot.
    pub output_extension: String,
    /// Temp file the encoder writes, once allocated.
    pub temp_output_path: Option<PathBuf>,
    /// `input_path` with `output_extension`.
    pub final_output_path: PathBuf,
    /// Input duration, 0 if unknown.
    pub duration_seconds: f64,
}

impl ConversionJob {
    /// Derives output naming for `input_path`.
    pub fn plan(input_path: PathBuf, config: &ConverterConfig) -> Self {
        let output_kind = config.classify(&input_path);
        let output_extension = config.extension_for(output_kind).to_string();
        let final_output_path = input_path.with_extension(&output_extension);

        Self {
            job_id: uuid::Uuid::new_v4().to_string(),
            input_path,
            output_kind,
            output_extension,
            temp_output_path: None,
            final_output_path,
            duration_seconds: 0.0,
        }
    }
}

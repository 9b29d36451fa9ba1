//! Types for the dispatcher module.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::supervisor::{JobEvent, JobOutcome, JobState};

/// Event delivered to the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DispatchEvent {
    /// A dropped path was refused; no job exists for it.
    Rejected { path: PathBuf, reason: String },
    /// An event from one job.
    Job {
        job_id: String,
        input_path: PathBuf,
        event: JobEvent,
    },
}

impl DispatchEvent {
    pub fn job_id(&self) -> Option<&str> {
        match self {
            Self::Job { job_id, .. } => Some(job_id),
            Self::Rejected { .. } => None,
        }
    }
}

/// Result of submitting one path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SubmitOutcome {
    Started { job_id: String, input_path: PathBuf },
    Rejected { path: PathBuf, reason: String },
}

impl SubmitOutcome {
    pub fn is_started(&self) -> bool {
        matches!(self, Self::Started { .. })
    }
}

/// Snapshot of a tracked job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSummary {
    pub job_id: String,
    pub input_path: PathBuf,
    pub final_output_path: PathBuf,
    pub state: JobState,
    pub submitted_at: DateTime<Utc>,
}

/// How a tracked job ended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobReport {
    pub job_id: String,
    pub input_path: PathBuf,
    pub outcome: JobOutcome,
}

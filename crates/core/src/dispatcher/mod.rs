//! Job registry in front of the supervisor.
//!
//! The dispatcher accepts dropped paths, refuses the ones that are not
//! readable regular files, starts one supervisor job per remaining path and
//! forwards every job event, tagged with its job, into one channel for the
//! presentation layer.

mod error;
mod registry;
mod types;

pub use error::DispatchError;
pub use registry::Dispatcher;
pub use types::{DispatchEvent, JobReport, JobSummary, SubmitOutcome};

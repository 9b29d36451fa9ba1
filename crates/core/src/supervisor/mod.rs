//! Conversion job supervisor.
//!
//! A job takes one input file to one output file:
//!
//! 1. Preflight the encoder (`ToolUnavailable` leaves the disk untouched)
//! 2. Move an existing output into `backup/`
//! 3. Allocate the temp output
//! 4. Probe the duration (failure only disables progress)
//! 5. Encode, announcing the temp file as a playable stream and reporting
//!    progress from the encoder's status lines
//! 6. Promote the temp file to the final path
//!
//! Every path out of the job removes the temp file and then sends exactly one
//! `Finished` or `Error` event.
//!
//! # Example
//!
//! ```ignore
//! use dropconv_core::converter::{ConverterConfig, FfmpegEncoder};
//! use dropconv_core::placer::FsPlacer;
//! use dropconv_core::supervisor::{JobEvent, Supervisor, SupervisorConfig};
//!
//! let config = ConverterConfig::default();
//! let supervisor = Supervisor::new(
//!     FfmpegEncoder::new(config.clone()),
//!     FsPlacer::with_defaults(),
//!     config,
//!     SupervisorConfig::default(),
//! );
//!
//! let mut job = supervisor.start(PathBuf::from("/videos/clip.avi"));
//! let mut events = job.take_events().unwrap();
//! while let Some(event) = events.recv().await {
//!     println!("{:?}", event);
//! }
//! ```

mod config;
mod error;
mod events;
mod job;
mod runner;

pub use config::SupervisorConfig;
pub use error::JobError;
pub use events::{JobErrorKind, JobEvent};
pub use job::{ConversionJob, JobState};
pub use runner::{JobHandle, JobOutcome, Supervisor};

//! Crash-safe output placement.
//!
//! Everything a job does on disk outside the encoder goes through
//! [`FsPlacer`]:
//!
//! - an existing output is moved into a `backup/` folder next to it, under
//!   the lowest free `.N` suffix
//! - the encoder writes into a [`TempOutput`] that is removed on every exit
//!   path
//! - the finished temp file is promoted to the final path without ever
//!   overwriting, copying through a staging file when the temp directory is
//!   on another filesystem
//!
//! # Example
//!
//! ```ignore
//! use dropconv_core::placer::FsPlacer;
//!
//! let placer = FsPlacer::with_defaults();
//! placer.backup_existing(&final_path).await?;
//! let mut temp = placer.allocate_temp(&temp_dir, "mp4").await?;
//! // ... encoder writes to temp.path() ...
//! placer.promote(temp.path(), &final_path).await?;
//! temp.cleanup().await;
//! ```

mod config;
mod error;
mod fs_placer;
mod temp;
mod types;

pub use config::PlacerConfig;
pub use error::PlacerError;
pub use fs_placer::FsPlacer;
pub use temp::TempOutput;
pub use types::{BackupRecord, PlacementMethod, Promotion};

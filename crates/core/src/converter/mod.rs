//! Converter module for driving the external encoder.
//!
//! This module provides the `Encoder` trait and an ffmpeg implementation that
//! the job supervisor uses to check tool availability, probe input duration
//! and run a streaming-friendly encode whose diagnostic output is parsed for
//! progress.
//!
//! # Features
//!
//! - Tool preflight via the encoder's version command
//! - Duration probe from ffmpeg's input summary
//! - Video transcoding (H.264 ultrafast + AAC in MPEG-TS, playable while growing)
//! - Audio-only transcoding (MP3)
//! - `\r`-aware parsing of `time=` status lines
//!
//! # Example
//!
//! ```ignore
//! use dropconv_core::converter::{ConverterConfig, EncodeRequest, Encoder, FfmpegEncoder};
//!
//! let config = ConverterConfig::default();
//! let encoder = FfmpegEncoder::new(config.clone());
//! encoder.check_available().await?;
//!
//! let input = PathBuf::from("/videos/clip.avi");
//! let duration = encoder.probe_duration(&input).await.unwrap_or(0.0);
//!
//! let mut session = encoder
//!     .start_encode(&EncodeRequest {
//!         kind: config.classify(&input),
//!         input_path: input,
//!         output_path: PathBuf::from("/tmp/dropconv-1234.mp4"),
//!     })
//!     .await?;
//!
//! while let Some(line) = session.next_status_line().await? {
//!     if let Some(elapsed) = parse_progress_time(&line) {
//!         println!("{:?}%", progress_percent(elapsed, duration));
//!     }
//! }
//! let exit = session.wait().await?;
//! ```

mod config;
mod error;
mod ffmpeg;
pub mod progress;
mod traits;
mod types;

pub use config::ConverterConfig;
pub use error::ConverterError;
pub use ffmpeg::FfmpegEncoder;
pub use progress::{
    parse_duration, parse_progress_time, progress_percent, StatusLines, MAX_LINE_BYTES,
};
pub use traits::{EncodeSession, Encoder};
pub use types::{EncodeExit, EncodeRequest, OutputKind};

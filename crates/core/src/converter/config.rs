//! Configuration for the converter module.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::types::OutputKind;

/// Configuration for the FFmpeg-based encoder and per-job encoding behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConverterConfig {
    /// Path to ffmpeg binary.
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: PathBuf,

    /// Directory where in-progress outputs are written.
    #[serde(default = "default_temp_dir")]
    pub temp_dir: PathBuf,

    /// Video codec for general inputs.
    #[serde(default = "default_video_codec")]
    pub video_codec: String,

    /// Encoder speed preset for video.
    #[serde(default = "default_video_preset")]
    pub video_preset: String,

    /// Audio codec used for the audio track of video outputs.
    #[serde(default = "default_video_audio_codec")]
    pub video_audio_codec: String,

    /// Muxer for video outputs. Must stay playable while being appended to.
    #[serde(default = "default_video_container")]
    pub video_container: String,

    /// File extension of video outputs.
    #[serde(default = "default_video_extension")]
    pub video_extension: String,

    /// Audio codec for audio-only inputs.
    #[serde(default = "default_audio_codec")]
    pub audio_codec: String,

    /// Muxer for audio outputs.
    #[serde(default = "default_audio_container")]
    pub audio_container: String,

    /// File extension of audio outputs.
    #[serde(default = "default_audio_extension")]
    pub audio_extension: String,

    /// Input extensions (lowercase, without dot) treated as audio-only.
    #[serde(default = "default_audio_extensions")]
    pub audio_extensions: Vec<String>,

    /// Delay between spawning the encoder and announcing the partial stream.
    #[serde(default = "default_stream_ready_delay_ms")]
    pub stream_ready_delay_ms: u64,

    /// Optional limit for a single encode. Unset means wait indefinitely.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,

    /// Number of trailing non-progress stderr lines kept for error reports.
    #[serde(default = "default_error_context_lines")]
    pub error_context_lines: usize,

    /// Additional ffmpeg arguments inserted before the output path.
    #[serde(default)]
    pub extra_ffmpeg_args: Vec<String>,
}

fn default_ffmpeg_path() -> PathBuf {
    PathBuf::from("ffmpeg")
}

fn default_temp_dir() -> PathBuf {
    std::env::temp_dir()
}

fn default_video_codec() -> String {
    "libx264".to_string()
}

fn default_video_preset() -> String {
    "ultrafast".to_string()
}

fn default_video_audio_codec() -> String {
    "aac".to_string()
}

fn default_video_container() -> String {
    "mpegts".to_string()
}

fn default_video_extension() -> String {
    "mp4".to_string()
}

fn default_audio_codec() -> String {
    "libmp3lame".to_string()
}

fn default_audio_container() -> String {
    "mp3".to_string()
}

fn default_audio_extension() -> String {
    "mp3".to_string()
}

fn default_audio_extensions() -> Vec<String> {
    ["wav", "mp3", "ogg", "m4a", "flac", "aac"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_stream_ready_delay_ms() -> u64 {
    500
}

fn default_error_context_lines() -> usize {
    20
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: default_ffmpeg_path(),
            temp_dir: default_temp_dir(),
            video_codec: default_video_codec(),
            video_preset: default_video_preset(),
            video_audio_codec: default_video_audio_codec(),
            video_container: default_video_container(),
            video_extension: default_video_extension(),
            audio_codec: default_audio_codec(),
            audio_container: default_audio_container(),
            audio_extension: default_audio_extension(),
            audio_extensions: default_audio_extensions(),
            stream_ready_delay_ms: default_stream_ready_delay_ms(),
            timeout_secs: None,
            error_context_lines: default_error_context_lines(),
            extra_ffmpeg_args: Vec::new(),
        }
    }
}

impl ConverterConfig {
    /// Creates a config pointing at a specific ffmpeg binary.
    pub fn with_ffmpeg_path(ffmpeg_path: PathBuf) -> Self {
        Self {
            ffmpeg_path,
            ..Default::default()
        }
    }

    /// Sets the temp directory.
    pub fn with_temp_dir(mut self, temp_dir: PathBuf) -> Self {
        self.temp_dir = temp_dir;
        self
    }

    /// Sets the encode timeout in seconds.
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = Some(timeout_secs);
        self
    }

    /// Sets the stream-ready delay in milliseconds.
    pub fn with_stream_ready_delay(mut self, delay_ms: u64) -> Self {
        self.stream_ready_delay_ms = delay_ms;
        self
    }

    /// Classifies an input path by its extension.
    pub fn classify(&self, input_path: &Path) -> OutputKind {
        let ext = input_path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase());

        match ext {
            Some(ext) if self.audio_extensions.iter().any(|a| a.eq_ignore_ascii_case(&ext)) => {
                OutputKind::Audio
            }
            _ => OutputKind::Video,
        }
    }

    /// Returns the output file extension for a kind.
    pub fn extension_for(&self, kind: OutputKind) -> &str {
        match kind {
            OutputKind::Audio => &self.audio_extension,
            OutputKind::Video => &self.video_extension,
        }
    }

    pub fn stream_ready_delay(&self) -> Duration {
        Duration::from_millis(self.stream_ready_delay_ms)
    }
}

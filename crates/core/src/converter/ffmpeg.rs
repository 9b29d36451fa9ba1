//! FFmpeg-based encoder implementation.

use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::{Child, ChildStderr, Command};

use super::config::ConverterConfig;
use super::error::ConverterError;
use super::progress::{parse_duration, StatusLines};
use super::traits::{EncodeSession, Encoder};
use super::types::{EncodeExit, EncodeRequest, OutputKind};

/// FFmpeg-based encoder implementation.
pub struct FfmpegEncoder {
    config: ConverterConfig,
}

impl FfmpegEncoder {
    /// Creates a new FFmpeg encoder with the given configuration.
    pub fn new(config: ConverterConfig) -> Self {
        Self { config }
    }

    /// Creates an encoder with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(ConverterConfig::default())
    }

    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    fn map_spawn_error(&self, e: std::io::Error) -> ConverterError {
        if e.kind() == std::io::ErrorKind::NotFound {
            ConverterError::tool_unavailable(&self.config.ffmpeg_path, "binary not found")
        } else {
            ConverterError::Io(e)
        }
    }

    /// Builds ffmpeg arguments for an encode.
    fn build_args(&self, request: &EncodeRequest) -> Vec<String> {
        let mut args = vec![
            "-hide_banner".to_string(),
            "-nostdin".to_string(),
            "-y".to_string(),
            "-i".to_string(),
            request.input_path.to_string_lossy().to_string(),
        ];

        match request.kind {
            OutputKind::Video => {
                args.extend([
                    "-c:v".to_string(),
                    self.config.video_codec.clone(),
                    "-preset".to_string(),
                    self.config.video_preset.clone(),
                    "-c:a".to_string(),
                    self.config.video_audio_codec.clone(),
                    "-f".to_string(),
                    self.config.video_container.clone(),
                ]);
            }
            OutputKind::Audio => {
                args.extend([
                    "-vn".to_string(),
                    "-c:a".to_string(),
                    self.config.audio_codec.clone(),
                    "-f".to_string(),
                    self.config.audio_container.clone(),
                ]);
            }
        }

        args.extend(self.config.extra_ffmpeg_args.iter().cloned());

        args.push(request.output_path.to_string_lossy().to_string());

        args
    }
}

#[async_trait]
impl Encoder for FfmpegEncoder {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    async fn check_available(&self) -> Result<(), ConverterError> {
        let output = Command::new(&self.config.ffmpeg_path)
            .arg("-version")
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| ConverterError::tool_unavailable(&self.config.ffmpeg_path, e.to_string()))?;

        if !output.status.success() {
            return Err(ConverterError::tool_unavailable(
                &self.config.ffmpeg_path,
                format!("version check exited with {}", output.status),
            ));
        }

        Ok(())
    }

    async fn probe_duration(&self, input: &Path) -> Result<f64, ConverterError> {
        // Without an output file ffmpeg prints the input summary and exits
        // non-zero, so the status is not checked.
        let probe = Command::new(&self.config.ffmpeg_path)
            .args(["-hide_banner", "-i"])
            .arg(input)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output();

        let output = match self.config.timeout_secs {
            Some(timeout_secs) => tokio::time::timeout(Duration::from_secs(timeout_secs), probe)
                .await
                .map_err(|_| ConverterError::Timeout { timeout_secs })?,
            None => probe.await,
        }
        .map_err(|e| self.map_spawn_error(e))?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        parse_duration(&stderr).ok_or_else(|| {
            ConverterError::probe_failed(format!(
                "no duration in probe output for {}",
                input.display()
            ))
        })
    }

    async fn start_encode(
        &self,
        request: &EncodeRequest,
    ) -> Result<Box<dyn EncodeSession>, ConverterError> {
        let args = self.build_args(request);
        tracing::debug!(
            "Spawning {} {}",
            self.config.ffmpeg_path.display(),
            args.join(" ")
        );

        let mut child = Command::new(&self.config.ffmpeg_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| self.map_spawn_error(e))?;

        let stderr = child.stderr.take().map(StatusLines::new);

        Ok(Box::new(FfmpegSession { child, stderr }))
    }
}

/// A running ffmpeg process.
struct FfmpegSession {
    child: Child,
    stderr: Option<StatusLines<ChildStderr>>,
}

#[async_trait]
impl EncodeSession for FfmpegSession {
    async fn next_status_line(&mut self) -> Result<Option<String>, ConverterError> {
        match self.stderr.as_mut() {
            Some(lines) => Ok(lines.next_line().await?),
            None => Ok(None),
        }
    }

    async fn wait(&mut self) -> Result<EncodeExit, ConverterError> {
        let status = self.child.wait().await?;
        Ok(status.into())
    }

    async fn kill(&mut self) -> Result<(), ConverterError> {
        self.child.kill().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn request(kind: OutputKind) -> EncodeRequest {
        EncodeRequest {
            input_path: PathBuf::from("/input/clip.avi"),
            output_path: PathBuf::from("/tmp/dropconv-abc.mp4"),
            kind,
        }
    }

    #[test]
    fn test_build_video_args() {
        let encoder = FfmpegEncoder::with_defaults();
        let args = encoder.build_args(&request(OutputKind::Video));

        let joined = args.join(" ");
        assert!(joined.contains("-y -i /input/clip.avi"));
        assert!(joined.contains("-c:v libx264"));
        assert!(joined.contains("-preset ultrafast"));
        assert!(joined.contains("-c:a aac"));
        assert!(joined.contains("-f mpegts"));
        assert_eq!(args.last().unwrap(), "/tmp/dropconv-abc.mp4");
    }

    #[test]
    fn test_build_audio_args() {
        let encoder = FfmpegEncoder::with_defaults();
        let args = encoder.build_args(&request(OutputKind::Audio));

        assert!(args.contains(&"-vn".to_string()));
        assert!(args.contains(&"libmp3lame".to_string()));
        assert!(!args.contains(&"-c:v".to_string()));
        let f = args.iter().position(|a| a == "-f").unwrap();
        assert_eq!(args[f + 1], "mp3");
    }

    #[test]
    fn test_extra_args_precede_output() {
        let mut config = ConverterConfig::default();
        config.extra_ffmpeg_args = vec!["-threads".to_string(), "2".to_string()];
        let encoder = FfmpegEncoder::new(config);
        let args = encoder.build_args(&request(OutputKind::Video));

        let n = args.len();
        assert_eq!(&args[n - 3..n - 1], &["-threads".to_string(), "2".to_string()]);
    }

    #[tokio::test]
    async fn test_missing_binary_is_tool_unavailable() {
        let encoder = FfmpegEncoder::new(ConverterConfig::with_ffmpeg_path(PathBuf::from(
            "/nonexistent/dropconv-ffmpeg",
        )));

        let result = encoder.check_available().await;
        assert!(matches!(result, Err(ConverterError::ToolUnavailable { .. })));

        let result = encoder.start_encode(&request(OutputKind::Video)).await;
        assert!(matches!(result, Err(ConverterError::ToolUnavailable { .. })));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_fake_ffmpeg_probe_and_encode() {
        use crate::testing::FakeFfmpeg;

        let dir = tempfile::TempDir::new().unwrap();
        let fake = FakeFfmpeg::new()
            .with_duration("00:00:20.00")
            .with_progress(&["00:00:05.00", "00:00:10.00"])
            .install(dir.path())
            .unwrap();

        let encoder = FfmpegEncoder::new(ConverterConfig::with_ffmpeg_path(fake));
        encoder.check_available().await.unwrap();

        let input = dir.path().join("clip.avi");
        std::fs::write(&input, b"source").unwrap();
        let duration = encoder.probe_duration(&input).await.unwrap();
        assert!((duration - 20.0).abs() < 1e-9);

        let output = dir.path().join("out.mp4");
        let mut session = encoder
            .start_encode(&EncodeRequest {
                input_path: input,
                output_path: output.clone(),
                kind: OutputKind::Video,
            })
            .await
            .unwrap();

        let mut lines = Vec::new();
        while let Some(line) = session.next_status_line().await.unwrap() {
            lines.push(line);
        }
        let exit = session.wait().await.unwrap();

        assert!(exit.success());
        assert!(lines.iter().any(|l| l.contains("time=00:00:10.00")));
        assert!(output.exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_fake_ffmpeg_probe_without_duration() {
        use crate::testing::FakeFfmpeg;

        let dir = tempfile::TempDir::new().unwrap();
        let fake = FakeFfmpeg::new().install(dir.path()).unwrap();
        let encoder = FfmpegEncoder::new(ConverterConfig::with_ffmpeg_path(fake));

        let result = encoder.probe_duration(&dir.path().join("x.wav")).await;
        assert!(matches!(result, Err(ConverterError::ProbeFailed { .. })));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_fake_ffmpeg_failing_version_check() {
        use crate::testing::FakeFfmpeg;

        let dir = tempfile::TempDir::new().unwrap();
        let fake = FakeFfmpeg::new()
            .with_broken_version()
            .install(dir.path())
            .unwrap();
        let encoder = FfmpegEncoder::new(ConverterConfig::with_ffmpeg_path(fake));

        let result = encoder.check_available().await;
        assert!(matches!(result, Err(ConverterError::ToolUnavailable { .. })));
    }
}

//! Mock encoder for testing.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::converter::{ConverterError, EncodeExit, EncodeRequest, EncodeSession, Encoder};

/// Scripted behaviour shared by every session of one mock.
#[derive(Debug, Clone)]
struct Script {
    available: bool,
    duration: Option<f64>,
    status_lines: Vec<String>,
    line_delay: Duration,
    exit_code: Option<i32>,
    output_bytes: Vec<u8>,
    hang: bool,
    panic: bool,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            available: true,
            duration: Some(10.0),
            status_lines: Vec::new(),
            line_delay: Duration::ZERO,
            exit_code: Some(0),
            output_bytes: b"encoded".to_vec(),
            hang: false,
            panic: false,
        }
    }
}

/// Mock implementation of the Encoder trait.
///
/// Provides controllable behavior for testing:
/// - Availability and probe results
/// - Scripted status lines with optional pacing
/// - Exit code, or a session that never ends
/// - Bytes written to the requested output
/// - Tracking of requests, kills and concurrent sessions
///
/// Clones share their recordings.
///
/// # Example
///
/// ```rust,ignore
/// use dropconv_core::testing::MockEncoder;
///
/// let encoder = MockEncoder::new()
///     .with_duration(20.0)
///     .with_status_lines(&["frame=10 time=00:00:10.00 bitrate=1k"])
///     .with_exit_code(0);
///
/// let supervisor = Supervisor::new(encoder.clone(), placer, config, jobs);
/// // ...
/// assert_eq!(encoder.recorded_requests().await.len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockEncoder {
    script: Script,
    requests: Arc<RwLock<Vec<EncodeRequest>>>,
    kills: Arc<AtomicUsize>,
    active: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl MockEncoder {
    /// Create a mock that succeeds with a 10 second input.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the version check fail.
    pub fn unavailable(mut self) -> Self {
        self.script.available = false;
        self
    }

    /// Set the probed duration.
    pub fn with_duration(mut self, seconds: f64) -> Self {
        self.script.duration = Some(seconds);
        self
    }

    /// Make the probe fail.
    pub fn without_duration(mut self) -> Self {
        self.script.duration = None;
        self
    }

    /// Lines the encode emits on its diagnostic stream.
    pub fn with_status_lines(mut self, lines: &[&str]) -> Self {
        self.script.status_lines = lines.iter().map(|l| l.to_string()).collect();
        self
    }

    /// Delay before each status line.
    pub fn with_line_delay(mut self, delay: Duration) -> Self {
        self.script.line_delay = delay;
        self
    }

    /// Exit code reported after the last line.
    pub fn with_exit_code(mut self, code: i32) -> Self {
        self.script.exit_code = Some(code);
        self
    }

    /// Bytes written to the output path when the encode starts.
    pub fn with_output_bytes(mut self, bytes: &[u8]) -> Self {
        self.script.output_bytes = bytes.to_vec();
        self
    }

    /// Keep the diagnostic stream open forever after the scripted lines.
    pub fn hanging(mut self) -> Self {
        self.script.hang = true;
        self
    }

    /// Panic when an encode is started.
    pub fn with_panic(mut self) -> Self {
        self.script.panic = true;
        self
    }

    /// Get all recorded encode requests.
    pub async fn recorded_requests(&self) -> Vec<EncodeRequest> {
        self.requests.read().await.clone()
    }

    /// Number of sessions that were killed.
    pub fn kill_count(&self) -> usize {
        self.kills.load(Ordering::SeqCst)
    }

    /// Highest number of sessions alive at the same time.
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Encoder for MockEncoder {
    fn name(&self) -> &str {
        "mock"
    }

    async fn check_available(&self) -> Result<(), ConverterError> {
        if self.script.available {
            Ok(())
        } else {
            Err(ConverterError::tool_unavailable("mock-ffmpeg", "binary not found"))
        }
    }

    async fn probe_duration(&self, input: &Path) -> Result<f64, ConverterError> {
        self.script.duration.ok_or_else(|| {
            ConverterError::probe_failed(format!("no duration for {}", input.display()))
        })
    }

    async fn start_encode(
        &self,
        request: &EncodeRequest,
    ) -> Result<Box<dyn EncodeSession>, ConverterError> {
        if self.script.panic {
            panic!("mock encoder asked to panic");
        }

        self.requests.write().await.push(request.clone());
        tokio::fs::write(&request.output_path, &self.script.output_bytes).await?;

        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        Ok(Box::new(MockSession {
            lines: self.script.status_lines.iter().cloned().collect(),
            line_delay: self.script.line_delay,
            hang: self.script.hang,
            exit_code: self.script.exit_code,
            killed: false,
            kills: Arc::clone(&self.kills),
            active: Arc::clone(&self.active),
        }))
    }
}

struct MockSession {
    lines: VecDeque<String>,
    line_delay: Duration,
    hang: bool,
    exit_code: Option<i32>,
    killed: bool,
    kills: Arc<AtomicUsize>,
    active: Arc<AtomicUsize>,
}

#[async_trait]
impl EncodeSession for MockSession {
    async fn next_status_line(&mut self) -> Result<Option<String>, ConverterError> {
        if self.lines.is_empty() {
            if self.hang && !self.killed {
                std::future::pending::<()>().await;
            }
            return Ok(None);
        }
        if !self.line_delay.is_zero() {
            tokio::time::sleep(self.line_delay).await;
        }
        Ok(self.lines.pop_front())
    }

    async fn wait(&mut self) -> Result<EncodeExit, ConverterError> {
        if self.killed {
            return Ok(EncodeExit { code: None });
        }
        Ok(EncodeExit {
            code: self.exit_code,
        })
    }

    async fn kill(&mut self) -> Result<(), ConverterError> {
        self.killed = true;
        self.kills.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl Drop for MockSession {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::OutputKind;
    use std::path::PathBuf;

    #[tokio::test]
    async fn test_mock_session_replays_script() {
        let dir = tempfile::TempDir::new().unwrap();
        let encoder = MockEncoder::new()
            .with_status_lines(&["a", "b"])
            .with_exit_code(3)
            .with_output_bytes(b"xyz");

        let request = EncodeRequest {
            input_path: PathBuf::from("/in.avi"),
            output_path: dir.path().join("out.mp4"),
            kind: OutputKind::Video,
        };
        let mut session = encoder.start_encode(&request).await.unwrap();

        assert_eq!(session.next_status_line().await.unwrap().as_deref(), Some("a"));
        assert_eq!(session.next_status_line().await.unwrap().as_deref(), Some("b"));
        assert_eq!(session.next_status_line().await.unwrap(), None);
        assert_eq!(session.wait().await.unwrap().code, Some(3));
        assert_eq!(std::fs::read(dir.path().join("out.mp4")).unwrap(), b"xyz");

        assert_eq!(encoder.peak_concurrency(), 1);
        drop(session);
        assert_eq!(encoder.recorded_requests().await, vec![request]);
    }

    #[tokio::test]
    async fn test_mock_availability_and_probe() {
        let encoder = MockEncoder::new().unavailable().without_duration();
        assert!(encoder.check_available().await.is_err());
        assert!(matches!(
            encoder.probe_duration(Path::new("/in.wav")).await,
            Err(ConverterError::ProbeFailed { .. })
        ));
    }
}

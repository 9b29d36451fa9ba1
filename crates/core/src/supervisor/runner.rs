//! Job supervisor implementation.

use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::VecDeque;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, watch, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::converter::{
    parse_progress_time, progress_percent, ConverterConfig, ConverterError, EncodeExit,
    EncodeRequest, EncodeSession, Encoder, OutputKind,
};
use crate::metrics;
use crate::placer::{FsPlacer, TempOutput};

use super::config::SupervisorConfig;
use super::error::JobError;
use super::events::{JobErrorKind, JobEvent};
use super::job::{ConversionJob, JobState};

/// How a job ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum JobOutcome {
    /// Output promoted to its final path.
    Completed { output_path: PathBuf },
    /// Job failed; the same kind and message were sent as the `Error` event.
    Failed { kind: JobErrorKind, message: String },
}

impl JobOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }
}

/// Starts conversion jobs and bounds how many run at once.
///
/// Each job runs on its own tokio task and shares nothing mutable with other
/// jobs except the concurrency permits.
pub struct Supervisor<E: Encoder + 'static> {
    encoder: Arc<E>,
    placer: Arc<FsPlacer>,
    converter_config: Arc<ConverterConfig>,
    permits: Arc<Semaphore>,
}

impl<E: Encoder + 'static> Clone for Supervisor<E> {
    fn clone(&self) -> Self {
        Self {
            encoder: Arc::clone(&self.encoder),
            placer: Arc::clone(&self.placer),
            converter_config: Arc::clone(&self.converter_config),
            permits: Arc::clone(&self.permits),
        }
    }
}

impl<E: Encoder + 'static> Supervisor<E> {
    /// Creates a new supervisor.
    pub fn new(
        encoder: E,
        placer: FsPlacer,
        converter_config: ConverterConfig,
        config: SupervisorConfig,
    ) -> Self {
        Self {
            encoder: Arc::new(encoder),
            placer: Arc::new(placer),
            converter_config: Arc::new(converter_config),
            permits: Arc::new(Semaphore::new(config.max_parallel.max(1))),
        }
    }

    pub fn encoder(&self) -> &E {
        &self.encoder
    }

    pub fn converter_config(&self) -> &ConverterConfig {
        &self.converter_config
    }

    /// Starts a job for `input_path` in the background.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self, input_path: PathBuf) -> JobHandle {
        let job = ConversionJob::plan(input_path, &self.converter_config);
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(JobState::Created);

        let handle_info = (
            job.job_id.clone(),
            job.input_path.clone(),
            job.final_output_path.clone(),
        );

        let runner = JobRunner {
            encoder: Arc::clone(&self.encoder),
            placer: Arc::clone(&self.placer),
            config: Arc::clone(&self.converter_config),
            permits: Arc::clone(&self.permits),
            job,
            temp: None,
            emitter: EventEmitter::new(events_tx),
            state: state_tx,
        };

        metrics::JOBS_STARTED.inc();
        info!(
            job_id = %handle_info.0,
            "Accepted {} -> {}",
            handle_info.1.display(),
            handle_info.2.display()
        );

        let task = tokio::spawn(runner.run());

        JobHandle {
            job_id: handle_info.0,
            input_path: handle_info.1,
            final_output_path: handle_info.2,
            events: Some(events_rx),
            state: state_rx,
            task,
        }
    }
}

/// Handle to a running job.
///
/// Dropping the handle does not stop the job.
pub struct JobHandle {
    job_id: String,
    input_path: PathBuf,
    final_output_path: PathBuf,
    events: Option<mpsc::UnboundedReceiver<JobEvent>>,
    state: watch::Receiver<JobState>,
    task: JoinHandle<JobOutcome>,
}

impl JobHandle {
    pub fn id(&self) -> &str {
        &self.job_id
    }

    pub fn input_path(&self) -> &Path {
        &self.input_path
    }

    pub fn final_output_path(&self) -> &Path {
        &self.final_output_path
    }

    /// Current state.
    pub fn state(&self) -> JobState {
        *self.state.borrow()
    }

    /// A receiver that observes state changes.
    pub fn watch_state(&self) -> watch::Receiver<JobState> {
        self.state.clone()
    }

    /// Takes the event receiver. Returns `None` if already taken.
    pub fn take_events(&mut self) -> Option<mpsc::UnboundedReceiver<JobEvent>> {
        self.events.take()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Aborts the job task. The encoder child is killed and the temp file
    /// removed when the task's state is dropped.
    pub fn abort(&self) {
        self.task.abort();
    }

    /// Waits for the job to end.
    pub async fn join(self) -> JobOutcome {
        match self.task.await {
            Ok(outcome) => outcome,
            Err(e) if e.is_cancelled() => JobOutcome::Failed {
                kind: JobErrorKind::UnexpectedException,
                message: "Job was aborted".to_string(),
            },
            Err(e) => JobOutcome::Failed {
                kind: JobErrorKind::UnexpectedException,
                message: e.to_string(),
            },
        }
    }
}

/// Enforces the per-job event ordering.
struct EventEmitter {
    tx: mpsc::UnboundedSender<JobEvent>,
    stream_announced: bool,
    terminated: bool,
}

impl EventEmitter {
    fn new(tx: mpsc::UnboundedSender<JobEvent>) -> Self {
        Self {
            tx,
            stream_announced: false,
            terminated: false,
        }
    }

    fn send(&self, event: JobEvent) {
        // Observer may have gone away; the job still runs to completion.
        let _ = self.tx.send(event);
    }

    fn stream_ready(&mut self, path: &Path) {
        if self.stream_announced || self.terminated {
            return;
        }
        self.stream_announced = true;
        self.send(JobEvent::StreamReady {
            path: path.to_path_buf(),
        });
    }

    fn progress(&mut self, percent: u8) {
        if !self.terminated {
            self.send(JobEvent::Progress { percent });
        }
    }

    fn terminate(&mut self, event: JobEvent) {
        if self.terminated {
            return;
        }
        self.terminated = true;
        self.send(event);
    }
}

/// State owned by one job task.
struct JobRunner<E: Encoder> {
    encoder: Arc<E>,
    placer: Arc<FsPlacer>,
    config: Arc<ConverterConfig>,
    permits: Arc<Semaphore>,
    job: ConversionJob,
    temp: Option<TempOutput>,
    emitter: EventEmitter,
    state: watch::Sender<JobState>,
}

impl<E: Encoder> JobRunner<E> {
    async fn run(mut self) -> JobOutcome {
        let result = AssertUnwindSafe(self.drive()).catch_unwind().await;

        let outcome = match result {
            Ok(Ok(output_path)) => JobOutcome::Completed { output_path },
            Ok(Err(e)) => JobOutcome::Failed {
                kind: e.kind(),
                message: e.to_string(),
            },
            Err(panic) => JobOutcome::Failed {
                kind: JobErrorKind::UnexpectedException,
                message: panic_message(panic.as_ref()),
            },
        };

        // The temp file is gone before observers see the terminal event.
        if let Some(mut temp) = self.temp.take() {
            temp.cleanup().await;
        }

        match &outcome {
            JobOutcome::Completed { output_path } => {
                info!(job_id = %self.job.job_id, "Conversion complete: {}", output_path.display());
                metrics::JOBS_FINISHED.with_label_values(&["completed"]).inc();
                self.emitter.terminate(JobEvent::Finished {
                    path: output_path.clone(),
                    message: format!("Conversion complete: {}", output_path.display()),
                });
                self.set_state(JobState::Completed);
            }
            JobOutcome::Failed { kind, message } => {
                warn!(job_id = %self.job.job_id, kind = %kind, "Conversion failed: {}", message);
                metrics::JOBS_FINISHED.with_label_values(&[kind.as_str()]).inc();
                self.emitter.terminate(JobEvent::Error {
                    kind: *kind,
                    message: message.clone(),
                });
                self.set_state(JobState::Failed);
            }
        }

        outcome
    }

    fn set_state(&self, state: JobState) {
        debug!(job_id = %self.job.job_id, "State -> {}", state);
        self.state.send_replace(state);
    }

    async fn drive(&mut self) -> Result<PathBuf, JobError> {
        let _permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|e| JobError::Unexpected(e.to_string()))?;
        metrics::JOBS_RUNNING.inc();
        let _running = RunningGuard;

        info!(job_id = %self.job.job_id, "Converting {}", self.job.input_path.display());

        self.encoder.check_available().await?;

        let backup = self
            .placer
            .backup_existing(&self.job.final_output_path)
            .await?;
        let source = match &backup {
            // Input and output share a name; read from where it was moved.
            Some(record) if record.original == self.job.input_path => record.backup.clone(),
            _ => self.job.input_path.clone(),
        };
        if backup.is_some() {
            metrics::BACKUPS_CREATED.inc();
        }

        let temp = self
            .placer
            .allocate_temp(&self.config.temp_dir, &self.job.output_extension)
            .await?;
        let temp_path = temp.path().to_path_buf();
        self.job.temp_output_path = Some(temp_path.clone());
        self.temp = Some(temp);

        self.set_state(JobState::Probing);
        self.job.duration_seconds = match self.encoder.probe_duration(&source).await {
            Ok(duration) => {
                debug!(job_id = %self.job.job_id, "Duration: {:.2}s", duration);
                duration
            }
            Err(e @ ConverterError::Timeout { .. }) => return Err(e.into()),
            Err(e) => {
                warn!(
                    job_id = %self.job.job_id,
                    kind = %JobErrorKind::ProbeParseFailure,
                    "Continuing without duration: {}",
                    e
                );
                0.0
            }
        };

        self.set_state(JobState::Encoding);
        let request = EncodeRequest {
            input_path: source,
            output_path: temp_path.clone(),
            kind: self.job.output_kind,
        };

        let encode_started = Instant::now();
        let encoded = self.encode(&request).await;
        metrics::ENCODE_DURATION
            .with_label_values(&[
                kind_label(&request),
                if encoded.is_ok() { "success" } else { "failure" },
            ])
            .observe(encode_started.elapsed().as_secs_f64());
        encoded?;

        self.set_state(JobState::Finalizing);
        self.emitter.progress(100);

        let promotion = self
            .placer
            .promote(&temp_path, &self.job.final_output_path)
            .await?;
        debug!(
            job_id = %self.job.job_id,
            "Placed {} bytes via {:?}",
            promotion.size_bytes,
            promotion.method
        );

        Ok(promotion.destination)
    }

    /// Runs the encoder to exit, honouring the optional timeout.
    async fn encode(&mut self, request: &EncodeRequest) -> Result<EncodeExit, JobError> {
        let mut session = self.encoder.start_encode(request).await?;

        let Some(timeout_secs) = self.config.timeout_secs else {
            return self.pump(session.as_mut(), &request.output_path).await;
        };

        let waited = tokio::time::timeout(
            Duration::from_secs(timeout_secs),
            self.pump(session.as_mut(), &request.output_path),
        )
        .await;

        match waited {
            Ok(result) => result,
            Err(_) => {
                if let Err(e) = session.kill().await {
                    warn!(job_id = %self.job.job_id, "Failed to kill encoder: {}", e);
                }
                Err(ConverterError::Timeout { timeout_secs }.into())
            }
        }
    }

    /// Reads status lines until the encoder closes its stream, then waits
    /// for its exit.
    async fn pump(
        &mut self,
        session: &mut dyn EncodeSession,
        temp_path: &Path,
    ) -> Result<EncodeExit, JobError> {
        let context_lines = self.config.error_context_lines;
        let mut tail: VecDeque<String> = VecDeque::with_capacity(context_lines);

        let delay = tokio::time::sleep(self.config.stream_ready_delay());
        tokio::pin!(delay);
        let mut announced = false;

        let read_result = loop {
            tokio::select! {
                _ = &mut delay, if !announced => {
                    announced = true;
                    self.emitter.stream_ready(temp_path);
                }
                line = session.next_status_line() => match line {
                    Ok(Some(line)) => self.observe_line(line, &mut tail, context_lines),
                    Ok(None) => break Ok(()),
                    Err(e) => break Err(e),
                },
            }
        };

        // Announced once per encode, even one that finishes within the delay.
        if !announced {
            (&mut delay).await;
            self.emitter.stream_ready(temp_path);
        }

        read_result?;

        let exit = session.wait().await?;
        if !exit.success() {
            let context = Vec::from(tail).join("\n");
            return Err(ConverterError::encode_failed(exit.code, context).into());
        }
        Ok(exit)
    }

    fn observe_line(&mut self, line: String, tail: &mut VecDeque<String>, limit: usize) {
        if let Some(elapsed) = parse_progress_time(&line) {
            if let Some(percent) = progress_percent(elapsed, self.job.duration_seconds) {
                self.emitter.progress(percent);
            }
            return;
        }

        let line = line.trim();
        if line.is_empty() || limit == 0 {
            return;
        }
        if tail.len() == limit {
            tail.pop_front();
        }
        tail.push_back(line.to_string());
    }
}

/// Keeps the running gauge in step with permit ownership, including on panic.
struct RunningGuard;

impl Drop for RunningGuard {
    fn drop(&mut self) {
        metrics::JOBS_RUNNING.dec();
    }
}

fn kind_label(request: &EncodeRequest) -> &'static str {
    match request.kind {
        OutputKind::Audio => "audio",
        OutputKind::Video => "video",
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("Job panicked: {}", s)
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("Job panicked: {}", s)
    } else {
        "Job panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::placer::PlacerConfig;
    use crate::testing::MockEncoder;
    use tempfile::TempDir;

    fn supervisor(encoder: MockEncoder, temp: &TempDir) -> Supervisor<MockEncoder> {
        let config = ConverterConfig::default()
            .with_temp_dir(temp.path().join("tmp"))
            .with_stream_ready_delay(10);
        Supervisor::new(
            encoder,
            FsPlacer::new(PlacerConfig::default()),
            config,
            SupervisorConfig::default(),
        )
    }

    async fn collect(handle: &mut JobHandle) -> Vec<JobEvent> {
        let mut rx = handle.take_events().unwrap();
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn test_successful_job_event_order() {
        let temp = TempDir::new().unwrap();
        let input = temp.path().join("clip.avi");
        std::fs::write(&input, b"source").unwrap();

        let encoder = MockEncoder::new()
            .with_duration(10.0)
            .with_status_lines(&["frame=1 time=00:00:05.00 bitrate=1k"]);
        let mut handle = supervisor(encoder, &temp).start(input);

        let events = collect(&mut handle).await;
        let outcome = handle.join().await;

        let ready = events
            .iter()
            .filter(|e| matches!(e, JobEvent::StreamReady { .. }))
            .count();
        assert_eq!(ready, 1);
        assert!(events.contains(&JobEvent::Progress { percent: 50 }));
        assert_eq!(events[events.len() - 2], JobEvent::Progress { percent: 100 });
        assert!(matches!(events.last(), Some(JobEvent::Finished { .. })));
        assert_eq!(
            outcome,
            JobOutcome::Completed {
                output_path: temp.path().join("clip.mp4")
            }
        );
    }

    #[tokio::test]
    async fn test_state_reaches_terminal() {
        let temp = TempDir::new().unwrap();
        let input = temp.path().join("clip.avi");
        std::fs::write(&input, b"source").unwrap();

        let handle = supervisor(MockEncoder::new().with_exit_code(1), &temp).start(input);
        let mut state = handle.watch_state();
        let terminal = *state.wait_for(|s| s.is_terminal()).await.unwrap();

        assert_eq!(terminal, JobState::Failed);
        assert!(!handle.join().await.is_success());
    }

    #[tokio::test]
    async fn test_panicking_encoder_is_unexpected_exception() {
        let temp = TempDir::new().unwrap();
        let input = temp.path().join("clip.avi");
        std::fs::write(&input, b"source").unwrap();

        let mut handle = supervisor(MockEncoder::new().with_panic(), &temp).start(input);
        let events = collect(&mut handle).await;

        assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 1);
        match events.last() {
            Some(JobEvent::Error { kind, .. }) => {
                assert_eq!(*kind, JobErrorKind::UnexpectedException)
            }
            other => panic!("unexpected last event: {:?}", other),
        }
        // Temp file cleaned up despite the panic.
        let leftovers = std::fs::read_dir(temp.path().join("tmp")).unwrap().count();
        assert_eq!(leftovers, 0);
    }

    #[test]
    fn test_emitter_enforces_ordering() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut emitter = EventEmitter::new(tx);

        emitter.stream_ready(Path::new("/tmp/a.mp4"));
        emitter.stream_ready(Path::new("/tmp/a.mp4"));
        emitter.progress(10);
        emitter.terminate(JobEvent::Error {
            kind: JobErrorKind::EncodeFailure,
            message: "boom".to_string(),
        });
        emitter.progress(20);
        emitter.terminate(JobEvent::Finished {
            path: PathBuf::from("/v/a.mp4"),
            message: String::new(),
        });
        drop(emitter);

        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        assert_eq!(events.len(), 3);
        assert!(matches!(events[0], JobEvent::StreamReady { .. }));
        assert_eq!(events[1], JobEvent::Progress { percent: 10 });
        assert!(matches!(events[2], JobEvent::Error { .. }));
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("bad state");
        assert_eq!(panic_message(payload.as_ref()), "Job panicked: bad state");
        let payload: Box<dyn Any + Send> = Box::new(7u32);
        assert_eq!(panic_message(payload.as_ref()), "Job panicked");
    }
}

//! Job registry implementation.

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::converter::Encoder;
use crate::metrics;
use crate::supervisor::{JobEvent, JobHandle, JobOutcome, JobState, Supervisor};

use super::error::DispatchError;
use super::types::{DispatchEvent, JobReport, JobSummary, SubmitOutcome};

/// A job the dispatcher started and has not yet reported.
struct TrackedJob {
    handle: JobHandle,
    /// Resolves to whether the job's own terminal event was forwarded.
    forwarder: JoinHandle<bool>,
    submitted_at: DateTime<Utc>,
}

impl TrackedJob {
    fn is_done(&self) -> bool {
        self.handle.is_finished() && self.forwarder.is_finished()
    }

    fn summary(&self) -> JobSummary {
        JobSummary {
            job_id: self.handle.id().to_string(),
            input_path: self.handle.input_path().to_path_buf(),
            final_output_path: self.handle.final_output_path().to_path_buf(),
            state: self.handle.state(),
            submitted_at: self.submitted_at,
        }
    }
}

/// Turns dropped paths into supervisor jobs and funnels their events into a
/// single channel.
pub struct Dispatcher<E: Encoder + 'static> {
    supervisor: Supervisor<E>,
    events: mpsc::UnboundedSender<DispatchEvent>,
    jobs: Arc<RwLock<Vec<TrackedJob>>>,
}

impl<E: Encoder + 'static> Dispatcher<E> {
    /// Creates a dispatcher and the receiver for everything it reports.
    pub fn new(supervisor: Supervisor<E>) -> (Self, mpsc::UnboundedReceiver<DispatchEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let dispatcher = Self {
            supervisor,
            events,
            jobs: Arc::new(RwLock::new(Vec::new())),
        };
        (dispatcher, rx)
    }

    pub fn supervisor(&self) -> &Supervisor<E> {
        &self.supervisor
    }

    /// Validates each path and starts one job per valid path.
    ///
    /// Invalid paths produce a [`DispatchEvent::Rejected`] and no job.
    pub async fn submit<I, P>(&self, paths: I) -> Vec<SubmitOutcome>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        self.prune().await;

        let mut outcomes = Vec::new();
        for path in paths {
            let path = path.as_ref();
            match validate_path(path).await {
                Ok(input_path) => {
                    let job_id = self.start_job(input_path.clone()).await;
                    outcomes.push(SubmitOutcome::Started { job_id, input_path });
                }
                Err(e) => {
                    let reason = e.to_string();
                    warn!("Rejected {}: {}", path.display(), reason);
                    metrics::PATHS_REJECTED.inc();
                    let _ = self.events.send(DispatchEvent::Rejected {
                        path: path.to_path_buf(),
                        reason: reason.clone(),
                    });
                    outcomes.push(SubmitOutcome::Rejected {
                        path: path.to_path_buf(),
                        reason,
                    });
                }
            }
        }
        outcomes
    }

    async fn start_job(&self, input_path: PathBuf) -> String {
        let mut handle = self.supervisor.start(input_path);
        let job_id = handle.id().to_string();

        let forwarder = match handle.take_events() {
            Some(rx) => spawn_forwarder(
                rx,
                self.events.clone(),
                job_id.clone(),
                handle.input_path().to_path_buf(),
            ),
            None => tokio::spawn(async { false }),
        };

        self.jobs.write().await.push(TrackedJob {
            handle,
            forwarder,
            submitted_at: Utc::now(),
        });
        job_id
    }

    /// Drops jobs that have finished and whose events were all forwarded.
    async fn prune(&self) {
        let mut jobs = self.jobs.write().await;
        let before = jobs.len();
        jobs.retain(|job| !job.is_done());
        let pruned = before - jobs.len();
        if pruned > 0 {
            tracing::debug!("Pruned {} finished jobs", pruned);
        }
    }

    /// Summaries of jobs that have not reached a terminal state.
    pub async fn active_jobs(&self) -> Vec<JobSummary> {
        self.jobs
            .read()
            .await
            .iter()
            .map(TrackedJob::summary)
            .filter(|summary| !summary.state.is_terminal())
            .collect()
    }

    /// Waits until every tracked job has ended, including jobs submitted
    /// while waiting, and reports their outcomes.
    ///
    /// All events of the reported jobs have been sent when this returns.
    pub async fn wait_all(&self) -> Vec<JobReport> {
        loop {
            let pending: Vec<_> = {
                let jobs = self.jobs.read().await;
                jobs.iter()
                    .map(|job| job.handle.watch_state())
                    .filter(|state| state.has_changed().is_ok() && !state.borrow().is_terminal())
                    .collect()
            };
            if pending.is_empty() {
                break;
            }
            for mut state in pending {
                // Err means the job task is gone.
                let _ = state.wait_for(JobState::is_terminal).await;
            }
        }

        self.drain().await
    }

    /// Aborts every running job and reports all tracked jobs.
    ///
    /// Aborted jobs kill their encoder and remove their temp file. Each gets a
    /// synthesized `Error` event since it never sent its own.
    pub async fn shutdown(&self) -> Vec<JobReport> {
        {
            let jobs = self.jobs.read().await;
            let running = jobs.iter().filter(|job| !job.handle.is_finished()).count();
            if running > 0 {
                info!("Aborting {} running jobs", running);
            }
            for job in jobs.iter() {
                job.handle.abort();
            }
        }

        self.drain().await
    }

    async fn drain(&self) -> Vec<JobReport> {
        let drained = std::mem::take(&mut *self.jobs.write().await);

        let mut reports = Vec::with_capacity(drained.len());
        for TrackedJob {
            handle, forwarder, ..
        } in drained
        {
            let job_id = handle.id().to_string();
            let input_path = handle.input_path().to_path_buf();
            let outcome = handle.join().await;
            let saw_terminal = forwarder.await.unwrap_or(false);

            if !saw_terminal {
                if let JobOutcome::Failed { kind, message } = &outcome {
                    let _ = self.events.send(DispatchEvent::Job {
                        job_id: job_id.clone(),
                        input_path: input_path.clone(),
                        event: JobEvent::Error {
                            kind: *kind,
                            message: message.clone(),
                        },
                    });
                }
            }

            reports.push(JobReport {
                job_id,
                input_path,
                outcome,
            });
        }
        reports
    }
}

fn spawn_forwarder(
    mut rx: mpsc::UnboundedReceiver<JobEvent>,
    tx: mpsc::UnboundedSender<DispatchEvent>,
    job_id: String,
    input_path: PathBuf,
) -> JoinHandle<bool> {
    tokio::spawn(async move {
        let mut saw_terminal = false;
        while let Some(event) = rx.recv().await {
            saw_terminal |= event.is_terminal();
            let _ = tx.send(DispatchEvent::Job {
                job_id: job_id.clone(),
                input_path: input_path.clone(),
                event,
            });
        }
        saw_terminal
    })
}

/// Checks that `path` is an existing, readable regular file and returns its
/// absolute form.
///
/// Symlinks are not resolved: the output and `backup/` belong next to the
/// path that was dropped, not next to the link target.
async fn validate_path(path: &Path) -> Result<PathBuf, DispatchError> {
    let meta = fs::metadata(path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            DispatchError::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            DispatchError::Inaccessible {
                path: path.to_path_buf(),
                source: e,
            }
        }
    })?;

    if !meta.is_file() {
        return Err(DispatchError::NotAFile {
            path: path.to_path_buf(),
        });
    }

    fs::File::open(path)
        .await
        .map_err(|e| DispatchError::Unreadable {
            path: path.to_path_buf(),
            source: e,
        })?;

    std::path::absolute(path).map_err(|e| DispatchError::Inaccessible {
        path: path.to_path_buf(),
        source: e,
    })
}

use std::collections::HashMap;
use std::path::Path;

use dropconv_core::{DispatchEvent, JobEvent};

/// Tally of what happened to the submitted paths.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Summary {
    pub completed: usize,
    pub failed: usize,
    pub rejected: usize,
}

impl Summary {
    pub fn has_failures(&self) -> bool {
        self.failed > 0 || self.rejected > 0
    }
}

/// Turns dispatcher events into output lines.
///
/// Repeated progress values for a job are suppressed.
pub struct Renderer {
    json: bool,
    last_percent: HashMap<String, u8>,
    summary: Summary,
}

impl Renderer {
    pub fn new(json: bool) -> Self {
        Self {
            json,
            last_percent: HashMap::new(),
            summary: Summary::default(),
        }
    }

    pub fn summary(&self) -> &Summary {
        &self.summary
    }

    /// Records `event` and returns the line to print, if any.
    pub fn render(&mut self, event: &DispatchEvent) -> Option<String> {
        match event {
            DispatchEvent::Rejected { .. } => self.summary.rejected += 1,
            DispatchEvent::Job { job_id, event, .. } => match event {
                JobEvent::Progress { percent } => {
                    if self.last_percent.insert(job_id.clone(), *percent) == Some(*percent) {
                        return None;
                    }
                }
                JobEvent::Finished { .. } => {
                    self.last_percent.remove(job_id);
                    self.summary.completed += 1;
                }
                JobEvent::Error { .. } => {
                    self.last_percent.remove(job_id);
                    self.summary.failed += 1;
                }
                JobEvent::StreamReady { .. } => {}
            },
        }

        if self.json {
            return serde_json::to_string(event).ok();
        }

        Some(match event {
            DispatchEvent::Rejected { path, reason } => {
                format!("rejected {}: {}", path.display(), reason)
            }
            DispatchEvent::Job {
                input_path, event, ..
            } => {
                let name = display_name(input_path);
                match event {
                    JobEvent::StreamReady { path } => {
                        format!("[{}] preview available at {}", name, path.display())
                    }
                    JobEvent::Progress { percent } => format!("[{}] {:>3}%", name, percent),
                    JobEvent::Finished { message, .. } => format!("[{}] {}", name, message),
                    JobEvent::Error { kind, message } => {
                        format!("[{}] error ({}): {}", name, kind, message)
                    }
                }
            }
        })
    }

    /// Closing line for text output.
    pub fn summary_line(&self) -> String {
        format!(
            "{} converted, {} failed, {} rejected",
            self.summary.completed, self.summary.failed, self.summary.rejected
        )
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

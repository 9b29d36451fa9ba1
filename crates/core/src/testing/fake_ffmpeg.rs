//! Shell script standing in for the ffmpeg binary.

use std::io;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

/// Builder for an executable `ffmpeg` replacement.
///
/// The script understands the three invocations the encoder makes:
/// `-version`, the probe (`-hide_banner -i <input>`) and an encode, for
/// which it writes to the last argument and prints `\r`-terminated status
/// lines on stderr.
#[derive(Debug, Clone)]
pub struct FakeFfmpeg {
    duration: Option<String>,
    progress: Vec<String>,
    error_lines: Vec<String>,
    broken_version: bool,
    exit_code: i32,
    sleep_secs: u32,
    probe_sleep_secs: u32,
}

impl Default for FakeFfmpeg {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeFfmpeg {
    pub fn new() -> Self {
        Self {
            duration: None,
            progress: Vec::new(),
            error_lines: Vec::new(),
            broken_version: false,
            exit_code: 0,
            sleep_secs: 0,
            probe_sleep_secs: 0,
        }
    }

    /// `Duration:` value printed by the probe.
    pub fn with_duration(mut self, duration: &str) -> Self {
        self.duration = Some(duration.to_string());
        self
    }

    /// `time=` values printed during the encode.
    pub fn with_progress(mut self, times: &[&str]) -> Self {
        self.progress = times.iter().map(|t| t.to_string()).collect();
        self
    }

    /// Plain diagnostic lines printed after the progress lines.
    pub fn with_error_lines(mut self, lines: &[&str]) -> Self {
        self.error_lines = lines.iter().map(|l| l.to_string()).collect();
        self
    }

    /// Make `-version` exit with status 1.
    pub fn with_broken_version(mut self) -> Self {
        self.broken_version = true;
        self
    }

    /// Exit status of the encode.
    pub fn with_exit_code(mut self, code: i32) -> Self {
        self.exit_code = code;
        self
    }

    /// Seconds the encode sleeps before exiting.
    pub fn with_sleep(mut self, secs: u32) -> Self {
        self.sleep_secs = secs;
        self
    }

    /// Seconds the probe sleeps before printing anything.
    pub fn with_probe_sleep(mut self, secs: u32) -> Self {
        self.probe_sleep_secs = secs;
        self
    }

    fn script(&self) -> String {
        let mut script = String::from("#!/bin/sh\n");

        script.push_str("if [ \"$1\" = \"-version\" ]; then\n");
        if self.broken_version {
            script.push_str("  echo 'ffmpeg: cannot load libraries' >&2\n  exit 1\n");
        } else {
            script.push_str("  echo 'ffmpeg version 0.0-fake'\n  exit 0\n");
        }
        script.push_str("fi\n");

        script.push_str("if [ \"$#\" -eq 3 ]; then\n");
        if self.probe_sleep_secs > 0 {
            script.push_str(&format!("  sleep {}\n", self.probe_sleep_secs));
        }
        script.push_str("  echo \"Input #0, avi, from '$3':\" >&2\n");
        if let Some(duration) = &self.duration {
            script.push_str(&format!(
                "  echo '  Duration: {}, start: 0.000000, bitrate: 1000 kb/s' >&2\n",
                duration
            ));
        }
        script.push_str("  echo 'At least one output file must be specified' >&2\n  exit 1\nfi\n");

        script.push_str("for arg in \"$@\"; do out=\"$arg\"; done\n");
        script.push_str("printf 'encoded' > \"$out\"\n");
        for (i, time) in self.progress.iter().enumerate() {
            script.push_str(&format!(
                "printf 'frame={} fps=25 time={} bitrate=1000kbits/s speed=2x\\r' >&2\n",
                i + 1,
                time
            ));
        }
        for line in &self.error_lines {
            script.push_str(&format!("echo '{}' >&2\n", line.replace('\'', "")));
        }
        if self.sleep_secs > 0 {
            script.push_str(&format!("sleep {}\n", self.sleep_secs));
        }
        script.push_str(&format!("exit {}\n", self.exit_code));

        script
    }

    /// Writes the script as `<dir>/ffmpeg` and returns its path.
    pub fn install(&self, dir: &Path) -> io::Result<PathBuf> {
        let path = dir.join("ffmpeg");
        std::fs::write(&path, self.script())?;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))?;
        Ok(path)
    }
}

//! Parsing of ffmpeg's diagnostic stream.
//!
//! ffmpeg prints a `Duration: HH:MM:SS.ms` line when inspecting an input and
//! rewrites a status line carrying `time=HH:MM:SS.ms` while encoding. Status
//! lines are terminated by `\r` rather than `\n`, so [`StatusLines`] splits on
//! both. This is a narrow, version-sensitive contract with one tool's output.

use once_cell::sync::Lazy;
use regex_lite::Regex;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};

static DURATION_RE: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"Duration:\s*(\d+:\d{1,2}:\d{1,2}(?:\.\d+)?)").ok());

static TIME_RE: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"time=(\S+)").ok());

/// Parses `HH:MM:SS[.frac]` into seconds.
pub fn parse_timestamp(value: &str) -> Option<f64> {
    let mut parts = value.trim().split(':');
    let hours = parts.next()?.parse::<f64>().ok()?;
    let minutes = parts.next()?.parse::<f64>().ok()?;
    let seconds = parts.next()?.parse::<f64>().ok()?;
    if parts.next().is_some() {
        return None;
    }

    let total = hours * 3600.0 + minutes * 60.0 + seconds;
    total.is_finite().then_some(total)
}

/// Extracts the total duration from probe output, if present.
pub fn parse_duration(output: &str) -> Option<f64> {
    let re = DURATION_RE.as_ref()?;
    output
        .lines()
        .find_map(|line| re.captures(line))
        .and_then(|caps| caps.get(1))
        .and_then(|m| parse_timestamp(m.as_str()))
}

/// Extracts the elapsed encode time from a status line.
///
/// Returns `None` for lines without a marker and for unparseable markers
/// such as `time=N/A`.
pub fn parse_progress_time(line: &str) -> Option<f64> {
    let re = TIME_RE.as_ref()?;
    let caps = re.captures(line)?;
    parse_timestamp(caps.get(1)?.as_str())
}

/// Converts elapsed/total seconds into a whole percentage clamped to 0..=100.
///
/// Returns `None` when the total is unknown.
pub fn progress_percent(elapsed_secs: f64, duration_secs: f64) -> Option<u8> {
    if !duration_secs.is_finite() || duration_secs <= 0.0 || !elapsed_secs.is_finite() {
        return None;
    }
    let percent = (elapsed_secs / duration_secs * 100.0).round();
    Some(percent.clamp(0.0, 100.0) as u8)
}

/// Longest segment returned as one line. Longer runs without a terminator
/// are split at this size.
pub const MAX_LINE_BYTES: usize = 64 * 1024;

/// Line reader that treats both `\r` and `\n` as terminators.
///
/// Empty segments (e.g. from `\r\n`) are skipped. Invalid UTF-8 is replaced.
pub struct StatusLines<R> {
    reader: BufReader<R>,
    buf: Vec<u8>,
}

impl<R: AsyncRead + Unpin> StatusLines<R> {
    pub fn new(inner: R) -> Self {
        Self {
            reader: BufReader::new(inner),
            buf: Vec::new(),
        }
    }

    /// Returns the next non-empty line, or `None` at end of stream.
    ///
    /// Cancel safe: partial lines stay buffered in `self`.
    pub async fn next_line(&mut self) -> std::io::Result<Option<String>> {
        loop {
            let available = self.reader.fill_buf().await?;

            if available.is_empty() {
                if self.buf.is_empty() {
                    return Ok(None);
                }
                return Ok(Some(self.take_line()));
            }

            let room = MAX_LINE_BYTES - self.buf.len();
            match available.iter().position(|b| *b == b'\n' || *b == b'\r') {
                Some(idx) if idx <= room => {
                    self.buf.extend_from_slice(&available[..idx]);
                    self.reader.consume(idx + 1);
                    if !self.buf.is_empty() {
                        return Ok(Some(self.take_line()));
                    }
                }
                _ => {
                    let take = available.len().min(room);
                    self.buf.extend_from_slice(&available[..take]);
                    self.reader.consume(take);
                    if self.buf.len() == MAX_LINE_BYTES {
                        return Ok(Some(self.take_line()));
                    }
                }
            }
        }
    }

    fn take_line(&mut self) -> String {
        let line = String::from_utf8_lossy(&self.buf).into_owned();
        self.buf.clear();
        line
    }
}

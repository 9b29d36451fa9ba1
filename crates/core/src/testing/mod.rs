//! Testing utilities and mock implementations.
//!
//! [`MockEncoder`] replaces the encoder with a scripted one so the supervisor
//! and dispatcher can be exercised without ffmpeg. On unix, [`FakeFfmpeg`]
//! installs a shell script that behaves enough like ffmpeg to drive the real
//! subprocess path.
//!
//! # Example
//!
//! ```rust,ignore
//! use dropconv_core::testing::{fixtures, MockEncoder};
//!
//! let dir = tempfile::TempDir::new()?;
//! let input = fixtures::media_file(dir.path(), "clip.avi");
//! let encoder = MockEncoder::new().with_exit_code(1);
//! ```

#[cfg(unix)]
mod fake_ffmpeg;
mod mock_encoder;

#[cfg(unix)]
pub use fake_ffmpeg::FakeFfmpeg;
pub use mock_encoder::MockEncoder;

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::path::{Path, PathBuf};

    use crate::converter::ConverterConfig;

    /// Create a small input file named `name` in `dir`.
    pub fn media_file(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        if let Err(e) = std::fs::write(&path, b"not really media") {
            panic!("failed to create fixture {}: {}", path.display(), e);
        }
        path
    }

    /// Converter config with a private temp dir and a short stream-ready delay.
    pub fn converter_config(temp_dir: &Path) -> ConverterConfig {
        ConverterConfig::default()
            .with_temp_dir(temp_dir.to_path_buf())
            .with_stream_ready_delay(20)
    }

    /// Names of the entries in `dir`, sorted. Empty if `dir` does not exist.
    pub fn dir_entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .map(|entries| {
                entries
                    .filter_map(|e| e.ok())
                    .map(|e| e.file_name().to_string_lossy().into_owned())
                    .collect()
            })
            .unwrap_or_default();
        names.sort();
        names
    }
}

//! Trait definitions for the converter module.

use async_trait::async_trait;
use std::path::Path;

use super::error::ConverterError;
use super::types::{EncodeExit, EncodeRequest};

/// An external encoder that can be probed and driven as a subprocess.
#[async_trait]
pub trait Encoder: Send + Sync {
    /// Returns the name of this encoder implementation.
    fn name(&self) -> &str;

    /// Verifies the encoder can be invoked at all.
    ///
    /// Fails with [`ConverterError::ToolUnavailable`] when it cannot.
    async fn check_available(&self) -> Result<(), ConverterError>;

    /// Inspects the input and returns its total duration in seconds.
    ///
    /// `Timeout` means the probe itself hung; other errors only mean the
    /// duration is unknown.
    async fn probe_duration(&self, input: &Path) -> Result<f64, ConverterError>;

    /// Starts encoding `request.input_path` into `request.output_path`.
    ///
    /// The returned session yields the encoder's diagnostic lines and its
    /// exit status.
    async fn start_encode(
        &self,
        request: &EncodeRequest,
    ) -> Result<Box<dyn EncodeSession>, ConverterError>;
}

/// A running encode.
#[async_trait]
pub trait EncodeSession: Send {
    /// Next line of diagnostic output, `None` once the stream is closed.
    async fn next_status_line(&mut self) -> Result<Option<String>, ConverterError>;

    /// Waits for the encoder to exit.
    async fn wait(&mut self) -> Result<EncodeExit, ConverterError>;

    /// Terminates the encoder.
    async fn kill(&mut self) -> Result<(), ConverterError>;
}

use dropconv_core::{
    Config, ConverterError, DispatchEvent, Dispatcher, Encoder, FfmpegEncoder, FsPlacer,
    Supervisor,
};
use tokio::sync::mpsc;

/// Everything the binary wires together, built once from the config.
pub struct AppContext<E: Encoder + 'static = FfmpegEncoder> {
    config: Config,
    dispatcher: Dispatcher<E>,
}

impl AppContext<FfmpegEncoder> {
    pub fn new(config: Config) -> (Self, mpsc::UnboundedReceiver<DispatchEvent>) {
        let encoder = FfmpegEncoder::new(config.converter.clone());
        Self::with_encoder(config, encoder)
    }
}

impl<E: Encoder + 'static> AppContext<E> {
    pub fn with_encoder(
        config: Config,
        encoder: E,
    ) -> (Self, mpsc::UnboundedReceiver<DispatchEvent>) {
        let supervisor = Supervisor::new(
            encoder,
            FsPlacer::new(config.placer.clone()),
            config.converter.clone(),
            config.jobs.clone(),
        );
        let (dispatcher, events) = Dispatcher::new(supervisor);
        (Self { config, dispatcher }, events)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn dispatcher(&self) -> &Dispatcher<E> {
        &self.dispatcher
    }

    /// Checks once that the encoder can run before any file is submitted.
    pub async fn preflight(&self) -> Result<(), ConverterError> {
        self.dispatcher.supervisor().encoder().check_available().await
    }
}

pub mod config;
pub mod converter;
pub mod dispatcher;
pub mod metrics;
pub mod placer;
pub mod supervisor;
pub mod testing;

pub use config::{
    load_config, load_config_from_str, load_config_or_default, validate_config, Config,
    ConfigError,
};
pub use converter::{ConverterConfig, ConverterError, Encoder, FfmpegEncoder, OutputKind};
pub use dispatcher::{DispatchError, DispatchEvent, Dispatcher, JobReport, JobSummary, SubmitOutcome};
pub use placer::{FsPlacer, PlacerConfig, PlacerError};
pub use supervisor::{
    ConversionJob, JobError, JobErrorKind, JobEvent, JobHandle, JobOutcome, JobState, Supervisor,
    SupervisorConfig,
};

use serde::{Deserialize, Serialize};

use crate::converter::ConverterConfig;
use crate::placer::PlacerConfig;
use crate::supervisor::SupervisorConfig;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Encoder binary, codecs and per-job encode behaviour.
    #[serde(default)]
    pub converter: ConverterConfig,

    /// Backup naming and output placement.
    #[serde(default)]
    pub placer: PlacerConfig,

    /// Job concurrency.
    #[serde(default)]
    pub jobs: SupervisorConfig,
}

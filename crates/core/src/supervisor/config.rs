//! Configuration for the job supervisor.

use serde::{Deserialize, Serialize};

/// Limits applied across all jobs of one supervisor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupervisorConfig {
    /// Maximum number of jobs past the `Created` state at once.
    #[serde(default = "default_max_parallel")]
    pub max_parallel: usize,
}

fn default_max_parallel() -> usize {
    4
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            max_parallel: default_max_parallel(),
        }
    }
}

impl SupervisorConfig {
    pub fn with_max_parallel(mut self, max_parallel: usize) -> Self {
        self.max_parallel = max_parallel;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        assert_eq!(SupervisorConfig::default().max_parallel, 4);
    }

    #[test]
    fn test_deserialize_empty_section() {
        let config: SupervisorConfig = toml::from_str("").unwrap();
        assert_eq!(config.max_parallel, 4);

        let config: SupervisorConfig = toml::from_str("max_parallel = 1").unwrap();
        assert_eq!(config.max_parallel, 1);
    }
}

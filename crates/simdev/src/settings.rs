//! Startup configuration

use crate::SimtempError;
use sampler::Mode;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variable prefix (`SIMTEMP_SAMPLING_MS`, ...)
pub const ENV_PREFIX: &str = "SIMTEMP";

/// Device configuration supplied at init
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimtempConfig {
    /// Sampling interval in milliseconds (must be > 0)
    pub sampling_ms: u64,

    /// Threshold in milli-degrees Celsius
    #[serde(rename = "threshold_mC", alias = "threshold_mc")]
    pub threshold_mc: i32,

    /// Initial generation mode
    pub mode: Mode,
}

impl Default for SimtempConfig {
    fn default() -> Self {
        Self {
            sampling_ms: 100,
            threshold_mc: 45_000,
            mode: Mode::Normal,
        }
    }
}

impl SimtempConfig {
    /// Load defaults, then an optional file, then `SIMTEMP_*` variables
    pub fn load(path: Option<&Path>) -> Result<Self, SimtempError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        let config: SimtempConfig = builder
            .add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Reject values the device cannot run with
    pub fn validate(&self) -> Result<(), SimtempError> {
        if self.sampling_ms == 0 {
            return Err(SimtempError::Config(
                "sampling_ms must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

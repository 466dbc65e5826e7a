//! Control Attributes
//!
//! Text key/value surface for sampling configuration and statistics.

use crate::SimtempError;
use sampler::{Mode, SensorState};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, warn};

/// One named control attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attribute {
    SamplingMs,
    ThresholdMc,
    Mode,
    Stats,
}

impl Attribute {
    /// Every attribute, in presentation order
    pub const ALL: [Attribute; 4] = [
        Attribute::SamplingMs,
        Attribute::ThresholdMc,
        Attribute::Mode,
        Attribute::Stats,
    ];

    /// Attribute name as exposed to consumers
    pub fn name(&self) -> &'static str {
        match self {
            Attribute::SamplingMs => "sampling_ms",
            Attribute::ThresholdMc => "threshold_mC",
            Attribute::Mode => "mode",
            Attribute::Stats => "stats",
        }
    }

    /// Whether the attribute accepts writes
    pub fn is_writable(&self) -> bool {
        !matches!(self, Attribute::Stats)
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Attribute {
    type Err = SimtempError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Attribute::ALL
            .into_iter()
            .find(|attr| attr.name() == s)
            .ok_or_else(|| SimtempError::UnknownAttribute(s.to_string()))
    }
}

/// Reads and writes control attributes of one device
#[derive(Debug, Clone)]
pub struct Control {
    state: Arc<SensorState>,
}

impl Control {
    pub(crate) fn new(state: Arc<SensorState>) -> Self {
        Self { state }
    }

    /// Render an attribute value, newline-terminated
    pub fn show(&self, attr: Attribute) -> String {
        let params = &self.state.params;
        match attr {
            Attribute::SamplingMs => format!("{}\n", params.interval_ms()),
            Attribute::ThresholdMc => format!("{}\n", params.threshold_mc()),
            Attribute::Mode => format!("{}\n", params.mode()),
            Attribute::Stats => self.state.counters.snapshot().to_string(),
        }
    }

    /// Parse and apply an attribute write, returning the bytes consumed
    pub fn store(&self, attr: Attribute, input: &str) -> Result<usize, SimtempError> {
        let params = &self.state.params;
        let invalid = || SimtempError::Invalid {
            attribute: attr.name(),
            value: input.to_string(),
        };

        let result = match attr {
            Attribute::SamplingMs => input
                .trim_end()
                .parse::<u64>()
                .map_err(|_| invalid())
                .and_then(|ms| params.set_interval_ms(ms).map_err(|_| invalid())),
            Attribute::ThresholdMc => input
                .trim_end()
                .parse::<i32>()
                .map(|mc| params.set_threshold_mc(mc))
                .map_err(|_| invalid()),
            Attribute::Mode => input
                .parse::<Mode>()
                .map(|mode| params.set_mode(mode))
                .map_err(|_| invalid()),
            Attribute::Stats => Err(SimtempError::ReadOnly(attr.name())),
        };

        match result {
            Ok(()) => {
                info!("{} set to {}", attr, input.trim_end());
                Ok(input.len())
            }
            Err(e) => {
                warn!("Rejected write to {}: {}", attr, e);
                Err(e)
            }
        }
    }

    /// `show` by attribute name
    pub fn read_attr(&self, name: &str) -> Result<String, SimtempError> {
        Ok(self.show(name.parse()?))
    }

    /// `store` by attribute name
    pub fn write_attr(&self, name: &str, input: &str) -> Result<usize, SimtempError> {
        self.store(name.parse()?, input)
    }
}

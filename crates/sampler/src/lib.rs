//! Simulated Temperature Sampler
//!
//! Generates synthetic readings on a periodic timer, flags threshold
//! crossings and publishes the samples into the shared ring.

mod generator;
mod params;
mod sampler;
mod state;
mod stats;

pub use generator::{
    Generator, Mode, ParseModeError, NORMAL_BASE_MC, RAMP_MAX_MC, RAMP_MIN_MC, RAMP_STEP_MC,
};
pub use params::{ParamError, SamplingParams, Snapshot};
pub use sampler::{crosses, Sampler};
pub use state::SensorState;
pub use stats::{Counters, StatsSnapshot};

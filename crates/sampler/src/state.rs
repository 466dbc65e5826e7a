//! Shared Sensor State

use crate::{Counters, Mode, ParamError, SamplingParams};
use sample_ring::{RingBuffer, WakeChannel};

/// Everything the sampler and the consumer side share.
///
/// Created once per device and handed around as `Arc<SensorState>`.
#[derive(Debug)]
pub struct SensorState {
    pub ring: RingBuffer,
    pub wake: WakeChannel,
    pub params: SamplingParams,
    pub counters: Counters,
}

impl SensorState {
    /// Create state with an empty ring and zeroed counters
    pub fn new(interval_ms: u64, threshold_mc: i32, mode: Mode) -> Result<Self, ParamError> {
        Ok(Self {
            ring: RingBuffer::new(),
            wake: WakeChannel::new(),
            params: SamplingParams::new(interval_ms, threshold_mc, mode)?,
            counters: Counters::new(),
        })
    }
}

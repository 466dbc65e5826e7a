//! Runtime-Mutable Sampling Parameters

use crate::Mode;
use std::sync::atomic::{AtomicI32, AtomicU8, Ordering};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;

/// Rejected parameter update
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParamError {
    /// Sampling interval must be at least 1 ms
    #[error("sampling interval must be greater than 0 ms")]
    ZeroInterval,
}

/// Values the sampler snapshots on every fire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    pub mode: Mode,
    pub threshold_mc: i32,
}

/// Sampling interval, threshold and mode.
///
/// Threshold and mode are plain atomics read once per sample. The interval is
/// published on a watch channel so the sampler can restart its timer as soon
/// as it changes.
#[derive(Debug)]
pub struct SamplingParams {
    interval_ms: watch::Sender<u64>,
    threshold_mc: AtomicI32,
    mode: AtomicU8,
}

impl SamplingParams {
    /// Create parameters, rejecting a zero interval
    pub fn new(interval_ms: u64, threshold_mc: i32, mode: Mode) -> Result<Self, ParamError> {
        if interval_ms == 0 {
            return Err(ParamError::ZeroInterval);
        }
        let (interval_tx, _) = watch::channel(interval_ms);
        Ok(Self {
            interval_ms: interval_tx,
            threshold_mc: AtomicI32::new(threshold_mc),
            mode: AtomicU8::new(mode.to_u8()),
        })
    }

    /// Current sampling interval in milliseconds
    pub fn interval_ms(&self) -> u64 {
        *self.interval_ms.borrow()
    }

    /// Current sampling interval
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms())
    }

    /// Set the sampling interval; the running sampler restarts its timer
    pub fn set_interval_ms(&self, interval_ms: u64) -> Result<(), ParamError> {
        if interval_ms == 0 {
            return Err(ParamError::ZeroInterval);
        }
        self.interval_ms.send_replace(interval_ms);
        Ok(())
    }

    /// Watch interval changes
    pub fn subscribe_interval(&self) -> watch::Receiver<u64> {
        self.interval_ms.subscribe()
    }

    /// Current threshold in milli-degrees Celsius
    pub fn threshold_mc(&self) -> i32 {
        self.threshold_mc.load(Ordering::Acquire)
    }

    /// Set the threshold used for subsequent samples
    pub fn set_threshold_mc(&self, threshold_mc: i32) {
        self.threshold_mc.store(threshold_mc, Ordering::Release);
    }

    /// Current generation mode
    pub fn mode(&self) -> Mode {
        Mode::from_u8(self.mode.load(Ordering::Acquire))
    }

    /// Set the mode used for subsequent samples
    pub fn set_mode(&self, mode: Mode) {
        self.mode.store(mode.to_u8(), Ordering::Release);
    }

    /// Read mode and threshold for one sample
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            mode: self.mode(),
            threshold_mc: self.threshold_mc(),
        }
    }
}

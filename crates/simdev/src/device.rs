//! Device Lifecycle

use crate::consumer::{Handle, ReadMode};
use crate::control::Control;
use crate::{SimtempConfig, SimtempError};
use sampler::{Generator, Sampler, SensorState};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::runtime;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// A running simulated temperature sensor.
///
/// `init` starts the sampler on the current tokio runtime; `shutdown` stops
/// it and closes every handle. Both the sampler task and the handles share
/// the device state through an `Arc`, there is no global instance.
pub struct Device {
    state: Arc<SensorState>,
    /// Cancels the sampler task
    stop_sampler: CancellationToken,
    /// Cancelled once the sampler has stopped; wakes blocked readers
    closed: CancellationToken,
    open_handles: Arc<AtomicUsize>,
    sampler: Option<JoinHandle<()>>,
}

impl Device {
    /// Allocate device state and start sampling
    pub fn init(config: &SimtempConfig) -> Result<Self, SimtempError> {
        Self::init_with_generator(config, Generator::new())
    }

    /// Like `init`, with an explicit generator (e.g. a seeded one)
    pub fn init_with_generator(
        config: &SimtempConfig,
        generator: Generator,
    ) -> Result<Self, SimtempError> {
        config.validate()?;
        runtime::Handle::try_current().map_err(|_| SimtempError::NoRuntime)?;

        let state = Arc::new(SensorState::new(
            config.sampling_ms,
            config.threshold_mc,
            config.mode,
        )?);
        let stop_sampler = CancellationToken::new();
        let sampler = Sampler::new(state.clone(), generator).spawn(stop_sampler.clone());

        info!(
            "simtemp ready: sampling_ms={} threshold_mC={} mode={}",
            config.sampling_ms, config.threshold_mc, config.mode
        );

        Ok(Self {
            state,
            stop_sampler,
            closed: CancellationToken::new(),
            open_handles: Arc::new(AtomicUsize::new(0)),
            sampler: Some(sampler),
        })
    }

    /// Open a consumer handle
    pub fn open(&self, mode: ReadMode) -> Handle {
        Handle::open(
            self.state.clone(),
            self.closed.clone(),
            self.open_handles.clone(),
            mode,
        )
    }

    /// Control attribute surface
    pub fn control(&self) -> Control {
        Control::new(self.state.clone())
    }

    /// Number of handles not yet dropped
    pub fn open_handles(&self) -> usize {
        self.open_handles.load(Ordering::Acquire)
    }

    /// Stop the sampler, then close the consumer side.
    ///
    /// No sample is published once this returns. Reads blocked on any handle
    /// fail with `Interrupted`.
    pub async fn shutdown(mut self) {
        let open = self.open_handles();
        if open > 0 {
            warn!("Shutting down with {} consumer handle(s) still open", open);
        }

        self.stop_sampler.cancel();
        if let Some(task) = self.sampler.take() {
            if let Err(e) = task.await {
                error!("Sampler task failed: {}", e);
            }
        }
        self.closed.cancel();

        let stats = self.state.counters.snapshot();
        info!(
            "simtemp shut down (updates={} alerts={})",
            stats.updates, stats.alerts
        );
    }
}

impl Drop for Device {
    // Dropped without `shutdown`: still stop producing and release readers
    fn drop(&mut self) {
        self.stop_sampler.cancel();
        self.closed.cancel();
    }
}

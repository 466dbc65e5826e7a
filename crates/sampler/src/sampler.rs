//! Periodic Sampler Implementation

use crate::{Generator, SensorState};
use sample_ring::Sample;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

/// Crossing rule: previous below and current at/above, or previous at/above
/// and current below.
pub fn crosses(last_mc: i32, temp_mc: i32, threshold_mc: i32) -> bool {
    (last_mc < threshold_mc && temp_mc >= threshold_mc)
        || (last_mc >= threshold_mc && temp_mc < threshold_mc)
}

/// Timer-driven producer that fills the ring
pub struct Sampler {
    state: Arc<SensorState>,
    generator: Generator,
    /// Temperature of the previous produced sample
    last_temp_mc: i32,
    /// Timestamp of the previous produced sample
    last_timestamp_ns: u64,
}

impl Sampler {
    /// Create a sampler over the shared state
    pub fn new(state: Arc<SensorState>, generator: Generator) -> Self {
        Self {
            state,
            generator,
            last_temp_mc: 0,
            last_timestamp_ns: 0,
        }
    }

    /// Produce one sample and publish it to consumers
    pub fn sample_once(&mut self) -> Sample {
        let timestamp_ns = self.next_timestamp_ns();
        let snapshot = self.state.params.snapshot();
        let temp_mc = self.generator.generate(snapshot.mode);
        let crossed = crosses(self.last_temp_mc, temp_mc, snapshot.threshold_mc);
        let sample = Sample::new(timestamp_ns, temp_mc, crossed);

        // Counters first so a consumer woken by this sample already sees it counted
        self.state.counters.record_sample(crossed);
        self.last_temp_mc = temp_mc;

        if let Some(dropped) = self.state.ring.push(sample) {
            trace!("Ring full, dropped sample ts={}", dropped.timestamp_ns);
            metrics::counter!("simtemp_ring_overwrites_total").increment(1);
        }
        self.state.wake.signal();

        if crossed {
            debug!(
                "Threshold {} mC crossed: {} mC ({:?})",
                snapshot.threshold_mc, temp_mc, snapshot.mode
            );
        } else {
            trace!("Sample {} mC ({:?})", temp_mc, snapshot.mode);
        }
        sample
    }

    // Wall clock can step backwards; records must stay strictly ordered
    fn next_timestamp_ns(&mut self) -> u64 {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0);
        self.last_timestamp_ns = now.max(self.last_timestamp_ns + 1);
        self.last_timestamp_ns
    }

    fn ticker(period: Duration) -> Interval {
        let mut ticker = time::interval_at(Instant::now() + period, period);
        // A late tick is followed by a full period, never by a burst
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker
    }

    /// Run the sampler loop until `shutdown` is cancelled
    pub async fn run(mut self, mut interval_ms: watch::Receiver<u64>, shutdown: CancellationToken) {
        let mut period = Duration::from_millis(*interval_ms.borrow_and_update());
        let mut ticker = Self::ticker(period);
        info!("Starting sampler with {:?} interval", period);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                changed = interval_ms.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    period = Duration::from_millis(*interval_ms.borrow_and_update());
                    ticker = Self::ticker(period);
                    info!("Sampling interval set to {:?}, timer restarted", period);
                }
                _ = ticker.tick() => {
                    self.sample_once();
                }
            }
        }

        info!(
            "Sampler stopped after {} samples",
            self.state.counters.updates()
        );
    }

    /// Spawn the sampler on the current tokio runtime
    pub fn spawn(self, shutdown: CancellationToken) -> JoinHandle<()> {
        let interval_ms = self.state.params.subscribe_interval();
        tokio::spawn(self.run(interval_ms, shutdown))
    }
}

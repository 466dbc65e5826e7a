//! Consumer Handles
//!
//! Byte-stream view of the ring. Handles carry no cursor: every handle drains
//! the same ring, and each record is delivered to exactly one reader.

use crate::SimtempError;
use bitflags::bitflags;
use sample_ring::{Registration, Sample, SAMPLE_SIZE};
use sampler::SensorState;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Blocking behaviour of `read` on an empty ring
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadMode {
    /// Wait for the next sample
    #[default]
    Blocking,
    /// Fail with `WouldBlock`
    NonBlocking,
}

bitflags! {
    /// Readiness reported by `poll`
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Readiness: u8 {
        /// At least one record can be read
        const READABLE = 1 << 0;
        /// An unread record carries THRESHOLD_CROSSED
        const PRIORITY = 1 << 1;
        /// The device has shut down
        const HANGUP = 1 << 2;
    }
}

/// Interrupts reads currently blocked on one handle.
///
/// The interruption is not sticky: only reads already waiting when
/// `interrupt` is called are woken. A read that starts afterwards waits for
/// the next sample as usual.
#[derive(Debug, Clone)]
pub struct Interrupter {
    notify: Arc<Notify>,
}

impl Interrupter {
    /// Wake every blocked read on the handle with `Interrupted`
    pub fn interrupt(&self) {
        self.notify.notify_waiters();
    }
}

/// Result of `Handle::poll`: current readiness plus a registration that
/// completes on the next published sample.
pub struct PollEvents<'a> {
    readiness: Readiness,
    registration: Registration<'a>,
}

impl PollEvents<'_> {
    /// Readiness at the time of the poll
    pub fn readiness(&self) -> Readiness {
        self.readiness
    }

    /// Wait for the next sample to be published
    pub async fn changed(self) {
        self.registration.wait().await
    }
}

/// An open consumer of the sample stream
pub struct Handle {
    state: Arc<SensorState>,
    closed: CancellationToken,
    interrupt: Arc<Notify>,
    open_handles: Arc<AtomicUsize>,
    mode: ReadMode,
}

impl Handle {
    pub(crate) fn open(
        state: Arc<SensorState>,
        closed: CancellationToken,
        open_handles: Arc<AtomicUsize>,
        mode: ReadMode,
    ) -> Self {
        let count = open_handles.fetch_add(1, Ordering::AcqRel) + 1;
        debug!("Consumer handle opened ({:?}, {} open)", mode, count);
        Self {
            state,
            closed,
            interrupt: Arc::new(Notify::new()),
            open_handles,
            mode,
        }
    }

    /// Current read mode
    pub fn read_mode(&self) -> ReadMode {
        self.mode
    }

    /// Switch between blocking and non-blocking reads
    pub fn set_read_mode(&mut self, mode: ReadMode) {
        self.mode = mode;
    }

    /// Interrupter for reads blocked on this handle
    pub fn interrupter(&self) -> Interrupter {
        Interrupter {
            notify: self.interrupt.clone(),
        }
    }

    /// Read exactly one record into `buf`.
    ///
    /// `buf` must hold at least SAMPLE_SIZE bytes; returns SAMPLE_SIZE.
    pub async fn read(&self, buf: &mut [u8]) -> Result<usize, SimtempError> {
        let count = buf.len();
        let mut dst = buf;
        self.read_to(&mut dst, count).await
    }

    /// Read one record and copy it to `out`, a destination offering `count`
    /// bytes.
    ///
    /// If writing to `out` fails the record is still consumed.
    pub async fn read_to<W: Write>(&self, out: &mut W, count: usize) -> Result<usize, SimtempError> {
        if count < SAMPLE_SIZE {
            return Err(SimtempError::InvalidSize(count));
        }

        let sample = self.next_sample().await?;
        out.write_all(&sample.to_bytes()).map_err(|e| {
            warn!("Sample ts={} lost: copy to consumer failed", sample.timestamp_ns);
            SimtempError::Fault(e)
        })?;
        Ok(SAMPLE_SIZE)
    }

    /// Read one record and decode it
    pub async fn read_sample(&self) -> Result<Sample, SimtempError> {
        let mut buf = [0u8; SAMPLE_SIZE];
        self.read(&mut buf).await?;
        Sample::from_bytes(&buf).map_err(|e| SimtempError::Fault(std::io::Error::other(e)))
    }

    async fn next_sample(&self) -> Result<Sample, SimtempError> {
        if self.closed.is_cancelled() {
            return Err(SimtempError::Interrupted);
        }

        let ring = &self.state.ring;
        match self.mode {
            ReadMode::NonBlocking => ring.pop().ok_or(SimtempError::WouldBlock),
            ReadMode::Blocking => {
                let interrupted = async {
                    tokio::select! {
                        _ = self.closed.cancelled() => {}
                        _ = self.interrupt.notified() => {}
                    }
                };
                Ok(self.state.wake.wait(|| ring.pop(), interrupted).await?)
            }
        }
    }

    /// Register for the next sample, then report current readiness
    pub fn poll(&self) -> PollEvents<'_> {
        let registration = self.state.wake.register();
        PollEvents {
            readiness: self.readiness(),
            registration,
        }
    }

    /// Wait until the handle is readable or the device has shut down
    pub async fn ready(&self) -> Readiness {
        loop {
            let events = self.poll();
            let readiness = events.readiness();
            if readiness.intersects(Readiness::READABLE | Readiness::HANGUP) {
                return readiness;
            }
            tokio::select! {
                _ = events.changed() => {}
                _ = self.closed.cancelled() => {}
            }
        }
    }

    fn readiness(&self) -> Readiness {
        if self.closed.is_cancelled() {
            return Readiness::HANGUP;
        }

        let mut readiness = Readiness::empty();
        if !self.state.ring.is_empty() {
            readiness |= Readiness::READABLE;
        }
        if self.state.ring.has_crossing() {
            readiness |= Readiness::PRIORITY;
        }
        readiness
    }

    /// Device control request; no operations are defined
    pub fn control(&self, op: u32, _arg: u64) -> Result<u64, SimtempError> {
        debug!("Rejecting control op {:#x}", op);
        Err(SimtempError::UnsupportedOp(op))
    }
}

impl Drop for Handle {
    fn drop(&mut self) {
        let remaining = self.open_handles.fetch_sub(1, Ordering::AcqRel) - 1;
        debug!("Consumer handle closed ({} open)", remaining);
    }
}

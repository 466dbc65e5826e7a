//! Bounded Sample Ring Implementation

use crate::Sample;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Number of records the ring retains
pub const CAPACITY: usize = 64;

/// One slot is kept free so that `head == tail` always means empty
const SLOTS: usize = CAPACITY + 1;

/// Fixed-capacity FIFO of samples with overwrite-oldest-on-full.
///
/// Single producer, any number of consumers. Head, tail and the slot being
/// copied are all covered by one mutex, held for a single record copy.
pub struct RingBuffer {
    inner: Mutex<Slots>,
    /// Total samples pushed (for statistics)
    total_written: AtomicU64,
    /// Samples dropped unread because the ring was full
    overwritten: AtomicU64,
}

struct Slots {
    storage: [Sample; SLOTS],
    /// Next write slot
    head: usize,
    /// Next read slot
    tail: usize,
    /// Unread records carrying THRESHOLD_CROSSED
    pending_crossings: usize,
}

impl Slots {
    fn len(&self) -> usize {
        (self.head + SLOTS - self.tail) % SLOTS
    }
}

impl RingBuffer {
    /// Create an empty ring
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Slots {
                storage: [Sample::default(); SLOTS],
                head: 0,
                tail: 0,
                pending_crossings: 0,
            }),
            total_written: AtomicU64::new(0),
            overwritten: AtomicU64::new(0),
        }
    }

    // Slots only hold Copy records, a panicking holder cannot leave them torn
    fn lock(&self) -> MutexGuard<'_, Slots> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Push a sample, overwriting the oldest one if the ring is full.
    ///
    /// Returns the record that was dropped to make room, if any.
    pub fn push(&self, sample: Sample) -> Option<Sample> {
        let evicted = {
            let mut slots = self.lock();
            let head = slots.head;
            slots.storage[head] = sample;
            slots.head = (head + 1) % SLOTS;
            if sample.is_crossing() {
                slots.pending_crossings += 1;
            }

            if slots.head == slots.tail {
                let tail = slots.tail;
                let dropped = slots.storage[tail];
                slots.tail = (tail + 1) % SLOTS;
                if dropped.is_crossing() {
                    slots.pending_crossings -= 1;
                }
                Some(dropped)
            } else {
                None
            }
        };

        self.total_written.fetch_add(1, Ordering::Relaxed);
        if evicted.is_some() {
            self.overwritten.fetch_add(1, Ordering::Relaxed);
        }
        evicted
    }

    /// Pop the oldest sample
    pub fn pop(&self) -> Option<Sample> {
        let mut slots = self.lock();
        if slots.head == slots.tail {
            return None;
        }

        let tail = slots.tail;
        let sample = slots.storage[tail];
        slots.tail = (tail + 1) % SLOTS;
        if sample.is_crossing() {
            slots.pending_crossings -= 1;
        }
        Some(sample)
    }

    /// Number of unread samples
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Check if the ring is empty
    pub fn is_empty(&self) -> bool {
        let slots = self.lock();
        slots.head == slots.tail
    }

    /// Whether an unread sample carries THRESHOLD_CROSSED
    pub fn has_crossing(&self) -> bool {
        self.lock().pending_crossings > 0
    }

    /// Maximum number of retained samples
    pub fn capacity(&self) -> usize {
        CAPACITY
    }

    /// Total samples pushed since creation
    pub fn total_written(&self) -> u64 {
        self.total_written.load(Ordering::Relaxed)
    }

    /// Samples dropped by overwrite-on-full
    pub fn overwritten(&self) -> u64 {
        self.overwritten.load(Ordering::Relaxed)
    }
}

impl fmt::Debug for RingBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RingBuffer")
            .field("len", &self.len())
            .field("total_written", &self.total_written())
            .field("overwritten", &self.overwritten())
            .finish()
    }
}

impl Default for RingBuffer {
    fn default() -> Self {
        Self::new()
    }
}

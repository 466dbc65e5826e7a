//! Sample Ring
//!
//! Stable 16-byte sample record, the bounded ring that stores records between
//! the sampler and its consumers, and the wake-up channel consumers block on.

mod buffer;
mod record;
mod wake;

pub use buffer::{RingBuffer, CAPACITY};
pub use record::{RecordError, Sample, SampleFlags, SAMPLE_SIZE};
pub use wake::{Interrupted, Registration, WakeChannel};

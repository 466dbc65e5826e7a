//! Simulated Temperature Device
//!
//! Ties the sampler, the ring and the wake-up channel together into a device
//! with consumer handles (blocking/non-blocking reads of 16-byte records,
//! readiness polling) and a text control surface.

mod consumer;
mod control;
mod device;
mod error;
mod settings;

#[cfg(test)]
mod scenarios;

pub use consumer::{Handle, Interrupter, PollEvents, ReadMode, Readiness};
pub use control::{Attribute, Control};
pub use device::Device;
pub use error::SimtempError;
pub use settings::{SimtempConfig, ENV_PREFIX};

pub use sample_ring::{Sample, SampleFlags, CAPACITY, SAMPLE_SIZE};
pub use sampler::{Generator, Mode, StatsSnapshot};

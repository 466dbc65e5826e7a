//! Device Error Types

use sample_ring::{Interrupted, SAMPLE_SIZE};
use sampler::ParamError;
use thiserror::Error;

/// Errors surfaced by the device, its handles and its control surface
#[derive(Debug, Error)]
pub enum SimtempError {
    /// Read buffer cannot hold one record
    #[error("read of {0} bytes is smaller than one {SAMPLE_SIZE}-byte sample")]
    InvalidSize(usize),

    /// Non-blocking read on an empty ring
    #[error("no sample available")]
    WouldBlock,

    /// Blocking read interrupted or device shut down
    #[error("wait for a sample was interrupted")]
    Interrupted,

    /// Copying the record to the consumer failed; the record is consumed
    #[error("failed to copy sample to consumer: {0}")]
    Fault(#[source] std::io::Error),

    /// Unknown control operation on a stream handle
    #[error("control operation {0:#x} is not supported")]
    UnsupportedOp(u32),

    /// Unparseable or out-of-range attribute value
    #[error("invalid value {value:?} for {attribute}")]
    Invalid {
        attribute: &'static str,
        value: String,
    },

    /// Write to a read-only attribute
    #[error("attribute {0} is read-only")]
    ReadOnly(&'static str),

    /// Attribute name not exposed by the device
    #[error("no such attribute: {0}")]
    UnknownAttribute(String),

    /// Startup configuration could not be loaded or validated
    #[error("configuration error: {0}")]
    Config(String),

    /// `Device::init` called outside a tokio runtime
    #[error("no tokio runtime available to drive the sampler")]
    NoRuntime,
}

impl SimtempError {
    /// Closest POSIX errno for this error
    pub fn errno(&self) -> i32 {
        match self {
            SimtempError::InvalidSize(_) => libc::EINVAL,
            SimtempError::WouldBlock => libc::EAGAIN,
            SimtempError::Interrupted => libc::EINTR,
            SimtempError::Fault(_) => libc::EFAULT,
            SimtempError::UnsupportedOp(_) => libc::ENOTTY,
            SimtempError::Invalid { .. } => libc::EINVAL,
            SimtempError::ReadOnly(_) => libc::EACCES,
            SimtempError::UnknownAttribute(_) => libc::ENOENT,
            SimtempError::Config(_) => libc::EINVAL,
            SimtempError::NoRuntime => libc::ENODEV,
        }
    }
}

impl From<Interrupted> for SimtempError {
    fn from(_: Interrupted) -> Self {
        SimtempError::Interrupted
    }
}

impl From<config::ConfigError> for SimtempError {
    fn from(err: config::ConfigError) -> Self {
        SimtempError::Config(err.to_string())
    }
}

impl From<ParamError> for SimtempError {
    fn from(err: ParamError) -> Self {
        SimtempError::Config(err.to_string())
    }
}

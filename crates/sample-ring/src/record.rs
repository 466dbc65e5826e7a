//! Sample Record Wire Format

use bitflags::bitflags;
use thiserror::Error;

/// Size of one encoded sample in bytes
pub const SAMPLE_SIZE: usize = 16;

bitflags! {
    /// Flag bits carried in every sample
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct SampleFlags: u32 {
        /// Set on every produced sample
        const NEW_SAMPLE = 1 << 0;
        /// Sample lies on the other side of the threshold from its predecessor
        const THRESHOLD_CROSSED = 1 << 1;
    }
}

/// Errors decoding a sample record
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    /// Fewer than SAMPLE_SIZE bytes supplied
    #[error("sample record needs {SAMPLE_SIZE} bytes, got {0}")]
    Truncated(usize),
}

/// One temperature reading.
///
/// Encoded as `timestamp_ns: u64`, `temp_mC: i32`, `flags: u32`, packed and
/// little-endian. The layout is a stable ABI shared with every consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Sample {
    /// Nanoseconds since the UNIX epoch
    pub timestamp_ns: u64,
    /// Temperature in milli-degrees Celsius
    pub temp_mc: i32,
    /// Flag bits
    pub flags: SampleFlags,
}

impl Sample {
    /// Create a freshly produced sample (NEW_SAMPLE set)
    pub fn new(timestamp_ns: u64, temp_mc: i32, crossed: bool) -> Self {
        let mut flags = SampleFlags::NEW_SAMPLE;
        flags.set(SampleFlags::THRESHOLD_CROSSED, crossed);
        Self {
            timestamp_ns,
            temp_mc,
            flags,
        }
    }

    /// Whether this sample crossed the threshold
    pub fn is_crossing(&self) -> bool {
        self.flags.contains(SampleFlags::THRESHOLD_CROSSED)
    }

    /// Encode into the 16-byte wire record
    pub fn to_bytes(&self) -> [u8; SAMPLE_SIZE] {
        let mut out = [0u8; SAMPLE_SIZE];
        out[0..8].copy_from_slice(&self.timestamp_ns.to_le_bytes());
        out[8..12].copy_from_slice(&self.temp_mc.to_le_bytes());
        out[12..16].copy_from_slice(&self.flags.bits().to_le_bytes());
        out
    }

    /// Decode the first SAMPLE_SIZE bytes of `bytes`
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, RecordError> {
        let record: &[u8; SAMPLE_SIZE] = bytes
            .get(..SAMPLE_SIZE)
            .and_then(|b| b.try_into().ok())
            .ok_or(RecordError::Truncated(bytes.len()))?;

        let mut ts = [0u8; 8];
        let mut temp = [0u8; 4];
        let mut flags = [0u8; 4];
        ts.copy_from_slice(&record[0..8]);
        temp.copy_from_slice(&record[8..12]);
        flags.copy_from_slice(&record[12..16]);

        Ok(Self {
            timestamp_ns: u64::from_le_bytes(ts),
            temp_mc: i32::from_le_bytes(temp),
            // Unknown bits are kept so a record survives re-encoding unchanged
            flags: SampleFlags::from_bits_retain(u32::from_le_bytes(flags)),
        })
    }
}

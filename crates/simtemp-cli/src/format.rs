//! Sample Formatting

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use simdev::Sample;

/// JSON line emitted with `--json`
#[derive(Debug, Serialize)]
pub struct SampleLine {
    pub timestamp: String,
    pub timestamp_ns: u64,
    pub temp_c: f64,
    pub temp_mc: i32,
    pub flags: u32,
    pub alert: bool,
}

/// ISO-8601 UTC with millisecond precision, `Z` suffix
pub fn iso_timestamp(timestamp_ns: u64) -> String {
    let secs = (timestamp_ns / 1_000_000_000) as i64;
    let nanos = (timestamp_ns % 1_000_000_000) as u32;
    DateTime::<Utc>::from_timestamp(secs, nanos)
        .unwrap_or_default()
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// `2026-01-01T00:00:00.000Z temp=44.123C alert=0`
pub fn text_line(sample: &Sample) -> String {
    format!(
        "{} temp={:.3}C alert={}",
        iso_timestamp(sample.timestamp_ns),
        sample.temp_mc as f64 / 1000.0,
        u8::from(sample.is_crossing())
    )
}

pub fn json_line(sample: &Sample) -> serde_json::Result<String> {
    serde_json::to_string(&SampleLine {
        timestamp: iso_timestamp(sample.timestamp_ns),
        timestamp_ns: sample.timestamp_ns,
        temp_c: sample.temp_mc as f64 / 1000.0,
        temp_mc: sample.temp_mc,
        flags: sample.flags.bits(),
        alert: sample.is_crossing(),
    })
}

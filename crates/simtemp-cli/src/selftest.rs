//! Threshold Alert Self-Test
//!
//! Reads a baseline, switches to noisy mode with the threshold just above
//! the baseline and expects the next sample to carry THRESHOLD_CROSSED.

use simdev::{Attribute, Device, ReadMode, Readiness};
use std::time::Duration;
use tracing::{info, warn};

/// Self-test passed
pub const EXIT_OK: i32 = 0;
/// Baseline sample could not be read
pub const EXIT_BASELINE: i32 = 3;
/// Threshold could not be written
pub const EXIT_THRESHOLD: i32 = 4;
/// Read failed while waiting for the alert
pub const EXIT_READ: i32 = 5;
/// No alert observed in time
pub const EXIT_NO_ALERT: i32 = 10;

/// Run the self-test against a running device, returning the exit code
pub async fn run(device: &Device) -> i32 {
    let control = device.control();
    let sampling_ms: u64 = control
        .read_attr(Attribute::SamplingMs.name())
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(100);

    println!("reading baseline sample...");
    let baseline = match device.open(ReadMode::Blocking).read_sample().await {
        Ok(sample) => sample,
        Err(e) => {
            eprintln!("failed to read baseline sample: {e}");
            return EXIT_BASELINE;
        }
    };
    println!("baseline temp {} mC", baseline.temp_mc);

    if let Err(e) = control.store(Attribute::Mode, "noisy") {
        warn!("failed to set mode: {}", e);
    }

    let threshold = baseline.temp_mc + 1;
    if let Err(e) = control.store(Attribute::ThresholdMc, &threshold.to_string()) {
        eprintln!("failed to set threshold: {e}");
        return EXIT_THRESHOLD;
    }
    println!("temporary threshold set to {threshold} mC");

    let timeout = Duration::from_millis(10 * sampling_ms);
    println!("waiting up to {} ms for an alert...", timeout.as_millis());

    let handle = device.open(ReadMode::NonBlocking);
    let readiness = match tokio::time::timeout(timeout, handle.ready()).await {
        Ok(readiness) => readiness,
        Err(_) => {
            println!("TEST: timeout waiting for sample");
            println!("TEST: FAILED (no alert)");
            return EXIT_NO_ALERT;
        }
    };
    if readiness.contains(Readiness::HANGUP) {
        eprintln!("read error during test: device closed");
        return EXIT_READ;
    }

    match handle.read_sample().await {
        Ok(sample) if sample.is_crossing() => {
            info!("Alert observed at {} mC", sample.temp_mc);
            println!("TEST: alert observed - success");
            EXIT_OK
        }
        Ok(_) => {
            println!("TEST: sample received but no alert flag set");
            println!("TEST: FAILED (no alert)");
            EXIT_NO_ALERT
        }
        Err(e) => {
            eprintln!("read error during test: {e}");
            EXIT_READ
        }
    }
}

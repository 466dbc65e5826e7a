//! End-to-end device behaviour on a paused clock

use crate::{Device, Generator, Mode, ReadMode, Readiness, SimtempConfig, SimtempError};
use sample_ring::{Sample, SampleFlags, CAPACITY, SAMPLE_SIZE};
use std::collections::HashSet;
use std::io;
use std::time::Duration;
use tokio::time::{self, Instant};

fn device(sampling_ms: u64, threshold_mc: i32, mode: Mode) -> Device {
    let config = SimtempConfig {
        sampling_ms,
        threshold_mc,
        mode,
    };
    Device::init_with_generator(&config, Generator::seeded(7)).unwrap()
}

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

/// Value of the n-th (1-based) RAMP sample before any wrap
fn ramp(n: i32) -> i32 {
    30_000 + 100 * n
}

#[tokio::test(start_paused = true)]
async fn s1_normal_mode_drain() {
    let device = device(100, 45_000, Mode::Normal);
    let handle = device.open(ReadMode::NonBlocking);

    time::sleep(ms(350)).await;

    let mut samples = Vec::new();
    loop {
        match handle.read_sample().await {
            Ok(sample) => samples.push(sample),
            Err(SimtempError::WouldBlock) => break,
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    assert_eq!(samples.len(), 3);
    for sample in &samples {
        assert!((43_750..=44_249).contains(&sample.temp_mc));
        assert_eq!(sample.flags, SampleFlags::NEW_SAMPLE);
    }

    let stats = device.control().read_attr("stats").unwrap();
    assert_eq!(stats, "updates=3 alerts=0 last_error=0\n");
    drop(handle);
    device.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn s2_fast_drain_one_second() {
    let device = device(10, 45_000, Mode::Normal);
    let handle = device.open(ReadMode::Blocking);

    let deadline = Instant::now() + ms(1000);
    let mut samples = Vec::new();
    while let Ok(result) = time::timeout_at(deadline, handle.read_sample()).await {
        samples.push(result.unwrap());
    }

    // floor(T / interval) +- 1
    assert!((99..=101).contains(&samples.len()), "{}", samples.len());
    assert!(samples.windows(2).all(|w| w[0].timestamp_ns < w[1].timestamp_ns));
    let stats = device.control().show(crate::Attribute::Stats);
    let updates: usize = stats
        .strip_prefix("updates=")
        .and_then(|rest| rest.split_whitespace().next())
        .and_then(|n| n.parse().ok())
        .unwrap();
    assert!(updates >= samples.len() && updates >= 90);
    drop(handle);
    device.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn s3_ramp_sequence() {
    let device = device(100, 45_000, Mode::Normal);
    device.control().write_attr("mode", "ramp").unwrap();
    let handle = device.open(ReadMode::Blocking);

    let mut temps = Vec::new();
    for _ in 0..CAPACITY + 1 {
        temps.push(handle.read_sample().await.unwrap().temp_mc);
    }

    assert_eq!(temps[0], 30_100);
    for w in temps.windows(2) {
        assert!(w[1] - w[0] == 100 || (w[0] == 80_000 && w[1] == 30_100));
    }
    drop(handle);
    device.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn s4_idle_consumer_sees_latest_capacity() {
    let device = device(10, 45_000, Mode::Ramp);
    let handle = device.open(ReadMode::NonBlocking);

    // 128 samples produced, the first 64 overwritten
    time::sleep(ms(10 * 2 * CAPACITY as u64 + 5)).await;

    let mut samples = Vec::new();
    for _ in 0..CAPACITY {
        samples.push(handle.read_sample().await.unwrap());
    }
    assert!(matches!(
        handle.read_sample().await,
        Err(SimtempError::WouldBlock)
    ));

    let temps: Vec<i32> = samples.iter().map(|s| s.temp_mc).collect();
    let expected: Vec<i32> = (CAPACITY as i32 + 1..=2 * CAPACITY as i32).map(ramp).collect();
    assert_eq!(temps, expected);
    assert!(samples.windows(2).all(|w| w[0].timestamp_ns < w[1].timestamp_ns));
    drop(handle);
    device.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn s5_zero_interval_rejected() {
    let device = device(100, 45_000, Mode::Normal);
    let control = device.control();

    let err = control.write_attr("sampling_ms", "0").unwrap_err();
    assert!(matches!(err, SimtempError::Invalid { .. }));
    assert_eq!(err.errno(), libc::EINVAL);
    assert_eq!(control.read_attr("sampling_ms").unwrap(), "100\n");

    time::sleep(ms(350)).await;
    assert!(control.read_attr("stats").unwrap().starts_with("updates=3 "));
    device.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn s6_ramp_crossings() {
    let device = device(1, 50_000, Mode::Ramp);
    let handle = device.open(ReadMode::Blocking);

    let mut crossings = Vec::new();
    for i in 0..510 {
        let sample = handle.read_sample().await.unwrap();
        if sample.is_crossing() {
            crossings.push((i, sample.temp_mc));
        }
    }

    // Once reaching 50_000, once on the wrap back to 30_100
    assert_eq!(crossings, vec![(199, 50_000), (500, 30_100)]);
    assert_eq!(
        device.control().read_attr("stats").unwrap(),
        "updates=510 alerts=2 last_error=0\n"
    );
    drop(handle);
    device.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_blocking_read_returns_next_sample() {
    let device = device(100, 45_000, Mode::Ramp);
    let handle = device.open(ReadMode::Blocking);

    let start = Instant::now();
    let sample = handle.read_sample().await.unwrap();
    assert_eq!(start.elapsed(), ms(100));
    assert_eq!(sample.temp_mc, ramp(1));
    drop(handle);
    device.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_nonblocking_empty_consumes_nothing() {
    let device = device(100, 45_000, Mode::Ramp);
    let mut handle = device.open(ReadMode::NonBlocking);

    let mut buf = [0u8; SAMPLE_SIZE];
    let err = handle.read(&mut buf).await.unwrap_err();
    assert!(matches!(err, SimtempError::WouldBlock));
    assert_eq!(err.errno(), libc::EAGAIN);

    handle.set_read_mode(ReadMode::Blocking);
    assert_eq!(handle.read_sample().await.unwrap().temp_mc, ramp(1));
    drop(handle);
    device.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_read_delivers_wire_record() {
    let device = device(100, 30_000, Mode::Ramp);
    let handle = device.open(ReadMode::Blocking);

    let mut buf = [0u8; 64];
    assert_eq!(handle.read(&mut buf).await.unwrap(), SAMPLE_SIZE);

    let temp = i32::from_le_bytes([buf[8], buf[9], buf[10], buf[11]]);
    let flags = u32::from_le_bytes([buf[12], buf[13], buf[14], buf[15]]);
    assert_eq!(temp, 30_100);
    // 0 -> 30_100 reaches the 30_000 threshold
    assert_eq!(flags, 0b11);
    assert!(buf[SAMPLE_SIZE..].iter().all(|&b| b == 0), "partial records are never written");
    drop(handle);
    device.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_short_read_rejected() {
    let device = device(100, 45_000, Mode::Ramp);
    let handle = device.open(ReadMode::NonBlocking);
    time::sleep(ms(150)).await;

    let mut small = [0u8; SAMPLE_SIZE - 1];
    assert!(matches!(
        handle.read(&mut small).await,
        Err(SimtempError::InvalidSize(15))
    ));
    // Record still there
    assert_eq!(handle.read_sample().await.unwrap().temp_mc, ramp(1));
    drop(handle);
    device.shutdown().await;
}

struct BrokenSink;

impl io::Write for BrokenSink {
    fn write(&mut self, _: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::Other, "bad address"))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[tokio::test(start_paused = true)]
async fn test_fault_consumes_record() {
    let device = device(100, 45_000, Mode::Ramp);
    let handle = device.open(ReadMode::NonBlocking);
    time::sleep(ms(250)).await;

    let err = handle.read_to(&mut BrokenSink, SAMPLE_SIZE).await.unwrap_err();
    assert!(matches!(err, SimtempError::Fault(_)));
    assert_eq!(err.errno(), libc::EFAULT);

    assert_eq!(handle.read_sample().await.unwrap().temp_mc, ramp(2));
    drop(handle);
    device.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_interval_change_timing() {
    let device = device(100, 45_000, Mode::Ramp);
    let handle = device.open(ReadMode::Blocking);

    time::sleep(ms(250)).await;
    device.control().write_attr("sampling_ms", "500\n").unwrap();
    let written = Instant::now();

    // Records from before the write are untouched
    assert_eq!(handle.read_sample().await.unwrap().temp_mc, ramp(1));
    assert_eq!(handle.read_sample().await.unwrap().temp_mc, ramp(2));
    assert_eq!(written.elapsed(), Duration::ZERO);

    let next = handle.read_sample().await.unwrap();
    assert_eq!(next.temp_mc, ramp(3));
    let waited = written.elapsed();
    assert!(waited >= ms(500) && waited <= ms(501), "{waited:?}");
    drop(handle);
    device.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_interrupted_read_consumes_nothing() {
    let device = device(10_000, 45_000, Mode::Ramp);
    let handle = device.open(ReadMode::Blocking);
    let interrupter = handle.interrupter();

    let reader = tokio::spawn(async move {
        let result = handle.read_sample().await;
        (handle, result)
    });
    time::sleep(ms(1)).await;
    interrupter.interrupt();

    let (handle, result) = reader.await.unwrap();
    let err = result.unwrap_err();
    assert!(matches!(err, SimtempError::Interrupted));
    assert_eq!(err.errno(), libc::EINTR);

    // The wait is re-armable and still sees the first sample
    assert_eq!(handle.read_sample().await.unwrap().temp_mc, ramp(1));
    drop(handle);
    device.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_interrupt_before_read_is_not_sticky() {
    let device = device(100, 45_000, Mode::Ramp);
    let handle = device.open(ReadMode::Blocking);

    handle.interrupter().interrupt();

    let sample = handle.read_sample().await.unwrap();
    assert_eq!(sample.temp_mc, ramp(1));
    drop(handle);
    device.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_interrupts_blocked_readers() {
    let device = device(10_000, 45_000, Mode::Normal);
    let blocked = device.open(ReadMode::Blocking);
    let observer = device.open(ReadMode::NonBlocking);

    let reader = tokio::spawn(async move { blocked.read_sample().await });
    time::sleep(ms(1)).await;

    device.shutdown().await;
    assert!(matches!(
        reader.await.unwrap(),
        Err(SimtempError::Interrupted)
    ));

    assert_eq!(observer.poll().readiness(), Readiness::HANGUP);
    assert_eq!(observer.ready().await, Readiness::HANGUP);
    assert!(matches!(
        observer.read_sample().await,
        Err(SimtempError::Interrupted)
    ));
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_readers_get_distinct_records() {
    let device = device(1, 45_000, Mode::Ramp);

    let readers: Vec<_> = (0..2)
        .map(|_| {
            let handle = device.open(ReadMode::Blocking);
            tokio::spawn(async move {
                let mut temps = Vec::new();
                for _ in 0..100 {
                    temps.push(handle.read_sample().await.unwrap().temp_mc);
                }
                temps
            })
        })
        .collect();

    let mut seen = HashSet::new();
    for reader in readers {
        let temps = reader.await.unwrap();
        // Each reader observes insertion order
        assert!(temps.windows(2).all(|w| w[0] < w[1]));
        for t in temps {
            assert!(seen.insert(t), "{t} delivered twice");
        }
    }
    assert_eq!(seen.len(), 200);
    device.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_poll_readiness_classes() {
    let device = device(100, 30_150, Mode::Ramp);
    let handle = device.open(ReadMode::NonBlocking);

    let events = handle.poll();
    assert_eq!(events.readiness(), Readiness::empty());
    // Registration completes on the first sample (30_100, below threshold)
    events.changed().await;
    assert_eq!(handle.poll().readiness(), Readiness::READABLE);

    // 30_200 crosses 30_150
    time::sleep(ms(150)).await;
    assert_eq!(
        handle.poll().readiness(),
        Readiness::READABLE | Readiness::PRIORITY
    );

    assert!(!handle.read_sample().await.unwrap().is_crossing());
    assert_eq!(
        handle.poll().readiness(),
        Readiness::READABLE | Readiness::PRIORITY
    );
    assert!(handle.read_sample().await.unwrap().is_crossing());
    assert_eq!(handle.poll().readiness(), Readiness::empty());

    assert_eq!(handle.ready().await, Readiness::READABLE);
    drop(handle);
    device.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_control_op_unsupported() {
    let device = device(100, 45_000, Mode::Normal);
    let handle = device.open(ReadMode::Blocking);

    let err = handle.control(0x5401, 0).unwrap_err();
    assert!(matches!(err, SimtempError::UnsupportedOp(0x5401)));
    assert_eq!(err.errno(), libc::ENOTTY);
    drop(handle);
    device.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_counters_monotonic_and_bounded() {
    let device = device(5, 44_000, Mode::Noisy);
    let control = device.control();
    let handle = device.open(ReadMode::NonBlocking);

    let mut last = (0u64, 0u64);
    for _ in 0..50 {
        time::sleep(ms(7)).await;
        while handle.read_sample().await.is_ok() {}

        let stats = control.read_attr("stats").unwrap();
        let fields: Vec<u64> = stats
            .split_whitespace()
            .map(|kv| kv.split_once('=').unwrap().1.parse().unwrap())
            .collect();
        let (updates, alerts) = (fields[0], fields[1]);
        assert!(alerts <= updates);
        assert!(updates >= last.0 && alerts >= last.1);
        last = (updates, alerts);
    }
    assert!(last.1 > 0, "noisy samples around the threshold should cross");
    drop(handle);
    device.shutdown().await;
}

#[test]
fn test_sample_decode_matches_flags() {
    let bytes = Sample::new(1, 2, true).to_bytes();
    let decoded = Sample::from_bytes(&bytes).unwrap();
    assert!(decoded.flags.contains(SampleFlags::NEW_SAMPLE | SampleFlags::THRESHOLD_CROSSED));
}

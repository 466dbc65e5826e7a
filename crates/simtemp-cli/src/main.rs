//! simtemp - Command-line consumer for the simulated temperature device

mod format;
mod selftest;

use anyhow::{Context, Result};
use clap::{App, Arg, ArgMatches};
use simdev::{Attribute, Device, ReadMode, Readiness, SimtempConfig, SimtempError};
use std::path::Path;
use std::process;
use std::time::Duration;
use tracing::{debug, info, Level};
use tracing_subscriber::FmtSubscriber;

const CONFIG_ARG: &str = "config";
const SAMPLING_ARG: &str = "sampling-ms";
const THRESHOLD_ARG: &str = "threshold-mC";
const MODE_ARG: &str = "mode";
const COUNT_ARG: &str = "count";
const NONBLOCK_ARG: &str = "nonblock";
const TIMEOUT_ARG: &str = "timeout-ms";
const TEST_ARG: &str = "test";
const SHOW_ARG: &str = "show-attrs";
const JSON_ARG: &str = "json";
const VERBOSE_ARG: &str = "verbose";
const LOG_JSON_ARG: &str = "log-json";

/// Exit code when a configuration write fails
const EXIT_CONFIG: i32 = 3;

fn get_matches() -> ArgMatches<'static> {
    App::new("simtemp")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Read and configure the simulated temperature sensor")
        .arg(
            Arg::with_name(CONFIG_ARG)
                .long(CONFIG_ARG)
                .value_name("FILE")
                .takes_value(true)
                .help("startup configuration file (TOML, JSON or YAML)"),
        )
        .arg(
            Arg::with_name(SAMPLING_ARG)
                .long(SAMPLING_ARG)
                .value_name("MS")
                .takes_value(true)
                .help("set sampling period in milliseconds"),
        )
        .arg(
            Arg::with_name(THRESHOLD_ARG)
                .long(THRESHOLD_ARG)
                .value_name("MC")
                .takes_value(true)
                .allow_hyphen_values(true)
                .help("set threshold in milli-degrees Celsius"),
        )
        .arg(
            Arg::with_name(MODE_ARG)
                .long(MODE_ARG)
                .takes_value(true)
                .possible_values(&["normal", "noisy", "ramp"])
                .help("set generation mode"),
        )
        .arg(
            Arg::with_name(COUNT_ARG)
                .long(COUNT_ARG)
                .value_name("N")
                .takes_value(true)
                .default_value("0")
                .help("number of samples to print (0 = infinite)"),
        )
        .arg(
            Arg::with_name(NONBLOCK_ARG)
                .long(NONBLOCK_ARG)
                .help("read non-blocking, polling for readiness"),
        )
        .arg(
            Arg::with_name(TIMEOUT_ARG)
                .long(TIMEOUT_ARG)
                .value_name("MS")
                .takes_value(true)
                .help("poll timeout in milliseconds (non-blocking mode)"),
        )
        .arg(
            Arg::with_name(TEST_ARG)
                .long(TEST_ARG)
                .help("run the threshold alert self-test (exit non-zero on failure)"),
        )
        .arg(
            Arg::with_name(SHOW_ARG)
                .long(SHOW_ARG)
                .help("print control attributes and exit"),
        )
        .arg(
            Arg::with_name(JSON_ARG)
                .long(JSON_ARG)
                .help("print samples as JSON lines"),
        )
        .arg(
            Arg::with_name(VERBOSE_ARG)
                .short("v")
                .multiple(true)
                .help("increase log verbosity"),
        )
        .arg(
            Arg::with_name(LOG_JSON_ARG)
                .long(LOG_JSON_ARG)
                .help("emit logs as JSON"),
        )
        .get_matches()
}

/// Initialize logging
fn init_logging(verbosity: u64, json: bool) {
    let level = match verbosity {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr);

    let result = if json {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(builder.finish())
    };
    if let Err(e) = result {
        eprintln!("failed to set tracing subscriber: {e}");
    }
}

fn parse_arg<T: std::str::FromStr>(matches: &ArgMatches, name: &str) -> Result<Option<T>>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    matches
        .value_of(name)
        .map(|v| v.parse::<T>().with_context(|| format!("invalid --{name} value {v:?}")))
        .transpose()
}

/// Apply `--sampling-ms`, `--threshold-mC` and `--mode` through the control surface
fn apply_settings(device: &Device, matches: &ArgMatches) -> Result<(), SimtempError> {
    let control = device.control();
    let settings = [
        (Attribute::SamplingMs, SAMPLING_ARG, " ms"),
        (Attribute::ThresholdMc, THRESHOLD_ARG, " mC"),
        (Attribute::Mode, MODE_ARG, ""),
    ];

    for (attr, arg, unit) in settings {
        if let Some(value) = matches.value_of(arg) {
            control.store(attr, value)?;
            println!("{attr} -> {value}{unit}");
        }
    }
    Ok(())
}

fn show_attrs(device: &Device) {
    let control = device.control();
    for attr in Attribute::ALL {
        println!("{}: {}", attr, control.show(attr).trim_end());
    }
}

/// Print samples until `count` have been shown (0 = forever)
async fn monitor(
    device: &Device,
    count: u64,
    mode: ReadMode,
    timeout: Option<Duration>,
    json: bool,
) -> Result<()> {
    let handle = device.open(mode);
    let mut shown = 0u64;

    while count == 0 || shown < count {
        if mode == ReadMode::NonBlocking {
            let readiness = match timeout {
                Some(t) => match tokio::time::timeout(t, handle.ready()).await {
                    Ok(readiness) => readiness,
                    Err(_) => {
                        debug!("Poll timed out after {:?}", t);
                        continue;
                    }
                },
                None => handle.ready().await,
            };
            if readiness.contains(Readiness::HANGUP) {
                break;
            }
        }

        let sample = match handle.read_sample().await {
            Ok(sample) => sample,
            Err(SimtempError::WouldBlock) => continue,
            Err(e) => return Err(e).context("read failed"),
        };

        let line = if json {
            format::json_line(&sample)?
        } else {
            format::text_line(&sample)
        };
        println!("{line}");
        shown += 1;
    }
    Ok(())
}

async fn run(matches: ArgMatches<'static>) -> Result<i32> {
    let config = SimtempConfig::load(matches.value_of(CONFIG_ARG).map(Path::new))
        .context("failed to load configuration")?;
    let count: u64 = parse_arg(&matches, COUNT_ARG)?.unwrap_or(0);
    let timeout = parse_arg::<u64>(&matches, TIMEOUT_ARG)?.map(Duration::from_millis);
    let mode = if matches.is_present(NONBLOCK_ARG) {
        ReadMode::NonBlocking
    } else {
        ReadMode::Blocking
    };

    let device = Device::init(&config).context("failed to start simtemp device")?;

    let code = if let Err(e) = apply_settings(&device, &matches) {
        eprintln!("failed to apply settings: {e}");
        EXIT_CONFIG
    } else if matches.is_present(SHOW_ARG) {
        show_attrs(&device);
        0
    } else if matches.is_present(TEST_ARG) {
        selftest::run(&device).await
    } else {
        tokio::select! {
            result = monitor(&device, count, mode, timeout, matches.is_present(JSON_ARG)) => {
                result?;
            }
            _ = tokio::signal::ctrl_c() => info!("Interrupted, stopping"),
        }
        0
    };

    device.shutdown().await;
    Ok(code)
}

#[tokio::main]
async fn main() {
    let matches = get_matches();
    init_logging(
        matches.occurrences_of(VERBOSE_ARG),
        matches.is_present(LOG_JSON_ARG),
    );

    info!("=== simtemp v{} ===", env!("CARGO_PKG_VERSION"));

    let code = match run(matches).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            1
        }
    };
    process::exit(code);
}

//! # Jog Bridge
//!
//! Jog a lab gantry with a PlayStation controller.
//!
//! Binds to the first Sony controller found (or the configured device),
//! connects to the machine over serial, and runs the jog loop until the PS
//! button is pressed, the controller goes away, or Ctrl+C is received.
//!
//! # Examples
//!
//! Dry run against the in-memory machine:
//! ```bash
//! cargo run --release -- --simulate --new-record
//! ```
//!
//! Expected output:
//! ```text
//! INFO jog_bridge: Jog Bridge v0.1.0 starting...
//! INFO jog_bridge::controller::gamepad: Found controller "Wireless Controller" at: /dev/input/event21
//! INFO jog_bridge::control: Jog mode on Wireless Controller (poll every 20ms, large step 10, stick step 1)
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use jog_bridge::config::{Config, LoggingConfig};
use jog_bridge::control::{ControlLoop, LoopSettings};
use jog_bridge::controller::gamepad::Gamepad;
use jog_bridge::machine::gcode::{GcodeMachine, GcodeSettings};
use jog_bridge::machine::simulated::SimulatedMachine;
use jog_bridge::machine::{CalibrationMarks, Machine};
use jog_bridge::record::{read_records, PositionRecorder};
use jog_bridge::serial::DuetSerial;

/// Log file name prefix inside `[logging] log_dir`
const LOG_FILE_PREFIX: &str = "jog-bridge.log";

#[derive(Parser, Debug)]
#[command(name = "jog-bridge")]
#[command(version)]
#[command(about = "Jog a lab gantry with a PlayStation controller")]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = "config/default.toml")]
    config: PathBuf,

    /// Record file (overrides [record] path)
    #[arg(short, long, value_name = "FILE")]
    record: Option<PathBuf>,

    /// Start a new, empty record file
    #[arg(long)]
    new_record: bool,

    /// Drive the in-memory machine instead of the serial one
    #[arg(short, long)]
    simulate: bool,
}

/// Loads `--config`, falling back to defaults when the file does not exist,
/// then applies the command line overrides and validates the result.
///
/// Returns whether the defaults were used so the caller can warn once
/// logging is up.
fn load_config(args: &Args) -> Result<(Config, bool)> {
    let path = args.config.as_path();
    let defaulted = !path.exists();

    let mut config = if defaulted {
        Config::default()
    } else {
        Config::read(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?
    };

    if let Some(record) = &args.record {
        config.record.path = record.display().to_string();
    }
    if args.simulate {
        config.simulation.enabled = true;
    }

    config
        .validate()
        .with_context(|| format!("Invalid configuration in {}", path.display()))?;
    Ok((config, defaulted))
}

/// Logs how many positions the record file holds.
///
/// The file may predate this session, so unreadable content is only
/// reported.
fn log_record_summary(path: &Path) {
    if !path.exists() {
        return;
    }
    match read_records(path) {
        Ok(records) => info!("{} positions in {}", records.len(), path.display()),
        Err(e) => warn!("Could not read back {}: {}", path.display(), e),
    }
}

/// Installs the console subscriber, plus a daily log file when `log_dir` is set.
///
/// The returned guard must be kept alive for file output to be flushed.
fn init_logging(logging: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .context("Invalid log filter")?;

    let console = tracing_subscriber::fmt::layer();

    if logging.log_dir.is_empty() {
        tracing_subscriber::registry().with(filter).with(console).init();
        return Ok(None);
    }

    let appender = tracing_appender::rolling::daily(&logging.log_dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let file = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .init();
    Ok(Some(guard))
}

/// Spawns a task that flips the quit flag on Ctrl+C.
fn spawn_ctrl_c_watch() -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, shutting down...");
            let _ = tx.send(true);
        }
    });
    rx
}

/// Runs one jog session against `machine`.
async fn jog<M: Machine>(
    machine: &mut M,
    config: &Config,
    recorder: PositionRecorder,
    marks: &mut CalibrationMarks,
) -> Result<()> {
    let controller = Gamepad::open_configured(&config.controller.device_path)
        .context("No controller available")?;
    info!("Controller opened at: {}", controller.device_path());

    ControlLoop::new(machine, controller, recorder, marks)
        .with_settings(LoopSettings::from_config(config))
        .with_quit_signal(spawn_ctrl_c_watch())
        .run()
        .await?;
    Ok(())
}

/// Main entry point for Jog Bridge
///
/// # Errors
///
/// Returns error if:
/// - The configuration file exists but is invalid
/// - The record file cannot be created
/// - No controller or serial port can be opened
/// - The machine rejects or does not answer a command
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    let (config, defaulted) = load_config(&args)?;

    let _log_guard = init_logging(&config.logging)?;

    info!("Jog Bridge v{} starting...", env!("CARGO_PKG_VERSION"));
    if defaulted {
        warn!("{} not found, using default configuration", args.config.display());
    }

    let recorder = if args.new_record || config.record.truncate_on_start {
        PositionRecorder::initialize(&config.record.path)
            .with_context(|| format!("Failed to create record file {}", config.record.path))?
    } else {
        PositionRecorder::new(&config.record.path)
    };
    info!("Recording positions to {}", recorder.path().display());

    let mut marks = CalibrationMarks::default();

    if config.simulation.enabled {
        info!("Simulation mode: no machine connected");
        let mut machine = SimulatedMachine::new(
            config.simulation.axis_limits(),
            config.simulation.start_position(),
        );
        jog(&mut machine, &config, recorder.clone(), &mut marks).await?;
        info!(
            "Simulated machine finished at {:?} after {} moves",
            machine.current_position(),
            machine.move_count()
        );
    } else {
        let serial = DuetSerial::open(&config.serial.port, config.serial.baud_rate)?;
        info!("Machine serial port opened at: {}", serial.device_path());

        let settings = GcodeSettings {
            response_timeout: Duration::from_millis(config.serial.timeout_ms),
            feed_rate: config.motion.feed_rate,
        };
        let mut machine = GcodeMachine::connect(serial.into_port(), settings).await?;
        jog(&mut machine, &config, recorder.clone(), &mut marks).await?;
    }

    info!("Calibration marks: {:?}", marks);
    log_record_summary(recorder.path());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_args_defaults() {
        let args = Args::parse_from(["jog-bridge"]);
        assert_eq!(args.config, PathBuf::from("config/default.toml"));
        assert!(args.record.is_none());
        assert!(!args.new_record);
        assert!(!args.simulate);
    }

    #[test]
    fn test_args_flags() {
        let args = Args::parse_from([
            "jog-bridge",
            "--config",
            "lab.toml",
            "--record",
            "tool3.txt",
            "--new-record",
            "--simulate",
        ]);
        assert_eq!(args.config, PathBuf::from("lab.toml"));
        assert_eq!(args.record, Some(PathBuf::from("tool3.txt")));
        assert!(args.new_record);
        assert!(args.simulate);
    }

    fn config_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    fn args_for(path: &Path, extra: &[&str]) -> Args {
        let mut argv = vec!["jog-bridge", "--config", path.to_str().unwrap()];
        argv.extend_from_slice(extra);
        Args::parse_from(argv)
    }

    #[test]
    fn test_missing_config_falls_back_to_defaults() {
        let args = args_for(Path::new("/nonexistent/jog-bridge.toml"), &[]);
        let (config, defaulted) = load_config(&args).unwrap();
        assert!(defaulted);
        assert_eq!(config.motion.large_step, 10.0);
    }

    #[test]
    fn test_invalid_config_is_an_error() {
        let file = config_file("[serial]\nbaud_rate = 1\n");
        assert!(load_config(&args_for(file.path(), &[])).is_err());
    }

    #[test]
    fn test_simulate_flag_applies_before_validation() {
        let file = config_file("[serial]\nport = \"\"\n");

        assert!(load_config(&args_for(file.path(), &[])).is_err());

        let (config, _) = load_config(&args_for(file.path(), &["--simulate"])).unwrap();
        assert!(config.simulation.enabled);
    }

    #[test]
    fn test_record_flag_overrides_config() {
        let file = config_file("[record]\npath = \"from_config.txt\"\n");
        let (config, _) = load_config(&args_for(file.path(), &["--record", "tool3.txt"])).unwrap();
        assert_eq!(config.record.path, "tool3.txt");
    }

    #[test]
    fn test_shipped_config_is_valid() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config/default.toml");
        let (config, defaulted) = load_config(&args_for(&path, &[])).unwrap();
        assert!(!defaulted);
        assert_eq!(config.serial.port, "/dev/ttyACM0");
    }

    #[test]
    fn test_record_summary_tolerates_bad_content() {
        let file = config_file("1,2,3\nnot a record\n");
        log_record_summary(file.path());
        log_record_summary(Path::new("/nonexistent/positions.txt"));
    }
}

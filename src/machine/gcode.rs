//! # G-code Machine Driver
//!
//! Drives a RepRapFirmware (Duet) motion controller over a serial link.
//!
//! ## Protocol
//!
//! Each command is written as one line. The firmware answers with zero or
//! more reply lines followed by `ok`. Replies starting with `Error:` fail the
//! command; `Warning:` replies are logged and otherwise ignored.
//!
//! | Operation | G-code |
//! |-----------|--------|
//! | Position | `M114` |
//! | Axis limits | `M409 K"move.axes"` |
//! | Homed state | `M409 K"move.axes[].homed"` |
//! | Relative move | `G91`, `G0 Z.. X.. Y.. F..`, `G90` |
//! | Tool lock / unlock | `M98 P0:/macros/tool_lock.g` / `M98 P0:/macros/tool_unlock.g` |

use bytes::{Buf, BytesMut};
use serde::Deserialize;
use std::time::Duration;
use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::Machine;
use crate::error::{JogBridgeError, Result};
use crate::motion::{AxisLimits, AxisRange, Displacement, MachinePosition};
use crate::serial::port_trait::SerialPortIO;

/// Default time to wait for a reply, in milliseconds
pub const DEFAULT_RESPONSE_TIMEOUT_MS: u64 = 10_000;

/// Default feed rate for jog moves (mm/min)
pub const DEFAULT_FEED_RATE: f64 = 6000.0;

/// Number of axes that must be homed before moving (X, Y, Z, U)
const HOMED_AXES_REQUIRED: usize = 4;

const TOOL_LOCK_MACRO: &str = "0:/macros/tool_lock.g";
const TOOL_UNLOCK_MACRO: &str = "0:/macros/tool_unlock.g";

/// Envelope of an `M409` object model reply.
#[derive(Debug, Deserialize)]
struct ObjectModelReply<T> {
    result: T,
}

/// One entry of `move.axes`.
#[derive(Debug, Deserialize)]
struct AxisEntry {
    min: f64,
    max: f64,
}

/// Settings for [`GcodeMachine`].
#[derive(Debug, Clone, Copy)]
pub struct GcodeSettings {
    /// How long to wait for `ok` before giving up.
    pub response_timeout: Duration,
    /// Feed rate for jog moves (mm/min).
    pub feed_rate: f64,
}

impl Default for GcodeSettings {
    fn default() -> Self {
        Self {
            response_timeout: Duration::from_millis(DEFAULT_RESPONSE_TIMEOUT_MS),
            feed_rate: DEFAULT_FEED_RATE,
        }
    }
}

/// RepRapFirmware machine reached through a serial port.
pub struct GcodeMachine<P: SerialPortIO> {
    port: P,
    read_buf: BytesMut,
    settings: GcodeSettings,
    axis_limits: Option<AxisLimits>,
    homed: bool,
}

impl<P: SerialPortIO> GcodeMachine<P> {
    /// Wraps a port without talking to the machine.
    pub fn new(port: P, settings: GcodeSettings) -> Self {
        Self {
            port,
            read_buf: BytesMut::with_capacity(256),
            settings,
            axis_limits: None,
            homed: false,
        }
    }

    /// Wraps a port, switches to absolute positioning and primes the limit cache.
    ///
    /// # Errors
    ///
    /// Fails if the machine does not answer or the limits cannot be read.
    pub async fn connect(port: P, settings: GcodeSettings) -> Result<Self> {
        let mut machine = Self::new(port, settings);
        machine.send("G90").await?;
        let limits = machine.axis_limits().await?;
        info!("Connected to machine, axis limits: {:?}", limits);
        Ok(machine)
    }

    /// Sends one command and returns its reply text (without the `ok`).
    ///
    /// # Errors
    ///
    /// - `Serial`: the write failed or the port closed
    /// - `Machine`: the firmware replied with `Error:`
    /// - `MachineTimeout`: no `ok` within the response timeout
    pub async fn send(&mut self, command: &str) -> Result<String> {
        debug!("sending: {}", command);

        let line = format!("{}\n", command);
        self.port
            .write_all(line.as_bytes())
            .await
            .map_err(|e| JogBridgeError::Serial(format!("Failed to write command: {}", e)))?;
        self.port
            .flush()
            .await
            .map_err(|e| JogBridgeError::Serial(format!("Failed to flush serial port: {}", e)))?;

        let timeout = self.settings.response_timeout;
        let reply = tokio::time::timeout(timeout, self.read_reply())
            .await
            .map_err(|_| JogBridgeError::MachineTimeout(command.to_string()))??;

        debug!("received: {}", reply);
        Ok(reply)
    }

    /// Collects reply lines until `ok`.
    async fn read_reply(&mut self) -> Result<String> {
        let mut lines: Vec<String> = Vec::new();
        let mut error: Option<String> = None;

        loop {
            let Some(line) = self.next_line().await? else {
                return Err(JogBridgeError::Serial("Serial port closed".to_string()));
            };

            if line == "ok" {
                break;
            }
            if line.is_empty() {
                continue;
            }
            if let Some(message) = line.strip_prefix("Error:") {
                error.get_or_insert_with(|| message.trim().to_string());
            } else if line.starts_with("Warning:") {
                warn!("Machine {}", line);
            } else {
                lines.push(line);
            }
        }

        match error {
            Some(message) => Err(JogBridgeError::Machine(message)),
            None => Ok(lines.join("\n")),
        }
    }

    /// Reads one trimmed line, or `None` once the port is closed.
    async fn next_line(&mut self) -> Result<Option<String>> {
        loop {
            if let Some(pos) = self.read_buf.iter().position(|&b| b == b'\n') {
                let raw = self.read_buf.split_to(pos);
                self.read_buf.advance(1);
                let line = String::from_utf8_lossy(&raw).trim().to_string();
                return Ok(Some(line));
            }

            let mut chunk = [0u8; 256];
            let n = self
                .port
                .read(&mut chunk)
                .await
                .map_err(|e| JogBridgeError::Serial(format!("Failed to read reply: {}", e)))?;
            if n == 0 {
                return Ok(None);
            }
            self.read_buf.extend_from_slice(&chunk[..n]);
        }
    }

    /// Fails unless the first four axes report homed. Cached once true.
    async fn ensure_homed(&mut self) -> Result<()> {
        if self.homed {
            return Ok(());
        }
        let reply = self.send("M409 K\"move.axes[].homed\"").await?;
        let homed: ObjectModelReply<Vec<bool>> = serde_json::from_str(&reply)?;
        let required = homed.result.len().min(HOMED_AXES_REQUIRED);

        if required == 0 || !homed.result[..required].iter().all(|&h| h) {
            return Err(JogBridgeError::MachineState(
                "machine must first be homed".to_string(),
            ));
        }
        self.homed = true;
        Ok(())
    }
}

#[async_trait]
impl<P: SerialPortIO> Machine for GcodeMachine<P> {
    async fn position(&mut self) -> Result<MachinePosition> {
        let reply = self.send("M114").await?;
        parse_m114(&reply)
    }

    async fn axis_limits(&mut self) -> Result<AxisLimits> {
        if let Some(limits) = self.axis_limits {
            return Ok(limits);
        }
        let reply = self.send("M409 K\"move.axes\"").await?;
        let limits = parse_axis_limits(&reply)?;
        self.axis_limits = Some(limits);
        Ok(limits)
    }

    async fn move_by(&mut self, delta: Displacement) -> Result<()> {
        self.ensure_homed().await?;
        self.send("G91").await?;
        let command = format!(
            "G0 Z{:.2} X{:.2} Y{:.2} F{:.2}",
            delta.dz, delta.dx, delta.dy, self.settings.feed_rate
        );
        let moved = self.send(&command).await;
        // Restore absolute mode even if the move was rejected.
        self.send("G90").await?;
        moved.map(|_| ())
    }

    async fn tool_lock(&mut self) -> Result<()> {
        self.send(&format!("M98 P{}", TOOL_LOCK_MACRO)).await.map(|_| ())
    }

    async fn tool_unlock(&mut self) -> Result<()> {
        self.send(&format!("M98 P{}", TOOL_UNLOCK_MACRO)).await.map(|_| ())
    }
}

/// Parses an `M114` reply such as
/// `X:10.000 Y:20.000 Z:30.000 U:0.000 E:0.000 Count 800 1600 12000 Machine ...`.
fn parse_m114(reply: &str) -> Result<MachinePosition> {
    let head = reply.split(" Count ").next().unwrap_or_default();

    let mut position = [None::<f64>; 3];
    for token in head.split_whitespace() {
        let Some((axis, value)) = token.split_once(':') else {
            continue;
        };
        let slot = match axis {
            "X" => 0,
            "Y" => 1,
            "Z" => 2,
            _ => continue,
        };
        let value = value
            .parse::<f64>()
            .map_err(|_| JogBridgeError::Machine(format!("Bad M114 coordinate: {}", token)))?;
        position[slot] = Some(value);
    }

    match position {
        [Some(x), Some(y), Some(z)] => Ok(MachinePosition::new(x, y, z)),
        _ => Err(JogBridgeError::Machine(format!(
            "Unexpected M114 reply: {}",
            reply
        ))),
    }
}

/// Parses the `move.axes` object model reply into X/Y/Z limits.
fn parse_axis_limits(reply: &str) -> Result<AxisLimits> {
    let parsed: ObjectModelReply<Vec<AxisEntry>> = serde_json::from_str(reply)?;
    match parsed.result.as_slice() {
        [x, y, z, ..] => Ok(AxisLimits::new(
            AxisRange::new(x.min, x.max),
            AxisRange::new(y.min, y.max),
            AxisRange::new(z.min, z.max),
        )),
        _ => Err(JogBridgeError::Machine(format!(
            "Expected at least 3 axes in move.axes, got {}",
            parsed.result.len()
        ))),
    }
}

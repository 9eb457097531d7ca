//! # Machine Module
//!
//! The motion platform the control loop drives.
//!
//! This module handles:
//! - The [`Machine`] seam: position, limits, relative moves, tool lock
//! - A RepRapFirmware G-code driver over serial ([`gcode::GcodeMachine`])
//! - An in-memory machine for dry runs and tests ([`simulated::SimulatedMachine`])

pub mod gcode;
pub mod simulated;

use async_trait::async_trait;

use crate::error::Result;
use crate::motion::{AxisLimits, Displacement, MachinePosition};

/// A multi-axis machine with a tool lock.
///
/// Every call blocks the caller until the machine has answered.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Machine: Send {
    /// Current absolute position of the control point.
    async fn position(&mut self) -> Result<MachinePosition>;

    /// Travel limits for X, Y and Z.
    async fn axis_limits(&mut self) -> Result<AxisLimits>;

    /// Moves relative to the current position.
    async fn move_by(&mut self, delta: Displacement) -> Result<()>;

    /// Runs the tool lock macro.
    async fn tool_lock(&mut self) -> Result<()>;

    /// Runs the tool unlock macro.
    async fn tool_unlock(&mut self) -> Result<()>;
}

/// Reference positions captured during tool setup.
///
/// Written only by the control loop in response to the mark buttons; read by
/// tool-change code once the loop returns.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CalibrationMarks {
    /// Y coordinate at which a tool clears the parking post.
    pub y_clear: Option<f64>,
    /// X coordinate of the tool's parking spot.
    pub x_park: Option<f64>,
    /// Y coordinate of the tool's parking spot.
    pub y_park: Option<f64>,
}

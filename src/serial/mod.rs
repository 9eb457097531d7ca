//! # Serial Communication Module
//!
//! Handles the USB serial link to the machine's Duet controller board.
//!
//! This module handles:
//! - Probing candidate device paths
//! - Opening the port 8N1 at the configured baud rate
//! - Handing the stream to the G-code machine driver

pub mod port_trait;

use crate::error::{JogBridgeError, Result};
use port_trait::TokioSerialPort;
use tracing::{debug, info, warn};

/// Default baud rate for the Duet USB port
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Default device paths to try (in order of preference)
const DEFAULT_DEVICE_PATHS: &[&str] = &[
    "/dev/ttyACM0", // USB CDC devices (Duet boards)
    "/dev/ttyUSB0", // USB-to-serial adapters
];

/// Duet Serial Port Handler
///
/// Manages the connection to the machine controller via USB serial.
pub struct DuetSerial {
    /// Serial port handle
    port: tokio_serial::SerialStream,
    /// Device path (e.g., /dev/ttyACM0)
    device_path: String,
}

impl std::fmt::Debug for DuetSerial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DuetSerial")
            .field("device_path", &self.device_path)
            .finish_non_exhaustive()
    }
}

impl DuetSerial {
    /// Open connection to the machine
    ///
    /// Tries `preferred` first (when non-empty), then the common device paths.
    ///
    /// # Errors
    ///
    /// Returns `SerialPortNotFound` if none of the paths can be opened
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use jog_bridge::serial::{DuetSerial, DEFAULT_BAUD_RATE};
    ///
    /// # async fn demo() -> jog_bridge::error::Result<()> {
    /// let serial = DuetSerial::open("/dev/ttyACM0", DEFAULT_BAUD_RATE)?;
    /// println!("Connected to: {}", serial.device_path());
    /// # Ok(())
    /// # }
    /// ```
    pub fn open(preferred: &str, baud_rate: u32) -> Result<Self> {
        let mut paths: Vec<&str> = Vec::new();
        if !preferred.is_empty() {
            paths.push(preferred);
        }
        for path in DEFAULT_DEVICE_PATHS {
            if !paths.contains(path) {
                paths.push(path);
            }
        }
        Self::open_with_paths(&paths, baud_rate)
    }

    /// Open connection to the machine with custom device paths
    ///
    /// # Arguments
    ///
    /// * `paths` - Device paths to try (e.g., &["/dev/ttyACM0"])
    /// * `baud_rate` - Line speed
    pub fn open_with_paths(paths: &[&str], baud_rate: u32) -> Result<Self> {
        for path in paths {
            debug!("Trying to open serial port: {}", path);

            match Self::open_port(path, baud_rate) {
                Ok(port) => {
                    info!("Successfully opened machine port at {}", path);
                    return Ok(Self {
                        port,
                        device_path: path.to_string(),
                    });
                }
                Err(e) => {
                    warn!("Failed to open {}: {}", path, e);
                    continue;
                }
            }
        }

        Err(JogBridgeError::SerialPortNotFound(paths.join(", ")))
    }

    /// Open a specific serial port 8N1
    fn open_port(path: &str, baud_rate: u32) -> Result<tokio_serial::SerialStream> {
        use tokio_serial::SerialPortBuilderExt;

        let port = tokio_serial::new(path, baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .open_native_async()
            .map_err(|e| JogBridgeError::Serial(format!("Failed to open {}: {}", path, e)))?;

        Ok(port)
    }

    /// Get the device path of the opened serial port
    pub fn device_path(&self) -> &str {
        &self.device_path
    }

    /// Wrap the stream for the G-code driver
    pub fn into_port(self) -> TokioSerialPort {
        TokioSerialPort::new(self.port)
    }
}

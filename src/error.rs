//! # Error Types
//!
//! Custom error types for Jog Bridge using `thiserror`.

use thiserror::Error;

/// Main error type for Jog Bridge
#[derive(Debug, Error)]
pub enum JogBridgeError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Controller errors (device read failures, bad device path)
    #[error("Controller error: {0}")]
    Controller(String),

    /// No supported controller was found
    #[error("No supported PlayStation controller found")]
    ControllerNotFound,

    /// Serial port errors
    #[error("Serial error: {0}")]
    Serial(String),

    /// None of the candidate serial ports could be opened
    #[error("No machine serial port found (tried: {0})")]
    SerialPortNotFound(String),

    /// The machine rejected a command or replied with something unparseable
    #[error("Machine error: {0}")]
    Machine(String),

    /// The machine is in the wrong state for the requested action
    #[error("Machine state error: {0}")]
    MachineState(String),

    /// The machine did not answer a command in time
    #[error("Machine did not respond to `{0}`")]
    MachineTimeout(String),

    /// Object model JSON could not be decoded
    #[error("Object model error: {0}")]
    ObjectModel(#[from] serde_json::Error),

    /// Malformed record file content
    #[error("Record error: {0}")]
    Record(String),
}

/// Result type alias for Jog Bridge
pub type Result<T> = std::result::Result<T, JogBridgeError>;

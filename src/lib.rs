//! # Jog Bridge Library
//!
//! Jog a Jubilee-style lab gantry with a PlayStation controller.
//!
//! This library provides the pieces of an interactive jog session: mapping
//! controller events to moves, keeping moves inside the machine's travel
//! limits, recording positions for tool setup, and the loop tying them to a
//! RepRapFirmware machine over serial.

pub mod config;
pub mod control;
pub mod controller;
pub mod error;
pub mod machine;
pub mod motion;
pub mod record;
pub mod report;
pub mod serial;

//! # Controller Module
//!
//! PlayStation controller input handling.
//!
//! This module handles:
//! - Controller detection and connection via evdev
//! - Translating raw evdev events into jog [`InputEvent`]s
//! - The [`ControllerSource`] seam the control loop polls

pub mod gamepad;
pub mod layout;
pub mod mapper;

use async_trait::async_trait;

use crate::error::Result;

/// Kind of a discrete controller event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// A button transitioned to pressed.
    ButtonDown,
    /// A button transitioned to released.
    ButtonUp,
    /// An analog axis changed.
    AxisMotion,
    /// The controller went away or the operator asked to quit.
    DeviceQuit,
}

/// A single controller event, consumed once per dispatch.
///
/// `id` is a button index for button events and an axis index for axis
/// events (see [`layout`]). `value` is only set for axis events and lies in
/// `-1.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InputEvent {
    pub kind: EventKind,
    pub id: u16,
    pub value: Option<f64>,
}

impl InputEvent {
    #[must_use]
    pub const fn button_down(id: u16) -> Self {
        Self { kind: EventKind::ButtonDown, id, value: None }
    }

    #[must_use]
    pub const fn button_up(id: u16) -> Self {
        Self { kind: EventKind::ButtonUp, id, value: None }
    }

    #[must_use]
    pub const fn axis(id: u16, value: f64) -> Self {
        Self { kind: EventKind::AxisMotion, id, value: Some(value) }
    }

    #[must_use]
    pub const fn device_quit() -> Self {
        Self { kind: EventKind::DeviceQuit, id: 0, value: None }
    }
}

/// Polling interface to a controller.
///
/// Implementations never block waiting for input: [`poll`](Self::poll)
/// returns whatever is pending right now, possibly nothing.
#[async_trait]
pub trait ControllerSource: Send {
    /// Human-readable device name.
    fn name(&self) -> &str;

    /// Takes every event currently pending.
    async fn poll(&mut self) -> Result<Vec<InputEvent>>;

    /// Discards every event currently pending.
    async fn clear(&mut self) -> Result<()>;
}

#[cfg(test)]
pub mod mocks {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// Controller that replays scripted poll batches.
    ///
    /// Each call to `poll` returns the next batch; once the script runs out
    /// every poll returns an empty batch.
    #[derive(Clone)]
    pub struct ScriptedController {
        pub batches: Arc<Mutex<VecDeque<Vec<InputEvent>>>>,
        pub polls: Arc<Mutex<usize>>,
        pub clears: Arc<Mutex<usize>>,
    }

    impl ScriptedController {
        pub fn new(batches: Vec<Vec<InputEvent>>) -> Self {
            Self {
                batches: Arc::new(Mutex::new(batches.into())),
                polls: Arc::new(Mutex::new(0)),
                clears: Arc::new(Mutex::new(0)),
            }
        }

        pub fn poll_count(&self) -> usize {
            *self.polls.lock().unwrap()
        }

        pub fn clear_count(&self) -> usize {
            *self.clears.lock().unwrap()
        }

        pub fn remaining(&self) -> usize {
            self.batches.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl ControllerSource for ScriptedController {
        fn name(&self) -> &str {
            "Scripted Controller"
        }

        async fn poll(&mut self) -> Result<Vec<InputEvent>> {
            *self.polls.lock().unwrap() += 1;
            Ok(self.batches.lock().unwrap().pop_front().unwrap_or_default())
        }

        async fn clear(&mut self) -> Result<()> {
            *self.clears.lock().unwrap() += 1;
            Ok(())
        }
    }
}

//! # Controller Event Mapper Module
//!
//! This module translates raw evdev events from a PlayStation controller into
//! jog [`InputEvent`]s using the indices in [`layout`](super::layout).
//!
//! ## Event Types
//!
//! - **EV_ABS (Absolute Axis)**: sticks, triggers and the D-Pad hat
//! - **EV_KEY (Key/Button)**: digital buttons
//!
//! ## Axis Codes (EV_ABS)
//!
//! | Axis | evdev Code | Range | Jog index |
//! |------|------------|-------|-----------|
//! | Left Stick X | ABS_X | 0-255 | 0 |
//! | Left Stick Y | ABS_Y | 0-255 | 1 |
//! | Right Stick X | ABS_RX | 0-255 | 2 |
//! | Right Stick Y | ABS_RY | 0-255 | 3 |
//! | L2 Trigger | ABS_Z | 0-255 | 4 |
//! | R2 Trigger | ABS_RZ | 0-255 | 5 |
//! | D-Pad X | ABS_HAT0X | -1/0/1 | buttons 13/14 |
//! | D-Pad Y | ABS_HAT0Y | -1/0/1 | buttons 11/12 |
//!
//! Analog values are normalized to `-1.0..=1.0`. Triggers therefore rest at
//! `-1.0` and read `1.0` when fully pressed.
//!
//! ## Button Codes (EV_KEY)
//!
//! | Button | evdev Code | Jog index |
//! |--------|------------|-----------|
//! | Cross (×) | BTN_SOUTH | 0 |
//! | Circle (○) | BTN_EAST | 1 |
//! | Square (□) | BTN_WEST | 2 |
//! | Triangle (△) | BTN_NORTH | 3 |
//! | Share | BTN_SELECT | 4 |
//! | PS | BTN_MODE | 5 |
//! | Options | BTN_START | 6 |
//! | L3 | BTN_THUMBL | 7 |
//! | R3 | BTN_THUMBR | 8 |
//! | L1 | BTN_TL | 9 |
//! | R1 | BTN_TR | 10 |
//!
//! ## Touchpad Node
//!
//! The kernel exposes the touchpad as its own evdev device. Only the pad
//! click (`BTN_LEFT`) is used, as jog index 15. Finger contact
//! (`BTN_TOUCH`) and finger coordinates are ignored; the coordinates share
//! `ABS_X`/`ABS_Y` codes with the left stick and must not reach
//! [`EventTranslator::translate`].

use evdev::{AbsoluteAxisType, InputEvent as RawEvent, InputEventKind, Key};

use super::layout::{axes, buttons};
use super::InputEvent;

/// Raw axis value range from the controller.
pub const AXIS_MIN: i32 = 0;
/// Raw axis value range from the controller.
pub const AXIS_MAX: i32 = 255;

/// D-Pad released.
pub const DPAD_RELEASED: i32 = 0;
/// D-Pad pressed negative direction (left or up).
pub const DPAD_NEGATIVE: i32 = -1;
/// D-Pad pressed positive direction (right or down).
pub const DPAD_POSITIVE: i32 = 1;

/// evdev key value for autorepeat.
const KEY_REPEAT: i32 = 2;

/// Normalizes a raw axis value to `-1.0..=1.0`.
#[must_use]
pub fn normalize_axis(raw: i32) -> f64 {
    let span = f64::from(AXIS_MAX - AXIS_MIN);
    let normalized = 2.0 * f64::from(raw - AXIS_MIN) / span - 1.0;
    normalized.clamp(-1.0, 1.0)
}

/// Translates raw evdev events into jog events.
///
/// D-Pad presses arrive as hat axis changes, so the translator keeps the
/// last hat values to turn them into button down/up edges.
///
/// # Examples
///
/// ```
/// use evdev::{AbsoluteAxisType, EventType, InputEvent};
/// use jog_bridge::controller::mapper::EventTranslator;
/// use jog_bridge::controller::InputEvent as JogEvent;
///
/// let mut translator = EventTranslator::new();
/// let raw = InputEvent::new(EventType::ABSOLUTE, AbsoluteAxisType::ABS_HAT0X.0, -1);
/// assert_eq!(translator.translate(&raw), vec![JogEvent::button_down(13)]);
/// ```
#[derive(Debug, Default)]
pub struct EventTranslator {
    hat_x: i32,
    hat_y: i32,
}

impl EventTranslator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Translates one raw event. Sync, autorepeat and unmapped events yield
    /// nothing; a D-Pad flip yields a release followed by a press.
    pub fn translate(&mut self, event: &RawEvent) -> Vec<InputEvent> {
        match event.kind() {
            InputEventKind::AbsAxis(axis) => self.translate_axis(axis, event.value()),
            InputEventKind::Key(key) => Self::translate_key(key, event.value())
                .into_iter()
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Forgets the D-Pad state.
    pub fn reset(&mut self) {
        self.hat_x = DPAD_RELEASED;
        self.hat_y = DPAD_RELEASED;
    }

    fn translate_axis(&mut self, axis: AbsoluteAxisType, value: i32) -> Vec<InputEvent> {
        let index = match axis {
            AbsoluteAxisType::ABS_X => axes::LEFT_X,
            AbsoluteAxisType::ABS_Y => axes::LEFT_Y,
            AbsoluteAxisType::ABS_RX => axes::RIGHT_X,
            AbsoluteAxisType::ABS_RY => axes::RIGHT_Y,
            AbsoluteAxisType::ABS_Z => axes::L2,
            AbsoluteAxisType::ABS_RZ => axes::R2,
            AbsoluteAxisType::ABS_HAT0X => {
                let previous = std::mem::replace(&mut self.hat_x, value);
                return hat_edges(previous, value, buttons::DPAD_LEFT, buttons::DPAD_RIGHT);
            }
            AbsoluteAxisType::ABS_HAT0Y => {
                let previous = std::mem::replace(&mut self.hat_y, value);
                return hat_edges(previous, value, buttons::DPAD_UP, buttons::DPAD_DOWN);
            }
            _ => return Vec::new(),
        };
        vec![InputEvent::axis(index, normalize_axis(value))]
    }

    fn translate_key(key: Key, value: i32) -> Option<InputEvent> {
        if value == KEY_REPEAT {
            return None;
        }
        let index = match key {
            Key::BTN_SOUTH => buttons::CROSS,
            Key::BTN_EAST => buttons::CIRCLE,
            Key::BTN_WEST => buttons::SQUARE,
            Key::BTN_NORTH => buttons::TRIANGLE,
            Key::BTN_SELECT => buttons::SHARE,
            Key::BTN_MODE => buttons::PS,
            Key::BTN_START => buttons::OPTIONS,
            Key::BTN_THUMBL => buttons::L3,
            Key::BTN_THUMBR => buttons::R3,
            Key::BTN_TL => buttons::L1,
            Key::BTN_TR => buttons::R1,
            _ => return None,
        };
        Some(button_edge(index, value))
    }

    /// Translates one event from the touchpad node. Only the pad click
    /// yields an event.
    #[must_use]
    pub fn translate_touchpad(event: &RawEvent) -> Option<InputEvent> {
        match event.kind() {
            InputEventKind::Key(Key::BTN_LEFT) if event.value() != KEY_REPEAT => {
                Some(button_edge(buttons::TOUCHPAD, event.value()))
            }
            _ => None,
        }
    }
}

fn button_edge(index: u16, value: i32) -> InputEvent {
    if value != 0 {
        InputEvent::button_down(index)
    } else {
        InputEvent::button_up(index)
    }
}

/// Turns a hat transition into button edges.
fn hat_edges(previous: i32, current: i32, negative: u16, positive: u16) -> Vec<InputEvent> {
    let button = |v: i32| match v {
        DPAD_NEGATIVE => Some(negative),
        DPAD_POSITIVE => Some(positive),
        _ => None,
    };

    let mut edges = Vec::new();
    if previous == current {
        return edges;
    }
    if let Some(released) = button(previous) {
        edges.push(InputEvent::button_up(released));
    }
    if let Some(pressed) = button(current) {
        edges.push(InputEvent::button_down(pressed));
    }
    edges
}

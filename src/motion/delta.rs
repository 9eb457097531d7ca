//! # Delta Mapper
//!
//! Converts single controller events into displacement vectors.
//!
//! Three step granularities let the operator choose coarse or fine
//! positioning without switching modes:
//!
//! - **Large**: D-Pad and shoulder buttons, `large_step` per move
//! - **Medium**: left stick, `value * step`
//! - **Small**: right stick, one tenth of medium
//!
//! The analog triggers drive Z. Their native `-1.0..=1.0` range (rest at
//! `-1.0`) is rescaled to `0.0..=1.0` before scaling.
//!
//! ## Usage
//!
//! ```
//! use jog_bridge::motion::delta::{axis_to_delta, button_to_delta};
//! use jog_bridge::motion::Displacement;
//!
//! assert_eq!(button_to_delta(13, 10.0), Displacement::new(10.0, 0.0, 0.0));
//! assert_eq!(axis_to_delta(1, 0.5, 1.0), Displacement::new(0.0, 0.5, 0.0));
//! ```

use super::Displacement;
use crate::controller::layout::{axes, buttons};

/// Default large step in millimetres.
pub const DEFAULT_LARGE_STEP: f64 = 10.0;

/// Default stick step multiplier.
pub const DEFAULT_STICK_STEP: f64 = 1.0;

/// Right stick scale relative to the left stick.
pub const FINE_STICK_SCALE: f64 = 0.1;

/// Maps a button to a large-step displacement along one axis.
///
/// Buttons without a jog direction yield [`Displacement::ZERO`].
#[must_use]
pub fn button_to_delta(button: u16, large_step: f64) -> Displacement {
    match button {
        buttons::DPAD_RIGHT => Displacement::new(-large_step, 0.0, 0.0),
        buttons::DPAD_LEFT => Displacement::new(large_step, 0.0, 0.0),
        buttons::DPAD_UP => Displacement::new(0.0, -large_step, 0.0),
        buttons::DPAD_DOWN => Displacement::new(0.0, large_step, 0.0),
        buttons::R1 => Displacement::new(0.0, 0.0, -large_step),
        buttons::L1 => Displacement::new(0.0, 0.0, large_step),
        _ => Displacement::ZERO,
    }
}

/// Maps an analog axis value to a displacement scaled by `step`.
///
/// X is sign-inverted on both sticks. Unknown axes yield
/// [`Displacement::ZERO`].
#[must_use]
pub fn axis_to_delta(axis: u16, value: f64, step: f64) -> Displacement {
    let delta = match axis {
        axes::LEFT_X => Displacement::new(-value, 0.0, 0.0),
        axes::LEFT_Y => Displacement::new(0.0, value, 0.0),
        axes::RIGHT_X => Displacement::new(-value * FINE_STICK_SCALE, 0.0, 0.0),
        axes::RIGHT_Y => Displacement::new(0.0, value * FINE_STICK_SCALE, 0.0),
        axes::L2 => Displacement::new(0.0, 0.0, trigger_travel(value)),
        axes::R2 => Displacement::new(0.0, 0.0, -trigger_travel(value)),
        _ => Displacement::ZERO,
    };
    delta.scaled(step)
}

/// Rescales a trigger from `-1.0..=1.0` to `0.0..=1.0`.
#[inline]
fn trigger_travel(value: f64) -> f64 {
    (value + 1.0) / 2.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Displacement, b: Displacement) {
        assert!(
            (a.dx - b.dx).abs() < 1e-9 && (a.dy - b.dy).abs() < 1e-9 && (a.dz - b.dz).abs() < 1e-9,
            "expected {:?}, got {:?}",
            b,
            a
        );
    }

    // ==================== button_to_delta ====================

    #[test]
    fn test_button_directions() {
        assert_eq!(button_to_delta(13, 10.0), Displacement::new(10.0, 0.0, 0.0));
        assert_eq!(button_to_delta(14, 10.0), Displacement::new(-10.0, 0.0, 0.0));
        assert_eq!(button_to_delta(12, 10.0), Displacement::new(0.0, 10.0, 0.0));
        assert_eq!(button_to_delta(11, 10.0), Displacement::new(0.0, -10.0, 0.0));
        assert_eq!(button_to_delta(9, 10.0), Displacement::new(0.0, 0.0, 10.0));
        assert_eq!(button_to_delta(10, 10.0), Displacement::new(0.0, 0.0, -10.0));
    }

    #[test]
    fn test_button_step_scales_magnitude() {
        assert_eq!(button_to_delta(buttons::DPAD_LEFT, 2.5), Displacement::new(2.5, 0.0, 0.0));
        assert_eq!(button_to_delta(buttons::L1, 0.1), Displacement::new(0.0, 0.0, 0.1));
    }

    #[test]
    fn test_unmapped_buttons_are_zero() {
        for button in [0, 1, 2, 3, 4, 5, 6, 7, 8, 15, 16, 200] {
            assert!(
                button_to_delta(button, DEFAULT_LARGE_STEP).is_zero(),
                "button {} should not move",
                button
            );
        }
    }

    #[test]
    fn test_button_mapping_is_deterministic() {
        for button in 0..20 {
            assert_eq!(button_to_delta(button, 10.0), button_to_delta(button, 10.0));
        }
    }

    #[test]
    fn test_each_directional_button_moves_exactly_one_axis() {
        for button in 9..=14 {
            let d = button_to_delta(button, 10.0);
            let moving = [d.dx, d.dy, d.dz].iter().filter(|v| **v != 0.0).count();
            assert_eq!(moving, 1, "button {} should move a single axis", button);
        }
    }

    // ==================== axis_to_delta ====================

    #[test]
    fn test_left_stick_medium_steps() {
        approx(axis_to_delta(0, 0.5, 1.0), Displacement::new(-0.5, 0.0, 0.0));
        approx(axis_to_delta(1, 0.5, 1.0), Displacement::new(0.0, 0.5, 0.0));
        approx(axis_to_delta(0, -1.0, 1.0), Displacement::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn test_right_stick_is_one_tenth() {
        approx(axis_to_delta(2, 0.8, 1.0), Displacement::new(-0.08, 0.0, 0.0));
        approx(axis_to_delta(3, -0.6, 1.0), Displacement::new(0.0, -0.06, 0.0));
    }

    #[test]
    fn test_triggers_rescale_to_unit_range() {
        approx(axis_to_delta(4, -1.0, 1.0), Displacement::ZERO);
        approx(axis_to_delta(5, -1.0, 1.0), Displacement::ZERO);
        approx(axis_to_delta(4, 1.0, 3.0), Displacement::new(0.0, 0.0, 3.0));
        approx(axis_to_delta(5, 1.0, 3.0), Displacement::new(0.0, 0.0, -3.0));
        approx(axis_to_delta(4, 0.0, 1.0), Displacement::new(0.0, 0.0, 0.5));
    }

    #[test]
    fn test_step_multiplies_every_axis() {
        approx(axis_to_delta(0, 0.75, 4.0), Displacement::new(-3.0, 0.0, 0.0));
        approx(axis_to_delta(3, 1.0, 10.0), Displacement::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn test_unknown_axes_are_zero() {
        for axis in [6, 7, 42] {
            assert!(axis_to_delta(axis, 1.0, 1.0).is_zero());
        }
    }
}

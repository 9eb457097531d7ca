//! # Controller Layout
//!
//! Button and axis indices delivered by [`ControllerSource`](super::ControllerSource)
//! implementations. The numbering follows the common PlayStation game
//! controller layout.
//!
//! | Index | Button | Jog function |
//! |-------|--------|--------------|
//! | 0 | Cross (×) | Mark clear position |
//! | 1 | Circle (○) | Unlock tool |
//! | 2 | Square (□) | Mark park position |
//! | 3 | Triangle (△) | Lock tool |
//! | 5 | PS | Exit |
//! | 9 / 10 | L1 / R1 | +Z / −Z large step |
//! | 11 / 12 | D-Pad up / down | −Y / +Y large step |
//! | 13 / 14 | D-Pad left / right | +X / −X large step |
//! | 15 | Touchpad | Record position |
//!
//! | Index | Axis | Jog function |
//! |-------|------|--------------|
//! | 0 / 1 | Left stick X / Y | Medium X / Y steps |
//! | 2 / 3 | Right stick X / Y | Small X / Y steps |
//! | 4 / 5 | L2 / R2 | Z up / down |

/// Button indices.
pub mod buttons {
    /// Cross (×) - mark clear position
    pub const CROSS: u16 = 0;
    /// Circle (○) - unlock tool
    pub const CIRCLE: u16 = 1;
    /// Square (□) - mark park position
    pub const SQUARE: u16 = 2;
    /// Triangle (△) - lock tool
    pub const TRIANGLE: u16 = 3;
    /// Share
    pub const SHARE: u16 = 4;
    /// PS - exit jog mode
    pub const PS: u16 = 5;
    /// Options
    pub const OPTIONS: u16 = 6;
    /// L3 - left stick click
    pub const L3: u16 = 7;
    /// R3 - right stick click
    pub const R3: u16 = 8;
    /// L1 - +Z
    pub const L1: u16 = 9;
    /// R1 - -Z
    pub const R1: u16 = 10;
    /// D-Pad up - -Y
    pub const DPAD_UP: u16 = 11;
    /// D-Pad down - +Y
    pub const DPAD_DOWN: u16 = 12;
    /// D-Pad left - +X
    pub const DPAD_LEFT: u16 = 13;
    /// D-Pad right - -X
    pub const DPAD_RIGHT: u16 = 14;
    /// Touchpad click - record position
    pub const TOUCHPAD: u16 = 15;
}

/// Axis indices.
pub mod axes {
    /// Left stick X
    pub const LEFT_X: u16 = 0;
    /// Left stick Y
    pub const LEFT_Y: u16 = 1;
    /// Right stick X
    pub const RIGHT_X: u16 = 2;
    /// Right stick Y
    pub const RIGHT_Y: u16 = 3;
    /// L2 trigger
    pub const L2: u16 = 4;
    /// R2 trigger
    pub const R2: u16 = 5;
}

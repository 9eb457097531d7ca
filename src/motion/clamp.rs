//! # Range Clamp
//!
//! Keeps jog requests inside the machine's travel limits.
//!
//! Each axis is checked on its own: a request that would leave
//! `[min, max]` has its delta zeroed and its target pinned to the violated
//! bound. Other axes are untouched. Violations are not errors; they are
//! returned so the caller can report them and carry on.
//!
//! ```
//! use jog_bridge::motion::clamp::clamp_request;
//! use jog_bridge::motion::{Axis, AxisLimits, AxisRange, Displacement, MachinePosition};
//!
//! let limits = AxisLimits::new(
//!     AxisRange::new(0.0, 100.0),
//!     AxisRange::new(0.0, 100.0),
//!     AxisRange::new(0.0, 100.0),
//! );
//! let outcome = clamp_request(
//!     &limits,
//!     MachinePosition::new(95.0, 50.0, 50.0),
//!     Displacement::new(10.0, 0.0, 0.0),
//! );
//! assert_eq!(outcome.target.x, 100.0);
//! assert_eq!(outcome.delta.dx, 0.0);
//! assert_eq!(outcome.violations[0].axis, Axis::X);
//! ```

use super::{Axis, AxisLimits, Displacement, MachinePosition};

/// Which side of the travel range a request crossed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    Min,
    Max,
}

/// A single-axis limit violation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Violation {
    /// Axis that would have left its range.
    pub axis: Axis,
    /// Bound that was crossed.
    pub bound: Bound,
    /// Raw requested coordinate.
    pub requested: f64,
    /// Coordinate the target was pinned to.
    pub limit: f64,
}

/// Result of clamping a jog request.
#[derive(Debug, Clone, PartialEq)]
pub struct ClampOutcome {
    /// Target position after clamping.
    pub target: MachinePosition,
    /// Delta safe to send to the machine.
    pub delta: Displacement,
    /// Axes that were clamped, in X, Y, Z order.
    pub violations: Vec<Violation>,
}

impl ClampOutcome {
    /// Returns true if any axis was clamped.
    #[must_use]
    pub fn clamped(&self) -> bool {
        !self.violations.is_empty()
    }
}

/// Clamps `delta` so that `current + delta` stays inside `limits`.
#[must_use]
pub fn clamp_request(
    limits: &AxisLimits,
    current: MachinePosition,
    delta: Displacement,
) -> ClampOutcome {
    let mut target = current.offset_by(delta);
    let mut delta = delta;
    let mut violations = Vec::new();

    for axis in Axis::ALL {
        let range = limits.range(axis);
        let requested = target.get(axis);

        let bound = if requested < range.min {
            Some((Bound::Min, range.min))
        } else if requested > range.max {
            Some((Bound::Max, range.max))
        } else {
            None
        };

        if let Some((bound, limit)) = bound {
            delta.set(axis, 0.0);
            target.set(axis, limit);
            violations.push(Violation { axis, bound, requested, limit });
        }
    }

    ClampOutcome { target, delta, violations }
}

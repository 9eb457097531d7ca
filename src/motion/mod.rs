//! # Motion Module
//!
//! Pure motion math shared by the control loop.
//!
//! This module handles:
//! - Converting button and stick events into displacement vectors
//! - Clamping requested moves against the machine's travel limits

pub mod delta;
pub mod clamp;

use std::fmt;

/// One of the three machine axes handled by the jog loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    /// All axes in machine order.
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    /// Index into ordered triples (X = 0, Y = 1, Z = 2).
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letter = match self {
            Axis::X => "x",
            Axis::Y => "y",
            Axis::Z => "z",
        };
        f.write_str(letter)
    }
}

/// Axis-aligned displacement in the machine frame.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Displacement {
    pub dx: f64,
    pub dy: f64,
    pub dz: f64,
}

impl Displacement {
    /// No motion.
    pub const ZERO: Displacement = Displacement { dx: 0.0, dy: 0.0, dz: 0.0 };

    #[must_use]
    pub const fn new(dx: f64, dy: f64, dz: f64) -> Self {
        Self { dx, dy, dz }
    }

    /// Returns true if no axis moves.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.dx == 0.0 && self.dy == 0.0 && self.dz == 0.0
    }

    /// Component along `axis`.
    #[must_use]
    pub fn get(&self, axis: Axis) -> f64 {
        match axis {
            Axis::X => self.dx,
            Axis::Y => self.dy,
            Axis::Z => self.dz,
        }
    }

    /// Sets the component along `axis`.
    pub fn set(&mut self, axis: Axis, value: f64) {
        match axis {
            Axis::X => self.dx = value,
            Axis::Y => self.dy = value,
            Axis::Z => self.dz = value,
        }
    }

    /// Scales every component by `factor`.
    #[must_use]
    pub fn scaled(self, factor: f64) -> Self {
        Self::new(self.dx * factor, self.dy * factor, self.dz * factor)
    }
}

/// Absolute machine position in millimetres.
///
/// Always re-read from the machine before a clamp; never cached across
/// dispatch cycles.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MachinePosition {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl MachinePosition {
    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Coordinate along `axis`.
    #[must_use]
    pub fn get(&self, axis: Axis) -> f64 {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
        }
    }

    /// Sets the coordinate along `axis`.
    pub fn set(&mut self, axis: Axis, value: f64) {
        match axis {
            Axis::X => self.x = value,
            Axis::Y => self.y = value,
            Axis::Z => self.z = value,
        }
    }

    /// Position after applying `delta`.
    #[must_use]
    pub fn offset_by(self, delta: Displacement) -> Self {
        Self::new(self.x + delta.dx, self.y + delta.dy, self.z + delta.dz)
    }
}

/// Travel range of a single axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisRange {
    pub min: f64,
    pub max: f64,
}

impl AxisRange {
    #[must_use]
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Returns true if `value` lies within `[min, max]`.
    #[must_use]
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Ordered (min, max) limits for X, Y and Z.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisLimits(pub [AxisRange; 3]);

impl AxisLimits {
    #[must_use]
    pub const fn new(x: AxisRange, y: AxisRange, z: AxisRange) -> Self {
        Self([x, y, z])
    }

    /// Range for `axis`.
    #[must_use]
    pub fn range(&self, axis: Axis) -> AxisRange {
        self.0[axis.index()]
    }
}

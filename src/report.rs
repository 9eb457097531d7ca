//! # Reporting Module
//!
//! Observability hook for the control loop. Clamp violations and operator
//! actions go through a [`Reporter`] instead of being printed, so the loop
//! can be exercised without capturing process output.

use tracing::{info, warn};

use crate::motion::clamp::{Bound, Violation};
use crate::motion::MachinePosition;

/// Operator-facing events raised by the control loop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Notice {
    /// The exit button was pressed.
    ExitRequested,
    /// A position was appended to the record file.
    PositionRecorded(MachinePosition),
    /// The clear position Y was captured.
    ClearPositionMarked { y: f64 },
    /// The park position X/Y was captured.
    ParkPositionMarked { x: f64, y: f64 },
    /// The tool unlock macro ran.
    ToolUnlocked,
    /// The tool lock macro ran.
    ToolLocked,
}

/// Receives diagnostics from the control loop.
pub trait Reporter: Send {
    /// A jog request was clamped on one axis.
    fn unsafe_move(&mut self, violation: &Violation);

    /// Something the operator asked for happened.
    fn notice(&mut self, notice: &Notice);
}

/// Reporter that forwards everything to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn unsafe_move(&mut self, violation: &Violation) {
        let side = match violation.bound {
            Bound::Min => "min",
            Bound::Max => "max",
        };
        warn!(
            axis = %violation.axis,
            requested = violation.requested,
            limit = violation.limit,
            "Unsafe {} move: request beyond {} limit, holding at {}",
            violation.axis,
            side,
            violation.limit
        );
    }

    fn notice(&mut self, notice: &Notice) {
        match notice {
            Notice::ExitRequested => info!("PS button pressed, leaving jog mode"),
            Notice::PositionRecorded(p) => {
                info!("Touchpad pressed: recorded position {:.3},{:.3},{:.3}", p.x, p.y, p.z)
            }
            Notice::ClearPositionMarked { y } => {
                info!("Cross pressed: clear tool position y = {:.3}", y)
            }
            Notice::ParkPositionMarked { x, y } => {
                info!("Square pressed: parked tool position x = {:.3}, y = {:.3}", x, y)
            }
            Notice::ToolUnlocked => info!("Circle pressed: tool unlocked"),
            Notice::ToolLocked => info!("Triangle pressed: tool locked"),
        }
    }
}

#[cfg(test)]
pub mod mocks {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Reporter that keeps everything it is told.
    #[derive(Clone, Default)]
    pub struct CollectingReporter {
        pub violations: Arc<Mutex<Vec<Violation>>>,
        pub notices: Arc<Mutex<Vec<Notice>>>,
    }

    impl CollectingReporter {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn get_violations(&self) -> Vec<Violation> {
            self.violations.lock().unwrap().clone()
        }

        pub fn get_notices(&self) -> Vec<Notice> {
            self.notices.lock().unwrap().clone()
        }
    }

    impl Reporter for CollectingReporter {
        fn unsafe_move(&mut self, violation: &Violation) {
            self.violations.lock().unwrap().push(*violation);
        }

        fn notice(&mut self, notice: &Notice) {
            self.notices.lock().unwrap().push(*notice);
        }
    }
}

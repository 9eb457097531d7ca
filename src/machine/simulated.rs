//! # Simulated Machine
//!
//! In-memory stand-in for the real machine. Moves are applied instantly and
//! never checked against limits, so it also shows what the clamp let through.

use async_trait::async_trait;
use std::collections::VecDeque;
use tracing::debug;

use super::Machine;
use crate::error::Result;
use crate::motion::{AxisLimits, Displacement, MachinePosition};

/// Number of recent moves kept for inspection
pub const MOVE_HISTORY_LEN: usize = 64;

/// Machine that keeps its state in memory.
#[derive(Debug, Clone)]
pub struct SimulatedMachine {
    position: MachinePosition,
    limits: AxisLimits,
    tool_locked: bool,
    recent_moves: VecDeque<Displacement>,
    move_count: u64,
}

impl SimulatedMachine {
    #[must_use]
    pub fn new(limits: AxisLimits, start: MachinePosition) -> Self {
        Self {
            position: start,
            limits,
            tool_locked: false,
            recent_moves: VecDeque::with_capacity(MOVE_HISTORY_LEN),
            move_count: 0,
        }
    }

    /// Current position without going through the async trait.
    #[must_use]
    pub fn current_position(&self) -> MachinePosition {
        self.position
    }

    /// Returns true if the tool lock macro ran last.
    #[must_use]
    pub fn tool_locked(&self) -> bool {
        self.tool_locked
    }

    /// The last [`MOVE_HISTORY_LEN`] moves received, oldest first.
    #[must_use]
    pub fn moves(&self) -> Vec<Displacement> {
        self.recent_moves.iter().copied().collect()
    }

    /// Total number of moves received.
    #[must_use]
    pub fn move_count(&self) -> u64 {
        self.move_count
    }
}

#[async_trait]
impl Machine for SimulatedMachine {
    async fn position(&mut self) -> Result<MachinePosition> {
        Ok(self.position)
    }

    async fn axis_limits(&mut self) -> Result<AxisLimits> {
        Ok(self.limits)
    }

    async fn move_by(&mut self, delta: Displacement) -> Result<()> {
        self.position = self.position.offset_by(delta);
        if self.recent_moves.len() == MOVE_HISTORY_LEN {
            self.recent_moves.pop_front();
        }
        self.recent_moves.push_back(delta);
        self.move_count += 1;
        debug!("simulated move {:?} -> {:?}", delta, self.position);
        Ok(())
    }

    async fn tool_lock(&mut self) -> Result<()> {
        self.tool_locked = true;
        Ok(())
    }

    async fn tool_unlock(&mut self) -> Result<()> {
        self.tool_locked = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motion::AxisRange;

    fn machine() -> SimulatedMachine {
        let range = AxisRange::new(0.0, 300.0);
        SimulatedMachine::new(
            AxisLimits::new(range, range, range),
            MachinePosition::new(150.0, 150.0, 150.0),
        )
    }

    #[tokio::test]
    async fn test_moves_accumulate() {
        let mut m = machine();
        m.move_by(Displacement::new(10.0, 0.0, 0.0)).await.unwrap();
        m.move_by(Displacement::new(0.0, -5.0, 2.0)).await.unwrap();

        assert_eq!(m.position().await.unwrap(), MachinePosition::new(160.0, 145.0, 152.0));
        assert_eq!(m.moves().len(), 2);
        assert_eq!(m.move_count(), 2);
    }

    #[tokio::test]
    async fn test_move_history_is_capped() {
        let mut m = machine();
        for i in 0..(MOVE_HISTORY_LEN + 10) {
            m.move_by(Displacement::new(0.0, 0.0, i as f64 * 0.001)).await.unwrap();
        }

        let moves = m.moves();
        assert_eq!(moves.len(), MOVE_HISTORY_LEN);
        assert_eq!(moves[0], Displacement::new(0.0, 0.0, 10.0 * 0.001));
        assert_eq!(m.move_count(), (MOVE_HISTORY_LEN + 10) as u64);
    }

    #[tokio::test]
    async fn test_tool_lock_state() {
        let mut m = machine();
        assert!(!m.tool_locked());
        m.tool_lock().await.unwrap();
        assert!(m.tool_locked());
        m.tool_unlock().await.unwrap();
        assert!(!m.tool_locked());
    }

    #[test]
    fn test_limits_reported_verbatim() {
        let mut m = machine();
        let limits = tokio_test::block_on(m.axis_limits()).unwrap();
        assert_eq!(limits.range(crate::motion::Axis::Z), AxisRange::new(0.0, 300.0));
    }
}

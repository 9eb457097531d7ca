//! # Control Loop
//!
//! Polls a controller, turns its events into jog moves and tool actions, and
//! drives the machine until the operator exits.
//!
//! ## Button Mapping (PS4 layout)
//!
//! | Button | Action |
//! |--------|--------|
//! | PS | Leave jog mode |
//! | D-Pad / L1 / R1 | Large-step jog, repeated while held |
//! | Touchpad | Append current position to the record file |
//! | Cross | Mark clear position (Y) |
//! | Square | Mark park position (X, Y) |
//! | Circle | Tool unlock |
//! | Triangle | Tool lock |
//!
//! Sticks jog by `value * stick_step` (right stick one tenth of that) and
//! the triggers jog Z. Stick values at or below the axis threshold are
//! ignored.
//!
//! ## Pacing
//!
//! Every poll, including each repeat of a held button, waits for the next
//! tick of a single interval ticker. Events left in the controller after a
//! batch has been dispatched are discarded, not deferred.

use std::path::Path;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval, Interval, MissedTickBehavior};
use tracing::{debug, info};

use crate::config::Config;
use crate::controller::layout::buttons;
use crate::controller::{ControllerSource, EventKind, InputEvent};
use crate::error::Result;
use crate::machine::{CalibrationMarks, Machine};
use crate::motion::clamp::clamp_request;
use crate::motion::delta::{axis_to_delta, button_to_delta, DEFAULT_LARGE_STEP, DEFAULT_STICK_STEP};
use crate::motion::Displacement;
use crate::record::PositionRecorder;
use crate::report::{Notice, Reporter, TracingReporter};

/// Default poll interval (50Hz)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 20;

/// Default stick dead zone
pub const DEFAULT_AXIS_THRESHOLD: f64 = 0.5;

/// Lifecycle of a control loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Running,
    /// Terminal.
    Stopped,
}

/// Tunables for a control loop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoopSettings {
    /// Step for D-Pad and shoulder buttons, in millimetres.
    pub large_step: f64,
    /// Multiplier for stick and trigger values.
    pub stick_step: f64,
    /// Stick values must exceed this magnitude to move.
    pub axis_threshold: f64,
    /// Time between polls.
    pub poll_interval: Duration,
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self {
            large_step: DEFAULT_LARGE_STEP,
            stick_step: DEFAULT_STICK_STEP,
            axis_threshold: DEFAULT_AXIS_THRESHOLD,
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        }
    }
}

impl LoopSettings {
    /// Builds settings from the `[motion]` and `[controller]` sections.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            large_step: config.motion.large_step,
            stick_step: config.motion.stick_step,
            axis_threshold: config.controller.axis_threshold,
            poll_interval: Duration::from_millis(config.controller.poll_interval_ms),
        }
    }
}

/// Returns true for buttons that jog while held.
fn is_jog_button(button: u16) -> bool {
    matches!(
        button,
        buttons::L1
            | buttons::R1
            | buttons::DPAD_UP
            | buttons::DPAD_DOWN
            | buttons::DPAD_LEFT
            | buttons::DPAD_RIGHT
    )
}

/// Event dispatcher bound to one controller and one machine.
///
/// The loop owns the controller and releases it when it stops. The machine
/// and calibration marks are borrowed for the duration of the run; the loop
/// is the only writer of the marks while it runs.
pub struct ControlLoop<'a, M: Machine, C: ControllerSource> {
    machine: &'a mut M,
    controller: C,
    recorder: PositionRecorder,
    marks: &'a mut CalibrationMarks,
    settings: LoopSettings,
    reporter: Box<dyn Reporter>,
    quit: Option<watch::Receiver<bool>>,
    state: LoopState,
}

impl<'a, M: Machine, C: ControllerSource> ControlLoop<'a, M, C> {
    /// Creates a loop in the `Running` state with default settings and a
    /// tracing reporter.
    pub fn new(
        machine: &'a mut M,
        controller: C,
        recorder: PositionRecorder,
        marks: &'a mut CalibrationMarks,
    ) -> Self {
        Self {
            machine,
            controller,
            recorder,
            marks,
            settings: LoopSettings::default(),
            reporter: Box::new(TracingReporter),
            quit: None,
            state: LoopState::Running,
        }
    }

    #[must_use]
    pub fn with_settings(mut self, settings: LoopSettings) -> Self {
        self.settings = settings;
        self
    }

    #[must_use]
    pub fn with_reporter(mut self, reporter: Box<dyn Reporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Treats `true` on `quit` as a device-quit signal.
    #[must_use]
    pub fn with_quit_signal(mut self, quit: watch::Receiver<bool>) -> Self {
        self.quit = Some(quit);
        self
    }

    /// Runs until a device-quit or exit button, then releases the controller.
    ///
    /// # Errors
    ///
    /// Any controller, machine or record file error stops the loop and is
    /// returned as is.
    pub async fn run(mut self) -> Result<()> {
        let mut ticker = interval(self.settings.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            "Jog mode on {} (poll every {:?}, large step {}, stick step {})",
            self.controller.name(),
            self.settings.poll_interval,
            self.settings.large_step,
            self.settings.stick_step
        );

        while self.state == LoopState::Running {
            ticker.tick().await;

            if self.quit_requested() {
                info!("Quit signal received");
                self.state = LoopState::Stopped;
                break;
            }

            let events = self.controller.poll().await?;
            for (index, event) in events.iter().enumerate() {
                let more_pending = index + 1 < events.len();
                self.dispatch(*event, more_pending, &mut ticker).await?;
                if self.state == LoopState::Stopped {
                    break;
                }
            }

            if self.state == LoopState::Running {
                self.controller.clear().await?;
            }
        }

        info!("Jog mode off, releasing {}", self.controller.name());
        Ok(())
    }

    fn quit_requested(&self) -> bool {
        self.quit.as_ref().map_or(false, |rx| *rx.borrow())
    }

    /// Handles one event. `more_pending` is set when later events of the
    /// same batch are still waiting, which rules out a held jog.
    async fn dispatch(
        &mut self,
        event: InputEvent,
        more_pending: bool,
        ticker: &mut Interval,
    ) -> Result<()> {
        match event.kind {
            EventKind::DeviceQuit => {
                info!("Controller quit");
                self.state = LoopState::Stopped;
            }
            EventKind::ButtonDown => self.button_down(event.id, more_pending, ticker).await?,
            EventKind::ButtonUp => debug!("Button {} released, not moving", event.id),
            EventKind::AxisMotion => {
                if let Some(value) = event.value {
                    if value.abs() > self.settings.axis_threshold {
                        let delta = axis_to_delta(event.id, value, self.settings.stick_step);
                        self.step(delta).await?;
                    }
                }
            }
        }
        Ok(())
    }

    async fn button_down(
        &mut self,
        button: u16,
        more_pending: bool,
        ticker: &mut Interval,
    ) -> Result<()> {
        match button {
            buttons::PS => {
                self.reporter.notice(&Notice::ExitRequested);
                self.state = LoopState::Stopped;
            }
            b if is_jog_button(b) => {
                let delta = button_to_delta(b, self.settings.large_step);
                if more_pending {
                    // A tap (down and up in one batch) or any other event
                    // queued behind the press: one step, no repeat
                    debug!("Button {} not held, single step", b);
                    self.step(delta).await?;
                } else {
                    self.jog_while_held(delta, ticker).await?;
                }
            }
            buttons::TOUCHPAD => {
                let position = self.machine.position().await?;
                let recorded = self.recorder.record(position)?;
                self.reporter.notice(&Notice::PositionRecorded(recorded));
            }
            buttons::CROSS => {
                let y = self.machine.position().await?.y;
                self.marks.y_clear = Some(y);
                self.reporter.notice(&Notice::ClearPositionMarked { y });
            }
            buttons::SQUARE => {
                let position = self.machine.position().await?;
                self.marks.x_park = Some(position.x);
                self.marks.y_park = Some(position.y);
                self.reporter.notice(&Notice::ParkPositionMarked {
                    x: position.x,
                    y: position.y,
                });
            }
            buttons::CIRCLE => {
                self.machine.tool_unlock().await?;
                self.reporter.notice(&Notice::ToolUnlocked);
            }
            buttons::TRIANGLE => {
                self.machine.tool_lock().await?;
                self.reporter.notice(&Notice::ToolLocked);
            }
            other => debug!("Button {} has no action", other),
        }
        Ok(())
    }

    /// Repeats `delta` once per tick until the controller has anything
    /// pending.
    ///
    /// Interrupting events are consumed. A device-quit among them still
    /// stops the loop; everything else is dropped.
    async fn jog_while_held(&mut self, delta: Displacement, ticker: &mut Interval) -> Result<()> {
        let mut delta = self.step(delta).await?;

        loop {
            ticker.tick().await;

            if self.quit_requested() {
                info!("Quit signal received while jogging");
                self.state = LoopState::Stopped;
                return Ok(());
            }

            let pending = self.controller.poll().await?;
            if !pending.is_empty() {
                if pending.iter().any(|e| e.kind == EventKind::DeviceQuit) {
                    info!("Controller quit while jogging");
                    self.state = LoopState::Stopped;
                } else {
                    debug!("Jog interrupted by {} event(s)", pending.len());
                }
                return Ok(());
            }

            delta = self.step(delta).await?;
        }
    }

    /// Clamps `delta` against fresh position and limits, then moves.
    ///
    /// Returns the delta actually sent. A request clamped on every moving
    /// axis sends nothing.
    async fn step(&mut self, delta: Displacement) -> Result<Displacement> {
        if delta.is_zero() {
            return Ok(delta);
        }

        let current = self.machine.position().await?;
        let limits = self.machine.axis_limits().await?;
        let outcome = clamp_request(&limits, current, delta);

        for violation in &outcome.violations {
            self.reporter.unsafe_move(violation);
        }

        if !outcome.delta.is_zero() {
            self.machine.move_by(outcome.delta).await?;
        }
        Ok(outcome.delta)
    }
}

/// Runs a control loop with default settings until the operator exits.
///
/// Positions are appended to `record_path`; the file is not truncated.
///
/// # Errors
///
/// See [`ControlLoop::run`].
///
/// # Examples
///
/// ```no_run
/// use jog_bridge::control::start_control;
/// use jog_bridge::controller::gamepad::Gamepad;
/// use jog_bridge::machine::simulated::SimulatedMachine;
/// use jog_bridge::machine::CalibrationMarks;
/// use jog_bridge::motion::{AxisLimits, AxisRange, MachinePosition};
///
/// # async fn demo() -> jog_bridge::error::Result<()> {
/// let range = AxisRange::new(0.0, 300.0);
/// let mut machine = SimulatedMachine::new(
///     AxisLimits::new(range, range, range),
///     MachinePosition::new(150.0, 150.0, 150.0),
/// );
/// let mut marks = CalibrationMarks::default();
/// start_control(&mut machine, Gamepad::open()?, "positions.txt", &mut marks).await?;
/// # Ok(())
/// # }
/// ```
pub async fn start_control<M, C, P>(
    machine: &mut M,
    controller: C,
    record_path: P,
    marks: &mut CalibrationMarks,
) -> Result<()>
where
    M: Machine,
    C: ControllerSource,
    P: AsRef<Path>,
{
    ControlLoop::new(machine, controller, PositionRecorder::new(record_path), marks)
        .run()
        .await
}

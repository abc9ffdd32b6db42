//! Collaborator interfaces.
//!
//! The control core owns no motion, actuator or sensor hardware. Everything
//! it drives is reached through these synchronous traits; [`Machine`] bundles
//! them so the scheduler takes a single `&mut impl Machine`.

use std::time::Duration;

use carvin_common::control::error::AlarmCause;
use carvin_common::control::flags::{ControlPins, StepControl};
use carvin_common::control::report::{Feedback, StatusSnapshot};
use carvin_common::control::state::{CoolantState, Position, SpindleState};

/// Motion planner buffer.
pub trait Planner {
    /// Whether any block is queued (including the one executing).
    fn has_queued_motion(&self) -> bool;
    /// Re-plan the remaining motion from the hold point.
    fn reinitialize_after_hold(&mut self);
}

/// Step segment executor.
pub trait Stepper {
    /// Recompute the current block for a deceleration to zero.
    fn recompute_for_decel(&mut self);
    fn prime_execution_buffer(&mut self);
    fn begin_execution(&mut self);
    /// Called every tick while motion may be active.
    fn refill_execution_buffer(&mut self);
    fn set_step_control(&mut self, control: StepControl);
}

/// Spindle, coolant and parking motion.
pub trait Actuators {
    fn spindle_stop(&mut self);
    /// Immediate kill without the soft ramp.
    fn spindle_silence(&mut self);
    fn spindle_set_state(&mut self, state: SpindleState, rpm: f32);
    fn coolant_stop(&mut self);
    fn coolant_set_state(&mut self, state: CoolantState);
    /// Blocking single move; returns with the machine at `target`.
    /// A negative `rate` selects the seek rate [mm/min].
    fn execute_parking_motion(&mut self, target: &Position, rate: f64);
}

/// Inputs sampled by the scheduler.
pub trait Sensors {
    /// Current control-pin snapshot, inversion applied.
    fn control_pins(&self) -> ControlPins;
    fn door_ajar(&self) -> bool;
    fn machine_position(&self) -> Position;
    /// One-shot: true once when the sleep timeout has elapsed.
    fn sleep_timeout_elapsed(&mut self) -> bool;
    /// Filtered spindle current [ADC counts], `None` without a sense circuit.
    fn spindle_current_counts(&self) -> Option<u16>;
}

/// Settings and modal state owned elsewhere.
pub trait Settings {
    fn homing_enabled(&self) -> bool;
    /// Last programmed spindle state and speed [rpm].
    fn modal_spindle(&self) -> (SpindleState, f32);
    fn modal_coolant(&self) -> CoolantState;
    fn soft_limit_violated(&self) -> bool;
    /// Live overcurrent setting [A].
    fn spindle_current_limit_amps(&self) -> f64;
}

/// Fire-and-forget reporting.
pub trait Reporter {
    fn report_status(&mut self, status: &StatusSnapshot);
    fn report_alarm(&mut self, cause: AlarmCause);
    fn report_feedback(&mut self, feedback: Feedback);
}

/// Time source for blocking waits.
pub trait Clock {
    /// Block for `duration`.
    fn sleep(&mut self, duration: Duration);
    /// Yield until the next scheduler tick.
    fn wait_tick(&mut self);
}

/// Everything the scheduler talks to.
pub trait Machine: Planner + Stepper + Actuators + Sensors + Settings + Reporter + Clock {}

impl<T> Machine for T where T: Planner + Stepper + Actuators + Sensors + Settings + Reporter + Clock {}

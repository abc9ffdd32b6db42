//! Simulated machine.
//!
//! [`SimMachine`] implements every collaborator trait with a small
//! deterministic model: a fixed-capacity planner queue, a stepper that
//! finishes a block after a set number of refill calls, instantaneous
//! parking moves and a tick-based virtual clock. Every collaborator call is
//! recorded in an ordered log so tests can assert on call order.

pub mod script;

use std::fmt;
use std::time::Duration;

use carvin_common::consts::{SPINDLE_CURRENT_THRESHOLD_DEFAULT, TICK_RATE_HZ};
use carvin_common::control::error::AlarmCause;
use carvin_common::control::flags::{ControlPins, ExecFlags, StepControl};
use carvin_common::control::report::{Feedback, StatusSnapshot};
use carvin_common::control::state::{CoolantState, Position, SpindleState};
use carvin_common::prelude::TICK_PERIOD;
use heapless::Deque;
use serde::Serialize;
use thiserror::Error;
use tracing::{trace, warn};

use crate::controller::Controller;
use crate::hal::{Actuators, Clock, Planner, Reporter, Sensors, Settings, Stepper};
use crate::realtime::RealtimeHandle;
use crate::scheduler::TickOutcome;

pub use script::{Script, SimEvent};

/// Planner queue depth.
pub const QUEUE_CAPACITY: usize = 16;

/// Simulation parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimConfig {
    /// Refill calls needed to finish one block.
    pub refills_per_block: u16,
    /// Refill calls from a hold request to standstill.
    pub decel_refills: u16,
    pub homing_enabled: bool,
    pub spindle: SpindleState,
    pub spindle_rpm: f32,
    pub coolant: CoolantState,
    /// Overcurrent setting [A].
    pub current_limit_amps: f64,
    pub start_position: Position,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            refills_per_block: 20,
            decel_refills: 4,
            homing_enabled: true,
            spindle: SpindleState::Clockwise,
            spindle_rpm: 12_000.0,
            coolant: CoolantState::Flood,
            current_limit_amps: SPINDLE_CURRENT_THRESHOLD_DEFAULT,
            start_position: [0.0, 0.0, -20.0],
        }
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SimError {
    #[error("planner queue full ({0} blocks)")]
    QueueFull(usize),
}

/// Recorded collaborator call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "call", rename_all = "snake_case")]
pub enum SimCall {
    SpindleStop,
    SpindleSilence,
    SpindleOn { state: SpindleState, rpm: f32 },
    CoolantStop,
    CoolantOn { state: CoolantState },
    Park {
        target: Position,
        rate: f64,
        /// Step control carried `EXECUTE_PARK` during the move.
        execute_park: bool,
    },
    RecomputeForDecel,
    PrimeExecution,
    BeginExecution,
    ReinitializePlanner,
    StepControl { bits: u8 },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LogEntry {
    pub tick: u64,
    /// Door switch state at the time of the call.
    pub door_open: bool,
    #[serde(flatten)]
    pub call: SimCall,
}

#[derive(Debug, Clone, Copy)]
struct Block {
    target: Position,
    refills: u16,
}

/// Deterministic machine model.
pub struct SimMachine {
    config: SimConfig,
    rt: RealtimeHandle,

    blocks: Deque<Block, QUEUE_CAPACITY>,
    remaining: u16,
    executing: bool,
    decel: Option<u16>,
    step_control: StepControl,
    position: Position,

    pins: ControlPins,
    spindle: (SpindleState, f32),
    coolant: CoolantState,
    spindle_counts: Option<u16>,
    sleep_pending: bool,
    soft_limit: bool,

    tick: u64,
    events: Vec<(u64, SimEvent)>,

    log: Vec<LogEntry>,
    statuses: Vec<StatusSnapshot>,
    alarms: Vec<AlarmCause>,
    feedback: Vec<Feedback>,
    sink: Option<Box<dyn Reporter>>,
}

impl fmt::Debug for SimMachine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimMachine")
            .field("tick", &self.tick)
            .field("position", &self.position)
            .field("queued", &self.blocks.len())
            .field("executing", &self.executing)
            .field("pins", &self.pins)
            .finish_non_exhaustive()
    }
}

impl SimMachine {
    pub fn new(config: SimConfig, rt: RealtimeHandle) -> Self {
        Self {
            config,
            rt,
            blocks: Deque::new(),
            remaining: 0,
            executing: false,
            decel: None,
            step_control: StepControl::NORMAL_OP,
            position: config.start_position,
            pins: ControlPins::empty(),
            spindle: (SpindleState::Disabled, 0.0),
            coolant: CoolantState::Disabled,
            spindle_counts: None,
            sleep_pending: false,
            soft_limit: false,
            tick: 0,
            events: Vec::new(),
            log: Vec::new(),
            statuses: Vec::new(),
            alarms: Vec::new(),
            feedback: Vec::new(),
            sink: None,
        }
    }

    /// Forward every report to `sink` as well as recording it.
    pub fn with_reporter(mut self, sink: Box<dyn Reporter>) -> Self {
        self.sink = Some(sink);
        self
    }

    // ─── Scripting ──────────────────────────────────────────────────

    pub fn queue_block(&mut self, target: Position) -> Result<(), SimError> {
        let block = Block {
            target,
            refills: self.config.refills_per_block.max(1),
        };
        self.blocks
            .push_back(block)
            .map_err(|_| SimError::QueueFull(QUEUE_CAPACITY))
    }

    /// Apply `event` once the clock reaches `at_tick`.
    pub fn schedule(&mut self, at_tick: u64, event: SimEvent) {
        let index = self.events.partition_point(|(at, _)| *at <= at_tick);
        self.events.insert(index, (at_tick, event));
    }

    /// Apply `event` now.
    pub fn apply(&mut self, event: SimEvent) {
        trace!(tick = self.tick, ?event, "sim event");
        match event {
            SimEvent::Raise(flags) => self.rt.raise_event(flags),
            SimEvent::Alarm(flags) => self.rt.raise_alarm(flags),
            SimEvent::OpenDoor => self.change_pins(ControlPins::SAFETY_DOOR, true),
            SimEvent::CloseDoor => self.change_pins(ControlPins::SAFETY_DOOR, false),
            SimEvent::PressButton => self.change_pins(ControlPins::CYCLE_START, true),
            SimEvent::ReleaseButton => self.change_pins(ControlPins::CYCLE_START, false),
            SimEvent::SpindleCurrent(counts) => self.spindle_counts = counts,
            SimEvent::SleepTimeout => self.sleep_pending = true,
            SimEvent::Queue(target) => {
                if let Err(e) = self.queue_block(target) {
                    warn!("sim: {e}");
                }
            }
        }
    }

    fn change_pins(&mut self, pins: ControlPins, active: bool) {
        self.pins.set(pins, active);
        self.rt.pin_changed(self.pins);
    }

    /// Set the door switch without a pin-change notification (initial state).
    pub fn set_door(&mut self, open: bool) {
        self.pins.set(ControlPins::SAFETY_DOOR, open);
    }

    pub fn set_soft_limit(&mut self, violated: bool) {
        self.soft_limit = violated;
    }

    pub fn config_mut(&mut self) -> &mut SimConfig {
        &mut self.config
    }

    // ─── Inspection ─────────────────────────────────────────────────

    #[inline]
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Virtual time since start.
    pub fn now(&self) -> Duration {
        TICK_PERIOD.saturating_mul(u32::try_from(self.tick).unwrap_or(u32::MAX))
    }

    #[inline]
    pub fn position(&self) -> Position {
        self.position
    }

    #[inline]
    pub fn queued_blocks(&self) -> usize {
        self.blocks.len()
    }

    #[inline]
    pub fn is_executing(&self) -> bool {
        self.executing
    }

    #[inline]
    pub fn spindle_output(&self) -> (SpindleState, f32) {
        self.spindle
    }

    #[inline]
    pub fn coolant_output(&self) -> CoolantState {
        self.coolant
    }

    pub fn log(&self) -> &[LogEntry] {
        &self.log
    }

    /// Recorded calls without timestamps.
    pub fn calls(&self) -> impl Iterator<Item = &SimCall> + '_ {
        self.log.iter().map(|e| &e.call)
    }

    pub fn statuses(&self) -> &[StatusSnapshot] {
        &self.statuses
    }

    pub fn alarms(&self) -> &[AlarmCause] {
        &self.alarms
    }

    pub fn feedback(&self) -> &[Feedback] {
        &self.feedback
    }

    fn record(&mut self, call: SimCall) {
        trace!(tick = self.tick, ?call, "sim call");
        self.log.push(LogEntry {
            tick: self.tick,
            door_open: self.pins.contains(ControlPins::SAFETY_DOOR),
            call,
        });
    }
}

// ─── Collaborator impls ─────────────────────────────────────────────

impl Planner for SimMachine {
    fn has_queued_motion(&self) -> bool {
        !self.blocks.is_empty()
    }

    fn reinitialize_after_hold(&mut self) {
        self.record(SimCall::ReinitializePlanner);
    }
}

impl Stepper for SimMachine {
    fn recompute_for_decel(&mut self) {
        self.record(SimCall::RecomputeForDecel);
        if self.executing {
            self.decel = Some(self.config.decel_refills.max(1));
        }
    }

    fn prime_execution_buffer(&mut self) {
        self.record(SimCall::PrimeExecution);
        if self.remaining == 0 {
            if let Some(block) = self.blocks.front() {
                self.remaining = block.refills;
            }
        }
    }

    fn begin_execution(&mut self) {
        self.record(SimCall::BeginExecution);
        self.executing = true;
    }

    fn refill_execution_buffer(&mut self) {
        if !self.executing {
            return;
        }

        if let Some(left) = self.decel {
            if left <= 1 {
                self.decel = None;
                self.executing = false;
                self.rt.raise_event(ExecFlags::CYCLE_STOP);
            } else {
                self.decel = Some(left - 1);
            }
            return;
        }

        match self.blocks.front().map(|b| b.target) {
            Some(target) => {
                self.remaining = self.remaining.saturating_sub(1);
                if self.remaining == 0 {
                    self.position = target;
                    self.blocks.pop_front();
                    match self.blocks.front() {
                        Some(next) => self.remaining = next.refills,
                        None => {
                            self.executing = false;
                            self.rt.raise_event(ExecFlags::CYCLE_STOP);
                        }
                    }
                }
            }
            None => {
                self.executing = false;
                self.rt.raise_event(ExecFlags::CYCLE_STOP);
            }
        }
    }

    fn set_step_control(&mut self, control: StepControl) {
        self.record(SimCall::StepControl {
            bits: control.bits(),
        });
        self.step_control = control;
    }
}

impl Actuators for SimMachine {
    fn spindle_stop(&mut self) {
        self.record(SimCall::SpindleStop);
        self.spindle = (SpindleState::Disabled, 0.0);
    }

    fn spindle_silence(&mut self) {
        self.record(SimCall::SpindleSilence);
        self.spindle = (SpindleState::Disabled, 0.0);
    }

    fn spindle_set_state(&mut self, state: SpindleState, rpm: f32) {
        self.record(SimCall::SpindleOn { state, rpm });
        self.spindle = (state, rpm);
    }

    fn coolant_stop(&mut self) {
        self.record(SimCall::CoolantStop);
        self.coolant = CoolantState::Disabled;
    }

    fn coolant_set_state(&mut self, state: CoolantState) {
        self.record(SimCall::CoolantOn { state });
        self.coolant = state;
    }

    fn execute_parking_motion(&mut self, target: &Position, rate: f64) {
        self.record(SimCall::Park {
            target: *target,
            rate,
            execute_park: self.step_control.contains(StepControl::EXECUTE_PARK),
        });
        self.position = *target;
    }
}

impl Sensors for SimMachine {
    fn control_pins(&self) -> ControlPins {
        self.pins
    }

    fn door_ajar(&self) -> bool {
        self.pins.contains(ControlPins::SAFETY_DOOR)
    }

    fn machine_position(&self) -> Position {
        self.position
    }

    fn sleep_timeout_elapsed(&mut self) -> bool {
        std::mem::take(&mut self.sleep_pending)
    }

    fn spindle_current_counts(&self) -> Option<u16> {
        self.spindle_counts
    }
}

impl Settings for SimMachine {
    fn homing_enabled(&self) -> bool {
        self.config.homing_enabled
    }

    fn modal_spindle(&self) -> (SpindleState, f32) {
        (self.config.spindle, self.config.spindle_rpm)
    }

    fn modal_coolant(&self) -> CoolantState {
        self.config.coolant
    }

    fn soft_limit_violated(&self) -> bool {
        self.soft_limit
    }

    fn spindle_current_limit_amps(&self) -> f64 {
        self.config.current_limit_amps
    }
}

impl Reporter for SimMachine {
    fn report_status(&mut self, status: &StatusSnapshot) {
        self.statuses.push(*status);
        if let Some(sink) = self.sink.as_mut() {
            sink.report_status(status);
        }
    }

    fn report_alarm(&mut self, cause: AlarmCause) {
        self.alarms.push(cause);
        if let Some(sink) = self.sink.as_mut() {
            sink.report_alarm(cause);
        }
    }

    fn report_feedback(&mut self, feedback: Feedback) {
        self.feedback.push(feedback);
        if let Some(sink) = self.sink.as_mut() {
            sink.report_feedback(feedback);
        }
    }
}

impl Clock for SimMachine {
    fn sleep(&mut self, duration: Duration) {
        let ticks = (duration.as_micros() * u128::from(TICK_RATE_HZ) / 1_000_000).max(1);
        for _ in 0..ticks {
            self.wait_tick();
        }
    }

    fn wait_tick(&mut self) {
        self.tick += 1;
        let due = self.events.partition_point(|(at, _)| *at <= self.tick);
        let events: Vec<SimEvent> = self.events.drain(..due).map(|(_, e)| e).collect();
        for event in events {
            self.apply(event);
        }
    }
}

// ─── Host loop ──────────────────────────────────────────────────────

/// Tick the controller `ticks` times, advancing the clock after each tick.
/// Stops at the first abort and returns it; otherwise returns the last
/// outcome.
pub fn drive(controller: &mut Controller, sim: &mut SimMachine, ticks: u64) -> TickOutcome {
    let mut outcome = TickOutcome::Running;
    for _ in 0..ticks {
        outcome = controller.tick(sim);
        if outcome == TickOutcome::Aborted {
            return outcome;
        }
        sim.wait_tick();
    }
    outcome
}

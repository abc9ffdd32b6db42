//! Per-tick realtime scheduler.
//!
//! [`Scheduler`] is the single writer of [`MachineState`], [`SuspendFlags`]
//! and [`StepControl`]. Each call to [`Scheduler::exec_rt_system`]:
//!
//! 0. services the control panel, the spindle current monitor and the
//!    sleep timeout, raising events like any other producer;
//! 1. drains alarms (alarms beat everything);
//! 2. drains events: reset, status report, hold-class, cycle start,
//!    cycle stop (reset beats the rest, hold-class beats cycle start);
//! 3. refills the stepper while motion may be active.
//!
//! The suspend loop and blocking waits live in [`crate::controller`].

use std::time::Duration;

use carvin_common::consts::DWELL_STEP_MS;
use carvin_common::control::config::ControllerConfig;
use carvin_common::control::error::AlarmCause;
use carvin_common::control::flags::{AlarmFlags, ExecFlags, StepControl, SuspendFlags};
use carvin_common::control::report::{Feedback, StatusSnapshot};
use carvin_common::control::state::{MachineState, Position};
use tracing::{debug, error, info, warn};

use crate::hal::{Machine, Sensors, Stepper};
use crate::input::{ControlPanel, panel_from_config};
use crate::realtime::RealtimeHandle;
use crate::safety::overcurrent::OvercurrentMonitor;
use crate::state::machine::{
    Effects, Snapshot, Transition, apply_cycle_start, apply_cycle_stop, apply_hold_request,
};

/// Slice length of blocking delays.
pub const DWELL_STEP: Duration = Duration::from_millis(DWELL_STEP_MS);

/// Result of one scheduler tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Normal cycling.
    Running,
    /// A hold, door or sleep suspension is active.
    Suspended,
    /// Reset requested; the caller must reinitialize.
    Aborted,
}

/// Result of a blocking delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelayOutcome {
    Elapsed,
    /// Cut short because the door re-opened during a restore.
    Interrupted,
    Aborted,
}

/// Number of [`DWELL_STEP`] slices in `seconds`, rounded up so a delay is
/// never shorter than requested.
pub fn dwell_slices(seconds: f64) -> u64 {
    if seconds.is_nan() || seconds <= 0.0 {
        return 0;
    }
    let slices = seconds * 1000.0 / DWELL_STEP_MS as f64;
    // Exact multiples must not gain a slice from float noise.
    (slices - 1e-9).ceil().max(1.0) as u64
}

/// Realtime state machine executor.
#[derive(Debug)]
pub struct Scheduler {
    state: MachineState,
    suspend: SuspendFlags,
    step_control: StepControl,
    /// Sticky until [`Scheduler::reinitialize`].
    abort: bool,
    overcurrent: OvercurrentMonitor,
    config: ControllerConfig,
    rt: RealtimeHandle,
}

impl Scheduler {
    /// Create a scheduler with the panel selected by `[input]`.
    pub fn new(config: ControllerConfig) -> Self {
        let panel = panel_from_config(&config.input);
        Self::with_panel(config, panel)
    }

    /// Create a scheduler with a custom control panel.
    pub fn with_panel(config: ControllerConfig, panel: Box<dyn ControlPanel>) -> Self {
        let rt = RealtimeHandle::new(panel, config.safety_door.door_feature, config.sleep.enabled);
        Self {
            state: MachineState::Idle,
            suspend: SuspendFlags::empty(),
            step_control: StepControl::NORMAL_OP,
            abort: false,
            overcurrent: OvercurrentMonitor::new(config.spindle_current.threshold_amps),
            config,
            rt,
        }
    }

    // ─── Introspection ──────────────────────────────────────────────

    #[inline]
    pub const fn state(&self) -> MachineState {
        self.state
    }

    #[inline]
    pub const fn suspend_flags(&self) -> SuspendFlags {
        self.suspend
    }

    #[inline]
    pub const fn step_control(&self) -> StepControl {
        self.step_control
    }

    #[inline]
    pub const fn is_suspended(&self) -> bool {
        self.suspend.is_suspended()
    }

    #[inline]
    pub const fn is_aborted(&self) -> bool {
        self.abort
    }

    #[inline]
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::new(self.state, self.suspend, self.step_control)
    }

    #[inline]
    pub fn handle(&self) -> &RealtimeHandle {
        &self.rt
    }

    #[inline]
    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    #[inline]
    pub fn overcurrent(&self) -> &OvercurrentMonitor {
        &self.overcurrent
    }

    /// Door state with the door feature applied.
    #[inline]
    pub fn door_ajar<M: Sensors + ?Sized>(&self, m: &M) -> bool {
        self.rt.door_feature() && m.door_ajar()
    }

    pub fn status<M: Sensors + ?Sized>(&self, m: &M) -> StatusSnapshot {
        StatusSnapshot::new(
            self.state,
            self.suspend,
            self.step_control,
            m.machine_position(),
            self.door_ajar(m),
        )
    }

    // ─── Tick ───────────────────────────────────────────────────────

    /// Run one pass of the realtime system. Does nothing once aborted.
    pub fn exec_rt_system<M: Machine>(&mut self, m: &mut M) {
        if self.abort {
            return;
        }
        self.service_inputs(m);
        self.service_alarms(m);
        self.service_events(m);
        if self.abort {
            return;
        }
        if self.state.refills_stepper() {
            m.refill_execution_buffer();
        }
    }

    fn service_inputs<M: Machine>(&mut self, m: &mut M) {
        self.rt.poll_panel(self.state, m.control_pins());

        if self.config.spindle_current.enabled && self.state != MachineState::SafetyDoor {
            self.overcurrent.refresh(m.spindle_current_limit_amps());
            if let Some(counts) = m.spindle_current_counts() {
                if self.overcurrent.check(counts) {
                    warn!(
                        counts,
                        threshold = self.overcurrent.threshold_counts(),
                        "spindle overcurrent"
                    );
                    m.report_feedback(Feedback::OverCurrent { counts });
                    self.rt.raise_event(ExecFlags::SAFETY_DOOR);
                }
            }
        }

        if self.rt.sleep_feature()
            && matches!(self.state, MachineState::Idle | MachineState::Hold)
            && m.sleep_timeout_elapsed()
        {
            info!("sleep timeout elapsed");
            m.report_feedback(Feedback::SleepMode);
            self.rt.raise_event(ExecFlags::SLEEP);
        }
    }

    fn service_alarms<M: Machine>(&mut self, m: &mut M) {
        let alarms = self.rt.flags().alarm.drain();
        if alarms.is_empty() {
            return;
        }

        if let Some(cause) = alarms.cause() {
            error!(code = cause.code(), critical = alarms.is_critical(), "{cause}");
            m.report_alarm(cause);
        }
        self.set_state(MachineState::Alarm);
        self.suspend = SuspendFlags::empty();
        m.spindle_stop();
        m.coolant_stop();

        if alarms.is_critical() {
            m.report_feedback(Feedback::CriticalEvent);
            // Only a reset raised after the crash counts.
            self.rt.flags().exec.clear(ExecFlags::RESET);
            loop {
                m.wait_tick();
                if self
                    .rt
                    .flags()
                    .exec
                    .drain_and_clear(ExecFlags::STATUS_REPORT)
                    .contains(ExecFlags::STATUS_REPORT)
                {
                    let status = self.status(m);
                    m.report_status(&status);
                }
                if self.rt.pending_events().contains(ExecFlags::RESET) {
                    break;
                }
            }
            // Everything raised during the halt is superseded by the reset.
            self.rt.flags().alarm.clear(AlarmFlags::all());
        }
    }

    fn service_events<M: Machine>(&mut self, m: &mut M) {
        let events = self.rt.flags().exec.drain();
        if events.is_empty() {
            return;
        }

        if events.contains(ExecFlags::RESET) {
            info!(state = self.state.name(), "reset requested");
            self.abort = true;
            return;
        }

        if events.contains(ExecFlags::STATUS_REPORT) {
            let status = self.status(m);
            m.report_status(&status);
        }

        if events.has_hold_class() {
            let t = apply_hold_request(self.snapshot(), events);
            self.apply(m, t);
        }

        if events.contains(ExecFlags::CYCLE_START) {
            let t = apply_cycle_start(self.snapshot(), events, m.has_queued_motion());
            self.apply(m, t);
        }

        if events.contains(ExecFlags::CYCLE_STOP) {
            let t = apply_cycle_stop(self.snapshot(), m.soft_limit_violated());
            self.apply(m, t);
        }
    }

    /// Execute a transition: reports, commit, then collaborator actions.
    fn apply<M: Machine>(&mut self, m: &mut M, t: Transition) {
        if t.effects.contains(Effects::REPORT_DOOR_AJAR) {
            m.report_feedback(Feedback::SafetyDoorAjar);
        }

        self.commit(m, t.next);

        let actions = t.effects - Effects::REPORTS;
        if actions.contains(Effects::RECOMPUTE_FOR_DECEL) {
            m.recompute_for_decel();
        }
        if actions.contains(Effects::SILENCE_SPINDLE) {
            m.spindle_silence();
        }
        if actions.contains(Effects::REINITIALIZE_PLANNER) {
            m.reinitialize_after_hold();
        }
        if actions.contains(Effects::PRIME_AND_START) {
            m.prime_execution_buffer();
            m.begin_execution();
        }
        if actions.contains(Effects::BUTTON_READY) {
            m.report_feedback(Feedback::ButtonReady);
        }
    }

    fn commit<S: Stepper + ?Sized>(&mut self, m: &mut S, next: Snapshot) {
        self.set_state(next.state);
        if next.suspend != self.suspend {
            debug!(from = ?self.suspend, to = ?next.suspend, "suspend flags");
            self.suspend = next.suspend;
        }
        self.set_step_control(m, next.step_control);
    }

    // ─── Mutators for the suspend manager and commands ──────────────

    pub(crate) fn set_state(&mut self, next: MachineState) {
        if next != self.state {
            debug!(from = self.state.name(), to = next.name(), "state transition");
            self.state = next;
        }
    }

    pub(crate) fn insert_suspend(&mut self, flags: SuspendFlags) {
        self.suspend.insert(flags);
    }

    pub(crate) fn remove_suspend(&mut self, flags: SuspendFlags) {
        self.suspend.remove(flags);
    }

    pub(crate) fn set_step_control<S: Stepper + ?Sized>(&mut self, m: &mut S, next: StepControl) {
        if next != self.step_control {
            self.step_control = next;
            m.set_step_control(next);
        }
    }

    /// Blocking parking move with the stepper in park mode, followed by one
    /// realtime pass so a re-opened door is seen before the next step.
    pub(crate) fn park<M: Machine>(&mut self, m: &mut M, target: &Position, rate: f64) {
        let parked = self.step_control | StepControl::EXECUTE_PARK;
        self.set_step_control(m, parked);
        m.execute_parking_motion(target, rate);
        let released = self.step_control - StepControl::EXECUTE_PARK;
        self.set_step_control(m, released);
        self.exec_rt_system(m);
    }

    /// Restore settle delay. Keeps the realtime system serviced and returns
    /// early when the door re-opens.
    pub fn door_delay<M: Machine>(&mut self, m: &mut M, seconds: f64) -> DelayOutcome {
        for _ in 0..dwell_slices(seconds) {
            if self.abort {
                return DelayOutcome::Aborted;
            }
            self.exec_rt_system(m);
            if self.abort {
                return DelayOutcome::Aborted;
            }
            if self.suspend.contains(SuspendFlags::RESTART_RETRACT) {
                return DelayOutcome::Interrupted;
            }
            m.sleep(DWELL_STEP);
        }
        DelayOutcome::Elapsed
    }

    // ─── Reset ──────────────────────────────────────────────────────

    /// Reinitialize after an abort.
    ///
    /// Interrupted motion (or a parked machine) leaves the position
    /// untrusted, so the machine comes back in `Alarm`; `Alarm` itself is
    /// sticky. Everything else comes back `Idle`.
    pub fn reinitialize<M: Machine>(&mut self, m: &mut M) {
        let previous = self.state;
        if previous.loses_position_on_reset() {
            let cause = if previous == MachineState::Homing {
                AlarmCause::HomingFail
            } else {
                AlarmCause::AbortCycle
            };
            warn!(state = previous.name(), "{cause}");
            m.report_alarm(cause);
        }
        m.spindle_stop();
        m.coolant_stop();

        self.rt.flags().exec.drain();
        self.rt.flags().alarm.drain();
        self.abort = false;
        self.suspend = SuspendFlags::empty();
        self.set_step_control(m, StepControl::NORMAL_OP);

        let next = if previous.loses_position_on_reset() || previous == MachineState::Alarm {
            MachineState::Alarm
        } else {
            MachineState::Idle
        };
        self.set_state(next);
        info!(from = previous.name(), to = next.name(), "reinitialized");
    }
}

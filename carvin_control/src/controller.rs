//! Controller: scheduler plus suspend manager.
//!
//! The host calls [`Controller::tick`] once per scheduler tick. In-firmware
//! waits (buffer sync, dwell) use the blocking forms, which keep servicing
//! the realtime system and run suspensions to completion.

use carvin_common::control::config::ControllerConfig;
use carvin_common::control::flags::{ExecFlags, StepControl, SuspendFlags};
use carvin_common::control::report::Feedback;
use carvin_common::control::state::{DelayMode, MachineState};
use tracing::{debug, info};

use crate::config::LoadError;
use crate::hal::Machine;
use crate::input::ControlPanel;
use crate::realtime::RealtimeHandle;
use crate::scheduler::{DWELL_STEP, DelayOutcome, Scheduler, TickOutcome, dwell_slices};
use crate::suspend::{ParkingContext, SuspendManager, SuspendPhase};

/// Realtime control core.
#[derive(Debug)]
pub struct Controller {
    pub(crate) scheduler: Scheduler,
    suspend: SuspendManager,
}

impl Controller {
    /// Build the controller with the panel selected by `[input]`.
    ///
    /// The configuration is validated here as well as at load time, so a
    /// hand-built config with an out-of-range parking axis or delay is
    /// rejected before the first retract.
    pub fn new(config: ControllerConfig) -> Result<Self, LoadError> {
        config.validate().map_err(LoadError::Validation)?;
        let suspend = SuspendManager::new(config.parking, config.safety_door);
        Ok(Self {
            scheduler: Scheduler::new(config),
            suspend,
        })
    }

    pub fn with_panel(
        config: ControllerConfig,
        panel: Box<dyn ControlPanel>,
    ) -> Result<Self, LoadError> {
        config.validate().map_err(LoadError::Validation)?;
        let suspend = SuspendManager::new(config.parking, config.safety_door);
        Ok(Self {
            scheduler: Scheduler::with_panel(config, panel),
            suspend,
        })
    }

    // ─── Introspection ──────────────────────────────────────────────

    #[inline]
    pub fn state(&self) -> MachineState {
        self.scheduler.state()
    }

    #[inline]
    pub fn suspend_flags(&self) -> SuspendFlags {
        self.scheduler.suspend_flags()
    }

    #[inline]
    pub fn step_control(&self) -> StepControl {
        self.scheduler.step_control()
    }

    #[inline]
    pub fn is_suspended(&self) -> bool {
        self.scheduler.is_suspended()
    }

    #[inline]
    pub fn is_aborted(&self) -> bool {
        self.scheduler.is_aborted()
    }

    /// Producer handle for pin handlers, serial receive and the stepper.
    #[inline]
    pub fn handle(&self) -> &RealtimeHandle {
        self.scheduler.handle()
    }

    #[inline]
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    #[inline]
    pub fn parking_context(&self) -> Option<&ParkingContext> {
        self.suspend.context()
    }

    // ─── Tick ───────────────────────────────────────────────────────

    /// One realtime pass plus at most one suspend phase.
    pub fn tick<M: Machine>(&mut self, m: &mut M) -> TickOutcome {
        self.scheduler.exec_rt_system(m);
        if self.scheduler.is_aborted() {
            return TickOutcome::Aborted;
        }

        if self.scheduler.is_suspended() {
            let phase = self.suspend.step(&mut self.scheduler, m);
            if phase != SuspendPhase::Idle {
                debug!(?phase, "suspend step");
            }
            if self.scheduler.is_aborted() {
                return TickOutcome::Aborted;
            }
            if self.scheduler.is_suspended() {
                return TickOutcome::Suspended;
            }
        }

        self.suspend.release();
        TickOutcome::Running
    }

    /// Blocking realtime pass: one pass, then the suspend loop until the
    /// suspension clears or a reset is requested.
    pub fn execute_realtime<M: Machine>(&mut self, m: &mut M) -> TickOutcome {
        self.scheduler.exec_rt_system(m);
        self.run_suspend(m)
    }

    fn run_suspend<M: Machine>(&mut self, m: &mut M) -> TickOutcome {
        while self.scheduler.is_suspended() {
            if self.scheduler.is_aborted() {
                return TickOutcome::Aborted;
            }
            self.suspend.step(&mut self.scheduler, m);
            self.scheduler.exec_rt_system(m);
            m.wait_tick();
        }
        self.suspend.release();
        if self.scheduler.is_aborted() {
            TickOutcome::Aborted
        } else {
            TickOutcome::Running
        }
    }

    // ─── Blocking helpers ───────────────────────────────────────────

    /// Start a cycle if anything is queued.
    pub fn auto_cycle_start<M: Machine>(&self, m: &M) {
        if m.has_queued_motion() {
            self.scheduler.handle().raise_event(ExecFlags::CYCLE_START);
        }
    }

    /// Block until all queued motion has executed.
    pub fn buffer_synchronize<M: Machine>(&mut self, m: &mut M) -> TickOutcome {
        self.auto_cycle_start(m);
        loop {
            if self.execute_realtime(m) == TickOutcome::Aborted {
                return TickOutcome::Aborted;
            }
            let state = self.scheduler.state();
            if state == MachineState::Alarm
                || (!m.has_queued_motion() && state != MachineState::Cycle)
            {
                return TickOutcome::Running;
            }
            m.wait_tick();
        }
    }

    /// Blocking delay in [`DWELL_STEP`] slices.
    pub fn dwell<M: Machine>(&mut self, m: &mut M, seconds: f64, mode: DelayMode) -> DelayOutcome {
        match mode {
            DelayMode::SafetyDoor => self.scheduler.door_delay(m, seconds),
            DelayMode::Dwell => {
                for _ in 0..dwell_slices(seconds) {
                    if self.execute_realtime(m) == TickOutcome::Aborted {
                        return DelayOutcome::Aborted;
                    }
                    m.sleep(DWELL_STEP);
                }
                DelayOutcome::Elapsed
            }
        }
    }

    // ─── Lifecycle ──────────────────────────────────────────────────

    /// Power-up or post-reset entry.
    pub fn startup<M: Machine>(&mut self, m: &mut M) -> TickOutcome {
        if self.scheduler.state() == MachineState::Alarm {
            info!("machine locked in alarm");
            m.report_feedback(Feedback::AlarmLock);
            return TickOutcome::Running;
        }

        self.scheduler.set_state(MachineState::Idle);
        if self.scheduler.door_ajar(m) {
            info!("door ajar at startup");
            self.scheduler.handle().raise_event(ExecFlags::SAFETY_DOOR);
            return self.tick(m);
        }
        TickOutcome::Running
    }

    /// Recover from an abort. See [`Scheduler::reinitialize`].
    pub fn reinitialize<M: Machine>(&mut self, m: &mut M) {
        self.scheduler.reinitialize(m);
        self.suspend.release();
    }
}

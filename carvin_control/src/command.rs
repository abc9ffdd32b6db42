//! System commands that change machine state.
//!
//! These run on the scheduler's thread of control, between ticks, so the
//! scheduler stays the only writer of [`MachineState`]. Rejections carry the
//! protocol status code in [`CommandError`].

use carvin_common::control::error::CommandError;
use carvin_common::control::flags::ExecFlags;
use carvin_common::control::report::Feedback;
use carvin_common::control::state::MachineState;
use tracing::{info, warn};

use crate::controller::Controller;
use crate::hal::Machine;

impl Controller {
    /// System commands (`$`) are accepted only in Idle or Alarm.
    pub fn require_system_command_state(&self) -> Result<(), CommandError> {
        if self.state().accepts_system_commands() {
            Ok(())
        } else {
            Err(CommandError::IdleError)
        }
    }

    /// G-code and jogging are locked out while in Alarm.
    pub fn require_gcode_state(&self) -> Result<(), CommandError> {
        if self.state() == MachineState::Alarm {
            Err(CommandError::AlarmLock)
        } else {
            Ok(())
        }
    }

    /// Kill alarm lock (`$X`). Has no effect outside Alarm.
    pub fn unlock<M: Machine>(&mut self, m: &mut M) -> Result<(), CommandError> {
        if self.state() != MachineState::Alarm {
            return Ok(());
        }
        if self.scheduler.door_ajar(m) {
            warn!("unlock refused, door ajar");
            return Err(CommandError::CheckDoor);
        }
        m.report_feedback(Feedback::AlarmUnlock);
        self.scheduler.set_state(MachineState::Idle);
        info!("alarm unlocked");
        Ok(())
    }

    /// Toggle check mode (`$C`). Leaving check mode goes through a reset.
    pub fn toggle_check_mode<M: Machine>(&mut self, m: &mut M) -> Result<(), CommandError> {
        match self.state() {
            MachineState::CheckMode => {
                self.handle().raise_event(ExecFlags::RESET);
                m.report_feedback(Feedback::Disabled);
                info!("check mode disabled");
                Ok(())
            }
            MachineState::Idle => {
                self.scheduler.set_state(MachineState::CheckMode);
                m.report_feedback(Feedback::Enabled);
                info!("check mode enabled");
                Ok(())
            }
            _ => Err(CommandError::IdleError),
        }
    }

    /// Toggle the door interlock and the sleep timeout together (`$D`).
    pub fn toggle_door_feature<M: Machine>(&mut self, m: &mut M) -> Result<(), CommandError> {
        self.require_system_command_state()?;
        let (door, sleep) = self.handle().toggle_features();
        info!(door, sleep, "door and sleep features toggled");
        m.report_feedback(Feedback::Features { door, sleep });
        Ok(())
    }

    /// Enter the homing cycle (`$H`).
    pub fn begin_homing<M: Machine>(&mut self, m: &mut M) -> Result<(), CommandError> {
        self.require_system_command_state()?;
        if !m.homing_enabled() {
            return Err(CommandError::SettingDisabled);
        }
        if self.scheduler.door_ajar(m) {
            return Err(CommandError::CheckDoor);
        }
        self.scheduler.set_state(MachineState::Homing);
        info!("homing cycle started");
        Ok(())
    }

    /// Homing motion finished. An aborted cycle is left to reinitialize.
    pub fn finish_homing(&mut self) {
        if self.is_aborted() || self.state() != MachineState::Homing {
            return;
        }
        self.scheduler.set_state(MachineState::Idle);
        info!("homing cycle complete");
    }
}

//! Alarm causes and command status codes.
//!
//! Alarm-class faults force `MachineState::Alarm`; hard and soft limits are
//! additionally critical. Command rejections are returned synchronously to
//! the caller and never change state.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Reported cause of an alarm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum AlarmCause {
    /// Hard limit switch tripped. **CRITICAL**.
    HardLimit = 1,
    /// Target beyond the soft travel limits. **CRITICAL**.
    SoftLimit = 2,
    /// Reset while in motion; position may be lost.
    AbortCycle = 3,
    /// Probe cycle ended without contact.
    ProbeFail = 4,
    /// Homing cycle failed to find the switches.
    HomingFail = 5,
}

impl AlarmCause {
    /// Numeric code used in `ALARM:n` lines.
    #[inline]
    pub const fn code(&self) -> u8 {
        *self as u8
    }

    /// Human-readable cause.
    pub const fn message(&self) -> &'static str {
        match self {
            Self::HardLimit => "Hard limit",
            Self::SoftLimit => "Soft limit",
            Self::AbortCycle => "Abort during cycle",
            Self::ProbeFail => "Probe fail",
            Self::HomingFail => "Homing fail",
        }
    }

    /// Whether this cause belongs to the critical (limit) class.
    #[inline]
    pub const fn is_limit(&self) -> bool {
        matches!(self, Self::HardLimit | Self::SoftLimit)
    }
}

impl std::fmt::Display for AlarmCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ALARM:{} ({})", self.code(), self.message())
    }
}

/// Command rejected by the current machine state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum CommandError {
    /// Command requires Idle (or Alarm for system commands).
    #[error("error:8 (Not idle)")]
    IdleError,
    /// Safety door is ajar.
    #[error("error:11 (Check door)")]
    CheckDoor,
    /// Feature disabled in settings (e.g. homing).
    #[error("error:5 (Setting disabled)")]
    SettingDisabled,
    /// Motion commands are locked out until the alarm is cleared.
    #[error("error:9 (Alarm lock)")]
    AlarmLock,
}

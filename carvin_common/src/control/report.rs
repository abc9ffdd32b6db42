//! Report payloads emitted by the control core.
//!
//! Reporting is fire-and-forget: the core hands these to a reporter and
//! never consumes a result.

use serde::{Deserialize, Serialize};

use super::flags::{StepControl, SuspendFlags};
use super::state::{MachineState, Position};

/// Point-in-time status, emitted on `STATUS_REPORT`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub state: MachineState,
    /// Raw `SuspendFlags` bits.
    pub suspend: u8,
    /// Raw `StepControl` bits.
    pub step_control: u8,
    pub machine_position: Position,
    pub door_ajar: bool,
}

impl StatusSnapshot {
    pub fn new(
        state: MachineState,
        suspend: SuspendFlags,
        step_control: StepControl,
        machine_position: Position,
        door_ajar: bool,
    ) -> Self {
        Self {
            state,
            suspend: suspend.bits(),
            step_control: step_control.bits(),
            machine_position,
            door_ajar,
        }
    }

    #[inline]
    pub fn suspend_flags(&self) -> SuspendFlags {
        SuspendFlags::from_bits_truncate(self.suspend)
    }
}

/// Feedback messages and operator cues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Feedback {
    /// Critical alarm: everything halted until reset.
    CriticalEvent,
    /// Machine came up in Alarm; unlock or home first.
    AlarmLock,
    /// Alarm cleared by the unlock command.
    AlarmUnlock,
    /// Safety door opened.
    SafetyDoorAjar,
    /// Door closed after a retract; the button now resumes (button throbs).
    ResumeReady,
    /// Cycle started or resumed (button solid).
    ButtonReady,
    /// Check mode enabled.
    Enabled,
    /// Check mode disabled.
    Disabled,
    /// Spindle current above the trip level [ADC counts].
    OverCurrent { counts: u16 },
    /// Sleep timeout elapsed; parking and powering down.
    SleepMode,
    /// Door interlock and sleep timeout after a feature toggle.
    Features { door: bool, sleep: bool },
}

impl Feedback {
    pub const fn message(&self) -> &'static str {
        match self {
            Self::CriticalEvent => "Reset to continue",
            Self::AlarmLock => "'$H'|'$X' to unlock",
            Self::AlarmUnlock => "Caution: Unlocked",
            Self::SafetyDoorAjar => "Check Door",
            Self::ResumeReady => "Door closed, press button to resume",
            Self::ButtonReady => "Running",
            Self::Enabled => "Enabled",
            Self::Disabled => "Disabled",
            Self::OverCurrent { .. } => "OverCurrent",
            Self::SleepMode => "Sleeping",
            Self::Features { .. } => "Features",
        }
    }
}

impl std::fmt::Display for Feedback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OverCurrent { counts } => write!(f, "[OverCurrent:{counts}]"),
            Self::Features { door, sleep } => {
                write!(f, "[Door Feature {} Sleep Feature {}]", u8::from(*door), u8::from(*sleep))
            }
            other => write!(f, "[{}]", other.message()),
        }
    }
}

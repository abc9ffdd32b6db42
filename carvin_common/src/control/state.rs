//! State enums for the realtime control core.
//!
//! All enums use `#[repr(u8)]` for compact layout and serialize by name for
//! status reports. `MachineState` is the single process-wide machine state,
//! written only by the scheduler.

use serde::{Deserialize, Serialize};

use crate::consts::N_AXIS;

/// Machine position vector in machine coordinates [mm].
pub type Position = [f64; N_AXIS];

// ─── Machine State ──────────────────────────────────────────────────

/// Global machine state.
///
/// Only `Idle` and `Alarm` accept system commands, only `Cycle` executes
/// queued motion, and `Alarm` is sticky until an unlock or reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[repr(u8)]
pub enum MachineState {
    /// Ready, nothing executing.
    #[default]
    Idle = 0,
    /// Queued motion is executing.
    Cycle = 1,
    /// Feed hold active or complete.
    Hold = 2,
    /// Safety door ajar; holds and de-energizes.
    SafetyDoor = 3,
    /// Parked and de-energized; only reset exits.
    Sleep = 4,
    /// Homing cycle running.
    Homing = 5,
    /// Job-fatal fault; requires unlock or reset.
    Alarm = 6,
    /// G-code check mode; planner and motion locked out.
    CheckMode = 7,
    /// Motion cancel decelerating back to idle.
    MotionCancel = 8,
}

impl MachineState {
    /// Convert from raw `u8`. Returns `None` for invalid values.
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Idle),
            1 => Some(Self::Cycle),
            2 => Some(Self::Hold),
            3 => Some(Self::SafetyDoor),
            4 => Some(Self::Sleep),
            5 => Some(Self::Homing),
            6 => Some(Self::Alarm),
            7 => Some(Self::CheckMode),
            8 => Some(Self::MotionCancel),
            _ => None,
        }
    }

    /// Whether `$`-style system and configuration commands are accepted.
    #[inline]
    pub const fn accepts_system_commands(&self) -> bool {
        matches!(self, Self::Idle | Self::Alarm)
    }

    /// Whether queued motion is allowed to execute.
    #[inline]
    pub const fn executes_motion(&self) -> bool {
        matches!(self, Self::Cycle)
    }

    /// States in which the stepper execution buffer must be refilled every tick.
    #[inline]
    pub const fn refills_stepper(&self) -> bool {
        matches!(
            self,
            Self::Cycle
                | Self::Hold
                | Self::MotionCancel
                | Self::SafetyDoor
                | Self::Sleep
                | Self::Homing
        )
    }

    /// States that accept hold-class requests (everything but Alarm and CheckMode).
    #[inline]
    pub const fn accepts_hold(&self) -> bool {
        !matches!(self, Self::Alarm | Self::CheckMode)
    }

    /// States in which a reset interrupts machine motion or a parked machine,
    /// so position can no longer be trusted afterwards.
    #[inline]
    pub const fn loses_position_on_reset(&self) -> bool {
        matches!(
            self,
            Self::Cycle
                | Self::Hold
                | Self::SafetyDoor
                | Self::Sleep
                | Self::Homing
                | Self::MotionCancel
        )
    }

    /// Short upper-case name used in status reports.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Cycle => "Run",
            Self::Hold => "Hold",
            Self::SafetyDoor => "Door",
            Self::Sleep => "Sleep",
            Self::Homing => "Home",
            Self::Alarm => "Alarm",
            Self::CheckMode => "Check",
            Self::MotionCancel => "Cancel",
        }
    }
}

// ─── Modal Actuator State ───────────────────────────────────────────

/// Modal spindle state as last programmed (M3/M4/M5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[repr(u8)]
pub enum SpindleState {
    #[default]
    Disabled = 0,
    Clockwise = 1,
    CounterClockwise = 2,
}

/// Modal coolant state as last programmed (M7/M8/M9).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[repr(u8)]
pub enum CoolantState {
    #[default]
    Disabled = 0,
    Flood = 1,
    Mist = 2,
}

/// Why a blocking delay is running; decides which events cut it short.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DelayMode {
    /// Program dwell (G4). Services the full realtime loop, suspensions included.
    Dwell,
    /// Safety-door restore settle delay. Ends early when the door re-opens.
    SafetyDoor,
}

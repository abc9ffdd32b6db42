//! Flag bitsets shared between the realtime producers and the scheduler.
//!
//! `ExecFlags` and `AlarmFlags` are the pending-request words written from
//! any context and drained by the scheduler. `SuspendFlags` and
//! `StepControl` are owned by the scheduler and the suspend manager.
//! `ControlPins` is the debounced snapshot of the physical control inputs.

use bitflags::bitflags;
use static_assertions::const_assert_eq;

use super::error::AlarmCause;
use super::state::MachineState;

bitflags! {
    /// Pending realtime requests.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ExecFlags: u8 {
        /// Emit a status snapshot.
        const STATUS_REPORT = 0x01;
        /// Start or resume queued motion.
        const CYCLE_START   = 0x02;
        /// Raised by the stepper when a hold or the motion queue completes.
        const CYCLE_STOP    = 0x04;
        /// Decelerate to a hold.
        const FEED_HOLD     = 0x08;
        /// Abort everything and reinitialize.
        const RESET         = 0x10;
        /// Door opened: hold, de-energize, park.
        const SAFETY_DOOR   = 0x20;
        /// Decelerate and discard the remaining motion.
        const MOTION_CANCEL = 0x40;
        /// Park and power down until reset.
        const SLEEP         = 0x80;
    }
}

impl ExecFlags {
    /// Requests that suspend active motion.
    pub const HOLD_CLASS: Self = Self::from_bits_truncate(
        Self::MOTION_CANCEL.bits()
            | Self::FEED_HOLD.bits()
            | Self::SAFETY_DOOR.bits()
            | Self::SLEEP.bits(),
    );

    /// Hold-class requests that veto a cycle start raised in the same tick.
    /// Sleep is absent: a cycle start cannot leave Sleep anyway.
    pub const BLOCKS_CYCLE_START: Self = Self::from_bits_truncate(
        Self::FEED_HOLD.bits() | Self::MOTION_CANCEL.bits() | Self::SAFETY_DOOR.bits(),
    );

    #[inline]
    pub const fn has_hold_class(&self) -> bool {
        self.intersects(Self::HOLD_CLASS)
    }
}

impl Default for ExecFlags {
    fn default() -> Self {
        Self::empty()
    }
}

bitflags! {
    /// Pending alarms. Any bit forces `MachineState::Alarm`.
    ///
    /// `CRITICAL_EVENT` is a modifier raised together with a cause; it halts
    /// everything but reset and status reports until the operator resets.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct AlarmFlags: u8 {
        const CRITICAL_EVENT = 0x01;
        const HARD_LIMIT     = 0x02;
        const SOFT_LIMIT     = 0x04;
        const ABORT_CYCLE    = 0x08;
        const PROBE_FAIL     = 0x10;
        const HOMING_FAIL    = 0x20;
    }
}

impl AlarmFlags {
    /// Returns true if the critical modifier is set.
    #[inline]
    pub const fn is_critical(&self) -> bool {
        self.contains(Self::CRITICAL_EVENT)
    }

    /// Cause to report when several alarm bits are pending at once.
    pub fn cause(&self) -> Option<AlarmCause> {
        if self.contains(Self::HARD_LIMIT) {
            Some(AlarmCause::HardLimit)
        } else if self.contains(Self::SOFT_LIMIT) {
            Some(AlarmCause::SoftLimit)
        } else if self.contains(Self::ABORT_CYCLE) {
            Some(AlarmCause::AbortCycle)
        } else if self.contains(Self::PROBE_FAIL) {
            Some(AlarmCause::ProbeFail)
        } else if self.contains(Self::HOMING_FAIL) {
            Some(AlarmCause::HomingFail)
        } else {
            None
        }
    }
}

impl Default for AlarmFlags {
    fn default() -> Self {
        Self::empty()
    }
}

bitflags! {
    /// Suspend sub-state. Empty means no suspension is active.
    ///
    /// `INITIATE_RESTORE` is only set after `RETRACT_COMPLETE`;
    /// `RESTORE_COMPLETE` implies `RETRACT_COMPLETE` without `SAFETY_DOOR_AJAR`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SuspendFlags: u8 {
        /// The initial deceleration to a hold has finished.
        const HOLD_COMPLETE    = 0x01;
        /// Door re-opened during a restore; retract again from where we are.
        const RESTART_RETRACT  = 0x02;
        /// Retract and de-energize are done.
        const RETRACT_COMPLETE = 0x04;
        /// Operator asked to resume; restore power and position.
        const INITIATE_RESTORE = 0x08;
        /// Restore finished; the next cycle start resumes.
        const RESTORE_COMPLETE = 0x10;
        /// Door has been open since the suspension began.
        const SAFETY_DOOR_AJAR = 0x20;
        /// The suspended motion was cancelled and must not resume.
        const MOTION_CANCEL    = 0x40;
    }
}

impl SuspendFlags {
    /// Restore-phase bits rolled back when the door re-opens mid-restore.
    pub const RESTORE_PHASE: Self = Self::from_bits_truncate(
        Self::RETRACT_COMPLETE.bits()
            | Self::INITIATE_RESTORE.bits()
            | Self::RESTORE_COMPLETE.bits(),
    );

    /// Bits that forbid re-energizing actuators.
    pub const BLOCKS_ENERGIZE: Self = Self::from_bits_truncate(
        Self::RESTART_RETRACT.bits() | Self::SAFETY_DOOR_AJAR.bits(),
    );

    /// Whether any suspension is active.
    #[inline]
    pub const fn is_suspended(&self) -> bool {
        !self.is_empty()
    }
}

impl Default for SuspendFlags {
    fn default() -> Self {
        Self::empty()
    }
}

bitflags! {
    /// How the stepper interprets the buffered motion. Empty is normal operation.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct StepControl: u8 {
        /// Nothing is moving; end the block immediately.
        const END_MOTION   = 0x02;
        /// Decelerate the buffered motion to a hold.
        const EXECUTE_HOLD = 0x04;
        /// A parking motion owns the stepper.
        const EXECUTE_PARK = 0x08;
    }
}

impl StepControl {
    pub const NORMAL_OP: Self = Self::empty();

    /// Dominant mode, hold taking precedence over park.
    pub const fn mode(&self) -> StepControlMode {
        if self.contains(Self::EXECUTE_HOLD) {
            StepControlMode::ExecuteHold
        } else if self.contains(Self::EXECUTE_PARK) {
            StepControlMode::ExecutePark
        } else if self.contains(Self::END_MOTION) {
            StepControlMode::EndMotion
        } else {
            StepControlMode::NormalOp
        }
    }
}

impl Default for StepControl {
    fn default() -> Self {
        Self::NORMAL_OP
    }
}

/// Projection of [`StepControl`] to a single mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepControlMode {
    NormalOp,
    EndMotion,
    ExecuteHold,
    ExecutePark,
}

bitflags! {
    /// Debounced control-pin snapshot (1 = triggered, inversion applied).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ControlPins: u8 {
        const RESET       = 0x01;
        const FEED_HOLD   = 0x02;
        const CYCLE_START = 0x04;
        const SAFETY_DOOR = 0x08;
    }
}

impl Default for ControlPins {
    fn default() -> Self {
        Self::empty()
    }
}

// The realtime words are stored in `AtomicU8`.
const_assert_eq!(core::mem::size_of::<ExecFlags>(), 1);
const_assert_eq!(core::mem::size_of::<AlarmFlags>(), 1);
const_assert_eq!(core::mem::size_of::<SuspendFlags>(), 1);

/// Whether a `CYCLE_START` is allowed to resume `state` given `suspend`.
#[inline]
pub const fn hold_is_resumable(state: MachineState, suspend: SuspendFlags) -> bool {
    matches!(state, MachineState::Hold | MachineState::MotionCancel)
        && suspend.contains(SuspendFlags::HOLD_COMPLETE)
}

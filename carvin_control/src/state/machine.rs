//! Machine-state transitions for hold, cycle-start and cycle-stop requests.
//!
//! Each function takes the scheduler's current [`Snapshot`] and returns the
//! next one together with the collaborator [`Effects`] to execute. Nothing
//! here touches hardware, so the whole transition table is unit-testable.
//!
//! | State      | CycleStart              | FeedHold / Cancel       | SafetyDoor             | Sleep   | CycleStop            |
//! |------------|-------------------------|-------------------------|------------------------|---------|----------------------|
//! | Idle       | start if queued         | hold complete at once   | → SafetyDoor           | → Sleep | -                    |
//! | Cycle      | -                       | → Hold / Cancel, decel  | → SafetyDoor, decel    | → Sleep | → Idle               |
//! | Hold       | resume if hold complete | stays Hold              | → SafetyDoor           | → Sleep | hold complete        |
//! | SafetyDoor | resume once restored    | stays, re-arm retract   | stays, re-arm retract  | blocked | hold complete        |
//! | Sleep      | blocked                 | n/a                     | n/a                    | n/a     | hold complete        |
//! | Alarm      | blocked                 | blocked                 | blocked                | blocked | -                    |

use bitflags::bitflags;
use carvin_common::control::flags::{ExecFlags, StepControl, SuspendFlags, hold_is_resumable};
use carvin_common::control::state::MachineState;

/// The scheduler-owned part of the control state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Snapshot {
    pub state: MachineState,
    pub suspend: SuspendFlags,
    pub step_control: StepControl,
}

impl Snapshot {
    pub const fn new(state: MachineState, suspend: SuspendFlags, step_control: StepControl) -> Self {
        Self {
            state,
            suspend,
            step_control,
        }
    }
}

bitflags! {
    /// Collaborator actions requested by a transition.
    ///
    /// Executed in bit order: reports go out before the new state is
    /// committed, everything else after.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Effects: u8 {
        /// Report the door as ajar.
        const REPORT_DOOR_AJAR     = 0x01;
        /// Stepper: re-plan the current block to decelerate.
        const RECOMPUTE_FOR_DECEL  = 0x02;
        /// Kill the spindle without the soft ramp.
        const SILENCE_SPINDLE      = 0x04;
        /// Planner: re-plan from the hold point.
        const REINITIALIZE_PLANNER = 0x08;
        /// Stepper: prime the segment buffer and start.
        const PRIME_AND_START      = 0x10;
        /// Operator cue: cycle running.
        const BUTTON_READY         = 0x20;
    }
}

impl Effects {
    /// Effects executed before the new snapshot is committed.
    pub const REPORTS: Self = Self::REPORT_DOOR_AJAR;
}

impl Default for Effects {
    fn default() -> Self {
        Self::empty()
    }
}

/// Outcome of a transition function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub next: Snapshot,
    pub effects: Effects,
}

impl Transition {
    #[inline]
    pub const fn unchanged(current: Snapshot) -> Self {
        Self {
            next: current,
            effects: Effects::empty(),
        }
    }
}

// ─── Hold-Class Requests ────────────────────────────────────────────

/// Apply the hold-class bits of `events` (motion cancel, feed hold, door, sleep).
///
/// Ignored in `Alarm` and `CheckMode`, and a lone motion cancel is ignored
/// in `Idle`.
pub fn apply_hold_request(current: Snapshot, events: ExecFlags) -> Transition {
    if !events.has_hold_class() || !current.state.accepts_hold() {
        return Transition::unchanged(current);
    }
    // Cancelling nothing.
    if current.state == MachineState::Idle
        && (events & ExecFlags::HOLD_CLASS) == ExecFlags::MOTION_CANCEL
    {
        return Transition::unchanged(current);
    }

    let mut next = current;
    let mut effects = Effects::empty();

    match current.state {
        MachineState::Cycle => {
            effects |= Effects::RECOMPUTE_FOR_DECEL;
            next.step_control.insert(StepControl::EXECUTE_HOLD);
            if events.contains(ExecFlags::SAFETY_DOOR) {
                effects |= Effects::SILENCE_SPINDLE;
            }
        }
        MachineState::Idle => {
            // Nothing is moving: the hold is complete immediately.
            next.suspend = SuspendFlags::HOLD_COMPLETE;
            next.step_control = StepControl::END_MOTION;
        }
        _ => {}
    }

    if events.contains(ExecFlags::MOTION_CANCEL) {
        if next.state == MachineState::Cycle {
            next.state = MachineState::MotionCancel;
        }
        next.suspend.insert(SuspendFlags::MOTION_CANCEL);
    }

    if events.contains(ExecFlags::FEED_HOLD)
        && !matches!(next.state, MachineState::SafetyDoor | MachineState::Sleep)
    {
        next.state = MachineState::Hold;
    }

    // Any hold request during a restore backs it out to a fresh retract.
    if next.suspend.contains(SuspendFlags::INITIATE_RESTORE)
        && (current.state == MachineState::SafetyDoor || events.contains(ExecFlags::SAFETY_DOOR))
    {
        next.suspend.remove(SuspendFlags::RESTORE_PHASE);
        next.suspend.insert(SuspendFlags::RESTART_RETRACT);
    }

    if events.contains(ExecFlags::SAFETY_DOOR) {
        effects |= Effects::REPORT_DOOR_AJAR;
        if next.state != MachineState::Sleep {
            next.state = MachineState::SafetyDoor;
        }
        next.suspend.insert(SuspendFlags::SAFETY_DOOR_AJAR);
    }

    if events.contains(ExecFlags::SLEEP) && current.state != MachineState::SafetyDoor {
        next.state = MachineState::Sleep;
    }

    Transition { next, effects }
}

// ─── Cycle Start ────────────────────────────────────────────────────

/// Apply a cycle-start request.
///
/// Vetoed when a feed hold, motion cancel or door request arrived in the
/// same drain. Resumes from a completed hold or a completed door restore,
/// and starts queued motion from Idle.
pub fn apply_cycle_start(current: Snapshot, events: ExecFlags, has_queued_motion: bool) -> Transition {
    if events.intersects(ExecFlags::BLOCKS_CYCLE_START) {
        return Transition::unchanged(current);
    }

    let mut next = current;
    let mut effects = Effects::empty();

    if next.state == MachineState::SafetyDoor
        && !next.suspend.contains(SuspendFlags::SAFETY_DOOR_AJAR)
    {
        if next.suspend.contains(SuspendFlags::RESTORE_COMPLETE) {
            next.state = MachineState::Idle;
        } else if next.suspend.contains(SuspendFlags::RETRACT_COMPLETE) {
            next.suspend.insert(SuspendFlags::INITIATE_RESTORE);
        }
    }

    if next.state == MachineState::Idle || hold_is_resumable(next.state, next.suspend) {
        next.step_control = StepControl::NORMAL_OP;
        if has_queued_motion && !next.suspend.contains(SuspendFlags::MOTION_CANCEL) {
            next.suspend = SuspendFlags::empty();
            next.state = MachineState::Cycle;
            effects |= Effects::PRIME_AND_START | Effects::BUTTON_READY;
        } else {
            next.suspend = SuspendFlags::empty();
            next.state = MachineState::Idle;
        }
    }

    Transition { next, effects }
}

// ─── Cycle Stop ─────────────────────────────────────────────────────

/// Apply a cycle-stop report from the stepper.
///
/// In a suspending state the stop marks the end of the hold deceleration.
/// Otherwise motion has finished (or a soft limit forced the stop) and the
/// machine returns to Idle. Alarm, check mode and homing own their own exit.
pub fn apply_cycle_stop(current: Snapshot, soft_limit_violated: bool) -> Transition {
    let mut next = current;
    let mut effects = Effects::empty();

    match current.state {
        MachineState::Alarm | MachineState::CheckMode | MachineState::Homing => {
            return Transition::unchanged(current);
        }
        MachineState::Hold | MachineState::SafetyDoor | MachineState::Sleep
            if !soft_limit_violated =>
        {
            effects |= Effects::REINITIALIZE_PLANNER;
            if next.step_control.contains(StepControl::EXECUTE_HOLD) {
                next.suspend.insert(SuspendFlags::HOLD_COMPLETE);
            }
            next.step_control.remove(StepControl::EXECUTE_HOLD);
        }
        _ => {
            next.suspend = SuspendFlags::empty();
            next.state = MachineState::Idle;
            next.step_control = StepControl::NORMAL_OP;
        }
    }

    Transition { next, effects }
}

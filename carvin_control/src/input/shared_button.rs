//! Single front button overloaded as hold/resume, plus a door switch.
//!
//! The button is wired to the cycle-start pin. Its meaning depends on the
//! machine state at the moment the debounce window expires:
//!
//! | State      | Button      |
//! |------------|-------------|
//! | Idle       | ignored     |
//! | SafetyDoor | cycle start |
//! | otherwise  | safety door |
//!
//! The door switch is not overloaded and dispatches immediately.

use std::sync::atomic::{AtomicU16, Ordering};

use carvin_common::control::flags::{ControlPins, ExecFlags};
use carvin_common::control::state::MachineState;

use super::ControlPanel;

/// Debounced shared-button panel.
#[derive(Debug)]
pub struct SharedButtonPanel {
    /// Ticks left in the debounce window; 0 = inert.
    timer: AtomicU16,
    debounce_ticks: u16,
}

impl SharedButtonPanel {
    pub fn new(debounce_ticks: u16) -> Self {
        Self {
            timer: AtomicU16::new(0),
            debounce_ticks: debounce_ticks.max(1),
        }
    }

    /// Ticks until the pending dispatch, 0 when nothing is pending.
    #[inline]
    pub fn pending_ticks(&self) -> u16 {
        self.timer.load(Ordering::Acquire)
    }

    fn dispatch(state: MachineState, pins: ControlPins) -> ExecFlags {
        if pins.contains(ControlPins::CYCLE_START) {
            match state {
                MachineState::Idle => ExecFlags::empty(),
                MachineState::SafetyDoor => ExecFlags::CYCLE_START,
                _ => ExecFlags::SAFETY_DOOR,
            }
        } else if pins.contains(ControlPins::SAFETY_DOOR) {
            ExecFlags::SAFETY_DOOR
        } else {
            ExecFlags::empty()
        }
    }
}

impl ControlPanel for SharedButtonPanel {
    fn pin_changed(&self, pins: ControlPins) -> ExecFlags {
        if pins.contains(ControlPins::RESET) {
            return ExecFlags::RESET;
        }
        if pins.contains(ControlPins::SAFETY_DOOR) && !pins.contains(ControlPins::CYCLE_START) {
            return ExecFlags::SAFETY_DOOR;
        }
        // Re-arm: the raw state at expiry is what counts.
        self.timer.store(self.debounce_ticks, Ordering::Release);
        ExecFlags::empty()
    }

    fn poll(&self, state: MachineState, pins: ControlPins) -> ExecFlags {
        let previous = self
            .timer
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |t| t.checked_sub(1));
        match previous {
            Ok(1) => Self::dispatch(state, pins),
            _ => ExecFlags::empty(),
        }
    }
}

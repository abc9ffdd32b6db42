//! Separate reset, cycle-start, feed-hold and door pins.

use carvin_common::control::flags::{ControlPins, ExecFlags};
use carvin_common::control::state::MachineState;

use super::ControlPanel;

/// One pin per request, dispatched immediately.
///
/// When several pins are asserted together only the highest-priority one
/// is dispatched: reset, cycle start, feed hold, door.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectPanel;

impl ControlPanel for DirectPanel {
    fn pin_changed(&self, pins: ControlPins) -> ExecFlags {
        if pins.contains(ControlPins::RESET) {
            ExecFlags::RESET
        } else if pins.contains(ControlPins::CYCLE_START) {
            ExecFlags::CYCLE_START
        } else if pins.contains(ControlPins::FEED_HOLD) {
            ExecFlags::FEED_HOLD
        } else if pins.contains(ControlPins::SAFETY_DOOR) {
            ExecFlags::SAFETY_DOOR
        } else {
            ExecFlags::empty()
        }
    }

    #[inline]
    fn poll(&self, _state: MachineState, _pins: ControlPins) -> ExecFlags {
        ExecFlags::empty()
    }
}

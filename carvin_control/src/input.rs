//! Control-input module root.
//!
//! Translates raw control-pin notifications into logical realtime events.
//! The mapping is panel specific and lives behind [`ControlPanel`]; panels
//! only return events to raise and never change machine state.

pub mod direct;
pub mod shared_button;

use carvin_common::control::config::{InputConfig, PanelKind};
use carvin_common::control::flags::{ControlPins, ExecFlags};
use carvin_common::control::state::MachineState;

pub use direct::DirectPanel;
pub use shared_button::SharedButtonPanel;

/// Mapping from physical control pins to realtime events.
pub trait ControlPanel: Send + Sync {
    /// Raw pin-change notification, from any context. Returns events to
    /// raise immediately; may arm internal debounce state instead.
    fn pin_changed(&self, pins: ControlPins) -> ExecFlags;

    /// Called once per scheduler tick with the current pin snapshot.
    fn poll(&self, state: MachineState, pins: ControlPins) -> ExecFlags;
}

/// Build the panel selected by `[input]`.
pub fn panel_from_config(config: &InputConfig) -> Box<dyn ControlPanel> {
    match config.panel {
        PanelKind::Direct => Box::new(DirectPanel),
        PanelKind::SharedButton => Box::new(SharedButtonPanel::new(config.debounce_ticks)),
    }
}

//! Prelude module for common re-exports.
//!
//! ```rust
//! use carvin_common::prelude::*;
//! ```

use std::time::Duration;

// ─── Logging ────────────────────────────────────────────────────────
pub use crate::config::LogLevel;

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{ConfigError, ConfigLoader, SharedConfig};
pub use crate::control::config::{ControllerConfig, PanelKind, ParkingConfig};

// ─── System Constants ───────────────────────────────────────────────
pub use crate::consts::{N_AXIS, TICK_RATE_HZ};

// ─── Control Types ──────────────────────────────────────────────────
pub use crate::control::error::{AlarmCause, CommandError};
pub use crate::control::flags::{
    AlarmFlags, ControlPins, ExecFlags, StepControl, StepControlMode, SuspendFlags,
};
pub use crate::control::report::{Feedback, StatusSnapshot};
pub use crate::control::state::{CoolantState, DelayMode, MachineState, Position, SpindleState};

/// Nominal scheduler tick period.
pub const TICK_PERIOD: Duration = Duration::from_micros(1_000_000 / TICK_RATE_HZ as u64);

//! # Carvin Control Core
//!
//! Realtime control core of the Carvin CNC firmware: the event flags shared
//! with interrupt-style producers, the control-input debouncer, the
//! per-tick scheduler that owns the machine state, and the suspend manager
//! that parks the spindle when the safety door opens and restores it when
//! the operator resumes.
//!
//! ## Layers
//!
//! 1. **realtime** - lock-free event and alarm flags plus the producer handle
//! 2. **input** - control panels mapping pins to events (debounced front button)
//! 3. **scheduler** - single writer of machine state, suspend flags and step control
//! 4. **suspend** - retract / await / restore with single-axis parking
//! 5. **controller** - tick loop, blocking waits, lifecycle
//!
//! All hardware is reached through the traits in [`hal`]; [`sim`] provides
//! a deterministic implementation for tests and the host binary.

pub mod command;
pub mod config;
pub mod controller;
pub mod hal;
pub mod input;
pub mod realtime;
pub mod report;
pub mod safety;
pub mod scheduler;
pub mod sim;
pub mod state;
pub mod suspend;

pub use controller::Controller;
pub use realtime::RealtimeHandle;
pub use scheduler::{DelayOutcome, TickOutcome};

//! Suspend manager module root.
//!
//! Sequences the safety-door and sleep choreography while a suspension is
//! active: hold, de-energize and retract, wait for the door, restore power
//! and position, resume.

pub mod manager;
pub mod parking;

pub use manager::{SuspendManager, SuspendPhase};
pub use parking::ParkingContext;

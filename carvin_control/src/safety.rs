//! Safety module root.
//!
//! Spindle overcurrent supervision. Door and alarm handling live in the
//! scheduler since they are realtime events like any other.

pub mod overcurrent;

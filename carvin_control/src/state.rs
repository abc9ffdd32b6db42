//! State machine module root.
//!
//! Pure transition functions for the scheduler's machine state, suspend
//! flags and step control. The scheduler executes the returned effects.

pub mod machine;

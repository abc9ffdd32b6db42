//! Control core shared types.
//!
//! Everything exchanged between the scheduler, the realtime producers and
//! the reporting side lives here: state enums, flag bitsets, alarm causes,
//! command status codes, report payloads and configuration structures.

pub mod config;
pub mod error;
pub mod flags;
pub mod report;
pub mod state;

//! Carvin Common Library
//!
//! Shared constants, types and configuration loading for the Carvin
//! control workspace.
//!
//! # Module Structure
//!
//! - [`consts`] - Timing windows, axis counts and factory defaults
//! - [`control`] - State enums, flag bitsets, reports and controller config
//! - [`config`] - Configuration loading traits and types
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! Add to your `Cargo.toml` with alias for shorter imports:
//! ```toml
//! [dependencies]
//! carvin = { package = "carvin_common", path = "../carvin_common" }
//! ```
//!
//! Then import:
//! ```rust
//! use carvin_common::control::flags::ExecFlags;
//! use carvin_common::config::{ConfigLoader, SharedConfig};
//! ```

pub mod config;
pub mod consts;
pub mod control;
pub mod prelude;

//! Configuration structures for the control core.
//!
//! All config types use `serde::Deserialize` for TOML loading.
//! Numeric parameters carry `MIN`/`MAX` bounds checked by `validate()`.
//! Every table and field is optional; omitted values fall back to the
//! factory defaults in [`crate::consts`].

use serde::{Deserialize, Serialize};

use crate::config::SharedConfig;
use crate::consts::{
    DEBOUNCE_TICKS_DEFAULT, DEBOUNCE_TICKS_MAX, DEBOUNCE_TICKS_MIN, N_AXIS,
    PARKING_AXIS_DEFAULT, PARKING_PULLOUT_INCREMENT_DEFAULT, PARKING_PULLOUT_RATE_DEFAULT,
    PARKING_RATE_DEFAULT, PARKING_TARGET_DEFAULT, SAFETY_DOOR_COOLANT_DELAY_DEFAULT,
    SAFETY_DOOR_DELAY_MAX, SAFETY_DOOR_SPINDLE_DELAY_DEFAULT, SPINDLE_CURRENT_SETTING_MAX,
    SPINDLE_CURRENT_THRESHOLD_DEFAULT,
};

// ─── Top-Level Config ───────────────────────────────────────────────

/// Top-level control core configuration.
///
/// ```toml
/// [input]
/// panel = "shared_button"
/// debounce_ticks = 8
///
/// [parking]
/// enabled = true
/// target = -5.0
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ControllerConfig {
    #[serde(default)]
    pub shared: SharedConfig,
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub parking: ParkingConfig,
    #[serde(default)]
    pub safety_door: SafetyDoorConfig,
    #[serde(default)]
    pub sleep: SleepConfig,
    #[serde(default)]
    pub spindle_current: SpindleCurrentConfig,
}

impl ControllerConfig {
    /// Validate every table.
    pub fn validate(&self) -> Result<(), String> {
        self.shared.validate().map_err(|e| e.to_string())?;
        self.input.validate()?;
        self.parking.validate()?;
        self.safety_door.validate()?;
        self.spindle_current.validate()?;
        Ok(())
    }
}

// ─── Control Inputs ─────────────────────────────────────────────────

/// Physical control surface wiring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PanelKind {
    /// One front button overloaded as hold/resume plus a door switch.
    #[default]
    SharedButton,
    /// Separate reset, feed-hold, cycle-start and door pins.
    Direct,
}

/// `[input]` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    #[serde(default)]
    pub panel: PanelKind,

    /// Button debounce window [scheduler ticks] (default: 8).
    #[serde(default = "default_debounce_ticks")]
    pub debounce_ticks: u16,
}

fn default_debounce_ticks() -> u16 {
    DEBOUNCE_TICKS_DEFAULT
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            panel: PanelKind::default(),
            debounce_ticks: DEBOUNCE_TICKS_DEFAULT,
        }
    }
}

impl InputConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.debounce_ticks < DEBOUNCE_TICKS_MIN || self.debounce_ticks > DEBOUNCE_TICKS_MAX {
            return Err(format!(
                "input.debounce_ticks {} out of range [{}, {}]",
                self.debounce_ticks, DEBOUNCE_TICKS_MIN, DEBOUNCE_TICKS_MAX
            ));
        }
        Ok(())
    }
}

// ─── Parking ────────────────────────────────────────────────────────

/// `[parking]` table: single-axis retract used by safety door and sleep.
///
/// Positions are machine coordinates [mm], rates [mm/min]. A negative
/// `rate` selects the seek rate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParkingConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_parking_axis")]
    pub axis: usize,
    #[serde(default = "default_parking_target")]
    pub target: f64,
    #[serde(default = "default_parking_rate")]
    pub rate: f64,
    #[serde(default = "default_pullout_rate")]
    pub pullout_rate: f64,
    /// Slow pull-out distance before the fast retract [mm].
    #[serde(default = "default_pullout_increment")]
    pub pullout_increment: f64,
}

fn default_true() -> bool {
    true
}
fn default_parking_axis() -> usize {
    PARKING_AXIS_DEFAULT
}
fn default_parking_target() -> f64 {
    PARKING_TARGET_DEFAULT
}
fn default_parking_rate() -> f64 {
    PARKING_RATE_DEFAULT
}
fn default_pullout_rate() -> f64 {
    PARKING_PULLOUT_RATE_DEFAULT
}
fn default_pullout_increment() -> f64 {
    PARKING_PULLOUT_INCREMENT_DEFAULT
}

impl Default for ParkingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            axis: PARKING_AXIS_DEFAULT,
            target: PARKING_TARGET_DEFAULT,
            rate: PARKING_RATE_DEFAULT,
            pullout_rate: PARKING_PULLOUT_RATE_DEFAULT,
            pullout_increment: PARKING_PULLOUT_INCREMENT_DEFAULT,
        }
    }
}

impl ParkingConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.axis >= N_AXIS {
            return Err(format!(
                "parking.axis {} out of range [0, {}]",
                self.axis,
                N_AXIS - 1
            ));
        }
        if !self.target.is_finite() {
            return Err("parking.target must be finite".to_string());
        }
        if !(self.pullout_rate > 0.0) {
            return Err(format!(
                "parking.pullout_rate {} must be > 0",
                self.pullout_rate
            ));
        }
        if !(self.pullout_increment >= 0.0) {
            return Err(format!(
                "parking.pullout_increment {} must be >= 0",
                self.pullout_increment
            ));
        }
        if self.rate == 0.0 || self.rate.is_nan() {
            return Err("parking.rate must be non-zero (negative selects seek rate)".to_string());
        }
        Ok(())
    }
}

// ─── Safety Door ────────────────────────────────────────────────────

/// `[safety_door]` table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SafetyDoorConfig {
    /// When false the door switch is ignored entirely.
    #[serde(default = "default_true")]
    pub door_feature: bool,

    /// Spindle spin-up settle time on restore [s] (default: 1.0).
    #[serde(default = "default_spindle_delay")]
    pub spindle_delay_s: f64,

    /// Coolant settle time on restore [s] (default: 1.0).
    #[serde(default = "default_coolant_delay")]
    pub coolant_delay_s: f64,
}

fn default_spindle_delay() -> f64 {
    SAFETY_DOOR_SPINDLE_DELAY_DEFAULT
}
fn default_coolant_delay() -> f64 {
    SAFETY_DOOR_COOLANT_DELAY_DEFAULT
}

impl Default for SafetyDoorConfig {
    fn default() -> Self {
        Self {
            door_feature: true,
            spindle_delay_s: SAFETY_DOOR_SPINDLE_DELAY_DEFAULT,
            coolant_delay_s: SAFETY_DOOR_COOLANT_DELAY_DEFAULT,
        }
    }
}

impl SafetyDoorConfig {
    pub fn validate(&self) -> Result<(), String> {
        for (name, value) in [
            ("spindle_delay_s", self.spindle_delay_s),
            ("coolant_delay_s", self.coolant_delay_s),
        ] {
            if !(0.0..=SAFETY_DOOR_DELAY_MAX).contains(&value) {
                return Err(format!(
                    "safety_door.{name} {value} out of range [0, {SAFETY_DOOR_DELAY_MAX}]"
                ));
            }
        }
        Ok(())
    }
}

// ─── Sleep / Spindle Current ────────────────────────────────────────

/// `[sleep]` table. Initial value only; `$D` flips it at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SleepConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for SleepConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// `[spindle_current]` table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpindleCurrentConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Initial trip level [A]; the live setting overrides it.
    #[serde(default = "default_current_threshold")]
    pub threshold_amps: f64,
}

fn default_current_threshold() -> f64 {
    SPINDLE_CURRENT_THRESHOLD_DEFAULT
}

impl Default for SpindleCurrentConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            threshold_amps: SPINDLE_CURRENT_THRESHOLD_DEFAULT,
        }
    }
}

impl SpindleCurrentConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !(self.threshold_amps > 0.0 && self.threshold_amps <= SPINDLE_CURRENT_SETTING_MAX) {
            return Err(format!(
                "spindle_current.threshold_amps {} out of range (0, {}]",
                self.threshold_amps, SPINDLE_CURRENT_SETTING_MAX
            ));
        }
        Ok(())
    }
}

//! System-wide constants for the Carvin control core.
//!
//! Single source of truth for timing windows, axis counts and the
//! factory defaults used when a configuration field is omitted.

/// Number of machine axes (X, Y, Z).
pub const N_AXIS: usize = 3;

/// Z axis index; the default parking axis.
pub const Z_AXIS: usize = 2;

/// Nominal scheduler tick rate of the host main loop [Hz].
pub const TICK_RATE_HZ: u32 = 512;

/// Default control-button debounce window [scheduler ticks] (≈16 ms at 512 Hz).
pub const DEBOUNCE_TICKS_DEFAULT: u16 = 8;
pub const DEBOUNCE_TICKS_MIN: u16 = 1;
pub const DEBOUNCE_TICKS_MAX: u16 = 512;

/// Slice length used by blocking dwells that keep servicing realtime events [ms].
pub const DWELL_STEP_MS: u64 = 50;

/// Safety-door resume settle delays [s].
pub const SAFETY_DOOR_SPINDLE_DELAY_DEFAULT: f64 = 1.0;
pub const SAFETY_DOOR_COOLANT_DELAY_DEFAULT: f64 = 1.0;
pub const SAFETY_DOOR_DELAY_MAX: f64 = 30.0;

/// Parking motion defaults (machine coordinates, mm and mm/min).
pub const PARKING_AXIS_DEFAULT: usize = Z_AXIS;
pub const PARKING_TARGET_DEFAULT: f64 = -5.0;
/// Negative rate selects the seek (rapid) rate.
pub const PARKING_RATE_DEFAULT: f64 = -1.0;
pub const PARKING_PULLOUT_RATE_DEFAULT: f64 = 500.0;
pub const PARKING_PULLOUT_INCREMENT_DEFAULT: f64 = 5.0;

/// Spindle current sense scale: 2.56 V reference over a 10-bit ADC [A/count].
pub const SPINDLE_CURRENT_AMPS_PER_COUNT: f64 = 2.56 / 1023.0;
/// Default overcurrent trip level [A].
pub const SPINDLE_CURRENT_THRESHOLD_DEFAULT: f64 = 1.75;
/// Highest trip level a setting may request [A].
pub const SPINDLE_CURRENT_SETTING_MAX: f64 = 3.0;

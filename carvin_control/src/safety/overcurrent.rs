//! Spindle overcurrent monitor.
//!
//! The sense circuit reports filtered ADC counts (2.56 V reference, 10 bit).
//! The trip level comes from a live setting in amps, clamped to
//! [`SPINDLE_CURRENT_SETTING_MAX`], and is re-derived whenever the setting
//! changes.

use carvin_common::consts::{
    SPINDLE_CURRENT_AMPS_PER_COUNT, SPINDLE_CURRENT_SETTING_MAX, SPINDLE_CURRENT_THRESHOLD_DEFAULT,
};
use tracing::debug;

/// Convert a trip level [A] to ADC counts.
pub fn amps_to_counts(amps: f64) -> u16 {
    let clamped = if amps.is_nan() {
        SPINDLE_CURRENT_THRESHOLD_DEFAULT
    } else {
        amps.clamp(0.0, SPINDLE_CURRENT_SETTING_MAX)
    };
    (clamped / SPINDLE_CURRENT_AMPS_PER_COUNT) as u16
}

/// Convert ADC counts to amps.
#[inline]
pub fn counts_to_amps(counts: u16) -> f64 {
    f64::from(counts) * SPINDLE_CURRENT_AMPS_PER_COUNT
}

/// Threshold cache for the spindle current check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OvercurrentMonitor {
    limit_amps: f64,
    threshold_counts: u16,
}

impl OvercurrentMonitor {
    pub fn new(limit_amps: f64) -> Self {
        Self {
            limit_amps,
            threshold_counts: amps_to_counts(limit_amps),
        }
    }

    /// Re-derive the trip level if the stored setting changed.
    /// Returns true when the threshold was updated.
    pub fn refresh(&mut self, limit_amps: f64) -> bool {
        if limit_amps.to_bits() == self.limit_amps.to_bits() {
            return false;
        }
        self.limit_amps = limit_amps;
        self.threshold_counts = amps_to_counts(limit_amps);
        debug!(
            limit_amps,
            threshold_counts = self.threshold_counts,
            "spindle current threshold updated"
        );
        true
    }

    /// Whether `counts` exceeds the trip level.
    #[inline]
    pub const fn check(&self, counts: u16) -> bool {
        counts > self.threshold_counts
    }

    #[inline]
    pub const fn threshold_counts(&self) -> u16 {
        self.threshold_counts
    }

    #[inline]
    pub const fn limit_amps(&self) -> f64 {
        self.limit_amps
    }
}

impl Default for OvercurrentMonitor {
    fn default() -> Self {
        Self::new(SPINDLE_CURRENT_THRESHOLD_DEFAULT)
    }
}

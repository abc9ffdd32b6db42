//! Parking context.
//!
//! Captured when a retract begins and kept by value until the restore
//! completes, the suspension ends or the machine is reinitialized.

use carvin_common::control::config::ParkingConfig;
use carvin_common::control::state::Position;

/// Positions used by one retract/restore sequence [mm, machine coordinates].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParkingContext {
    /// Where the interrupted motion stopped; the plunge returns here.
    pub restore_target: Position,
    /// Where the machine currently is on the parking path.
    pub parking_target: Position,
    /// End of the slow pull-out on the parking axis.
    pub retract_waypoint: f64,
}

impl ParkingContext {
    /// Snapshot `current` as the restore point and derive the pull-out
    /// waypoint, never beyond the park target.
    pub fn capture(current: Position, config: &ParkingConfig) -> Self {
        let retract_waypoint =
            (current[config.axis] + config.pullout_increment).min(config.target);
        Self {
            restore_target: current,
            parking_target: current,
            retract_waypoint,
        }
    }

    /// Continue a retract from `current` after a restore was interrupted,
    /// keeping the original restore point.
    #[inline]
    pub fn resume_from(self, current: Position) -> Self {
        Self {
            parking_target: current,
            ..self
        }
    }

    /// Parking axis value of the current parking position.
    #[inline]
    pub fn parked_axis(&self, config: &ParkingConfig) -> f64 {
        self.parking_target[config.axis]
    }

    /// Move the parking position along the parking axis only.
    #[inline]
    pub fn set_parked_axis(&mut self, config: &ParkingConfig, value: f64) {
        self.parking_target[config.axis] = value;
    }
}

//! # Drive interfaces
//!
//! The characterisation run never talks to motors or encoders directly. It
//! commands an `ActuationPort` and samples a `TelemetryPort`, so that real
//! hardware, the simulated drivetrain, or a test double can be plugged in.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod sim;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Serialize;

pub use sim::*;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// Accepts normalised wheel speed demands.
pub trait ActuationPort {
    /// Set the left side demand, in the range `[-1, 1]`.
    fn set_left_speed(&mut self, speed: f64);

    /// Set the right side demand, in the range `[-1, 1]`.
    fn set_right_speed(&mut self, speed: f64);
}

/// Provides the drivetrain's sensor readings.
pub trait TelemetryPort {
    /// Cumulative distance travelled by the left side since the last reset.
    fn left_position(&self) -> f64;

    /// Cumulative distance travelled by the right side since the last reset.
    fn right_position(&self) -> f64;

    /// Instantaneous rate of the left side.
    fn left_rate(&self) -> f64;

    /// Instantaneous rate of the right side.
    fn right_rate(&self) -> f64;

    /// Supply (battery) voltage.
    ///
    /// Units: volts
    fn supply_voltage(&self) -> f64;

    /// Zero both encoder positions.
    fn reset_encoders(&mut self);
}

/// A drivetrain which can both be commanded and sampled.
pub trait Drivetrain: ActuationPort + TelemetryPort {
    /// Command both sides to stop.
    fn stop(&mut self) {
        self.set_left_speed(0.0);
        self.set_right_speed(0.0);
    }
}

impl<T: ActuationPort + TelemetryPort> Drivetrain for T {}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A point-in-time snapshot of the telemetry port.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Telemetry {
    pub supply_voltage_v: f64,
    pub left_pos: f64,
    pub right_pos: f64,
    pub left_rate: f64,
    pub right_rate: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Telemetry {
    /// Sample every reading of the port.
    pub fn read<P: TelemetryPort + ?Sized>(port: &P) -> Self {
        Self {
            supply_voltage_v: port.supply_voltage(),
            left_pos: port.left_position(),
            right_pos: port.right_position(),
            left_rate: port.left_rate(),
            right_rate: port.right_rate(),
        }
    }
}

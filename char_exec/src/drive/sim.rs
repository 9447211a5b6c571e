//! # Simulated drivetrain
//!
//! Each side is modelled as a first order system driven by the applied
//! voltage:
//!
//! ```text
//! d(rate)/dt = (gain * volts - rate) / time_constant
//! ```
//!
//! The model is integrated exactly between updates so any update period is
//! stable.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::trace;
use serde::{Deserialize, Serialize};

use super::{ActuationPort, TelemetryPort};
use util::maths::clamp;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Parameters of the simulated drivetrain.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SimParams {
    /// Nominal supply voltage.
    ///
    /// Units: volts
    pub supply_voltage_v: f64,

    /// Steady state rate per applied volt.
    ///
    /// Units: (distance/second)/volt
    pub rate_per_volt: f64,

    /// Time constant of the motor response.
    ///
    /// Units: seconds
    pub time_constant_s: f64,
}

/// Simulated two wheel drivetrain implementing both drive ports.
#[derive(Debug, Clone)]
pub struct SimDrivetrain {
    params: SimParams,
    left: SimSide,
    right: SimSide,
    last_update_s: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default)]
struct SimSide {
    demand: f64,
    rate: f64,
    pos: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for SimParams {
    fn default() -> Self {
        Self {
            supply_voltage_v: 7.2,
            rate_per_volt: 0.12,
            time_constant_s: 0.15,
        }
    }
}

impl SimDrivetrain {
    pub fn new(params: SimParams) -> Self {
        Self {
            params,
            left: SimSide::default(),
            right: SimSide::default(),
            last_update_s: None,
        }
    }

    /// Advance the model to the given time.
    ///
    /// The first call only sets the time reference. Calls with a time earlier
    /// than the previous one are ignored.
    pub fn update(&mut self, now_s: f64) {
        let dt = match self.last_update_s {
            Some(t) if now_s > t => now_s - t,
            Some(_) => return,
            None => {
                self.last_update_s = Some(now_s);
                return;
            }
        };
        self.last_update_s = Some(now_s);

        let p = self.params;
        self.left.step(&p, dt);
        self.right.step(&p, dt);

        trace!(
            "SimDrivetrain rates: left {:.4}, right {:.4}",
            self.left.rate,
            self.right.rate
        );
    }
}

impl SimSide {
    fn step(&mut self, params: &SimParams, dt: f64) {
        let target = params.rate_per_volt * self.demand * params.supply_voltage_v;

        // Instantaneous response if there's no time constant
        if params.time_constant_s <= 0.0 {
            self.rate = target;
            self.pos += target * dt;
            return;
        }

        let decay = (-dt / params.time_constant_s).exp();
        let error = self.rate - target;

        self.pos += target * dt + error * params.time_constant_s * (1.0 - decay);
        self.rate = target + error * decay;
    }
}

impl ActuationPort for SimDrivetrain {
    fn set_left_speed(&mut self, speed: f64) {
        self.left.demand = clamp(speed, -1.0, 1.0);
    }

    fn set_right_speed(&mut self, speed: f64) {
        self.right.demand = clamp(speed, -1.0, 1.0);
    }
}

impl TelemetryPort for SimDrivetrain {
    fn left_position(&self) -> f64 {
        self.left.pos
    }

    fn right_position(&self) -> f64 {
        self.right.pos
    }

    fn left_rate(&self) -> f64 {
        self.left.rate
    }

    fn right_rate(&self) -> f64 {
        self.right.rate
    }

    fn supply_voltage(&self) -> f64 {
        self.params.supply_voltage_v
    }

    fn reset_encoders(&mut self) {
        self.left.pos = 0.0;
        self.right.pos = 0.0;
    }
}

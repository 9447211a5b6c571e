//! Ramp profile generator

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Serialize;

// Internal
use super::{Direction, Params, ParamsError};
use util::maths::clamp;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A three phase (up, hold, down) speed profile indexed by tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RampProfile {
    ramp_ticks: u64,
    hold_ticks: u64,
    direction: Direction,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// The phase of the profile a given tick falls in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RampPhase {
    /// Demand increasing linearly from zero.
    Up,
    /// Demand held at full magnitude.
    Hold,
    /// Demand decreasing linearly back to zero.
    Down,
    /// Past the end of the profile.
    Finished,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for RampProfile {
    fn default() -> Self {
        let p = Params::default();

        Self {
            ramp_ticks: p.ramp_ticks,
            hold_ticks: p.hold_ticks,
            direction: p.direction,
        }
    }
}

impl RampProfile {
    /// Create a new profile.
    ///
    /// `ramp_ticks` must be non-zero and the index of the profile's last tick,
    /// `2 * ramp_ticks + hold_ticks`, must fit in a `u64`.
    pub fn new(ramp_ticks: u64, hold_ticks: u64, direction: Direction) -> Result<Self, ParamsError> {
        if ramp_ticks == 0 {
            return Err(ParamsError::ZeroRampTicks);
        }

        if ramp_ticks
            .checked_mul(2)
            .and_then(|r| r.checked_add(hold_ticks))
            .is_none()
        {
            return Err(ParamsError::TooManyTicks {
                ramp_ticks,
                hold_ticks,
            });
        }

        Ok(Self {
            ramp_ticks,
            hold_ticks,
            direction,
        })
    }

    /// Create a new profile from the loaded parameters.
    pub fn from_params(params: &Params) -> Result<Self, ParamsError> {
        Self::new(params.ramp_ticks, params.hold_ticks, params.direction)
    }

    /// Get the phase of the profile at the given tick.
    pub fn phase(&self, tick: u64) -> RampPhase {
        if self.is_finished(tick) {
            RampPhase::Finished
        }
        else if tick < self.ramp_ticks {
            RampPhase::Up
        }
        else if tick < self.ramp_ticks + self.hold_ticks {
            RampPhase::Hold
        }
        else {
            RampPhase::Down
        }
    }

    /// Get the speed demand at the given tick, in the range `[-1, 1]`.
    ///
    /// The ramp down is always from `+1` to `0`, whatever the direction, so a
    /// reverse profile steps from `-1` to `+1` when leaving the hold phase.
    pub fn speed(&self, tick: u64) -> f64 {
        let ramp = self.ramp_ticks as f64;
        let sign = self.direction.sign();

        let raw = match self.phase(tick) {
            RampPhase::Up => sign * tick as f64 / ramp,
            RampPhase::Hold => sign,
            RampPhase::Down | RampPhase::Finished => {
                1.0 - (tick - self.hold_ticks - self.ramp_ticks) as f64 / ramp
            }
        };

        clamp(raw, -1.0, 1.0)
    }

    /// True once the tick has passed the end of the ramp down.
    pub fn is_finished(&self, tick: u64) -> bool {
        tick > self.last_tick()
    }

    /// The last tick for which the profile drives the wheels.
    pub fn last_tick(&self) -> u64 {
        2 * self.ramp_ticks + self.hold_ticks
    }

    /// Number of ticks driven by a complete run of this profile.
    ///
    /// Saturates for a profile whose last tick is `u64::MAX`.
    pub fn num_driven_ticks(&self) -> u64 {
        self.last_tick().saturating_add(1)
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }
}

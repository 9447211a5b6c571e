//! Parameters structure for the ramp profile

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters of the ramp profile.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Params {
    /// Number of ticks taken to ramp from zero to full demand.
    ///
    /// Units: ticks
    pub ramp_ticks: u64,

    /// Number of ticks to hold full demand for before ramping down.
    ///
    /// Units: ticks
    pub hold_ticks: u64,

    /// Sign applied to the ramp up and hold phases.
    pub direction: Direction,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Direction of the ramp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Forward,
    Reverse,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Params {
    fn default() -> Self {
        Self {
            ramp_ticks: 400,
            hold_ticks: 50,
            direction: Direction::Forward,
        }
    }
}

impl Direction {
    /// `+1.0` for forward, `-1.0` for reverse.
    pub fn sign(&self) -> f64 {
        match self {
            Direction::Forward => 1.0,
            Direction::Reverse => -1.0,
        }
    }
}

//! # Characterisation Executable Parameters
//!
//! This module provide parameters for the characterisation executable.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use crate::{drive::SimParams, ramp_profile};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CharExecParams {
    /// Target period of one cycle.
    ///
    /// Units: seconds
    pub cycle_period_s: f64,

    /// Number of runs to perform before exiting.
    pub num_runs: u32,

    /// Directory to write run records into. Relative paths are relative to the session
    /// directory, if not set records go into the session's archive directory.
    pub archive_dir: Option<String>,

    /// Number of consecutive failed attempts at persisting a record before giving up.
    pub max_persist_attempts: u64,

    /// Ramp profile parameters.
    pub ramp: ramp_profile::Params,

    /// Simulated drivetrain parameters.
    pub sim: SimParams,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for CharExecParams {
    fn default() -> Self {
        Self {
            cycle_period_s: 0.02,
            num_runs: 1,
            archive_dir: None,
            max_persist_attempts: 5,
            ramp: ramp_profile::Params::default(),
            sim: SimParams::default(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ramp_profile::Direction;

    #[test]
    fn test_parse_params() {
        let p: CharExecParams = util::params::from_str(
            r#"
            cycle_period_s = 0.05
            num_runs = 2

            [ramp]
            ramp_ticks = 100
            direction = "reverse"

            [sim]
            supply_voltage_v = 6.0
            "#,
        )
        .unwrap();

        assert_eq!(p.cycle_period_s, 0.05);
        assert_eq!(p.num_runs, 2);
        assert_eq!(p.archive_dir, None);
        assert_eq!(p.ramp.ramp_ticks, 100);
        assert_eq!(p.ramp.hold_ticks, 50);
        assert_eq!(p.ramp.direction, Direction::Reverse);
        assert_eq!(p.sim.supply_voltage_v, 6.0);
        assert_eq!(p.sim.time_constant_s, SimParams::default().time_constant_s);
    }

    #[test]
    fn test_empty_params_are_default() {
        let p: CharExecParams = util::params::from_str("").unwrap();

        assert_eq!(p.num_runs, 1);
        assert_eq!(p.ramp, ramp_profile::Params::default());
    }
}

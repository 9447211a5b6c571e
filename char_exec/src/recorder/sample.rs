//! Samples and their derivation

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Serialize, Serializer};

use crate::drive::Telemetry;
use util::maths::backward_diff;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Minimum width of every numeric field in the persisted table.
pub const FIELD_MIN_WIDTH: usize = 4;

/// Column names of the persisted table, in order.
pub const COLUMNS: [&str; 11] = [
    "Time",
    "Voltage",
    "Speed Request",
    "Left Motor Volts",
    "Right Motor Volts",
    "Left Encoder Pos",
    "Right Encoder Pos",
    "Left Rate",
    "Right Rate",
    "Left Acc",
    "Right Acc",
];

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// One row of a run record.
///
/// The serialised field names are the persisted table's column names.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Sample {
    /// Units: seconds
    #[serde(rename = "Time", serialize_with = "fixed_width")]
    pub time_s: f64,

    /// Units: volts
    #[serde(rename = "Voltage", serialize_with = "fixed_width")]
    pub supply_voltage_v: f64,

    /// Demand commanded on this tick, in `[-1, 1]`.
    #[serde(rename = "Speed Request", serialize_with = "fixed_width")]
    pub speed_request: f64,

    /// Voltage applied on the previous tick, seen by the motors during this
    /// tick.
    ///
    /// Units: volts
    #[serde(rename = "Left Motor Volts", serialize_with = "fixed_width")]
    pub left_motor_volts: f64,

    /// Units: volts
    #[serde(rename = "Right Motor Volts", serialize_with = "fixed_width")]
    pub right_motor_volts: f64,

    #[serde(rename = "Left Encoder Pos", serialize_with = "fixed_width")]
    pub left_pos: f64,

    #[serde(rename = "Right Encoder Pos", serialize_with = "fixed_width")]
    pub right_pos: f64,

    #[serde(rename = "Left Rate", serialize_with = "fixed_width")]
    pub left_rate: f64,

    #[serde(rename = "Right Rate", serialize_with = "fixed_width")]
    pub right_rate: f64,

    #[serde(rename = "Left Acc", serialize_with = "fixed_width")]
    pub left_acc: f64,

    #[serde(rename = "Right Acc", serialize_with = "fixed_width")]
    pub right_acc: f64,
}

/// State carried between ticks to derive accelerations.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RunState {
    pub prev_left_rate: f64,
    pub prev_right_rate: f64,
    pub prev_time_s: f64,

    /// Demand commanded on the previous tick.
    pub prev_speed: f64,
}

/// Result of deriving one sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Derivation {
    pub sample: Sample,

    /// True if the time step since the previous tick was zero or negative,
    /// in which case both accelerations were set to zero.
    pub invalid_dt: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl RunState {
    /// Seed the state from the telemetry at the start of a run.
    ///
    /// No demand has been commanded yet so the previous speed is zero.
    pub fn seed(now_s: f64, telemetry: &Telemetry) -> Self {
        Self {
            prev_left_rate: telemetry.left_rate,
            prev_right_rate: telemetry.right_rate,
            prev_time_s: now_s,
            prev_speed: 0.0,
        }
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Build the sample for this tick and advance the run state.
///
/// Accelerations are backward differences of the rates over the time since
/// the previous tick. The motor voltage is the supply voltage scaled by the
/// previous tick's demand magnitude, and is the same for both sides as they
/// are driven with mirrored demands of equal magnitude.
pub fn derive_sample(
    now_s: f64,
    speed: f64,
    telemetry: &Telemetry,
    state: &mut RunState,
) -> Derivation {
    let dt = now_s - state.prev_time_s;

    let left_acc = backward_diff(telemetry.left_rate, state.prev_left_rate, dt);
    let right_acc = backward_diff(telemetry.right_rate, state.prev_right_rate, dt);
    let invalid_dt = left_acc.is_none() || right_acc.is_none();

    let motor_volts = telemetry.supply_voltage_v * state.prev_speed.abs();

    let sample = Sample {
        time_s: now_s,
        supply_voltage_v: telemetry.supply_voltage_v,
        speed_request: speed,
        left_motor_volts: motor_volts,
        right_motor_volts: motor_volts,
        left_pos: telemetry.left_pos,
        right_pos: telemetry.right_pos,
        left_rate: telemetry.left_rate,
        right_rate: telemetry.right_rate,
        left_acc: left_acc.unwrap_or(0.0),
        right_acc: right_acc.unwrap_or(0.0),
    };

    *state = RunState {
        prev_left_rate: telemetry.left_rate,
        prev_right_rate: telemetry.right_rate,
        prev_time_s: now_s,
        prev_speed: speed,
    };

    Derivation { sample, invalid_dt }
}

/// Format a value right aligned to the table's minimum field width.
///
/// Uses Rust's `Debug` float formatting: the shortest representation that
/// round-trips, always with a fractional part or an exponent. Very small or
/// large magnitudes use an unpadded exponent (`1e-7`, `1e16`), unlike C style
/// `%g` output (`1e-07`), so offline readers must parse fields as floats
/// rather than match their text.
pub fn format_field(value: f64) -> String {
    format!("{:>width$?}", value, width = FIELD_MIN_WIDTH)
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

fn fixed_width<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_field(*value))
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    fn telem(t_rate: (f64, f64)) -> Telemetry {
        Telemetry {
            supply_voltage_v: 8.0,
            left_pos: 1.5,
            right_pos: -1.5,
            left_rate: t_rate.0,
            right_rate: t_rate.1,
        }
    }

    #[test]
    fn test_acceleration_uses_previous_tick_only() {
        let mut state = RunState::seed(0.0, &telem((0.0, 0.0)));

        // Tick 1 and tick 2 with two different tick 1 rates, tick 2's
        // acceleration should only depend on r2, r1, t2 and t1.
        for r1 in &[0.3, 10.0] {
            let mut s = state;
            derive_sample(0.02, 0.1, &telem((*r1, -*r1)), &mut s);
            let d = derive_sample(0.05, 0.1, &telem((1.0, -1.0)), &mut s);

            assert_relative_eq!(d.sample.left_acc, (1.0 - r1) / 0.03, epsilon = 1e-9);
            assert_relative_eq!(d.sample.right_acc, (-1.0 + r1) / 0.03, epsilon = 1e-9);
            assert!(!d.invalid_dt);
        }

        // State itself untouched by the copies
        assert_eq!(state.prev_time_s, 0.0);
        let d = derive_sample(0.02, 0.0, &telem((0.0, 0.0)), &mut state);
        assert_eq!(d.sample.left_acc, 0.0);
    }

    #[test]
    fn test_motor_volts_lag_one_tick() {
        let mut state = RunState::seed(0.0, &telem((0.0, 0.0)));

        let d0 = derive_sample(0.02, 0.25, &telem((0.0, 0.0)), &mut state);
        assert_eq!(d0.sample.speed_request, 0.25);
        assert_eq!(d0.sample.left_motor_volts, 0.0);

        let d1 = derive_sample(0.04, -0.5, &telem((0.0, 0.0)), &mut state);
        assert_eq!(d1.sample.left_motor_volts, 2.0);
        assert_eq!(d1.sample.right_motor_volts, 2.0);

        // Magnitude only
        let d2 = derive_sample(0.06, 0.0, &telem((0.0, 0.0)), &mut state);
        assert_eq!(d2.sample.left_motor_volts, 4.0);
    }

    #[test]
    fn test_zero_dt_gives_zero_acceleration() {
        let mut state = RunState::seed(1.0, &telem((0.0, 0.0)));

        let d = derive_sample(1.0, 0.5, &telem((2.0, -2.0)), &mut state);
        assert!(d.invalid_dt);
        assert_eq!(d.sample.left_acc, 0.0);
        assert_eq!(d.sample.right_acc, 0.0);
        assert!(d.sample.left_acc.is_finite());

        // Rates still advance so the next tick is relative to this one
        let d = derive_sample(1.5, 0.5, &telem((3.0, -3.0)), &mut state);
        assert!(!d.invalid_dt);
        assert_relative_eq!(d.sample.left_acc, 2.0);
    }

    #[test]
    fn test_seed_gives_zero_first_acceleration_at_rest() {
        let t = telem((0.7, -0.7));
        let mut state = RunState::seed(0.0, &t);

        let d = derive_sample(0.02, 0.0, &t, &mut state);
        assert_eq!(d.sample.left_acc, 0.0);
        assert_eq!(d.sample.right_acc, 0.0);
    }

    #[test]
    fn test_format_field() {
        assert_eq!(format_field(0.0), " 0.0");
        assert_eq!(format_field(1.0), " 1.0");
        assert_eq!(format_field(0.25), "0.25");
        assert_eq!(format_field(-7.125), "-7.125");
        assert_eq!(format_field(1e-7), "1e-7");
        assert_eq!(format_field(1e-7).parse::<f64>().unwrap(), 1e-7);
    }
}

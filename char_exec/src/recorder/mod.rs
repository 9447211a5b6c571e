//! Sample recorder module
//!
//! Samples the drivetrain on every tick of a run, derives the acceleration of
//! each side and buffers the resulting rows until the run is persisted.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod record;
mod sample;
mod sink;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::warn;

// Internal
use crate::drive::Telemetry;
pub use record::*;
pub use sample::*;
pub use sink::*;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Owns the record and derivation state of the current run.
#[derive(Debug, Default)]
pub struct Recorder {
    record: RunRecord,
    run_state: RunState,

    /// Number of ticks this run whose time delta was not positive.
    num_invalid_dt: u64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Recorder {
    /// Prepare for a new run.
    ///
    /// Clears the record and seeds the derivation state from the given
    /// telemetry so that the first derived acceleration is relative to the
    /// state at the start of the run.
    pub fn arm(&mut self, now_s: f64, telemetry: &Telemetry) {
        self.record = RunRecord::default();
        self.run_state = RunState::seed(now_s, telemetry);
        self.num_invalid_dt = 0;
    }

    /// Derive and append the sample for this tick.
    ///
    /// `speed` is the demand commanded on this tick.
    pub fn on_tick(&mut self, now_s: f64, speed: f64, telemetry: &Telemetry) -> &Sample {
        let derivation = derive_sample(now_s, speed, telemetry, &mut self.run_state);

        if derivation.invalid_dt {
            self.num_invalid_dt += 1;
            warn!(
                "Non-positive time step at {:.6} s (sample {}), acceleration set to zero",
                now_s,
                self.record.len()
            );
        }

        self.record.push(derivation.sample)
    }

    /// Remove the record for persisting, leaving an empty one in its place.
    pub fn take_record(&mut self) -> RunRecord {
        std::mem::take(&mut self.record)
    }

    /// Put back a record which could not be persisted.
    pub fn restore_record(&mut self, record: RunRecord) {
        self.record = record;
    }

    /// Drop the current record.
    pub fn clear(&mut self) {
        self.record = RunRecord::default();
    }

    pub fn record(&self) -> &RunRecord {
        &self.record
    }

    pub fn num_invalid_dt(&self) -> u64 {
        self.num_invalid_dt
    }
}

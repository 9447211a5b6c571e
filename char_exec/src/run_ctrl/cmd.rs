//! Commands passed into RunCtrl

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Summary of a completed run, produced when the record has been persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    /// Number of ticks driven during the run.
    pub num_ticks: u64,

    /// Number of samples persisted.
    pub num_rows: usize,

    /// Time from start to stop.
    ///
    /// Units: seconds
    pub elapsed_s: f64,

    /// Number of samples whose acceleration was zeroed due to a non-positive
    /// time step.
    pub num_invalid_dt: u64,

    /// File the record was written to, `None` if the record was empty.
    pub path: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// A command to change the state of the run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub enum RunCmd {
    /// Start a new run.
    Start,

    /// Stop the run and persist the record. Valid at any time, including
    /// straight after a start, and used to retry a failed persist.
    Stop,

    /// Drop a record which could not be persisted.
    Discard,
}

/// The state of the run controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum RunMode {
    /// No run in progress.
    Idle,

    /// Driving the profile and recording.
    Running,

    /// Profile finished or persisting failed, wheels stopped and waiting for
    /// a stop command.
    Stopping,
}

impl Default for RunMode {
    fn default() -> Self {
        RunMode::Idle
    }
}

//! Run control module
//!
//! Orchestrates a characterisation run: starts it, drives the wheels along
//! the ramp profile while recording samples, and hands the record to the
//! sink when the run is stopped.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod cmd;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use cmd::*;
pub use state::*;
use util::archive::ArchiveError;

use crate::ramp_profile::ParamsError;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during RunCtrl operation.
#[derive(Debug, thiserror::Error)]
pub enum RunCtrlError {
    #[error("Cannot start a run while one is already running")]
    AlreadyRunning,

    #[error(
        "Cannot start a run, the previous run's record ({0} samples) has not been persisted yet"
    )]
    UnflushedRecord(usize),

    #[error("Cannot tick, no run is in progress")]
    NotRunning,

    #[error("Failed to persist the run record, it has been kept for a retry: {0}")]
    PersistError(ArchiveError),
}

/// Possible errors that can occur during RunCtrl initialisation.
#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("Invalid ramp profile parameters: {0}")]
    ParamsInvalid(ParamsError),

    #[error("Could not set up the status report archive: {0}")]
    ArchiveError(ArchiveError),
}

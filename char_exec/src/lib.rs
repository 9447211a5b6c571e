//! # Characterisation library.
//!
//! This library allows other crates in the workspace (and the benchmarks) to access items defined
//! inside the characterisation executable crate.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Data store - the executable's global data
pub mod data_store;

/// Drive interfaces - actuation and telemetry ports, and the simulated drivetrain
pub mod drive;

/// Executable parameters
pub mod params;

/// Ramp profile - the speed demand of a run as a function of tick
pub mod ramp_profile;

/// Recorder - per tick sampling, acceleration derivation and record persistence
pub mod recorder;

/// Run control module - start/tick/stop orchestration of a characterisation run
pub mod run_ctrl;

//! Ramp profile module
//!
//! Generates the open-loop speed demand of a characterisation run as a pure
//! function of the run's tick counter.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;
mod profile;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use params::*;
pub use profile::*;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors raised when building a ramp profile from invalid parameters.
#[derive(Debug, thiserror::Error)]
pub enum ParamsError {
    #[error("The ramp must last at least one tick, found ramp_ticks = 0")]
    ZeroRampTicks,

    #[error(
        "The profile is too long to count, 2 * ramp_ticks + hold_ticks overflows \
        (ramp_ticks = {ramp_ticks}, hold_ticks = {hold_ticks})"
    )]
    TooManyTicks { ramp_ticks: u64, hold_ticks: u64 },
}

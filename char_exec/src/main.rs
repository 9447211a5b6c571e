//! Characterisation executable entry point.
//!
//! # Architecture
//!
//! The general execution methodology consists of:
//!
//!     - Initialise all modules
//!     - Main loop:
//!         - Drivetrain update (simulation step)
//!         - Run sequencing (start, stop, retry)
//!         - Run control processing
//!         - Archive writing
//!         - Cycle management
//!
//! # Usage
//!
//! `char_exec [PARAM_FILE]`, where `PARAM_FILE` is an optional path to the executable's parameter
//! file. If omitted `$CHAR_SW_ROOT/params/char_exec.toml` is loaded.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{
    eyre::{eyre, WrapErr},
    Report,
};
use log::{debug, info, warn};
use std::env;
use std::thread;
use std::time::{Duration, Instant};

// Internal
use char_lib::{
    data_store::DataStore,
    drive::SimDrivetrain,
    params::CharExecParams,
    ramp_profile::RampProfile,
    recorder::CsvSink,
    run_ctrl::{RunCtrl, RunCtrlError},
};
use util::{
    archive::Archived,
    logger::{logger_init, LevelFilter},
    module::State,
    session::{self, Session},
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Default parameter file, relative to the params directory.
const PARAMS_FILE: &str = "char_exec.toml";

/// Fallback record directory, relative to the session root.
const FALLBACK_DIR: &str = "unsaved_records";

/// Minimum log level of the executable.
const LOG_LEVEL: LevelFilter = LevelFilter::Debug;

/// Per-target log levels, overriding `LOG_LEVEL`.
///
/// Both targets log once per tick at trace, which stays out of the session log even when
/// `LOG_LEVEL` is raised to trace.
const TARGET_LOG_LEVELS: [(&str, LevelFilter); 2] = [
    ("char_lib::drive::sim", LevelFilter::Debug),
    ("char_lib::run_ctrl", LevelFilter::Debug),
];

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new("char_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LOG_LEVEL, &TARGET_LOG_LEVELS, &session).wrap_err("Failed to initialise logging")?;

    info!("Drivetrain Characterisation Executable\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let args: Vec<String> = env::args().collect();

    debug!("CLI arguments: {:?}", args);

    let params: CharExecParams = match args.len() {
        1 => util::params::load(PARAMS_FILE).wrap_err("Could not load exec params")?,
        2 => {
            info!("Loading parameters from \"{}\"", &args[1]);
            util::params::load_from_path(&args[1]).wrap_err("Could not load exec params")?
        }
        n => {
            return Err(eyre!(
                "Expected either zero or one argument, found {}",
                n - 1
            ))
        }
    };

    if params.cycle_period_s <= 0.0 {
        return Err(eyre!(
            "The cycle period must be positive, found {} s",
            params.cycle_period_s
        ));
    }

    info!("Exec parameters loaded: {:#?}", params);

    // ---- INITIALISE MODULES ----

    info!("Initialising modules...");

    let archive_dir = match params.archive_dir {
        Some(ref d) => session.session_root.join(d),
        None => session.arch_root.clone(),
    };
    info!("Run records will be written to {:?}", archive_dir);

    let run_ctrl = RunCtrl::new(
        RampProfile::default(),
        SimDrivetrain::new(params.sim),
        CsvSink::new(archive_dir),
    );

    // Records the archive directory keeps refusing are written into the session root instead
    let fallback_dir = session.session_root.join(FALLBACK_DIR);

    let mut ds = DataStore::new(
        run_ctrl,
        params.num_runs,
        params.max_persist_attempts,
        CsvSink::new(fallback_dir),
    );

    ds.run_ctrl
        .init(params.ramp, &session)
        .wrap_err("Failed to initialise RunCtrl")?;
    info!("RunCtrl init complete");

    info!("Module initialisation complete\n");

    // ---- MAIN LOOP ----

    info!("Begining main loop\n");

    let cycle_period = Duration::from_secs_f64(params.cycle_period_s);

    while !ds.is_complete() {
        // Get cycle start time
        let cycle_start_instant = Instant::now();

        // Clear items that need wiping at the start of the cycle
        ds.cycle_start(session::get_elapsed_seconds());

        // ---- DATA INPUT ----

        ds.run_ctrl.drive_mut().update(ds.now_s);

        // ---- RUN SEQUENCING ----

        ds.run_ctrl_input.cmd = ds.next_cmd();

        // ---- CONTROL ALGORITHM PROCESSING ----

        match ds.run_ctrl.proc(&ds.run_ctrl_input) {
            Ok((o, r)) => {
                if let Some(ref summary) = o.summary {
                    session.save_with_timestamp("run_summary.json", summary.clone());
                    ds.persist_succeeded();
                }
                ds.run_ctrl_output = o;
                ds.run_ctrl_status_rpt = r;
            }
            Err(RunCtrlError::PersistError(_)) => {
                // Already logged by RunCtrl, the record is kept and the stop retried next cycle
                ds.run_ctrl_status_rpt = ds.run_ctrl.report();

                if let Some(summary) = ds.persist_failed() {
                    session.save_with_timestamp("run_summary.json", summary);
                }
            }
            Err(e) => {
                // Sequencing errors mean a command arrived in the wrong state, so just issue the
                // warning and continue.
                warn!("Error during RunCtrl processing: {}", e);
                ds.run_ctrl_status_rpt = ds.run_ctrl.report();
            }
        };

        // ---- WRITE ARCHIVES ----

        if let Err(e) = ds.run_ctrl.write() {
            warn!("Could not write RunCtrl archive: {}", e);
        }

        // ---- CYCLE MANAGEMENT ----

        let cycle_dur = Instant::now() - cycle_start_instant;

        // Get sleep duration
        match cycle_period.checked_sub(cycle_dur) {
            Some(d) => {
                ds.num_consec_cycle_overruns = 0;
                thread::sleep(d);
            }
            None => {
                warn!(
                    "Cycle overran by {:.06} s",
                    cycle_dur.as_secs_f64() - cycle_period.as_secs_f64()
                );
                ds.num_consec_cycle_overruns += 1;
            }
        }

        // Increment cycle counter
        ds.num_cycles += 1;
    }

    // ---- SHUTDOWN ----

    info!(
        "{} runs complete in {} cycles",
        ds.num_runs_complete, ds.num_cycles
    );

    session.exit();

    info!("End of execution");

    Ok(())
}

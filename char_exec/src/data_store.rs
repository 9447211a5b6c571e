//! # Data Store

use log::{error, info, warn};

use crate::{
    drive::SimDrivetrain,
    recorder::CsvSink,
    run_ctrl::{self, RunCmd, RunCtrl, RunMode, RunSummary},
};

// ---------------------------------------------------------------------------
// TYPES
// ---------------------------------------------------------------------------

/// The run controller used by the executable.
pub type ExecRunCtrl = RunCtrl<SimDrivetrain, CsvSink>;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Global data store for the executable.
pub struct DataStore {
    // Cycle management
    /// Number of cycles already executed
    pub num_cycles: u128,

    /// Session time at the start of this cycle
    pub now_s: f64,

    // RunCtrl
    pub run_ctrl: ExecRunCtrl,
    pub run_ctrl_input: run_ctrl::InputData,
    pub run_ctrl_output: run_ctrl::OutputData,
    pub run_ctrl_status_rpt: run_ctrl::StatusReport,

    // Run sequencing
    /// Number of runs requested before exiting
    pub num_runs_requested: u32,

    /// Number of runs whose records have been persisted
    pub num_runs_complete: u32,

    /// Consecutive failed persists after which the record is written to the fallback sink
    pub max_persist_attempts: u64,

    /// Where records go when the run controller's own sink keeps failing
    pub fallback_sink: CsvSink,

    // Monitoring Counters
    /// Number of consecutive cycle overruns
    pub num_consec_cycle_overruns: u64,

    /// Number of consecutive failed attempts at persisting a record
    pub num_consec_persist_failures: u64,
}

// ---------------------------------------------------------------------------
// IMPLS
// ---------------------------------------------------------------------------

impl DataStore {
    pub fn new(
        run_ctrl: ExecRunCtrl,
        num_runs_requested: u32,
        max_persist_attempts: u64,
        fallback_sink: CsvSink,
    ) -> Self {
        Self {
            num_cycles: 0,
            now_s: 0.0,
            run_ctrl,
            run_ctrl_input: run_ctrl::InputData::default(),
            run_ctrl_output: run_ctrl::OutputData::default(),
            run_ctrl_status_rpt: run_ctrl::StatusReport::default(),
            num_runs_requested,
            num_runs_complete: 0,
            max_persist_attempts,
            fallback_sink,
            num_consec_cycle_overruns: 0,
            num_consec_persist_failures: 0,
        }
    }

    /// Perform actions required at the start of a cycle.
    ///
    /// Clears those items that need clearing at the start of a cycle and latches the cycle time.
    pub fn cycle_start(&mut self, now_s: f64) {
        self.now_s = now_s;

        self.run_ctrl_input = run_ctrl::InputData {
            now_s,
            cmd: None,
        };
        self.run_ctrl_output = run_ctrl::OutputData::default();
    }

    /// Choose the command for this cycle from the state reported on the previous one.
    ///
    /// Runs are started back to back until enough have completed, and a finished profile is
    /// stopped on the next cycle. A stop that failed to persist is retried every cycle.
    pub fn next_cmd(&self) -> Option<RunCmd> {
        match self.run_ctrl_status_rpt.mode {
            RunMode::Idle if self.num_runs_complete < self.num_runs_requested => Some(RunCmd::Start),
            RunMode::Stopping => Some(RunCmd::Stop),
            _ => None,
        }
    }

    /// True once every requested run has completed and the controller is idle.
    pub fn is_complete(&self) -> bool {
        self.num_runs_complete >= self.num_runs_requested
            && self.run_ctrl_status_rpt.mode == RunMode::Idle
    }

    /// Record a successful stop.
    pub fn persist_succeeded(&mut self) {
        self.num_runs_complete += 1;
        self.num_consec_persist_failures = 0;
        info!(
            "Run {} of {} complete",
            self.num_runs_complete, self.num_runs_requested
        );
    }

    /// Record a failed stop.
    ///
    /// The record stays in run control and the stop is retried on the next cycle. Once
    /// `max_persist_attempts` consecutive stops have failed the record is written to the fallback
    /// sink, returning the run's summary if that works. If the fallback fails too the count
    /// restarts and the own sink is retried, so the record is never dropped.
    pub fn persist_failed(&mut self) -> Option<RunSummary> {
        self.num_consec_persist_failures += 1;
        warn!(
            "Persisting the run record failed ({} consecutive failures)",
            self.num_consec_persist_failures
        );

        if self.num_consec_persist_failures < self.max_persist_attempts {
            return None;
        }

        warn!(
            "Writing the {} sample record to the fallback directory {:?}",
            self.run_ctrl.record().len(),
            self.fallback_sink.dir()
        );

        match self.run_ctrl.stop_into(self.now_s, &mut self.fallback_sink) {
            Ok(summary) => {
                self.run_ctrl_status_rpt = self.run_ctrl.report();
                self.persist_succeeded();
                summary
            }
            Err(e) => {
                error!("Fallback persist failed, retrying from the start: {}", e);
                self.run_ctrl_status_rpt = self.run_ctrl.report();
                self.num_consec_persist_failures = 0;
                None
            }
        }
    }
}

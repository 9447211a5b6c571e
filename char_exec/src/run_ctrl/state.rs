//! Implementations for the RunCtrl state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{error, info, trace, warn};
use serde::Serialize;

// Internal
use super::{InitError, RunCmd, RunCtrlError, RunMode, RunSummary};
use crate::{
    drive::{Drivetrain, Telemetry},
    ramp_profile::{self, RampPhase, RampProfile},
    recorder::{PersistFailure, PersistReceipt, RecordSink, Recorder, RunRecord},
};
use util::{
    archive::{ArchiveError, Archived, Archiver},
    module::State,
    session::Session,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Run control module state
pub struct RunCtrl<D, S> {
    profile: RampProfile,

    drive: D,
    sink: S,

    mode: RunMode,

    /// Ticks driven since the start of the run
    tick: u64,

    start_time_s: f64,

    recorder: Recorder,

    report: StatusReport,
    arch_report: Archiver,
}

/// Input data to run control.
#[derive(Default, Clone, Copy, Debug)]
pub struct InputData {
    /// Current time.
    ///
    /// Units: seconds
    pub now_s: f64,

    /// Command to execute on this cycle, if any.
    pub cmd: Option<RunCmd>,
}

/// Output of run control.
#[derive(Default, Clone, Debug)]
pub struct OutputData {
    /// Set on the cycle a run is stopped and its record persisted.
    pub summary: Option<RunSummary>,
}

/// Status report for run control processing.
#[derive(Clone, Copy, Default, Serialize, Debug, PartialEq)]
pub struct StatusReport {
    pub mode: RunMode,

    /// Tick counter after this cycle.
    pub tick: u64,

    /// Profile phase driven on this cycle, `None` if nothing was driven.
    pub phase: Option<RampPhase>,

    /// Demand commanded to the left side on this cycle.
    pub speed_request: f64,

    /// Samples currently held in the record.
    pub num_samples: usize,

    /// Samples this run with a non-positive time step.
    pub num_invalid_dt: u64,

    /// Raised on the cycle the profile finishes.
    pub profile_finished: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<D, S> State for RunCtrl<D, S>
where
    D: Drivetrain,
    S: RecordSink,
{
    type InitData = ramp_profile::Params;
    type InitError = InitError;

    type InputData = InputData;
    type OutputData = OutputData;
    type StatusReport = StatusReport;
    type ProcError = RunCtrlError;

    /// Initialise the RunCtrl module.
    ///
    /// Expected init data is the ramp profile parameters.
    fn init(&mut self, init_data: Self::InitData, session: &Session) -> Result<(), Self::InitError> {
        self.profile = RampProfile::from_params(&init_data).map_err(InitError::ParamsInvalid)?;

        self.arch_report = Archiver::from_path(session, "run_ctrl/status_report.csv")
            .map_err(InitError::ArchiveError)?;

        info!(
            "RunCtrl profile: {:?}, {} driven ticks per run",
            init_data,
            self.profile.num_driven_ticks()
        );

        Ok(())
    }

    /// Perform cyclic processing of run control.
    ///
    /// A start command arms the run without driving, ticking begins on the
    /// following cycle.
    fn proc(&mut self, input_data: &Self::InputData) -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError> {
        // Clear the per-cycle parts of the report
        self.report.phase = None;
        self.report.speed_request = 0.0;
        self.report.profile_finished = false;

        let mut output = OutputData::default();

        let result = match input_data.cmd {
            Some(RunCmd::Start) => self.start(input_data.now_s),
            Some(RunCmd::Stop) => self.stop(input_data.now_s).map(|s| output.summary = s),
            Some(RunCmd::Discard) => {
                self.discard();
                Ok(())
            }
            None if self.mode == RunMode::Running => self.tick(input_data.now_s),
            None => Ok(()),
        };

        self.update_report();

        result.map(|_| (output, self.report))
    }
}

impl<D, S> Archived for RunCtrl<D, S> {
    fn write(&mut self) -> Result<(), ArchiveError> {
        self.arch_report.serialise(self.report)?;
        self.arch_report.flush()
    }
}

impl<D, S> RunCtrl<D, S>
where
    D: Drivetrain,
    S: RecordSink,
{
    /// Create a new idle run controller.
    pub fn new(profile: RampProfile, drive: D, sink: S) -> Self {
        Self {
            profile,
            drive,
            sink,
            mode: RunMode::Idle,
            tick: 0,
            start_time_s: 0.0,
            recorder: Recorder::default(),
            report: StatusReport::default(),
            arch_report: Archiver::default(),
        }
    }

    /// Start a new run.
    ///
    /// Zeroes the encoders, seeds the recorder from the current telemetry and
    /// resets the tick counter.
    pub fn start(&mut self, now_s: f64) -> Result<(), RunCtrlError> {
        match self.mode {
            RunMode::Running => return Err(RunCtrlError::AlreadyRunning),
            RunMode::Stopping if !self.recorder.record().is_empty() => {
                return Err(RunCtrlError::UnflushedRecord(self.recorder.record().len()))
            }
            _ => (),
        }

        self.drive.reset_encoders();

        let telemetry = Telemetry::read(&self.drive);
        self.recorder.arm(now_s, &telemetry);

        self.start_time_s = now_s;
        self.tick = 0;
        self.mode = RunMode::Running;

        info!(
            "Run started at {:.3} s, direction {:?}, {:.2} V supply",
            now_s,
            self.profile.direction(),
            telemetry.supply_voltage_v
        );

        Ok(())
    }

    /// Drive one tick of the profile and record the sample.
    ///
    /// Telemetry is read before this tick's demands are actuated, so each
    /// sample holds the response to the previous tick's demand.
    pub fn tick(&mut self, now_s: f64) -> Result<(), RunCtrlError> {
        if self.mode != RunMode::Running {
            return Err(RunCtrlError::NotRunning);
        }

        let telemetry = Telemetry::read(&self.drive);

        let speed = self.profile.speed(self.tick);
        self.report.phase = Some(self.profile.phase(self.tick));
        self.report.speed_request = speed;

        // Mirrored demands
        self.drive.set_left_speed(speed);
        self.drive.set_right_speed(-speed);

        let sample = self.recorder.on_tick(now_s, speed, &telemetry);
        trace!("Tick {}: {:?}", self.tick, sample);

        self.tick += 1;

        if self.profile.is_finished(self.tick) {
            info!("Profile finished after {} ticks, stopping", self.tick);
            self.drive.stop();
            self.mode = RunMode::Stopping;
            self.report.profile_finished = true;
        }

        Ok(())
    }

    /// Stop the run and persist its record.
    ///
    /// Returns `Ok(None)` if there was no run to stop. If persisting fails the
    /// record is kept, the controller stays in `Stopping` and the stop can be
    /// retried.
    pub fn stop(&mut self, now_s: f64) -> Result<Option<RunSummary>, RunCtrlError> {
        if self.mode == RunMode::Idle {
            return Ok(None);
        }

        self.drive.stop();

        let result = persist_record(&mut self.sink, self.recorder.take_record());
        self.finish_stop(now_s, result).map(Some)
    }

    /// Stop the run, persisting its record into `fallback` instead of the
    /// controller's own sink.
    ///
    /// Used to save a record the own sink keeps refusing. Failure handling is
    /// the same as `stop`.
    pub fn stop_into<F>(&mut self, now_s: f64, fallback: &mut F) -> Result<Option<RunSummary>, RunCtrlError>
    where
        F: RecordSink + ?Sized,
    {
        if self.mode == RunMode::Idle {
            return Ok(None);
        }

        self.drive.stop();

        let result = persist_record(fallback, self.recorder.take_record());
        self.finish_stop(now_s, result).map(Some)
    }

    /// Drop an unflushed record and return to idle.
    pub fn discard(&mut self) {
        if self.mode == RunMode::Running {
            warn!("Discarding the record of a run in progress");
            self.drive.stop();
        }

        if !self.recorder.record().is_empty() {
            warn!("Discarding {} unsaved samples", self.recorder.record().len());
        }

        self.recorder.clear();
        self.mode = RunMode::Idle;
    }

    pub fn mode(&self) -> RunMode {
        self.mode
    }

    /// Status report as of the last change of state.
    pub fn report(&self) -> StatusReport {
        self.report
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    pub fn record(&self) -> &RunRecord {
        self.recorder.record()
    }

    pub fn profile(&self) -> &RampProfile {
        &self.profile
    }

    pub fn drive(&self) -> &D {
        &self.drive
    }

    pub fn drive_mut(&mut self) -> &mut D {
        &mut self.drive
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    fn finish_stop(
        &mut self,
        now_s: f64,
        result: Result<PersistReceipt, PersistFailure>,
    ) -> Result<RunSummary, RunCtrlError> {
        let receipt = match result {
            Ok(r) => r,
            Err(failure) => {
                error!("{}", failure);
                self.recorder.restore_record(failure.record);
                self.mode = RunMode::Stopping;
                return Err(RunCtrlError::PersistError(failure.source));
            }
        };

        self.mode = RunMode::Idle;

        let elapsed_s = now_s - self.start_time_s;

        info!(
            "Collected {} readings in {:.3} seconds",
            receipt.num_rows, elapsed_s
        );

        Ok(RunSummary {
            num_ticks: self.tick,
            num_rows: receipt.num_rows,
            elapsed_s,
            num_invalid_dt: self.recorder.num_invalid_dt(),
            path: receipt.path,
        })
    }

    fn update_report(&mut self) {
        self.report.mode = self.mode;
        self.report.tick = self.tick;
        self.report.num_samples = self.recorder.record().len();
        self.report.num_invalid_dt = self.recorder.num_invalid_dt();
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Persist a record, skipping the sink entirely if it's empty.
fn persist_record<F>(sink: &mut F, record: RunRecord) -> Result<PersistReceipt, PersistFailure>
where
    F: RecordSink + ?Sized,
{
    if record.is_empty() {
        return Ok(PersistReceipt {
            path: None,
            num_rows: 0,
        });
    }

    sink.persist(record)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        drive::{ActuationPort, TelemetryPort},
        ramp_profile::Direction,
        recorder::Sample,
    };
    use approx::assert_relative_eq;
    use std::path::PathBuf;

    /// Drivetrain double replaying a fixed rate and logging demands.
    #[derive(Default)]
    struct FakeDrive {
        rate: f64,
        pos: f64,
        left_dems: Vec<f64>,
        right_dems: Vec<f64>,
        num_resets: u32,
    }

    impl ActuationPort for FakeDrive {
        fn set_left_speed(&mut self, speed: f64) {
            self.left_dems.push(speed);
        }

        fn set_right_speed(&mut self, speed: f64) {
            self.right_dems.push(speed);
        }
    }

    impl TelemetryPort for FakeDrive {
        fn left_position(&self) -> f64 {
            self.pos
        }

        fn right_position(&self) -> f64 {
            -self.pos
        }

        fn left_rate(&self) -> f64 {
            self.rate
        }

        fn right_rate(&self) -> f64 {
            -self.rate
        }

        fn supply_voltage(&self) -> f64 {
            7.0
        }

        fn reset_encoders(&mut self) {
            self.pos = 0.0;
            self.num_resets += 1;
        }
    }

    /// Sink keeping records in memory, optionally failing.
    #[derive(Default)]
    struct MemSink {
        fail: bool,
        records: Vec<RunRecord>,
    }

    impl RecordSink for MemSink {
        fn persist(&mut self, record: RunRecord) -> Result<PersistReceipt, PersistFailure> {
            if self.fail {
                return Err(PersistFailure {
                    record,
                    source: ArchiveError::FlushError(std::io::Error::new(
                        std::io::ErrorKind::Other,
                        "disk full",
                    )),
                });
            }

            let num_rows = record.len();
            self.records.push(record);

            Ok(PersistReceipt {
                path: Some(PathBuf::from(format!("mem_{}.csv", self.records.len()))),
                num_rows,
            })
        }
    }

    fn run_ctrl(profile: RampProfile) -> RunCtrl<FakeDrive, MemSink> {
        RunCtrl::new(profile, FakeDrive::default(), MemSink::default())
    }

    /// Run the controller until it leaves `Running`, returning the number of
    /// ticks it took.
    fn run_to_completion(rc: &mut RunCtrl<FakeDrive, MemSink>, start_s: f64) -> u64 {
        let mut ticks = 0;
        while rc.mode() == RunMode::Running {
            ticks += 1;
            rc.tick(start_s + ticks as f64 * 0.02).unwrap();
        }
        ticks
    }

    #[test]
    fn test_full_default_run() {
        let mut rc = run_ctrl(RampProfile::default());

        rc.start(0.0).unwrap();
        assert_eq!(rc.mode(), RunMode::Running);
        assert_eq!(rc.drive().num_resets, 1);

        let ticks = run_to_completion(&mut rc, 0.0);
        assert_eq!(ticks, 851);
        assert_eq!(rc.tick_count(), 851);
        assert_eq!(rc.mode(), RunMode::Stopping);
        assert_eq!(rc.record().len(), 851);

        // Mirrored demands, then the stop on finishing
        let d = &rc.drive();
        assert_eq!(d.left_dems.len(), 852);
        for (l, r) in d.left_dems.iter().zip(d.right_dems.iter()) {
            assert_eq!(*l, -*r);
        }
        assert_eq!(d.left_dems[200], 0.5);
        assert_eq!(d.left_dems[851], 0.0);

        let summary = rc.stop(17.1).unwrap().unwrap();
        assert_eq!(summary.num_rows, 851);
        assert_eq!(summary.num_ticks, 851);
        assert_relative_eq!(summary.elapsed_s, 17.1);
        assert_eq!(summary.path, Some(PathBuf::from("mem_1.csv")));

        assert_eq!(rc.mode(), RunMode::Idle);
        assert!(rc.record().is_empty());
        assert_eq!(rc.sink().records[0].len(), 851);
    }

    #[test]
    fn test_rows_are_not_modified_after_append() {
        let mut rc = run_ctrl(RampProfile::new(5, 0, Direction::Forward).unwrap());
        rc.start(0.0).unwrap();

        rc.tick(0.02).unwrap();
        let first: Sample = rc.record().samples()[0];

        rc.drive_mut().rate = 4.0;
        run_to_completion(&mut rc, 0.02);

        assert_eq!(rc.record().samples()[0], first);
        assert_eq!(rc.record().len() as u64, rc.tick_count());
    }

    #[test]
    fn test_stop_at_tick_zero() {
        let mut rc = run_ctrl(RampProfile::default());
        rc.start(1.0).unwrap();

        let summary = rc.stop(1.0).unwrap().unwrap();
        assert_eq!(summary.num_rows, 0);
        assert_eq!(summary.path, None);
        assert_eq!(summary.elapsed_s, 0.0);

        // Nothing persisted for an empty record
        assert!(rc.sink().records.is_empty());
        assert_eq!(rc.mode(), RunMode::Idle);
    }

    #[test]
    fn test_stop_mid_run() {
        let mut rc = run_ctrl(RampProfile::default());
        rc.start(0.0).unwrap();
        for i in 1..=10 {
            rc.tick(i as f64 * 0.02).unwrap();
        }

        let summary = rc.stop(0.25).unwrap().unwrap();
        assert_eq!(summary.num_rows, 10);
        assert_eq!(*rc.drive().left_dems.last().unwrap(), 0.0);
        assert_eq!(*rc.drive().right_dems.last().unwrap(), 0.0);
    }

    #[test]
    fn test_stop_when_idle_is_noop() {
        let mut rc = run_ctrl(RampProfile::default());
        assert_eq!(rc.stop(0.0).unwrap(), None);
        assert_eq!(rc.mode(), RunMode::Idle);
    }

    #[test]
    fn test_restart_after_flush() {
        let mut rc = run_ctrl(RampProfile::new(3, 1, Direction::Forward).unwrap());

        for run in 0..3 {
            let t0 = run as f64 * 10.0;
            rc.start(t0).unwrap();
            assert_eq!(rc.tick_count(), 0);
            assert!(rc.record().is_empty());

            let ticks = run_to_completion(&mut rc, t0);
            assert_eq!(ticks, 8);
            rc.stop(t0 + 1.0).unwrap();
        }

        assert_eq!(rc.sink().records.len(), 3);
        assert!(rc.sink().records.iter().all(|r| r.len() == 8));
    }

    #[test]
    fn test_start_rejected_while_running() {
        let mut rc = run_ctrl(RampProfile::default());
        rc.start(0.0).unwrap();
        rc.tick(0.02).unwrap();

        match rc.start(0.04) {
            Err(RunCtrlError::AlreadyRunning) => (),
            r => panic!("Expected AlreadyRunning, got {:?}", r),
        }
        assert_eq!(rc.tick_count(), 1);
    }

    #[test]
    fn test_start_rejected_before_first_stop() {
        let mut rc = run_ctrl(RampProfile::new(1, 0, Direction::Forward).unwrap());
        rc.start(0.0).unwrap();
        run_to_completion(&mut rc, 0.0);
        assert_eq!(rc.mode(), RunMode::Stopping);

        // No stop has been tried yet, the record is just waiting to be persisted
        let e = rc.start(1.0).unwrap_err();
        assert!(matches!(e, RunCtrlError::UnflushedRecord(3)));
        assert_eq!(
            e.to_string(),
            "Cannot start a run, the previous run's record (3 samples) has not been persisted yet"
        );
        assert_eq!(rc.record().len(), 3);
    }

    #[test]
    fn test_tick_when_not_running() {
        let mut rc = run_ctrl(RampProfile::default());

        match rc.tick(0.0) {
            Err(RunCtrlError::NotRunning) => (),
            r => panic!("Expected NotRunning, got {:?}", r),
        }
        assert!(rc.drive().left_dems.is_empty());
    }

    #[test]
    fn test_persist_failure_keeps_record() {
        let mut rc = run_ctrl(RampProfile::new(2, 0, Direction::Forward).unwrap());
        rc.sink_mut().fail = true;

        rc.start(0.0).unwrap();
        run_to_completion(&mut rc, 0.0);
        assert_eq!(rc.record().len(), 5);

        match rc.stop(1.0) {
            Err(RunCtrlError::PersistError(_)) => (),
            r => panic!("Expected PersistError, got {:?}", r),
        }
        assert_eq!(rc.mode(), RunMode::Stopping);
        assert_eq!(rc.record().len(), 5);

        // New runs can't clobber the unsaved record
        match rc.start(2.0) {
            Err(RunCtrlError::UnflushedRecord(5)) => (),
            r => panic!("Expected UnflushedRecord, got {:?}", r),
        }

        // Retry succeeds once the sink recovers
        rc.sink_mut().fail = false;
        let summary = rc.stop(3.0).unwrap().unwrap();
        assert_eq!(summary.num_rows, 5);
        assert_eq!(rc.sink().records[0].len(), 5);
        assert!(rc.record().is_empty());
        assert_eq!(rc.mode(), RunMode::Idle);
    }

    #[test]
    fn test_stop_into_fallback_sink() {
        let mut rc = run_ctrl(RampProfile::new(2, 0, Direction::Forward).unwrap());
        rc.sink_mut().fail = true;

        rc.start(0.0).unwrap();
        run_to_completion(&mut rc, 0.0);
        assert!(rc.stop(1.0).is_err());

        // A failing fallback keeps the record too
        let mut fallback = MemSink { fail: true, records: Vec::new() };
        assert!(rc.stop_into(1.5, &mut fallback).is_err());
        assert_eq!(rc.mode(), RunMode::Stopping);
        assert_eq!(rc.record().len(), 5);

        fallback.fail = false;
        let summary = rc.stop_into(2.0, &mut fallback).unwrap().unwrap();
        assert_eq!(summary.num_rows, 5);
        assert_eq!(summary.path, Some(PathBuf::from("mem_1.csv")));
        assert_eq!(fallback.records[0].len(), 5);
        assert!(rc.sink().records.is_empty());
        assert!(rc.record().is_empty());
        assert_eq!(rc.mode(), RunMode::Idle);

        // Nothing left to stop
        assert_eq!(rc.stop_into(3.0, &mut fallback).unwrap(), None);
    }

    #[test]
    fn test_discard_after_failure() {
        let mut rc = run_ctrl(RampProfile::new(2, 0, Direction::Forward).unwrap());
        rc.sink_mut().fail = true;

        rc.start(0.0).unwrap();
        run_to_completion(&mut rc, 0.0);
        assert!(rc.stop(1.0).is_err());

        rc.discard();
        assert_eq!(rc.mode(), RunMode::Idle);
        assert!(rc.record().is_empty());
        rc.start(2.0).unwrap();
    }

    #[test]
    fn test_proc_cycle() {
        let mut rc = run_ctrl(RampProfile::new(2, 1, Direction::Forward).unwrap());

        // Idle cycles do nothing
        let (_, report) = rc.proc(&InputData { now_s: 0.0, cmd: None }).unwrap();
        assert_eq!(report.mode, RunMode::Idle);
        assert!(rc.drive().left_dems.is_empty());

        // Start arms without driving
        let (_, report) = rc
            .proc(&InputData { now_s: 0.02, cmd: Some(RunCmd::Start) })
            .unwrap();
        assert_eq!(report.mode, RunMode::Running);
        assert_eq!(report.phase, None);
        assert!(rc.drive().left_dems.is_empty());

        let mut t = 0.02;
        let mut report = report;
        while report.mode == RunMode::Running {
            t += 0.02;
            let (_, r) = rc.proc(&InputData { now_s: t, cmd: None }).unwrap();
            report = r;
        }
        assert!(report.profile_finished);
        assert_eq!(report.tick, 6);
        assert_eq!(report.num_samples, 6);
        assert_eq!(report.phase, Some(RampPhase::Down));

        let (out, report) = rc
            .proc(&InputData { now_s: t + 0.02, cmd: Some(RunCmd::Stop) })
            .unwrap();
        assert_eq!(report.mode, RunMode::Idle);
        assert_eq!(out.summary.unwrap().num_rows, 6);
    }

    /// Drivetrain whose rate is its last left demand.
    #[derive(Default)]
    struct EchoDrive {
        left_dem: f64,
    }

    impl ActuationPort for EchoDrive {
        fn set_left_speed(&mut self, speed: f64) {
            self.left_dem = speed;
        }

        fn set_right_speed(&mut self, _speed: f64) {}
    }

    impl TelemetryPort for EchoDrive {
        fn left_position(&self) -> f64 {
            0.0
        }

        fn right_position(&self) -> f64 {
            0.0
        }

        fn left_rate(&self) -> f64 {
            self.left_dem
        }

        fn right_rate(&self) -> f64 {
            -self.left_dem
        }

        fn supply_voltage(&self) -> f64 {
            7.0
        }

        fn reset_encoders(&mut self) {}
    }

    #[test]
    fn test_telemetry_read_before_actuation() {
        let mut rc = RunCtrl::new(
            RampProfile::new(4, 0, Direction::Forward).unwrap(),
            EchoDrive::default(),
            MemSink::default(),
        );
        rc.start(0.0).unwrap();
        for i in 1..=3 {
            rc.tick(i as f64).unwrap();
        }

        // Each sample sees the previous tick's demand
        let s = rc.record().samples();
        assert_eq!(s[0].left_rate, 0.0);
        assert_eq!(s[1].left_rate, 0.0);
        assert_eq!(s[1].speed_request, 0.25);
        assert_eq!(s[2].left_rate, 0.25);
        assert_eq!(s[2].speed_request, 0.5);
    }

    #[test]
    fn test_first_acceleration_relative_to_start() {
        let mut rc = run_ctrl(RampProfile::default());
        rc.drive_mut().rate = 1.0;
        rc.start(0.0).unwrap();

        rc.drive_mut().rate = 1.5;
        rc.tick(0.5).unwrap();

        let s = rc.record().samples()[0];
        assert_relative_eq!(s.left_acc, 1.0);
        assert_relative_eq!(s.right_acc, -1.0);
    }
}

//! Persistence of run records

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use chrono::Utc;
use log::{debug, info};
use serde::Serialize;
use std::path::PathBuf;

// Internal
use super::RunRecord;
use util::{
    archive::{ArchiveError, Archiver},
    session::TIMESTAMP_FORMAT,
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// File name prefix of persisted run records.
pub const RECORD_FILE_PREFIX: &str = "characdata";

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A destination for completed run records.
pub trait RecordSink {
    /// Persist the record.
    ///
    /// Ownership of the record passes to the sink. If it cannot be persisted
    /// the record is handed back inside the failure so no data is lost.
    fn persist(&mut self, record: RunRecord) -> Result<PersistReceipt, PersistFailure>;
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Confirmation that a record was persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PersistReceipt {
    /// Where the record was written, if anywhere.
    pub path: Option<PathBuf>,

    /// Number of data rows written, excluding the header.
    pub num_rows: usize,
}

/// A record which could not be persisted, and why.
#[derive(Debug, thiserror::Error)]
#[error("Could not persist a record of {} samples: {source}", .record.len())]
pub struct PersistFailure {
    pub record: RunRecord,

    #[source]
    pub source: ArchiveError,
}

/// Writes each record to its own CSV file in a directory.
///
/// Files are named `characdata_{timestamp}_{run index}.csv`.
pub struct CsvSink {
    dir: PathBuf,
    run_index: u32,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl CsvSink {
    /// Create a sink writing into the given directory, which is created on
    /// the first write if it doesn't exist.
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self {
            dir: dir.into(),
            run_index: 0,
        }
    }

    pub fn dir(&self) -> &PathBuf {
        &self.dir
    }

    fn next_path(&self) -> PathBuf {
        self.dir.join(format!(
            "{}_{}_{:03}.csv",
            RECORD_FILE_PREFIX,
            Utc::now().format(TIMESTAMP_FORMAT),
            self.run_index
        ))
    }

    fn write(&self, path: &PathBuf, record: &RunRecord) -> Result<usize, ArchiveError> {
        let mut arch = Archiver::create(path)?;
        arch.serialise_all(record.samples())?;

        Ok(arch.num_records())
    }
}

impl RecordSink for CsvSink {
    fn persist(&mut self, record: RunRecord) -> Result<PersistReceipt, PersistFailure> {
        if record.is_empty() {
            debug!("Empty record, nothing to persist");
            return Ok(PersistReceipt {
                path: None,
                num_rows: 0,
            });
        }

        let path = self.next_path();

        match self.write(&path, &record) {
            Ok(num_rows) => {
                info!("Wrote {} samples to {:?}", num_rows, path);
                self.run_index += 1;

                Ok(PersistReceipt {
                    path: Some(path),
                    num_rows,
                })
            }
            Err(source) => Err(PersistFailure { record, source }),
        }
    }
}

//! Struct archiving functionality
//!
//! To add archiving functionality to a struct implement the `Archived` trait.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use csv::WriterBuilder;
pub use csv::Writer;
use serde::Serialize;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use thiserror::Error;

// Internal imports
use crate::session::Session;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// An object used to write CSV archive files.
///
/// The header row is taken from the field names of the first serialised
/// record.
#[derive(Default)]
pub struct Archiver {
    writer: Option<Writer<File>>,
    path: PathBuf,
    num_records: usize,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors which can occur while writing an archive.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Cannot create the archive file {0:?}: {1}")]
    CreateError(PathBuf, std::io::Error),

    #[error("Cannot write to the archive: {0}")]
    WriteError(#[from] csv::Error),

    #[error("Cannot flush the archive: {0}")]
    FlushError(#[from] std::io::Error),

    #[error("The archiver has not been initialised")]
    NotInitialised,
}

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A trait which enables a struct to be archived as a timestamped csv.
///
/// To implement this trait, the struct shall have an `Archiver` member which
/// shall be setup in the struct's `init` or `new` functions.
pub trait Archived {
    /// Write the archives for this struct
    fn write(&mut self) -> Result<(), ArchiveError>;
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Archiver {
    /// Create a new archiver from a paricular path relative to the session's
    /// archive root.
    pub fn from_path<P: AsRef<Path>>(session: &Session, path: P) -> Result<Self, ArchiveError> {
        Self::create(session.arch_root.join(path))
    }

    /// Create a new archiver writing to the given path.
    ///
    /// Missing parent directories are created and any existing file at the
    /// path is truncated.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self, ArchiveError> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ArchiveError::CreateError(path.clone(), e))?;
        }

        let file = File::create(&path).map_err(|e| ArchiveError::CreateError(path.clone(), e))?;

        let w = WriterBuilder::new().has_headers(true).from_writer(file);

        Ok(Self {
            writer: Some(w),
            path,
            num_records: 0,
        })
    }

    /// Serialise a record into the archive.
    pub fn serialise<T: Serialize>(&mut self, record: T) -> Result<(), ArchiveError> {
        let w = self.writer.as_mut().ok_or(ArchiveError::NotInitialised)?;

        w.serialize(record)?;
        self.num_records += 1;

        Ok(())
    }

    /// Serialise every record of the slice, then flush.
    pub fn serialise_all<T: Serialize>(&mut self, records: &[T]) -> Result<(), ArchiveError> {
        for r in records {
            self.serialise(r)?;
        }

        self.flush()
    }

    /// Flush buffered records to the file.
    pub fn flush(&mut self) -> Result<(), ArchiveError> {
        let w = self.writer.as_mut().ok_or(ArchiveError::NotInitialised)?;

        w.flush()?;

        Ok(())
    }

    /// The path of the archive file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of records serialised so far, not counting the header.
    pub fn num_records(&self) -> usize {
        self.num_records
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[derive(Serialize)]
    struct Row {
        #[serde(rename = "Time")]
        time_s: f64,
        label: &'static str,
    }

    #[test]
    fn test_archiver_writes_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/rows.csv");

        let mut arch = Archiver::create(&path).unwrap();
        arch.serialise_all(&[
            Row { time_s: 0.5, label: "a" },
            Row { time_s: 1.0, label: "b" },
        ])
        .unwrap();

        assert_eq!(arch.num_records(), 2);
        assert_eq!(arch.path(), path.as_path());

        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "Time,label\n0.5,a\n1.0,b\n");
    }

    #[test]
    fn test_uninitialised_archiver() {
        let mut arch = Archiver::default();

        match arch.serialise(1u8) {
            Err(ArchiveError::NotInitialised) => (),
            r => panic!("Expected NotInitialised, got {:?}", r),
        }
    }
}

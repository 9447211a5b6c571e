//! Run record

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use super::Sample;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The ordered samples of one run.
///
/// Samples can only be appended, never modified or removed, and the record
/// is consumed as a whole when it is persisted.
#[derive(Debug, Default, PartialEq)]
pub struct RunRecord {
    samples: Vec<Sample>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl RunRecord {
    /// Append a sample, returning a reference to it.
    pub(crate) fn push(&mut self, sample: Sample) -> &Sample {
        self.samples.push(sample);
        &self.samples[self.samples.len() - 1]
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration covered by the record, from the first to the last sample.
    pub fn duration_s(&self) -> f64 {
        match (self.samples.first(), self.samples.last()) {
            (Some(f), Some(l)) => l.time_s - f.time_s,
            _ => 0.0,
        }
    }
}

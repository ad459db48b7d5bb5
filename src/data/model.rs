use std::collections::BTreeMap;
use std::fmt;

use crate::error::{PipelineError, Result};

// ---------------------------------------------------------------------------
// Interval – one annotation row
// ---------------------------------------------------------------------------

/// A labelled time span in seconds, as read from an annotation file.
///
/// `start_s <= end_s` is expected but not enforced; an inverted interval
/// simply activates no samples.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interval {
    pub start_s: f64,
    pub end_s: f64,
}

impl Interval {
    pub fn new(start_s: f64, end_s: f64) -> Self {
        Self { start_s, end_s }
    }

    /// Raw duration in seconds, independent of any sample rounding.
    pub fn duration_s(&self) -> f64 {
        self.end_s - self.start_s
    }
}

impl From<(f64, f64)> for Interval {
    fn from((start_s, end_s): (f64, f64)) -> Self {
        Self { start_s, end_s }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:.4}s, {:.4}s)", self.start_s, self.end_s)
    }
}

/// Single-channel waveform.
pub type AudioSample = Vec<f32>;

/// One 0/1 entry per audio sample.
pub type LabelMask = Vec<u8>;

// ---------------------------------------------------------------------------
// DatasetRecord – one row of the output table
// ---------------------------------------------------------------------------

/// A fully processed file pair, stored at the run's target rate.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetRecord {
    /// Base name shared by the `.wav` and `.txt` files.
    pub identifier: String,
    pub audio: AudioSample,
    /// Same length as `audio`.
    pub mask: LabelMask,
    /// `end_s - start_s` for every annotation row, in file order.
    pub durations_s: Vec<f64>,
    /// Rate `audio` and `mask` are sampled at.
    pub sample_rate: u32,
}

impl DatasetRecord {
    /// Number of samples set to 1.
    pub fn active_samples(&self) -> usize {
        self.mask.iter().filter(|&&v| v == 1).count()
    }

    /// Length of the record in seconds.
    pub fn duration_s(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.audio.len() as f64 / self.sample_rate as f64
    }
}

// ---------------------------------------------------------------------------
// Dataset – the complete assembled table
// ---------------------------------------------------------------------------

/// Insertion-ordered records keyed by identifier.
///
/// Only code inside the crate appends; callers get a read-only view once the
/// assembler hands the dataset out.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    records: Vec<DatasetRecord>,
    index: BTreeMap<String, usize>,
}

impl Dataset {
    /// Build a dataset from already-processed records, rejecting duplicates.
    pub fn from_records(records: Vec<DatasetRecord>) -> Result<Self> {
        let mut dataset = Dataset::default();
        for record in records {
            dataset.push(record)?;
        }
        Ok(dataset)
    }

    pub(crate) fn push(&mut self, record: DatasetRecord) -> Result<()> {
        if self.index.contains_key(&record.identifier) {
            return Err(PipelineError::consistency(format!(
                "identifier '{}' appears more than once",
                record.identifier
            )));
        }
        self.index.insert(record.identifier.clone(), self.records.len());
        self.records.push(record);
        Ok(())
    }

    pub fn get(&self, identifier: &str) -> Option<&DatasetRecord> {
        self.index.get(identifier).map(|&i| &self.records[i])
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.index.contains_key(identifier)
    }

    /// Records in insertion order.
    pub fn records(&self) -> &[DatasetRecord] {
        &self.records
    }

    pub fn identifiers(&self) -> impl Iterator<Item = &str> {
        self.records.iter().map(|r| r.identifier.as_str())
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the dataset is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str) -> DatasetRecord {
        DatasetRecord {
            identifier: id.to_string(),
            audio: vec![0.0; 4],
            mask: vec![0, 1, 1, 0],
            durations_s: vec![0.5],
            sample_rate: 4,
        }
    }

    #[test]
    fn keeps_insertion_order_and_index() {
        let ds = Dataset::from_records(vec![record("b"), record("a")]).unwrap();
        let ids: Vec<&str> = ds.identifiers().collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert_eq!(ds.get("a").unwrap().identifier, "a");
        assert!(ds.get("c").is_none());
    }

    #[test]
    fn duplicate_identifier_is_rejected() {
        let err = Dataset::from_records(vec![record("a"), record("a")]).unwrap_err();
        assert!(matches!(err, PipelineError::Consistency(_)));
    }

    #[test]
    fn record_summaries() {
        let r = record("a");
        assert_eq!(r.active_samples(), 2);
        assert!((r.duration_s() - 1.0).abs() < 1e-12);
        assert!((Interval::new(1.25, 2.0).duration_s() - 0.75).abs() < 1e-12);
    }
}

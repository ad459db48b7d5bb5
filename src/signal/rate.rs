use std::collections::BTreeSet;
use std::path::Path;

use hound::WavReader;
use log::{info, warn};

use crate::error::{PipelineError, Result};

/// Outcome of inspecting the headers of a set of audio files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateReport {
    /// Rate of the first file in the collection.
    pub source_sr: u32,
    /// Whether every file reports `source_sr`.
    pub rates_agree: bool,
}

/// Read the sampling rate from a WAV header without decoding samples.
pub fn read_sample_rate(path: &Path) -> Result<u32> {
    let reader = WavReader::open(path).map_err(|e| PipelineError::data_access(path, e))?;
    let rate = reader.spec().sample_rate;
    if rate == 0 {
        return Err(PipelineError::data_access(path, "header reports a sampling rate of 0"));
    }
    Ok(rate)
}

/// Inspect every file and report the first rate plus whether all agree.
///
/// Disagreement is reported, not rejected; callers decide whether to enforce.
pub fn inspect_rates<P: AsRef<Path>>(paths: &[P]) -> Result<RateReport> {
    let Some(first) = paths.first() else {
        return Err(PipelineError::config("no audio files to inspect"));
    };
    let source_sr = read_sample_rate(first.as_ref())?;

    let mut distinct = BTreeSet::from([source_sr]);
    for path in &paths[1..] {
        distinct.insert(read_sample_rate(path.as_ref())?);
    }
    let rates_agree = distinct.len() == 1;

    info!("sample rate of first file is {source_sr} Hz");
    info!("sample rates of other files agree = {rates_agree}");
    if !rates_agree {
        warn!("distinct sample rates found: {distinct:?}");
    }

    Ok(RateReport {
        source_sr,
        rates_agree,
    })
}

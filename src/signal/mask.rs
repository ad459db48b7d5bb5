use std::path::Path;

use crate::data::model::{Interval, LabelMask};
use crate::error::{PipelineError, Result};

/// Convert a time in seconds to a sample index.
///
/// Halfway cases round to even, so `0.5 s * 5 Hz` lands on sample 2.
pub fn to_sample_index(time_s: f64, sample_rate: u32) -> i64 {
    (time_s * sample_rate as f64).round_ties_even() as i64
}

/// Parse one annotation row given as text.
pub fn parse_interval(start: &str, end: &str) -> std::result::Result<Interval, String> {
    let parse = |field: &str, name: &str| -> std::result::Result<f64, String> {
        let value = field
            .trim()
            .parse::<f64>()
            .map_err(|_| format!("{name} '{field}' is not a number"))?;
        if !value.is_finite() {
            return Err(format!("{name} '{field}' is not finite"));
        }
        Ok(value)
    };
    Ok(Interval::new(parse(start, "start")?, parse(end, "end")?))
}

/// Build a dense 0/1 mask of exactly `len` samples from `intervals`.
///
/// Each interval activates `[round(start * sr), round(end * sr))`, clamped to
/// `[0, len)`. Overlaps are a union. An interval with `end < start` activates
/// nothing. The second value holds the raw duration of every interval in
/// input order.
pub fn mask_from_intervals(
    intervals: &[Interval],
    sample_rate: u32,
    len: usize,
) -> Result<(LabelMask, Vec<f64>)> {
    if sample_rate == 0 {
        return Err(PipelineError::config("sampling rate must be positive"));
    }

    let mut mask = vec![0u8; len];
    let mut durations = Vec::with_capacity(intervals.len());
    let upper = len as i64;

    for interval in intervals {
        durations.push(interval.duration_s());

        let start = to_sample_index(interval.start_s, sample_rate).clamp(0, upper) as usize;
        let end = to_sample_index(interval.end_s, sample_rate).clamp(0, upper) as usize;
        if start < end {
            mask[start..end].fill(1);
        }
    }

    Ok((mask, durations))
}

/// Text-form variant of [`mask_from_intervals`] for rows read straight from
/// the delimited file at `source`, which parse errors name.
pub fn mask_from_text_rows<S: AsRef<str>>(
    source: &Path,
    rows: &[[S; 2]],
    sample_rate: u32,
    len: usize,
) -> Result<(LabelMask, Vec<f64>)> {
    let intervals = rows
        .iter()
        .enumerate()
        .map(|(i, [start, end])| {
            parse_interval(start.as_ref(), end.as_ref())
                .map_err(|e| PipelineError::data_access(source, format!("row {i}: {e}")))
        })
        .collect::<Result<Vec<_>>>()?;
    mask_from_intervals(&intervals, sample_rate, len)
}

use std::path::{Path, PathBuf};

use hound::{SampleFormat, WavReader};
use log::debug;

use super::model::{AudioSample, Interval};
use crate::config::ChannelPolicy;
use crate::error::{PipelineError, Result};
use crate::signal::mask::parse_interval;

// ---------------------------------------------------------------------------
// File discovery
// ---------------------------------------------------------------------------

/// One recording and its annotation file, sharing a base name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePair {
    pub identifier: String,
    pub audio: PathBuf,
    pub annotation: PathBuf,
}

/// Pair every `<id>.wav` in `dir` with `<id>.txt`, sorted by identifier.
///
/// A recording without its annotation file is an error; stray `.txt` files
/// are ignored.
pub fn discover_pairs(dir: &Path) -> Result<Vec<FilePair>> {
    let entries = std::fs::read_dir(dir).map_err(|e| PipelineError::data_access(dir, e))?;

    let mut pairs = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| PipelineError::data_access(dir, e))?.path();
        let is_wav = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("wav"));
        if !is_wav || !path.is_file() {
            continue;
        }
        let Some(identifier) = path.file_stem().and_then(|s| s.to_str()).map(str::to_string)
        else {
            return Err(PipelineError::data_access(&path, "file name is not valid UTF-8"));
        };

        let annotation = path.with_extension("txt");
        if !annotation.is_file() {
            return Err(PipelineError::data_access(
                &annotation,
                format!("missing annotation file for '{identifier}'"),
            ));
        }
        pairs.push(FilePair {
            identifier,
            audio: path,
            annotation,
        });
    }

    if pairs.is_empty() {
        return Err(PipelineError::config(format!(
            "no .wav files found in {}",
            dir.display()
        )));
    }
    pairs.sort_by(|a, b| a.identifier.cmp(&b.identifier));
    debug!("{} wav files found in {}", pairs.len(), dir.display());
    Ok(pairs)
}

// ---------------------------------------------------------------------------
// Audio
// ---------------------------------------------------------------------------

/// Decode a WAV file into per-channel `f32` samples in `[-1, 1]`.
pub fn read_wav_channels(path: &Path) -> Result<(Vec<Vec<f32>>, u32)> {
    let mut reader = WavReader::open(path).map_err(|e| PipelineError::data_access(path, e))?;
    let spec = reader.spec();
    let channels = spec.channels as usize;
    if channels == 0 {
        return Err(PipelineError::data_access(path, "header reports zero channels"));
    }
    let mut samples = vec![Vec::new(); channels];

    match spec.sample_format {
        SampleFormat::Float => {
            for (idx, sample) in reader.samples::<f32>().enumerate() {
                let value = sample.map_err(|e| PipelineError::data_access(path, e))?;
                samples[idx % channels].push(value);
            }
        }
        SampleFormat::Int => {
            let max = (1_i64 << (spec.bits_per_sample - 1)) as f32;
            for (idx, sample) in reader.samples::<i32>().enumerate() {
                let value = sample.map_err(|e| PipelineError::data_access(path, e))? as f32 / max;
                samples[idx % channels].push(value);
            }
        }
    }

    Ok((samples, spec.sample_rate))
}

/// Reduce decoded channels to a single channel according to `policy`.
pub fn reduce_channels(mut channels: Vec<Vec<f32>>, policy: ChannelPolicy) -> AudioSample {
    if channels.len() <= 1 {
        return channels.pop().unwrap_or_default();
    }
    match policy {
        ChannelPolicy::First => channels.swap_remove(0),
        ChannelPolicy::Downmix => {
            let len = channels.iter().map(Vec::len).min().unwrap_or(0);
            let scale = 1.0 / channels.len() as f32;
            let mut mixed = vec![0.0_f32; len];
            for channel in &channels {
                for (out, value) in mixed.iter_mut().zip(channel) {
                    *out += *value;
                }
            }
            for value in &mut mixed {
                *value *= scale;
            }
            mixed
        }
    }
}

/// Load a recording as one channel plus its native sampling rate.
pub fn load_audio(path: &Path, policy: ChannelPolicy) -> Result<(AudioSample, u32)> {
    let (channels, sample_rate) = read_wav_channels(path)?;
    if channels.len() > 1 {
        debug!(
            "{}: reducing {} channels with policy '{policy}'",
            path.display(),
            channels.len()
        );
    }
    Ok((reduce_channels(channels, policy), sample_rate))
}

// ---------------------------------------------------------------------------
// Annotations
// ---------------------------------------------------------------------------

/// Parse tab-delimited `start<TAB>end` rows, in file order.
///
/// There is no header. Blank lines are skipped and columns after the second
/// (e.g. a label text) are ignored.
pub fn load_annotations(path: &Path) -> Result<Vec<Interval>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| PipelineError::data_access(path, e))?;

    let mut intervals = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.map_err(|e| PipelineError::data_access(path, e))?;
        if record.iter().all(str::is_empty) {
            continue;
        }
        let (Some(start), Some(end)) = (record.get(0), record.get(1)) else {
            return Err(PipelineError::data_access(
                path,
                format!("row {row_no}: expected two tab-separated fields"),
            ));
        };
        let interval = parse_interval(start, end)
            .map_err(|e| PipelineError::data_access(path, format!("row {row_no}: {e}")))?;
        intervals.push(interval);
    }
    Ok(intervals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hound::{WavSpec, WavWriter};
    use tempfile::tempdir;

    fn write_stereo(path: &Path) {
        let spec = WavSpec {
            channels: 2,
            sample_rate: 8000,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(path, spec).unwrap();
        for _ in 0..4 {
            writer.write_sample(16384i16).unwrap();
            writer.write_sample(0i16).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn channel_policies() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("stereo.wav");
        write_stereo(&path);

        let (first, rate) = load_audio(&path, ChannelPolicy::First).unwrap();
        assert_eq!(rate, 8000);
        assert_eq!(first, vec![0.5; 4]);

        let (mixed, _) = load_audio(&path, ChannelPolicy::Downmix).unwrap();
        assert_eq!(mixed, vec![0.25; 4]);
    }

    #[test]
    fn annotations_keep_file_order() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, "1.5\t2.0\n\n0.25\t0.5\tspeech\n").unwrap();
        let intervals = load_annotations(&path).unwrap();
        assert_eq!(intervals, vec![Interval::new(1.5, 2.0), Interval::new(0.25, 0.5)]);
    }

    #[test]
    fn malformed_annotation_row_names_the_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.txt");
        std::fs::write(&path, "0.0\t0.5\n0.7\n").unwrap();
        let err = load_annotations(&path).unwrap_err();
        assert!(err.to_string().contains("bad.txt"));
        assert!(err.to_string().contains("row 1"));
    }

    #[test]
    fn discovery_pairs_and_sorts() {
        let dir = tempdir().unwrap();
        for id in ["b", "a"] {
            write_stereo(&dir.path().join(format!("{id}.wav")));
            std::fs::write(dir.path().join(format!("{id}.txt")), "").unwrap();
        }
        std::fs::write(dir.path().join("notes.txt"), "").unwrap();

        let pairs = discover_pairs(dir.path()).unwrap();
        let ids: Vec<&str> = pairs.iter().map(|p| p.identifier.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert!(pairs[0].annotation.ends_with("a.txt"));
    }

    #[test]
    fn discovery_rejects_unpaired_wav() {
        let dir = tempdir().unwrap();
        write_stereo(&dir.path().join("lonely.wav"));
        let err = discover_pairs(dir.path()).unwrap_err();
        assert!(matches!(err, PipelineError::DataAccess { .. }));
        assert!(err.to_string().contains("lonely"));
    }

    #[test]
    fn discovery_of_empty_dir_is_a_configuration_error() {
        let dir = tempdir().unwrap();
        let err = discover_pairs(dir.path()).unwrap_err();
        assert!(matches!(err, PipelineError::Configuration(_)));
    }
}

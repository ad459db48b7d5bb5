use log::debug;
use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};

use crate::data::model::{AudioSample, LabelMask};
use crate::error::{PipelineError, Result};

/// Interpolated mask values strictly above this become 1.
pub const MASK_THRESHOLD: f32 = 0.5;

const SINC_LEN: usize = 256;

fn sinc_parameters() -> SincInterpolationParameters {
    SincInterpolationParameters {
        sinc_len: SINC_LEN,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    }
}

fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

/// Number of output samples for `len` input samples: `ceil(len * to / from)`.
pub fn resampled_len(len: usize, from_rate: u32, to_rate: u32) -> usize {
    let (len, from, to) = (len as u64, from_rate as u64, to_rate as u64);
    ((len * to).div_ceil(from)) as usize
}

/// Band-limited resampling of a single channel.
///
/// The signal is padded at both ends by repeating its edge values so that a
/// constant input stays constant. Output sample `k` sits at input time
/// `k / to_rate`; the result has exactly [`resampled_len`] samples.
pub fn resample_channel(samples: &[f32], from_rate: u32, to_rate: u32) -> Result<Vec<f32>> {
    check_rates(from_rate, to_rate)?;
    if from_rate == to_rate || samples.is_empty() {
        return Ok(samples.to_vec());
    }

    let (from, to) = (from_rate as u64, to_rate as u64);
    let g = gcd(from, to);
    // Padding is a whole number of input periods so it maps to whole output samples.
    let step = (from / g) as usize;
    let pad = SINC_LEN.div_ceil(step) * step;
    let pad_out = (pad as u64 / (from / g) * (to / g)) as usize;

    let first = samples[0];
    let last = samples[samples.len() - 1];
    let mut padded = Vec::with_capacity(samples.len() + 3 * pad);
    padded.extend(std::iter::repeat(first).take(pad));
    padded.extend_from_slice(samples);
    padded.extend(std::iter::repeat(last).take(2 * pad));

    let ratio = to as f64 / from as f64;
    let mut resampler = SincFixedIn::<f32>::new(ratio, 1.0, sinc_parameters(), padded.len(), 1)
        .map_err(|e| PipelineError::config(format!("resampler setup failed: {e}")))?;
    let input = vec![padded];
    let mut output = resampler
        .process(&input, None)
        .map_err(|e| PipelineError::consistency(format!("resampling failed: {e}")))?;
    let channel = output.pop().unwrap_or_default();

    // The first output of a single `process` call is already aligned with
    // padded input time 0, so only the front padding is skipped.
    let offset = pad_out;
    let wanted = resampled_len(samples.len(), from_rate, to_rate);
    debug!(
        "resampled {} -> {} samples ({from_rate} Hz -> {to_rate} Hz, offset {offset})",
        samples.len(),
        wanted
    );

    Ok((0..wanted)
        .map(|i| channel.get(offset + i).copied().unwrap_or(last))
        .collect())
}

/// Resample a binary mask and threshold it back to 0/1.
pub fn resample_mask(mask: &[u8], from_rate: u32, to_rate: u32) -> Result<LabelMask> {
    let continuous: Vec<f32> = mask.iter().map(|&v| v as f32).collect();
    let resampled = resample_channel(&continuous, from_rate, to_rate)?;
    Ok(binarize(&resampled))
}

/// Values strictly above [`MASK_THRESHOLD`] become 1, everything else 0.
pub fn binarize(values: &[f32]) -> LabelMask {
    values.iter().map(|&v| u8::from(v > MASK_THRESHOLD)).collect()
}

/// Truncate both sequences to the shorter length.
pub fn reconcile_lengths(audio: &mut AudioSample, mask: &mut LabelMask) {
    let len = audio.len().min(mask.len());
    audio.truncate(len);
    mask.truncate(len);
}

/// Audio and its mask at the same rate and of the same length.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedPair {
    pub audio: AudioSample,
    pub mask: LabelMask,
}

/// Resample audio and mask from `source_sr` to `target_sr` with the same
/// algorithm, re-binarize the mask, then truncate both to the shorter length.
pub fn resample_joint(
    audio: &[f32],
    mask: &[u8],
    source_sr: u32,
    target_sr: u32,
) -> Result<AlignedPair> {
    check_rates(source_sr, target_sr)?;
    if audio.len() != mask.len() {
        return Err(PipelineError::consistency(format!(
            "audio has {} samples but mask has {}",
            audio.len(),
            mask.len()
        )));
    }

    let mut audio = resample_channel(audio, source_sr, target_sr)?;
    let mut mask = resample_mask(mask, source_sr, target_sr)?;
    reconcile_lengths(&mut audio, &mut mask);

    Ok(AlignedPair { audio, mask })
}

fn check_rates(source_sr: u32, target_sr: u32) -> Result<()> {
    if source_sr == 0 || target_sr == 0 {
        return Err(PipelineError::config(format!(
            "sampling rates must be positive (source {source_sr}, target {target_sr})"
        )));
    }
    Ok(())
}

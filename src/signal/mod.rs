//! Sample-level signal processing: rate inspection, interval masks and joint
//! resampling of audio with its mask.

pub mod mask;
pub mod rate;
pub mod resample;

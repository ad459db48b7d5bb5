//! Align interval annotations with audio recordings and build a resampled,
//! model-ready dataset.
//!
//! The pipeline per file pair: decode the `.wav`, parse the `.txt` intervals,
//! build a per-sample 0/1 mask at the source rate, then resample audio and
//! mask together to the target rate and re-binarize the mask.

pub mod assembler;
pub mod config;
pub mod data;
pub mod error;
pub mod signal;

pub use assembler::{Assembler, build_dataset, process_pair};
pub use config::{ChannelPolicy, PipelineConfig};
pub use data::model::{Dataset, DatasetRecord, Interval};
pub use error::PipelineError;

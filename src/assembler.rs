use std::collections::VecDeque;

use log::{debug, info, warn};

use crate::config::PipelineConfig;
use crate::data::model::{Dataset, DatasetRecord};
use crate::data::source::{FilePair, discover_pairs, load_annotations, load_audio};
use crate::error::{PipelineError, Result};
use crate::signal::mask::mask_from_intervals;
use crate::signal::rate::inspect_rates;
use crate::signal::resample::{resample_channel, resample_joint};

// ---------------------------------------------------------------------------
// Single file pair
// ---------------------------------------------------------------------------

/// Turn one file pair into a record at `config.target_sr`.
///
/// A recording whose native rate differs from `source_sr` is an error when
/// rate consistency is required; otherwise it is first brought to
/// `source_sr` so the mask is built on the nominal grid.
pub fn process_pair(pair: &FilePair, source_sr: u32, config: &PipelineConfig) -> Result<DatasetRecord> {
    let (mut audio, native_sr) = load_audio(&pair.audio, config.channel_policy)?;
    if native_sr != source_sr {
        if config.require_consistent_rate {
            return Err(PipelineError::consistency(format!(
                "{} is sampled at {native_sr} Hz, expected {source_sr} Hz",
                pair.audio.display()
            )));
        }
        warn!(
            "{}: converting {native_sr} Hz to nominal {source_sr} Hz",
            pair.identifier
        );
        audio = resample_channel(&audio, native_sr, source_sr)?;
    }

    let intervals = load_annotations(&pair.annotation)?;
    let (mask, durations_s) = mask_from_intervals(&intervals, source_sr, audio.len())?;
    debug!(
        "{}: {} samples, {} intervals, {} active",
        pair.identifier,
        audio.len(),
        intervals.len(),
        mask.iter().filter(|&&v| v == 1).count()
    );

    let aligned = resample_joint(&audio, &mask, source_sr, config.target_sr)?;

    Ok(DatasetRecord {
        identifier: pair.identifier.clone(),
        audio: aligned.audio,
        mask: aligned.mask,
        durations_s,
        sample_rate: config.target_sr,
    })
}

// ---------------------------------------------------------------------------
// Assembler – step-wise processor over a work queue
// ---------------------------------------------------------------------------

/// Builds a [`Dataset`] one file pair at a time.
///
/// Pairs leave the queue only after they have been processed successfully, so
/// a failed run can be retried by seeding a new assembler with the records
/// that were already produced (see [`Assembler::resume_from`]).
pub struct Assembler {
    config: PipelineConfig,
    source_sr: u32,
    queue: VecDeque<FilePair>,
    dataset: Dataset,
    processed: usize,
}

impl Assembler {
    /// Discover the pairs in `config.data_dir` and prepare a run.
    pub fn from_config(config: PipelineConfig) -> Result<Self> {
        let pairs = discover_pairs(&config.data_dir)?;
        info!("{} wav files found in {}", pairs.len(), config.data_dir.display());
        Self::new(config, pairs)
    }

    /// Prepare a run over an explicit list of pairs.
    pub fn new(config: PipelineConfig, pairs: Vec<FilePair>) -> Result<Self> {
        config.validate()?;
        let audio_paths: Vec<_> = pairs.iter().map(|p| p.audio.as_path()).collect();
        let report = inspect_rates(&audio_paths)?;
        if !report.rates_agree {
            if config.require_consistent_rate {
                return Err(PipelineError::consistency(
                    "source files do not share one sampling rate",
                ));
            }
            warn!("accepting {} Hz as the nominal source rate", report.source_sr);
        }

        Ok(Self {
            config,
            source_sr: report.source_sr,
            queue: pairs.into(),
            dataset: Dataset::default(),
            processed: 0,
        })
    }

    /// Seed the run with records from an earlier, interrupted run.
    ///
    /// Queued pairs whose identifier is already present are dropped.
    pub fn resume_from(mut self, prior: Dataset) -> Result<Self> {
        if let Some(r) = prior
            .records()
            .iter()
            .find(|r| r.sample_rate != self.config.target_sr)
        {
            return Err(PipelineError::consistency(format!(
                "record '{}' is stored at {} Hz but this run targets {} Hz",
                r.identifier, r.sample_rate, self.config.target_sr
            )));
        }
        let before = self.queue.len();
        self.queue.retain(|p| !prior.contains(&p.identifier));
        info!(
            "resuming: {} records already done, {} pairs skipped",
            prior.len(),
            before - self.queue.len()
        );
        self.dataset = prior;
        Ok(self)
    }

    pub fn source_sr(&self) -> u32 {
        self.source_sr
    }

    /// Pairs still waiting to be processed.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Records collected so far, including resumed ones.
    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    /// Process the next queued pair. Returns `None` once the queue is empty.
    pub fn step(&mut self) -> Result<Option<&DatasetRecord>> {
        let Some(pair) = self.queue.front() else {
            return Ok(None);
        };
        let record = process_pair(pair, self.source_sr, &self.config)?;
        info!("load sample {} ({})", self.processed, record.identifier);
        self.dataset.push(record)?;
        self.queue.pop_front();
        self.processed += 1;
        Ok(self.dataset.records().last())
    }

    /// Process pairs until the queue is empty or one fails.
    ///
    /// On failure the records produced so far stay in [`Assembler::dataset`]
    /// and the failing pair stays at the head of the queue.
    pub fn drain(&mut self) -> Result<()> {
        while self.step()?.is_some() {}
        Ok(())
    }

    /// Drain the queue and hand out the finished dataset.
    ///
    /// The first failing pair aborts the run; no partial dataset is returned.
    pub fn run(mut self) -> Result<Dataset> {
        self.drain()?;
        info!("dataset built: {} records", self.dataset.len());
        Ok(self.dataset)
    }
}

/// Discover, process and collect every pair described by `config`.
pub fn build_dataset(config: PipelineConfig) -> Result<Dataset> {
    Assembler::from_config(config)?.run()
}

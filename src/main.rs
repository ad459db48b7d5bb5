use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};

use rusty_marks::assembler::Assembler;
use rusty_marks::config::{ChannelPolicy, PipelineConfig};
use rusty_marks::data::{loader, writer};

#[derive(Parser)]
#[command(name = "rusty-marks")]
#[command(about = "Build a resampled audio + label-mask dataset from wav/txt pairs", long_about = None)]
struct Cli {
    /// TOML file with run settings; flags below override it.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Directory containing <id>.wav and <id>.txt pairs.
    #[arg(long)]
    data_dir: Option<PathBuf>,
    /// Output table (.parquet or .json).
    #[arg(long, short)]
    output: Option<PathBuf>,
    /// Target sampling rate in Hz.
    #[arg(long)]
    target_sr: Option<u32>,
    /// How multi-channel audio is reduced: first | downmix.
    #[arg(long)]
    channel_policy: Option<ChannelPolicy>,
    /// Accept files whose sampling rates disagree, using the first as nominal.
    #[arg(long)]
    allow_mixed_rates: bool,
    /// Previously written table (a finished output or the `.partial` checkpoint
    /// left by a failed run); its records are kept and their pairs skipped.
    #[arg(long)]
    resume: Option<PathBuf>,
}

impl Cli {
    fn into_config(self) -> Result<(PipelineConfig, Option<PathBuf>)> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_toml_file(path)?,
            None => PipelineConfig::default(),
        };
        if let Some(dir) = self.data_dir {
            config.data_dir = dir;
        }
        if let Some(output) = self.output {
            config.output = output;
        }
        if let Some(sr) = self.target_sr {
            config.target_sr = sr;
        }
        if let Some(policy) = self.channel_policy {
            config.channel_policy = policy;
        }
        if self.allow_mixed_rates {
            config.require_consistent_rate = false;
        }
        config.validate()?;
        Ok((config, self.resume))
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let (config, resume) = Cli::parse().into_config()?;
    info!(
        "target rate {} Hz, channel policy '{}'",
        config.target_sr, config.channel_policy
    );

    let mut assembler = Assembler::from_config(config.clone())?;
    if let Some(path) = resume {
        let prior = loader::load_file(&path)
            .with_context(|| format!("loading resume table {}", path.display()))?;
        assembler = assembler.resume_from(prior)?;
    }
    if let Err(err) = assembler.drain() {
        let done = assembler.dataset();
        if !done.is_empty() {
            let checkpoint = config.checkpoint_path();
            writer::save_file(done, &checkpoint)
                .with_context(|| format!("saving checkpoint {}", checkpoint.display()))?;
            warn!(
                "{} records saved to {}; rerun with --resume {} to continue",
                done.len(),
                checkpoint.display(),
                checkpoint.display()
            );
        }
        return Err(err.into());
    }
    let dataset = assembler.run()?;

    writer::save_file(&dataset, &config.output)
        .with_context(|| format!("saving {}", config.output.display()))?;
    info!("success");
    Ok(())
}

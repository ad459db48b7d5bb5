use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

/// Rate every record is resampled to unless configured otherwise.
pub const DEFAULT_TARGET_SR: u32 = 8000;

// ---------------------------------------------------------------------------
// ChannelPolicy – how multi-channel audio is reduced to one channel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelPolicy {
    /// Keep channel 0 and discard the rest.
    #[default]
    First,
    /// Average all channels.
    Downmix,
}

impl fmt::Display for ChannelPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelPolicy::First => write!(f, "first"),
            ChannelPolicy::Downmix => write!(f, "downmix"),
        }
    }
}

impl FromStr for ChannelPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "first" => Ok(ChannelPolicy::First),
            "downmix" | "mix" => Ok(ChannelPolicy::Downmix),
            other => Err(format!("unknown channel policy '{other}' (expected first or downmix)")),
        }
    }
}

// ---------------------------------------------------------------------------
// PipelineConfig – the explicit run configuration
// ---------------------------------------------------------------------------

/// Everything a run needs to know, passed into the assembler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Directory holding `<id>.wav` / `<id>.txt` pairs.
    pub data_dir: PathBuf,
    /// Where the finished table is written. Format follows the extension.
    pub output: PathBuf,
    /// Rate (Hz) audio and masks are resampled to.
    pub target_sr: u32,
    pub channel_policy: ChannelPolicy,
    /// Abort when source files disagree on their sampling rate.
    pub require_consistent_rate: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./dataset"),
            output: PathBuf::from("data.parquet"),
            target_sr: DEFAULT_TARGET_SR,
            channel_policy: ChannelPolicy::First,
            require_consistent_rate: true,
        }
    }
}

impl PipelineConfig {
    /// Read a TOML config file. Missing keys fall back to the defaults.
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| PipelineError::config(format!("reading {}: {e}", path.display())))?;
        Self::from_toml_str(&text).map_err(|e| match e {
            PipelineError::Configuration(msg) => {
                PipelineError::config(format!("{}: {msg}", path.display()))
            }
            other => other,
        })
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: PipelineConfig =
            toml::from_str(text).map_err(|e| PipelineError::config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Where records finished before a failure are saved: `data.parquet`
    /// becomes `data.partial.parquet`. Never the same file as `output`.
    pub fn checkpoint_path(&self) -> PathBuf {
        let stem = self
            .output
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("data");
        let name = match self.output.extension().and_then(|e| e.to_str()) {
            Some(ext) => format!("{stem}.partial.{ext}"),
            None => format!("{stem}.partial.parquet"),
        };
        self.output.with_file_name(name)
    }

    pub fn validate(&self) -> Result<()> {
        if self.target_sr == 0 {
            return Err(PipelineError::config("target sampling rate must be positive"));
        }
        Ok(())
    }
}

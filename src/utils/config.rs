// src/utils/config.rs
//! Capture engine configuration
//!
//! All knobs are optional with the defaults below; a config file (TOML,
//! YAML, or JSON via the `config` crate) can override any subset.

use crate::utils::errors::{CaptureError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Construction-time configuration for [`crate::CaptureEngine`]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Persist dumps to files under `output_dir`
    pub write_to_file: bool,

    /// Persist dumps to the trace sink
    pub write_to_trace: bool,

    /// Write `name.<reason>` marker artifacts on failure
    pub report_on_error: bool,

    /// When the pool is saturated, drop requests instead of blocking the
    /// producer until a shadow is released
    pub allow_data_loss: bool,

    /// Percent of adapter shared memory usable for shadows (0 = unbounded)
    pub max_percent_shared: u8,

    /// Percent of adapter dedicated memory usable for shadows (0 = tier off)
    pub max_percent_dedicated: u8,

    /// Capture window length in milliseconds
    pub sampling_duration_ms: u64,

    /// Pause between capture windows in milliseconds.
    /// Duration and interval both zero means capture everything.
    pub sampling_interval_ms: u64,

    /// Directory dump artifacts are written to
    pub output_dir: PathBuf,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            write_to_file: true,
            write_to_trace: false,
            report_on_error: true,
            allow_data_loss: true,
            max_percent_shared: 75,
            max_percent_dedicated: 0,
            sampling_duration_ms: 0,
            sampling_interval_ms: 0,
            output_dir: PathBuf::from("surfcap-dumps"),
        }
    }
}

impl CaptureConfig {
    /// Load configuration from a file, with defaults for anything unset
    pub fn from_file(path: &Path) -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::File::from(path))
            .build()
            .map_err(|e| CaptureError::Config(e.to_string()))?;
        let parsed: Self = cfg
            .try_deserialize()
            .map_err(|e| CaptureError::Config(e.to_string()))?;
        parsed.validate()?;
        Ok(parsed)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.max_percent_shared > 100 {
            return Err(CaptureError::Config(
                "max_percent_shared cannot exceed 100".to_string(),
            ));
        }
        if self.max_percent_dedicated > 100 {
            return Err(CaptureError::Config(
                "max_percent_dedicated cannot exceed 100".to_string(),
            ));
        }
        Ok(())
    }
}

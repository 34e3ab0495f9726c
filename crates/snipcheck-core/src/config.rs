//! Harness configuration.
//!
//! Loaded from an optional JSON file; the CLI then overlays flags and
//! `SNIPCHECK_*` environment variables on top.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::controller::{ChannelMode, RunConfig};
use crate::error::{HarnessError, Result};
use crate::fixture::MatchMode;

/// Report rendering format.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for ReportFormat {
    type Err = HarnessError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(ReportFormat::Text),
            "json" => Ok(ReportFormat::Json),
            other => Err(HarnessError::config(format!(
                "unknown report format '{other}' (expected 'text' or 'json')"
            ))),
        }
    }
}

/// Top-level harness settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct HarnessConfig {
    /// Per-snippet wall-clock limit in milliseconds (0 = unlimited).
    pub timeout_ms: u64,

    /// Concurrent workers (1 = sequential).
    pub parallelism: usize,

    /// Give each worker its own output channel.
    pub isolated_channels: bool,

    pub match_mode: MatchMode,

    /// Directory of `<snippet-id>.expected` fixture overrides.
    pub fixtures_dir: Option<PathBuf>,

    pub format: ReportFormat,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 5_000,
            parallelism: 1,
            isolated_channels: true,
            match_mode: MatchMode::Exact,
            fixtures_dir: None,
            format: ReportFormat::Text,
        }
    }
}

impl HarnessConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            HarnessError::config(format!("cannot read config {}: {e}", path.display()))
        })?;
        serde_json::from_str(&text).map_err(|e| {
            HarnessError::config(format!("invalid config {}: {e}", path.display()))
        })
    }

    pub fn run_config(&self) -> RunConfig {
        RunConfig {
            parallelism: self.parallelism,
            channel: if self.isolated_channels {
                ChannelMode::PerWorker
            } else {
                ChannelMode::Shared
            },
            match_mode: self.match_mode,
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.run_config().validate()?;
        if let Some(dir) = &self.fixtures_dir {
            if !dir.is_dir() {
                return Err(HarnessError::config(format!(
                    "fixtures directory {} does not exist",
                    dir.display()
                )));
            }
        }
        Ok(())
    }
}

//! Optional TOML configuration file.
//!
//! Looked up at `--config`, else `$CONFIG_DIR/syndic/config.toml`. Every field
//! is optional; command-line flags override whatever the file sets.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

/// File-level settings overlay.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub fetch: FetchSection,
    pub pipeline: PipelineSection,
    pub media: MediaSection,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FetchSection {
    /// Request timeout in seconds.
    pub timeout: Option<u64>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineSection {
    pub concurrency: Option<usize>,
    /// Delay between batches in milliseconds.
    pub pacing_ms: Option<u64>,
    /// Per-request jitter bounds in milliseconds.
    pub jitter_min_ms: Option<u64>,
    pub jitter_max_ms: Option<u64>,
    pub cache_failures: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MediaSection {
    /// Image proxy prefix for hotlink-protected hosts.
    pub proxy: Option<String>,
    /// Extra protected hosts on top of the ones each source declares.
    pub protected_hosts: Vec<String>,
}

/// Default location of the config file.
pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("syndic").join("config.toml"))
}

impl FileConfig {
    /// Loads `explicit` if given (it must exist), else the default path if it
    /// exists, else an empty config.
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        match explicit {
            Some(path) => Self::load_from(path),
            None => match default_path() {
                Some(path) if path.exists() => Self::load_from(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: FileConfig =
            toml::from_str(&content).with_context(|| format!("Invalid config file: {}", path.display()))?;
        tracing::debug!(path = %path.display(), "loaded config file");
        Ok(config)
    }
}

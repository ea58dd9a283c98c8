use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

pub const DEFAULT_BASE_URL: &str = "http://localhost:3000/api";
pub const DEFAULT_OUTPUT: &str = "backend_test_results.json";
pub const DEFAULT_DELAY_MS: u64 = 500;

/// Optional TOML config file. Every key may be omitted.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub base_url: Option<String>,
    pub output: Option<PathBuf>,
    /// Pause between checks, in milliseconds.
    pub delay_ms: Option<u64>,
    pub timeouts: TimeoutConfig,
}

/// Per-request timeouts in seconds.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TimeoutConfig {
    pub read: Option<u64>,
    pub write: Option<u64>,
    pub setup: Option<u64>,
}

/// Hard per-request bounds. No retries happen on expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub read: Duration,
    pub write: Duration,
    pub setup: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Timeouts {
            read: Duration::from_secs(10),
            write: Duration::from_secs(15),
            setup: Duration::from_secs(30),
        }
    }
}

/// Values given on the command line (or through their env vars).
#[derive(Debug, Default)]
pub struct Overrides {
    pub base_url: Option<String>,
    pub output: Option<PathBuf>,
    pub delay_ms: Option<u64>,
}

/// Fully resolved settings for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub base_url: String,
    pub output: PathBuf,
    pub delay: Duration,
    pub timeouts: Timeouts,
}

/// Load a config file from disk.
pub fn load_config(path: &Path) -> anyhow::Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let config: Config =
        toml::from_str(&content).with_context(|| format!("Failed to parse config: {}", path.display()))?;
    Ok(config)
}

/// Command line wins over the config file, which wins over the built-in defaults.
pub fn resolve(overrides: Overrides, file: Config) -> Settings {
    let defaults = Timeouts::default();
    let secs_or = |value: Option<u64>, fallback: Duration| value.map(Duration::from_secs).unwrap_or(fallback);

    Settings {
        base_url: overrides
            .base_url
            .or(file.base_url)
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        output: overrides
            .output
            .or(file.output)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT)),
        delay: Duration::from_millis(overrides.delay_ms.or(file.delay_ms).unwrap_or(DEFAULT_DELAY_MS)),
        timeouts: Timeouts {
            read: secs_or(file.timeouts.read, defaults.read),
            write: secs_or(file.timeouts.write, defaults.write),
            setup: secs_or(file.timeouts.setup, defaults.setup),
        },
    }
}

use crate::cli::CliArgs;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_API_BASE: &str = "http://localhost:54321/api";

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ScalingPollConfig {
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub max_attempts: u32,
}

impl Default for ScalingPollConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: 2_000,
            max_delay_ms: 30_000,
            max_attempts: 8,
        }
    }
}

impl ScalingPollConfig {
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    pub api_base: String,
    pub request_timeout_secs: u64,
    pub log_tail_lines: u32,
    pub scaling_poll: ScalingPollConfig,
    #[serde(skip)]
    pub source: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            request_timeout_secs: 30,
            log_tail_lines: 500,
            scaling_poll: ScalingPollConfig::default(),
            source: None,
        }
    }
}

impl Settings {
    /// Reads the discovered config file, if any, then applies CLI overrides.
    pub fn load(cli: &CliArgs) -> Result<Self> {
        let home = std::env::var_os("HOME").map(PathBuf::from);
        let explicit = std::env::var("FLEETDECK_CONFIG").ok();
        let path = discover_config_path(explicit.as_deref(), Path::new("."), home.as_deref());
        let settings = match path {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        Ok(settings.with_overrides(cli))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let mut parsed = Self::parse(&raw)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        parsed.source = Some(path.display().to_string());
        Ok(parsed)
    }

    fn parse(raw: &str) -> Result<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(raw)?)
    }

    pub fn with_overrides(mut self, cli: &CliArgs) -> Self {
        if let Some(api_base) = &cli.api_base
            && !api_base.trim().is_empty()
        {
            self.api_base = api_base.trim().to_string();
        }
        if let Some(timeout) = cli.request_timeout_secs {
            self.request_timeout_secs = timeout;
        }
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

fn discover_config_path(
    explicit: Option<&str>,
    cwd: &Path,
    home: Option<&Path>,
) -> Option<PathBuf> {
    if let Some(path) = explicit
        && !path.trim().is_empty()
    {
        return Some(PathBuf::from(path));
    }

    let cwd_candidates = [cwd.join("fleetdeck.yaml"), cwd.join("fleetdeck.yml")];
    for candidate in cwd_candidates {
        if candidate.exists() {
            return Some(candidate);
        }
    }

    let candidate = home?.join(".config/fleetdeck/config.yaml");
    candidate.exists().then_some(candidate)
}

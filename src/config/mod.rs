//! Configuration loading and management.

use std::collections::BTreeMap;
use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::core::Result;
use crate::identity::AliasTable;

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Single-window analysis settings.
    pub analysis: AnalysisConfig,
    /// Multi-period trend settings.
    pub trend: TrendConfig,
    /// Issue backlog settings.
    pub issues: IssuesConfig,
    /// Contributor identity aliases.
    pub identity: IdentityConfig,
    /// Output configuration.
    pub output: OutputConfig,
}

impl Config {
    /// Load configuration from an explicit file path.
    ///
    /// Errors if the file does not exist. Use this for explicit `--config` flags.
    /// Env vars with `GLT_` prefix override file values.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(crate::core::Error::Config(format!(
                "config file not found: {}",
                path.display()
            )));
        }
        let config: Self = Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file_exact(path))
            .merge(Env::prefixed("GLT_").split("__"))
            .extract()
            .map_err(|e| crate::core::Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a directory, looking for `glt-insights.toml`
    /// or `.glt/insights.toml`.
    ///
    /// Missing files are silently skipped (defaults are used).
    /// Env vars with `GLT_` prefix override file/default values.
    pub fn load_default(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let config: Self = Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(dir.join("glt-insights.toml")))
            .merge(Toml::file(dir.join(".glt/insights.toml")))
            .merge(Env::prefixed("GLT_").split("__"))
            .extract()
            .map_err(|e| crate::core::Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Create default config file content.
    pub fn default_toml() -> &'static str {
        include_str!("default_config.toml")
    }

    /// Build the run's alias table from `[identity.aliases]`.
    pub fn alias_table(&self) -> AliasTable {
        AliasTable::from_pairs(
            self.identity
                .aliases
                .iter()
                .map(|(alias, canonical)| (alias.as_str(), canonical.clone())),
        )
    }

    fn validate(&self) -> Result<()> {
        if self.analysis.days == 0 {
            return Err(crate::core::Error::config("analysis.days must be positive"));
        }
        if self.trend.periods.is_empty() || self.trend.periods.contains(&0) {
            return Err(crate::core::Error::config(
                "trend.periods must be a non-empty list of positive day counts",
            ));
        }
        Ok(())
    }
}

/// Single-window analysis configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Trailing window length in days.
    pub days: u32,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self { days: 30 }
    }
}

/// Multi-period trend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendConfig {
    /// Trailing windows to compare, in days.
    pub periods: Vec<u32>,
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            periods: vec![7, 15, 30, 60, 90],
        }
    }
}

/// Issue backlog configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IssuesConfig {
    /// Days without an update before an open issue counts as stale.
    pub stale_days: u32,
}

impl Default for IssuesConfig {
    fn default() -> Self {
        Self { stale_days: 30 }
    }
}

/// Identity alias configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// `alias = "Canonical Name"`; aliases containing `@` are emails.
    pub aliases: BTreeMap<String, String>,
}

/// Output configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Default output format.
    pub format: OutputFormat,
    /// Color output.
    pub color: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Markdown,
            color: true,
        }
    }
}

/// Output format.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable text.
    Text,
    /// JSON format.
    Json,
    /// Markdown format.
    #[default]
    Markdown,
}

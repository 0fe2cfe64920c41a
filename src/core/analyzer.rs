//! Analyzer trait and common types.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{Result, TimeWindow};
use crate::config::Config;
use crate::identity::AliasTable;
use crate::source::Snapshot;

/// Trait implemented by all analyzers.
pub trait Analyzer: Send + Sync {
    /// The result type produced by this analyzer.
    type Output: Serialize + Send;

    /// Unique identifier for this analyzer.
    fn name(&self) -> &'static str;

    /// Human-readable description.
    fn description(&self) -> &'static str;

    /// Run analysis and return results.
    fn analyze(&self, ctx: &AnalysisContext<'_>) -> Result<Self::Output>;

    /// Configure the analyzer from config.
    fn configure(&mut self, _config: &Config) -> Result<()> {
        Ok(())
    }
}

/// Context shared by all analyzers during one run.
pub struct AnalysisContext<'a> {
    /// Materialized platform data.
    pub snapshot: &'a Snapshot,
    /// Configuration.
    pub config: &'a Config,
    /// Alias table built once from the configuration.
    pub aliases: AliasTable,
    /// Reference time every trailing window ends at.
    pub now: DateTime<Utc>,
    /// Progress callback.
    pub on_progress: Option<Box<dyn Fn(usize, usize) + Send + Sync + 'a>>,
}

impl<'a> AnalysisContext<'a> {
    /// Create a new analysis context anchored at `now`.
    pub fn new(snapshot: &'a Snapshot, config: &'a Config, now: DateTime<Utc>) -> Self {
        Self {
            snapshot,
            config,
            aliases: config.alias_table(),
            now,
            on_progress: None,
        }
    }

    /// Trailing window of `days` days ending at the reference time.
    pub fn window(&self, days: u32) -> TimeWindow {
        TimeWindow::trailing(self.now, days)
    }

    /// The configured single-analysis window.
    pub fn default_window(&self) -> TimeWindow {
        self.window(self.config.analysis.days)
    }

    /// Add progress callback.
    pub fn with_progress<F>(mut self, f: F) -> Self
    where
        F: Fn(usize, usize) + Send + Sync + 'a,
    {
        self.on_progress = Some(Box::new(f));
        self
    }

    /// Report progress if callback is set.
    pub fn report_progress(&self, current: usize, total: usize) {
        if let Some(ref f) = self.on_progress {
            f(current, total);
        }
    }
}

/// Quick summary statistics for display.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Summary {
    /// Number of projects analyzed.
    pub projects_analyzed: usize,
    /// Number of projects whose analysis failed.
    pub projects_failed: usize,
    /// Analysis duration.
    #[serde(with = "duration_serde")]
    pub duration: Duration,
}

impl Summary {
    /// Create a new summary.
    pub fn new(projects_analyzed: usize, projects_failed: usize, duration: Duration) -> Self {
        Self {
            projects_analyzed,
            projects_failed,
            duration,
        }
    }
}

mod duration_serde {
    use std::time::Duration;

    use serde::Serializer;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_f64(duration.as_secs_f64())
    }
}

//! Multi-period trends.
//!
//! Each period re-runs the aggregator and scorer from scratch over its own
//! window; nothing is carried between periods. Adjacent periods are then
//! compared metric by metric.

use std::collections::BTreeMap;
use std::fmt;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::analyzers::project::{aggregate_isolated, ProjectMetrics};
use crate::core::{period_label, AnalysisContext, Analyzer as AnalyzerTrait, Error, Result};
use crate::source::ProjectSnapshot;

/// Periods compared when nothing else is configured.
pub const DEFAULT_PERIODS: [u32; 5] = [7, 15, 30, 60, 90];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendMetric {
    Commits,
    CodeChanges,
    Contributors,
    HealthScore,
}

impl TrendMetric {
    pub const ALL: [TrendMetric; 4] = [
        TrendMetric::Commits,
        TrendMetric::CodeChanges,
        TrendMetric::Contributors,
        TrendMetric::HealthScore,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TrendMetric::Commits => "commits",
            TrendMetric::CodeChanges => "code_changes",
            TrendMetric::Contributors => "contributors",
            TrendMetric::HealthScore => "health_score",
        }
    }

    /// Key of this metric's trend map, e.g. `commits_trend`.
    pub fn trend_key(&self) -> String {
        format!("{}_trend", self.as_str())
    }

    /// The compared value. Code changes compare added lines.
    pub fn value(&self, metrics: &ProjectMetrics) -> f64 {
        match self {
            TrendMetric::Commits => metrics.commits_total as f64,
            TrendMetric::CodeChanges => metrics.lines_added as f64,
            TrendMetric::Contributors => metrics.contributors_count as f64,
            TrendMetric::HealthScore => f64::from(metrics.health.score),
        }
    }
}

impl fmt::Display for TrendMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Change of one metric between two adjacent periods.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendDelta {
    pub metric: TrendMetric,
    pub from_period: String,
    pub to_period: String,
    pub from_value: f64,
    pub to_value: f64,
    pub change: f64,
    pub percentage: f64,
}

impl TrendDelta {
    /// Pair key such as `7d_to_15d`.
    pub fn key(&self) -> String {
        pair_key(&self.from_period, &self.to_period)
    }
}

pub fn pair_key(from: &str, to: &str) -> String {
    format!("{from}_to_{to}")
}

/// One period's metrics for a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodMetrics {
    pub days: u32,
    pub period: String,
    pub metrics: ProjectMetrics,
}

/// `{metric}_trend` → `{from}d_to_{to}d` → delta.
pub type TrendMap = BTreeMap<String, BTreeMap<String, TrendDelta>>;

/// A project measured over every requested period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodComparison {
    pub project_id: u64,
    pub name: String,
    /// Ascending by window length.
    pub periods: Vec<PeriodMetrics>,
    pub trends: TrendMap,
}

impl PeriodComparison {
    pub fn period(&self, days: u32) -> Option<&ProjectMetrics> {
        self.periods
            .iter()
            .find(|p| p.days == days)
            .map(|p| &p.metrics)
    }

    pub fn trend(&self, metric: TrendMetric, from: u32, to: u32) -> Option<&TrendDelta> {
        self.trends
            .get(&metric.trend_key())?
            .get(&pair_key(&period_label(from), &period_label(to)))
    }
}

/// Sort ascending and drop duplicates. Zero-length or empty period lists
/// are rejected.
pub fn normalize_periods(periods: &[u32]) -> Result<Vec<u32>> {
    if periods.is_empty() {
        return Err(Error::InvalidArgument("at least one period is required".to_string()));
    }
    if periods.contains(&0) {
        return Err(Error::InvalidArgument("periods must be at least 1 day".to_string()));
    }
    let mut sorted = periods.to_vec();
    sorted.sort_unstable();
    sorted.dedup();
    Ok(sorted)
}

/// Deltas between each adjacent pair of periods. A delta is only produced
/// when the earlier period's value is nonzero. `periods` must be ascending.
pub fn calculate_period_trends(periods: &[PeriodMetrics]) -> TrendMap {
    let mut trends: TrendMap = TrendMetric::ALL
        .iter()
        .map(|m| (m.trend_key(), BTreeMap::new()))
        .collect();

    for pair in periods.windows(2) {
        let (from, to) = (&pair[0], &pair[1]);
        for metric in TrendMetric::ALL {
            let prev = metric.value(&from.metrics);
            if prev == 0.0 {
                continue;
            }
            let current = metric.value(&to.metrics);
            let change = current - prev;
            let delta = TrendDelta {
                metric,
                from_period: from.period.clone(),
                to_period: to.period.clone(),
                from_value: prev,
                to_value: current,
                change,
                percentage: change / prev * 100.0,
            };
            if let Some(map) = trends.get_mut(&metric.trend_key()) {
                map.insert(delta.key(), delta);
            }
        }
    }
    trends
}

/// Re-run aggregation for every period and derive the trends.
///
/// Periods are evaluated in parallel; results are collected in period
/// order. A failing project yields error-flagged metrics for each period.
pub fn compare_periods(
    project: &ProjectSnapshot,
    periods: &[u32],
    ctx: &AnalysisContext<'_>,
) -> Result<PeriodComparison> {
    let periods = normalize_periods(periods)?;
    let per_period: Vec<PeriodMetrics> = periods
        .par_iter()
        .map(|&days| PeriodMetrics {
            days,
            period: period_label(days),
            metrics: aggregate_isolated(project, &ctx.window(days), ctx),
        })
        .collect();
    let trends = calculate_period_trends(&per_period);

    Ok(PeriodComparison {
        project_id: project.id,
        name: project.name.clone(),
        periods: per_period,
        trends,
    })
}

/// One ranking row: `(project_id, name, value)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankEntry {
    pub project_id: u64,
    pub name: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiPeriodComparison {
    pub periods: Vec<u32>,
    pub projects: Vec<PeriodComparison>,
    /// `health_score_{p}d`, `commits_{p}d` and `code_changes_{p}d`, each
    /// sorted by value descending.
    pub rankings: BTreeMap<String, Vec<RankEntry>>,
}

/// Rankings for every period. Ties keep project input order.
pub fn rankings(projects: &[PeriodComparison], periods: &[u32]) -> BTreeMap<String, Vec<RankEntry>> {
    let mut rankings = BTreeMap::new();
    for &days in periods {
        let label = period_label(days);
        for metric in [TrendMetric::HealthScore, TrendMetric::Commits, TrendMetric::CodeChanges] {
            let mut entries: Vec<RankEntry> = projects
                .iter()
                .map(|p| RankEntry {
                    project_id: p.project_id,
                    name: p.name.clone(),
                    value: p.period(days).map(|m| metric.value(m)).unwrap_or(0.0),
                })
                .collect();
            // sort_by is stable.
            entries.sort_by(|a, b| b.value.total_cmp(&a.value));
            rankings.insert(format!("{}_{}", metric.as_str(), label), entries);
        }
    }
    rankings
}

/// Compare every project in the snapshot across `periods`.
pub fn compare_projects_across_periods(
    ctx: &AnalysisContext<'_>,
    periods: &[u32],
) -> Result<MultiPeriodComparison> {
    let periods = normalize_periods(periods)?;
    let total = ctx.snapshot.projects.len();
    let mut projects = Vec::with_capacity(total);
    for (i, project) in ctx.snapshot.projects.iter().enumerate() {
        tracing::info!("Analyzing {} across {} periods", project.name, periods.len());
        projects.push(compare_periods(project, &periods, ctx)?);
        ctx.report_progress(i + 1, total);
    }
    let rankings = rankings(&projects, &periods);
    Ok(MultiPeriodComparison {
        periods,
        projects,
        rankings,
    })
}

/// Multi-period trend analyzer.
#[derive(Default)]
pub struct Analyzer {
    periods: Option<Vec<u32>>,
}

impl Analyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_periods(mut self, periods: Vec<u32>) -> Self {
        self.periods = Some(periods);
        self
    }
}

impl AnalyzerTrait for Analyzer {
    type Output = MultiPeriodComparison;

    fn name(&self) -> &'static str {
        "trends"
    }

    fn description(&self) -> &'static str {
        "Compare project activity and health across trailing periods"
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> Result<Self::Output> {
        let periods = self
            .periods
            .as_deref()
            .unwrap_or(ctx.config.trend.periods.as_slice());
        compare_projects_across_periods(ctx, periods)
    }

    fn configure(&mut self, config: &crate::config::Config) -> Result<()> {
        if self.periods.is_none() {
            self.periods = Some(config.trend.periods.clone());
        }
        Ok(())
    }
}

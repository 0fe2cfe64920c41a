//! Types for the batch report.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::analyzers::issues::IssueAnalytics;
use crate::analyzers::project::ProjectMetrics;
use crate::analyzers::recommend::Recommendation;
use crate::analyzers::team::TeamAnalytics;
use crate::core::Summary;
use crate::score::trend::MultiPeriodComparison;
use crate::score::Grade;

/// Metadata contains report generation metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metadata {
    /// Reference time every window ends at.
    pub generated_at: DateTime<Utc>,
    /// Fetch time reported by the snapshot, if any.
    #[serde(default)]
    pub snapshot_generated_at: Option<String>,
    pub window_days: u32,
    pub periods: Vec<u32>,
    pub version: String,
}

/// Health of the projects in one group.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupHealth {
    pub projects: usize,
    pub average_score: f64,
    pub total_commits: usize,
}

/// Portfolio-level roll-up of the single-window metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub total_projects: usize,
    pub active_projects: usize,
    pub failed_projects: usize,
    pub total_commits: usize,
    /// Distinct canonical contributors across all projects.
    pub total_contributors: usize,
    pub net_lines_owned: i64,
    /// Mean health score of the projects that were analyzed.
    pub average_score: f64,
    pub grade_distribution: BTreeMap<Grade, usize>,
    /// Keyed by group name; projects without a group are under `ungrouped`.
    pub groups: BTreeMap<String, GroupHealth>,
}

/// Everything produced by one batch run.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub metadata: Metadata,
    pub summary: ReportSummary,
    pub projects: Vec<ProjectMetrics>,
    pub team: TeamAnalytics,
    pub issues: IssueAnalytics,
    pub recommendations: Vec<Recommendation>,
    pub trends: MultiPeriodComparison,
    pub run: Summary,
}

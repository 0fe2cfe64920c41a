//! Per-project metrics for one trailing window.
//!
//! Commits are filtered to the window per branch, resolved to owning
//! branches, and only then counted, so a commit reachable from many
//! branches is counted once. Merge requests and issues are filtered by
//! their own timestamps. Every figure is derived from the snapshot alone.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::analyzers::ownership::{self, BranchCommits, BranchOwnership};
use crate::core::{
    days_between, parse_timestamp, AnalysisContext, Analyzer as AnalyzerTrait, Error, Result,
    TimeWindow,
};
use crate::identity::Normalizer;
use crate::score::{self, HealthInputs, HealthScore};
use crate::source::{
    IssueState, MergeRequestState, ProjectSnapshot, RawCommit, RawIssue, RawMergeRequest,
};

/// Days since the last commit when a window has none.
pub const NO_COMMITS_DAYS: i64 = 999;

/// Number of trailing days drawn in the activity sparkline.
pub const SPARKLINE_DAYS: i64 = 14;

const SPARKS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
    Active,
    Maintenance,
    Inactive,
    Error,
}

impl ProjectStatus {
    fn from_recency(days_since_last_commit: i64) -> Self {
        if days_since_last_commit < 7 {
            Self::Active
        } else if days_since_last_commit < 30 {
            Self::Maintenance
        } else {
            Self::Inactive
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Maintenance => "maintenance",
            Self::Inactive => "inactive",
            Self::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BranchStatus {
    Active,
    Inactive,
}

/// Line changes attributed to one contributor over the deduplicated commits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContributorChanges {
    pub commits: usize,
    pub additions: u64,
    pub deletions: u64,
    pub net: i64,
}

/// One row of the branch activity table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchActivity {
    pub group: Option<String>,
    pub project: String,
    pub branch: String,
    pub commits_total: usize,
    pub commits_unique: usize,
    pub commits_owned: usize,
    pub commits_inherited: usize,
    /// Distinct canonical authors among the branch's commits.
    pub contributors: usize,
    /// Owned line delta from ownership resolution.
    pub net_lines: i64,
    /// Line delta from the branch-vs-base compare. The base branch reports
    /// its owned delta here.
    pub net_lines_git_diff: i64,
    pub lines_indicator: String,
    pub base_branch: String,
    pub status: BranchStatus,
}

/// Everything measured for one project over one window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectMetrics {
    pub project_id: u64,
    pub name: String,
    pub group: Option<String>,
    pub period: String,
    pub status: ProjectStatus,
    pub base_branch: String,
    /// Distinct commits across all branches.
    pub commits_total: usize,
    /// Commits present on exactly one branch.
    pub commits_unique: usize,
    /// Canonical contributor name to commit count.
    pub contributors: BTreeMap<String, usize>,
    pub contributors_count: usize,
    pub net_lines_owned: i64,
    pub net_lines_diff: i64,
    pub lines_added: u64,
    pub lines_removed: u64,
    pub open_issues: usize,
    pub open_mrs: usize,
    pub issues_created: usize,
    pub issues_closed: usize,
    pub mrs_created: usize,
    pub mrs_merged: usize,
    pub mrs_closed: usize,
    pub merge_rate: f64,
    pub closure_rate: f64,
    pub languages: BTreeMap<String, f64>,
    /// `YYYY-MM-DD` to commit count.
    pub commits_by_day: BTreeMap<String, usize>,
    pub days_since_last_commit: i64,
    pub activity_sparkline: String,
    pub contributor_changes: BTreeMap<String, ContributorChanges>,
    pub branches: Vec<BranchActivity>,
    pub health: HealthScore,
    pub analysis_errors: Vec<String>,
}

impl ProjectMetrics {
    fn empty(project: &ProjectSnapshot, window: &TimeWindow) -> Self {
        Self {
            project_id: project.id,
            name: project.name.clone(),
            group: project.group.clone(),
            period: window.label(),
            status: ProjectStatus::Inactive,
            base_branch: project.base_branch(),
            commits_total: 0,
            commits_unique: 0,
            contributors: BTreeMap::new(),
            contributors_count: 0,
            net_lines_owned: 0,
            net_lines_diff: 0,
            lines_added: 0,
            lines_removed: 0,
            open_issues: 0,
            open_mrs: 0,
            issues_created: 0,
            issues_closed: 0,
            mrs_created: 0,
            mrs_merged: 0,
            mrs_closed: 0,
            merge_rate: 0.0,
            closure_rate: 0.0,
            languages: project.languages.clone(),
            commits_by_day: BTreeMap::new(),
            days_since_last_commit: NO_COMMITS_DAYS,
            activity_sparkline: String::new(),
            contributor_changes: BTreeMap::new(),
            branches: Vec::new(),
            health: HealthScore::failed(),
            analysis_errors: Vec::new(),
        }
    }

    /// Error-flagged metrics for a project whose analysis could not run.
    pub fn failed(project: &ProjectSnapshot, window: &TimeWindow, reason: impl Into<String>) -> Self {
        let mut metrics = Self::empty(project, window);
        metrics.status = ProjectStatus::Error;
        metrics.analysis_errors.push(reason.into());
        metrics
    }

    pub fn is_error(&self) -> bool {
        self.status == ProjectStatus::Error
    }

    pub fn health_inputs(&self) -> HealthInputs {
        HealthInputs {
            commits: self.commits_total,
            open_issues: self.open_issues,
            open_mrs: self.open_mrs,
            contributors: self.contributors_count,
            days_since_last_commit: self.days_since_last_commit,
        }
    }
}

/// Ratio that is 0 when the denominator is 0.
pub fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

/// Render daily counts as block characters scaled to the busiest day.
pub fn sparkline(values: &[usize]) -> String {
    let max = values.iter().copied().max().unwrap_or(0).max(1);
    values
        .iter()
        .map(|&v| SPARKS[(v * 7 / max).min(7)])
        .collect()
}

/// A commit timestamp parsed once, or `None` after the drop was logged.
fn commit_time(project: &str, commit: &RawCommit) -> Option<DateTime<Utc>> {
    match parse_timestamp(&commit.created_at) {
        Ok(at) => Some(at),
        Err(e) => {
            tracing::warn!("Dropping commit {} in {}: {}", commit.id, project, e);
            None
        }
    }
}

fn mr_time(project: &str, mr: &RawMergeRequest) -> Option<DateTime<Utc>> {
    match parse_timestamp(&mr.created_at) {
        Ok(at) => Some(at),
        Err(e) => {
            tracing::warn!("Dropping merge request {} in {}: {}", mr.id, project, e);
            None
        }
    }
}

fn issue_time(project: &str, issue: &RawIssue) -> Option<DateTime<Utc>> {
    match parse_timestamp(&issue.created_at) {
        Ok(at) => Some(at),
        Err(e) => {
            tracing::warn!("Dropping issue #{} in {}: {}", issue.iid, project, e);
            None
        }
    }
}

/// Branch commit lists restricted to a window, in listing order, with each
/// kept commit's parsed timestamp.
#[derive(Debug, Default)]
pub struct WindowedCommits<'a> {
    pub branches: Vec<BranchCommits<'a>>,
    pub times: HashMap<&'a str, DateTime<Utc>>,
}

/// Filter every branch to `window` ahead of ownership resolution. Commits
/// with unparsable timestamps are dropped.
pub fn window_commits<'a>(project: &'a ProjectSnapshot, window: &TimeWindow) -> WindowedCommits<'a> {
    let mut times: HashMap<&'a str, DateTime<Utc>> = HashMap::new();
    let mut branches = Vec::with_capacity(project.branches.len());
    for branch in &project.branches {
        let mut kept = Vec::new();
        for commit in &branch.commits {
            let at = match times.get(commit.id.as_str()) {
                Some(at) => *at,
                None => match commit_time(&project.name, commit) {
                    Some(at) => {
                        times.insert(commit.id.as_str(), at);
                        at
                    }
                    None => continue,
                },
            };
            if window.contains(at) {
                kept.push(commit);
            }
        }
        branches.push(BranchCommits::new(&branch.name, kept));
    }
    WindowedCommits { branches, times }
}

/// Compute metrics and health for `project` over `window`.
///
/// Fails only on a fatal fetch error; anything narrower drops the affected
/// record and carries on.
pub fn aggregate(
    project: &ProjectSnapshot,
    window: &TimeWindow,
    ctx: &AnalysisContext<'_>,
) -> Result<ProjectMetrics> {
    if let Some(fatal) = project.fatal_error() {
        return Err(Error::project_fetch(
            &project.name,
            &fatal.stage,
            &fatal.message,
        ));
    }

    let mut metrics = ProjectMetrics::empty(project, window);
    metrics.analysis_errors = project
        .errors
        .iter()
        .map(|e| format!("{}: {}", e.stage, e.message))
        .collect();

    let normalizer = Normalizer::new(&ctx.aliases);
    let base = metrics.base_branch.clone();

    let WindowedCommits {
        branches: branch_commits,
        times,
    } = window_commits(project, window);

    let resolution = ownership::resolve(&branch_commits);
    metrics.commits_total = resolution.distinct_commits();
    metrics.commits_unique = resolution.unique_commit_count();
    metrics.net_lines_owned = resolution.total_owned_net_lines();

    let mut newest: Option<DateTime<Utc>> = None;
    for owned in &resolution.owned_commits {
        let commit = owned.commit;
        let author = normalizer.normalize(&commit.author_name, &commit.author_email);
        let stats = commit.stats_or_default();

        *metrics.contributors.entry(author.clone()).or_insert(0) += 1;
        let changes = metrics.contributor_changes.entry(author).or_default();
        changes.commits += 1;
        changes.additions += stats.additions;
        changes.deletions += stats.deletions;
        changes.net += stats.net();

        metrics.lines_added += stats.additions;
        metrics.lines_removed += stats.deletions;

        if let Some(at) = times.get(commit.id.as_str()) {
            let day = at.format("%Y-%m-%d").to_string();
            *metrics.commits_by_day.entry(day).or_insert(0) += 1;
            newest = Some(newest.map_or(*at, |n| n.max(*at)));
        }
    }
    metrics.contributors_count = metrics.contributors.values().filter(|&&c| c > 0).count();
    metrics.days_since_last_commit = newest
        .map(|at| days_between(at, window.end))
        .unwrap_or(NO_COMMITS_DAYS);

    metrics.activity_sparkline = sparkline(&trailing_daily_counts(&metrics.commits_by_day, window));

    metrics.branches = branch_rows(project, &base, &branch_commits, &resolution.branches, &normalizer);
    metrics.net_lines_diff = metrics.branches.iter().map(|b| b.net_lines_git_diff).sum();

    count_merge_requests(project, window, &mut metrics);
    count_issues(project, window, &mut metrics);

    metrics.status = ProjectStatus::from_recency(metrics.days_since_last_commit);
    metrics.health = score::score(&metrics.health_inputs());

    tracing::info!(
        "{} [{}]: {} commits, {} contributors, score {} ({})",
        project.name,
        metrics.period,
        metrics.commits_total,
        metrics.contributors_count,
        metrics.health.score,
        metrics.health.grade
    );

    Ok(metrics)
}

fn trailing_daily_counts(by_day: &BTreeMap<String, usize>, window: &TimeWindow) -> Vec<usize> {
    let last = window.end.date_naive();
    (0..SPARKLINE_DAYS)
        .rev()
        .map(|back| {
            let day = (last - Duration::days(back)).format("%Y-%m-%d").to_string();
            by_day.get(&day).copied().unwrap_or(0)
        })
        .collect()
}

fn branch_rows(
    project: &ProjectSnapshot,
    base: &str,
    branch_commits: &[BranchCommits<'_>],
    owned: &[BranchOwnership],
    normalizer: &Normalizer<'_>,
) -> Vec<BranchActivity> {
    branch_commits
        .iter()
        .zip(owned)
        .map(|(branch, row)| {
            let authors: BTreeSet<String> = branch
                .commits
                .iter()
                .map(|c| normalizer.normalize(&c.author_name, &c.author_email))
                .collect();
            let net_lines_git_diff = if branch.name == base {
                row.owned_net_lines
            } else {
                ownership::branch_diff(project, base, branch.name).net
            };
            BranchActivity {
                group: project.group.clone(),
                project: project.name.clone(),
                branch: row.branch.clone(),
                commits_total: row.commits_total,
                commits_unique: row.commits_unique,
                commits_owned: row.commits_owned,
                commits_inherited: row.commits_inherited,
                contributors: authors.len(),
                net_lines: row.owned_net_lines,
                net_lines_git_diff,
                lines_indicator: ownership::lines_indicator(row),
                base_branch: base.to_string(),
                status: if row.commits_total > 0 {
                    BranchStatus::Active
                } else {
                    BranchStatus::Inactive
                },
            }
        })
        .collect()
}

fn count_merge_requests(project: &ProjectSnapshot, window: &TimeWindow, metrics: &mut ProjectMetrics) {
    for mr in &project.merge_requests {
        let Some(created) = mr_time(&project.name, mr) else {
            continue;
        };
        if mr.state == MergeRequestState::Opened {
            metrics.open_mrs += 1;
        }
        if !window.contains(created) {
            continue;
        }
        metrics.mrs_created += 1;
        match mr.state {
            MergeRequestState::Merged => metrics.mrs_merged += 1,
            MergeRequestState::Closed => metrics.mrs_closed += 1,
            _ => {}
        }
    }
    metrics.merge_rate = ratio(metrics.mrs_merged, metrics.mrs_created);
}

fn count_issues(project: &ProjectSnapshot, window: &TimeWindow, metrics: &mut ProjectMetrics) {
    for issue in &project.issues {
        let Some(created) = issue_time(&project.name, issue) else {
            continue;
        };
        if issue.state == IssueState::Opened {
            metrics.open_issues += 1;
        }
        if window.contains(created) {
            metrics.issues_created += 1;
        }
        if let Some(closed_at) = issue.closed_at.as_deref() {
            match parse_timestamp(closed_at) {
                Ok(at) if window.contains(at) => metrics.issues_closed += 1,
                Ok(_) => {}
                Err(e) => tracing::warn!(
                    "Not counting closure of issue #{} in {}: {}",
                    issue.iid,
                    project.name,
                    e
                ),
            }
        }
    }
    metrics.closure_rate = ratio(metrics.issues_closed, metrics.issues_created);
}

/// Aggregate every project for `window`, turning project failures into
/// error-flagged metrics.
pub fn aggregate_all(ctx: &AnalysisContext<'_>, window: &TimeWindow) -> Vec<ProjectMetrics> {
    let total = ctx.snapshot.projects.len();
    ctx.snapshot
        .projects
        .iter()
        .enumerate()
        .map(|(i, project)| {
            let metrics = aggregate_isolated(project, window, ctx);
            ctx.report_progress(i + 1, total);
            metrics
        })
        .collect()
}

/// Run [`aggregate`] and contain its failure to this project.
pub fn aggregate_isolated(
    project: &ProjectSnapshot,
    window: &TimeWindow,
    ctx: &AnalysisContext<'_>,
) -> ProjectMetrics {
    match aggregate(project, window, ctx) {
        Ok(metrics) => metrics,
        Err(e) => {
            tracing::warn!("Project {} failed: {}", project.name, e);
            ProjectMetrics::failed(project, window, e.to_string())
        }
    }
}

/// Project metrics analyzer for a single window.
#[derive(Default)]
pub struct Analyzer {
    days: Option<u32>,
}

impl Analyzer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the configured window length.
    pub fn with_days(mut self, days: u32) -> Self {
        self.days = Some(days);
        self
    }
}

impl AnalyzerTrait for Analyzer {
    type Output = Analysis;

    fn name(&self) -> &'static str {
        "project"
    }

    fn description(&self) -> &'static str {
        "Aggregate per-project activity and health for one window"
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> Result<Self::Output> {
        let days = self.days.unwrap_or(ctx.config.analysis.days);
        if days == 0 {
            return Err(Error::InvalidArgument("window must be at least 1 day".to_string()));
        }
        let window = ctx.window(days);
        let projects = aggregate_all(ctx, &window);
        let failed = projects.iter().filter(|p| p.is_error()).count();
        Ok(Analysis {
            period: window.label(),
            window,
            summary: AnalysisSummary {
                total_projects: projects.len(),
                failed_projects: failed,
                total_commits: projects.iter().map(|p| p.commits_total).sum(),
            },
            projects,
        })
    }

    fn configure(&mut self, config: &crate::config::Config) -> Result<()> {
        if self.days.is_none() {
            self.days = Some(config.analysis.days);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Analysis {
    pub period: String,
    pub window: TimeWindow,
    pub projects: Vec<ProjectMetrics>,
    pub summary: AnalysisSummary,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisSummary {
    pub total_projects: usize,
    pub failed_projects: usize,
    pub total_commits: usize,
}

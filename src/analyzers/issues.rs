//! Open issue backlog analytics.
//!
//! Issues are classified from their labels (priority, type, workflow state)
//! and checked against the reference time for overdue and stale status.
//! Only currently open issues are counted; issues carrying a completion label
//! are treated as done even when the platform still reports them open.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::IssuesConfig;
use crate::core::{
    days_between, parse_due_date, parse_timestamp, AnalysisContext, Analyzer as AnalyzerTrait,
    Result,
};
use crate::identity::Normalizer;
use crate::source::{IssueState, ProjectSnapshot, RawIssue};

/// Labels that mark an open issue as finished.
const DONE_LABELS: &[&str] = &["done", "complete", "completed", "finished"];

const BLOCKED_PATTERNS: &[&str] = &["blocked", "on hold", "waiting", "stalled"];
const REVIEW_PATTERNS: &[&str] = &["review", "testing"];
const PROGRESS_PATTERNS: &[&str] = &["doing", "in progress", "in development", "wip"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Critical,
    High,
    Medium,
    Low,
}

impl Priority {
    pub const ALL: [Priority; 4] = [
        Priority::Critical,
        Priority::High,
        Priority::Medium,
        Priority::Low,
    ];

    /// First matching label pattern wins; unlabeled issues are medium.
    pub fn from_labels(labels: &[String]) -> Self {
        let lower = lowercase(labels);
        if any_contains(&lower, &["critical", "urgent"]) {
            Priority::Critical
        } else if any_contains(&lower, &["high"]) {
            Priority::High
        } else if any_contains(&lower, &["medium"]) {
            Priority::Medium
        } else if any_contains(&lower, &["low"]) {
            Priority::Low
        } else {
            Priority::Medium
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueType {
    Bug,
    Feature,
    Enhancement,
    Other,
}

impl IssueType {
    pub const ALL: [IssueType; 4] = [
        IssueType::Bug,
        IssueType::Feature,
        IssueType::Enhancement,
        IssueType::Other,
    ];

    pub fn from_labels(labels: &[String]) -> Self {
        let lower = lowercase(labels);
        if any_contains(&lower, &["bug"]) {
            IssueType::Bug
        } else if any_contains(&lower, &["feature"]) {
            IssueType::Feature
        } else if any_contains(&lower, &["enhancement"]) {
            IssueType::Enhancement
        } else {
            IssueType::Other
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowState {
    ToDo,
    InProgress,
    InReview,
    Blocked,
}

impl WorkflowState {
    pub const ALL: [WorkflowState; 4] = [
        WorkflowState::ToDo,
        WorkflowState::InProgress,
        WorkflowState::InReview,
        WorkflowState::Blocked,
    ];

    /// Board labels decide the state; without one, an assignee means the
    /// issue is in progress.
    pub fn of(issue: &RawIssue) -> Self {
        let lower = lowercase(&issue.labels);
        if any_contains(&lower, BLOCKED_PATTERNS) {
            WorkflowState::Blocked
        } else if any_contains(&lower, REVIEW_PATTERNS) || lower.iter().any(|l| l == "qa") {
            WorkflowState::InReview
        } else if any_contains(&lower, PROGRESS_PATTERNS) || issue.assignee.is_some() {
            WorkflowState::InProgress
        } else {
            WorkflowState::ToDo
        }
    }
}

fn lowercase(labels: &[String]) -> Vec<String> {
    labels.iter().map(|l| l.to_lowercase()).collect()
}

fn any_contains(labels: &[String], patterns: &[&str]) -> bool {
    labels
        .iter()
        .any(|label| patterns.iter().any(|p| label.contains(p)))
}

/// Whether the issue counts toward the open backlog.
pub fn is_open(issue: &RawIssue) -> bool {
    issue.state == IssueState::Opened
        && !issue
            .labels
            .iter()
            .any(|l| DONE_LABELS.contains(&l.to_lowercase().as_str()))
}

/// Due date in the past. Unparsable due dates are never overdue.
pub fn is_overdue(issue: &RawIssue, now: DateTime<Utc>) -> bool {
    let Some(due) = issue.due_date.as_deref().filter(|d| !d.trim().is_empty()) else {
        return false;
    };
    match parse_due_date(due) {
        Ok(due) => due < now,
        Err(e) => {
            tracing::debug!("Ignoring due date on issue #{}: {}", issue.iid, e);
            false
        }
    }
}

/// An open issue with its derived classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueRecord {
    pub project_id: u64,
    pub project: String,
    pub iid: u64,
    pub title: String,
    pub priority: Priority,
    pub issue_type: IssueType,
    pub workflow_state: WorkflowState,
    pub assignee: Option<String>,
    pub age_days: i64,
    pub days_since_update: i64,
    pub overdue: bool,
    pub stale: bool,
    pub due_date: Option<String>,
    pub labels: Vec<String>,
    pub web_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueAnalytics {
    pub total_open: usize,
    pub by_priority: BTreeMap<Priority, usize>,
    pub by_type: BTreeMap<IssueType, usize>,
    pub by_state: BTreeMap<WorkflowState, usize>,
    pub overdue: usize,
    pub unassigned: usize,
    pub stale_issues: usize,
    /// Idle days after which an open issue counts as stale.
    pub stale_days: u32,
    /// Open issues per project name.
    pub project_issues: BTreeMap<String, usize>,
    /// Open issues per canonical assignee.
    pub assignee_workload: BTreeMap<String, usize>,
    pub all_issues: Vec<IssueRecord>,
}

impl Default for IssueAnalytics {
    fn default() -> Self {
        Self {
            total_open: 0,
            by_priority: Priority::ALL.iter().map(|p| (*p, 0)).collect(),
            by_type: IssueType::ALL.iter().map(|t| (*t, 0)).collect(),
            by_state: WorkflowState::ALL.iter().map(|s| (*s, 0)).collect(),
            overdue: 0,
            unassigned: 0,
            stale_issues: 0,
            stale_days: IssuesConfig::default().stale_days,
            project_issues: BTreeMap::new(),
            assignee_workload: BTreeMap::new(),
            all_issues: Vec::new(),
        }
    }
}

impl IssueAnalytics {
    pub fn priority_count(&self, priority: Priority) -> usize {
        self.by_priority.get(&priority).copied().unwrap_or(0)
    }

    pub fn type_count(&self, issue_type: IssueType) -> usize {
        self.by_type.get(&issue_type).copied().unwrap_or(0)
    }

    /// Share of open issues that are bugs; 0 with nothing open.
    pub fn bug_ratio(&self) -> f64 {
        if self.total_open == 0 {
            0.0
        } else {
            self.type_count(IssueType::Bug) as f64 / self.total_open as f64
        }
    }

    /// Distinct project names with open critical issues, first seen first.
    pub fn critical_projects(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for issue in &self.all_issues {
            if issue.priority == Priority::Critical && !names.contains(&issue.project) {
                names.push(issue.project.clone());
            }
        }
        names
    }

    /// Project with the most open issues; ties go to the alphabetically first.
    pub fn busiest_project(&self) -> Option<(&str, usize)> {
        let mut best: Option<(&str, usize)> = None;
        for (name, count) in &self.project_issues {
            if best.map_or(true, |(_, c)| *count > c) {
                best = Some((name.as_str(), *count));
            }
        }
        best
    }

    fn record(&mut self, record: IssueRecord) {
        self.total_open += 1;
        *self.by_priority.entry(record.priority).or_insert(0) += 1;
        *self.by_type.entry(record.issue_type).or_insert(0) += 1;
        *self.by_state.entry(record.workflow_state).or_insert(0) += 1;
        if record.overdue {
            self.overdue += 1;
        }
        if record.stale {
            self.stale_issues += 1;
        }
        match &record.assignee {
            Some(name) => *self.assignee_workload.entry(name.clone()).or_insert(0) += 1,
            None => self.unassigned += 1,
        }
        *self.project_issues.entry(record.project.clone()).or_insert(0) += 1;
        self.all_issues.push(record);
    }
}

/// Classify one open issue.
fn classify(
    project: &ProjectSnapshot,
    issue: &RawIssue,
    now: DateTime<Utc>,
    stale_days: i64,
    normalizer: &Normalizer<'_>,
) -> Option<IssueRecord> {
    let created = match parse_timestamp(&issue.created_at) {
        Ok(at) => at,
        Err(e) => {
            tracing::warn!("Dropping issue #{} in {}: {}", issue.iid, project.name, e);
            return None;
        }
    };
    // A bad updated_at falls back to the creation time.
    let updated = parse_timestamp(&issue.updated_at).unwrap_or(created);
    let days_since_update = days_between(updated, now);

    let assignee = issue.assignee.as_ref().map(|a| {
        normalizer.normalize(&a.name, a.email.as_deref().unwrap_or_default())
    });

    Some(IssueRecord {
        project_id: project.id,
        project: project.name.clone(),
        iid: issue.iid,
        title: issue.title.clone(),
        priority: Priority::from_labels(&issue.labels),
        issue_type: IssueType::from_labels(&issue.labels),
        workflow_state: WorkflowState::of(issue),
        assignee,
        age_days: days_between(created, now),
        days_since_update,
        overdue: is_overdue(issue, now),
        stale: days_since_update > stale_days,
        due_date: issue.due_date.clone(),
        labels: issue.labels.clone(),
        web_url: issue.web_url.clone(),
    })
}

/// Backlog analytics over every project in the snapshot.
pub fn analyze_issues(ctx: &AnalysisContext<'_>) -> IssueAnalytics {
    let normalizer = Normalizer::new(&ctx.aliases);
    let stale_days = i64::from(ctx.config.issues.stale_days);
    let mut analytics = IssueAnalytics {
        stale_days: ctx.config.issues.stale_days,
        ..IssueAnalytics::default()
    };

    for project in &ctx.snapshot.projects {
        if let Some(fatal) = project.fatal_error() {
            tracing::warn!(
                "Skipping issues of {}: {} failed ({})",
                project.name,
                fatal.stage,
                fatal.message
            );
            continue;
        }
        for issue in project.issues.iter().filter(|i| is_open(i)) {
            if let Some(record) = classify(project, issue, ctx.now, stale_days, &normalizer) {
                analytics.record(record);
            }
        }
    }

    tracing::info!(
        "Issue analytics: {} open, {} overdue, {} stale",
        analytics.total_open,
        analytics.overdue,
        analytics.stale_issues
    );
    analytics
}

/// Issue backlog analyzer.
#[derive(Default)]
pub struct Analyzer;

impl Analyzer {
    pub fn new() -> Self {
        Self
    }
}

impl AnalyzerTrait for Analyzer {
    type Output = IssueAnalytics;

    fn name(&self) -> &'static str {
        "issues"
    }

    fn description(&self) -> &'static str {
        "Classify the open issue backlog by priority, type and workflow state"
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> Result<Self::Output> {
        Ok(analyze_issues(ctx))
    }
}

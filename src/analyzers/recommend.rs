//! Actionable recommendations from issue and team analytics.
//!
//! Rules are independent: each one looks at the analytics and either fires
//! or not. Results are ordered by severity, keeping rule order within a
//! severity.

use serde::{Deserialize, Serialize};

use crate::analyzers::issues::{IssueAnalytics, Priority};
use crate::analyzers::team::TeamAnalytics;
use crate::core::{AnalysisContext, Analyzer as AnalyzerTrait, Result};

/// Maximum projects listed by the critical-issues rule.
const MAX_CRITICAL_PROJECTS: usize = 5;

/// Maximum people named by the collaboration rule.
const MAX_COACHING_NAMES: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Success,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Success => "success",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub severity: Severity,
    pub title: String,
    pub message: String,
    pub action: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub projects: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_member: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub team_members: Vec<String>,
}

impl Recommendation {
    fn new(severity: Severity, title: impl Into<String>, message: impl Into<String>, action: &str) -> Self {
        Self {
            severity,
            title: title.into(),
            message: message.into(),
            action: action.to_string(),
            projects: Vec::new(),
            project: None,
            team_member: None,
            team_members: Vec::new(),
        }
    }
}

/// What the rules look at.
#[derive(Debug, Clone, Copy)]
pub struct Signals<'a> {
    pub issues: &'a IssueAnalytics,
    pub team: Option<&'a TeamAnalytics>,
}

type Rule = fn(&Signals<'_>) -> Option<Recommendation>;

/// Evaluated in order; every rule runs.
const RULES: &[Rule] = &[
    critical_issues,
    workload_imbalance,
    bug_ratio,
    stale_issues,
    unassigned_issues,
    healthy_backlog,
    issue_concentration,
    low_collaboration,
    low_merge_rate,
];

fn critical_issues(s: &Signals<'_>) -> Option<Recommendation> {
    let critical = s.issues.priority_count(Priority::Critical);
    if critical <= 3 {
        return None;
    }
    let mut rec = Recommendation::new(
        Severity::Critical,
        "Critical Issues Require Immediate Attention",
        format!("{critical} critical issues are open"),
        "Allocate senior developers to resolve critical issues immediately",
    );
    rec.projects = s
        .issues
        .critical_projects()
        .into_iter()
        .take(MAX_CRITICAL_PROJECTS)
        .collect();
    Some(rec)
}

fn workload_imbalance(s: &Signals<'_>) -> Option<Recommendation> {
    let workload = &s.issues.assignee_workload;
    if workload.len() < 2 {
        return None;
    }
    let total: usize = workload.values().sum();
    let avg = total as f64 / workload.len() as f64;

    // Heaviest load; ties keep the alphabetically first name.
    let mut heaviest: Option<(&str, usize)> = None;
    for (name, count) in workload {
        if heaviest.map_or(true, |(_, c)| *count > c) {
            heaviest = Some((name.as_str(), *count));
        }
    }
    let (name, max) = heaviest?;
    if (max as f64) <= avg * 2.0 {
        return None;
    }
    let mut rec = Recommendation::new(
        Severity::High,
        "Workload Imbalance Detected",
        format!("{name} has {max} issues (2x average of {avg:.1})"),
        "Redistribute issues to balance team workload",
    );
    rec.team_member = Some(name.to_string());
    Some(rec)
}

fn bug_ratio(s: &Signals<'_>) -> Option<Recommendation> {
    let ratio = s.issues.bug_ratio();
    if ratio <= 0.6 {
        return None;
    }
    Some(Recommendation::new(
        Severity::Medium,
        "High Bug-to-Feature Ratio",
        format!("{:.0}% of open issues are bugs", ratio * 100.0),
        "Schedule dedicated bug-fixing sprint and improve QA processes",
    ))
}

fn stale_issues(s: &Signals<'_>) -> Option<Recommendation> {
    let stale = s.issues.stale_issues;
    if stale <= 10 {
        return None;
    }
    Some(Recommendation::new(
        Severity::Medium,
        "Stale Issues Need Review",
        format!(
            "{stale} issues haven't been updated in {}+ days",
            s.issues.stale_days
        ),
        "Review and close or reprioritize stale issues",
    ))
}

fn unassigned_issues(s: &Signals<'_>) -> Option<Recommendation> {
    let unassigned = s.issues.unassigned;
    if unassigned <= 5 {
        return None;
    }
    Some(Recommendation::new(
        Severity::Medium,
        "Many Unassigned Issues",
        format!("{unassigned} issues lack assignees"),
        "Assign team members to unowned issues for accountability",
    ))
}

fn healthy_backlog(s: &Signals<'_>) -> Option<Recommendation> {
    if s.issues.total_open >= 20 || s.issues.priority_count(Priority::Critical) > 0 {
        return None;
    }
    Some(Recommendation::new(
        Severity::Success,
        "Excellent Issue Management",
        "Low issue count with no critical issues",
        "Maintain current practices and document successful processes",
    ))
}

fn issue_concentration(s: &Signals<'_>) -> Option<Recommendation> {
    let (project, count) = s.issues.busiest_project()?;
    if count <= 20 {
        return None;
    }
    let mut rec = Recommendation::new(
        Severity::High,
        format!("High Issue Concentration in {project}"),
        format!("{count} open issues in one project"),
        "Consider splitting into smaller work items or allocating more resources",
    );
    rec.project = Some(project.to_string());
    Some(rec)
}

fn low_collaboration(s: &Signals<'_>) -> Option<Recommendation> {
    let team = s.team?;
    let names = team.low_collaborators(50);
    if names.is_empty() {
        return None;
    }
    let mut rec = Recommendation::new(
        Severity::Medium,
        "Low Collaboration Detected",
        format!("{} contributors have a collaboration score below 50", names.len()),
        "Encourage more code reviews and cross-project work",
    );
    rec.team_members = names
        .into_iter()
        .take(MAX_COACHING_NAMES)
        .map(str::to_string)
        .collect();
    Some(rec)
}

fn low_merge_rate(s: &Signals<'_>) -> Option<Recommendation> {
    let team = s.team?;
    if team.team.total_mrs == 0 || team.team.merge_rate >= 0.7 {
        return None;
    }
    Some(Recommendation::new(
        Severity::Medium,
        "Low Merge Rate",
        format!(
            "Only {:.1}% of MRs are being merged",
            team.team.merge_rate * 100.0
        ),
        "Review MR approval process and requirements",
    ))
}

/// Run every rule and order the results by severity.
pub fn recommend(issues: &IssueAnalytics, team: Option<&TeamAnalytics>) -> Vec<Recommendation> {
    let signals = Signals { issues, team };
    let mut recommendations: Vec<Recommendation> =
        RULES.iter().filter_map(|rule| rule(&signals)).collect();
    // Stable: rule order is kept within a severity.
    recommendations.sort_by_key(|r| r.severity);
    tracing::debug!("{} recommendations generated", recommendations.len());
    recommendations
}

/// Recommendation analyzer: runs issue and team analytics, then the rules.
#[derive(Default)]
pub struct Analyzer;

impl Analyzer {
    pub fn new() -> Self {
        Self
    }
}

impl AnalyzerTrait for Analyzer {
    type Output = Vec<Recommendation>;

    fn name(&self) -> &'static str {
        "recommend"
    }

    fn description(&self) -> &'static str {
        "Derive prioritized recommendations from backlog and team signals"
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> Result<Self::Output> {
        let issues = crate::analyzers::issues::analyze_issues(ctx);
        let team = crate::analyzers::team::analyze_team(ctx, &ctx.default_window());
        Ok(recommend(&issues, Some(&team)))
    }
}

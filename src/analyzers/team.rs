//! Team contribution analytics for one window across all projects.
//!
//! Everything is keyed by canonical identity, so a person committing from two
//! addresses and opening merge requests under a username still lands on one
//! row.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::analyzers::collaboration::{self, Distribution, VelocityTrend};
use crate::analyzers::issues::{is_open, is_overdue};
use crate::analyzers::ownership;
use crate::analyzers::project::{ratio, window_commits};
use crate::core::{parse_timestamp, AnalysisContext, Analyzer as AnalyzerTrait, Result, TimeWindow};
use crate::identity::Normalizer;
use crate::source::{MergeRequestState, ProjectSnapshot};

/// Per-person contribution totals.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberStats {
    pub name: String,
    pub commits: usize,
    pub lines_added: u64,
    pub lines_removed: u64,
    pub net_lines: i64,
    pub mrs_created: usize,
    pub mrs_merged: usize,
    pub issues_opened: usize,
    pub issues_closed: usize,
    /// Projects the person committed to or opened merge requests in.
    pub projects: BTreeSet<String>,
    pub open_assigned_issues: usize,
    pub overdue_issues: usize,
    pub collaboration_score: u32,
    pub productivity_score: u32,
    /// Platform user id, when an assignee record exposed one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<u64>,
}

impl MemberStats {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    /// Cross-project and review activity, capped per component.
    pub fn compute_collaboration_score(&self) -> u32 {
        let projects = (self.projects.len() * 10).min(30);
        let mrs = (self.mrs_created * 3).min(20);
        let opened = (self.issues_opened * 2).min(15);
        let closed = (self.issues_closed * 3).min(10);
        ((projects + mrs + opened + closed) as u32).min(100)
    }

    pub fn compute_productivity_score(&self) -> u32 {
        let raw = self.commits * 2
            + self.mrs_merged * 5
            + self.issues_closed * 3
            + self.projects.len() * 5;
        ((raw / 2) as u32).min(100)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamStats {
    pub total_contributors: usize,
    pub total_commits: usize,
    pub total_mrs: usize,
    pub merged_mrs: usize,
    pub merge_rate: f64,
    pub avg_commits: f64,
    pub median_commits: f64,
    pub avg_productivity: f64,
    pub top_performer: Option<String>,
    pub most_collaborative: Option<String>,
    pub gini: f64,
    pub distribution: Distribution,
    pub velocity: VelocityTrend,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamAnalytics {
    pub period: String,
    pub members: BTreeMap<String, MemberStats>,
    /// Team-wide commits per `YYYY-MM-DD`.
    pub commits_by_day: BTreeMap<String, usize>,
    pub team: TeamStats,
}

impl TeamAnalytics {
    /// Members with a collaboration score below `threshold`, alphabetical.
    pub fn low_collaborators(&self, threshold: u32) -> Vec<&str> {
        self.members
            .values()
            .filter(|m| m.collaboration_score < threshold)
            .map(|m| m.name.as_str())
            .collect()
    }
}

struct Collector<'a> {
    normalizer: Normalizer<'a>,
    members: BTreeMap<String, MemberStats>,
    commits_by_day: BTreeMap<String, usize>,
    /// Commit emails seen per canonical name, for late user id lookup.
    emails: BTreeMap<String, BTreeSet<String>>,
}

impl<'a> Collector<'a> {
    fn member(&mut self, name: &str) -> &mut MemberStats {
        self.members
            .entry(name.to_string())
            .or_insert_with(|| MemberStats::new(name))
    }

    /// Fill in user ids for members only seen through commit emails.
    fn resolve_user_ids(&mut self) {
        let cache = self.normalizer.cache();
        for (name, emails) in &self.emails {
            let Some(member) = self.members.get_mut(name) else {
                continue;
            };
            if member.user_id.is_none() {
                member.user_id = emails.iter().find_map(|e| cache.get(e));
            }
        }
    }

    fn project(&mut self, project: &ProjectSnapshot, window: &TimeWindow, ctx: &AnalysisContext<'_>) {
        let windowed = window_commits(project, window);
        let resolution = ownership::resolve(&windowed.branches);
        for owned in &resolution.owned_commits {
            let commit = owned.commit;
            let name = self
                .normalizer
                .normalize(&commit.author_name, &commit.author_email);
            let stats = commit.stats_or_default();
            if !commit.author_email.is_empty() {
                self.emails
                    .entry(name.clone())
                    .or_default()
                    .insert(commit.author_email.to_lowercase());
            }
            let member = self.member(&name);
            member.commits += 1;
            member.lines_added += stats.additions;
            member.lines_removed += stats.deletions;
            member.net_lines += stats.net();
            member.projects.insert(project.name.clone());

            if let Some(at) = windowed.times.get(commit.id.as_str()) {
                let day = at.format("%Y-%m-%d").to_string();
                *self.commits_by_day.entry(day).or_insert(0) += 1;
            }
        }

        for mr in &project.merge_requests {
            let created = match parse_timestamp(&mr.created_at) {
                Ok(at) => at,
                Err(e) => {
                    tracing::warn!("Dropping merge request {} in {}: {}", mr.id, project.name, e);
                    continue;
                }
            };
            if !window.contains(created) {
                continue;
            }
            let display = if mr.author.name.is_empty() {
                mr.author.username.as_str()
            } else {
                mr.author.name.as_str()
            };
            let name = self
                .normalizer
                .normalize(display, mr.author.email.as_deref().unwrap_or_default());
            let member = self.member(&name);
            member.mrs_created += 1;
            if mr.state == MergeRequestState::Merged {
                member.mrs_merged += 1;
            }
            member.projects.insert(project.name.clone());
        }

        for issue in &project.issues {
            let created = match parse_timestamp(&issue.created_at) {
                Ok(at) => at,
                Err(e) => {
                    tracing::warn!("Dropping issue #{} in {}: {}", issue.iid, project.name, e);
                    continue;
                }
            };

            if window.contains(created) {
                if let Some(author) = &issue.author {
                    let name = self.normalizer.normalize(author.display_name(), author.email());
                    self.member(&name).issues_opened += 1;
                }
            }

            let closed_in_window = match issue.closed_at.as_deref().map(parse_timestamp) {
                Some(Ok(at)) => window.contains(at),
                Some(Err(e)) => {
                    tracing::warn!(
                        "Not crediting closure of issue #{} in {}: {}",
                        issue.iid,
                        project.name,
                        e
                    );
                    false
                }
                None => false,
            };
            if closed_in_window {
                let closer = issue
                    .closed_by
                    .as_ref()
                    .map(|u| (u.display_name().to_string(), u.email().to_string()))
                    .or_else(|| {
                        issue.assignee.as_ref().map(|a| {
                            (a.name.clone(), a.email.clone().unwrap_or_default())
                        })
                    });
                if let Some((name, email)) = closer {
                    let name = self.normalizer.normalize(&name, &email);
                    self.member(&name).issues_closed += 1;
                }
            }

            if is_open(issue) {
                if let Some(assignee) = &issue.assignee {
                    let email = assignee.email.as_deref().unwrap_or_default();
                    let name = self.normalizer.normalize(&assignee.name, email);
                    let id = self.normalizer.remember_id(email, assignee.id);
                    let overdue = is_overdue(issue, ctx.now);
                    let member = self.member(&name);
                    member.user_id.get_or_insert(id);
                    member.open_assigned_issues += 1;
                    if overdue {
                        member.overdue_issues += 1;
                    }
                }
            }
        }
    }
}

fn median(sorted: &[usize]) -> f64 {
    match sorted.len() {
        0 => 0.0,
        n if n % 2 == 1 => sorted[n / 2] as f64,
        n => (sorted[n / 2 - 1] + sorted[n / 2]) as f64 / 2.0,
    }
}

fn mean(values: &[usize]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<usize>() as f64 / values.len() as f64
    }
}

/// Highest value wins; ties keep the alphabetically first name.
fn leader<F>(members: &BTreeMap<String, MemberStats>, key: F) -> Option<String>
where
    F: Fn(&MemberStats) -> u32,
{
    let mut best: Option<(&MemberStats, u32)> = None;
    for member in members.values() {
        let value = key(member);
        if best.map_or(true, |(_, b)| value > b) {
            best = Some((member, value));
        }
    }
    best.map(|(m, _)| m.name.clone())
}

fn team_stats(members: &BTreeMap<String, MemberStats>, commits_by_day: &BTreeMap<String, usize>) -> TeamStats {
    let mut commits: Vec<usize> = members.values().map(|m| m.commits).collect();
    commits.sort_unstable();
    let productivity: Vec<usize> = members
        .values()
        .map(|m| m.productivity_score as usize)
        .collect();
    let total_mrs: usize = members.values().map(|m| m.mrs_created).sum();
    let merged_mrs: usize = members.values().map(|m| m.mrs_merged).sum();

    let committers: Vec<u64> = commits.iter().filter(|&&c| c > 0).map(|&c| c as u64).collect();
    let distribution = collaboration::distribution(&committers);
    let daily: Vec<u64> = commits_by_day.values().map(|&c| c as u64).collect();

    TeamStats {
        total_contributors: members.len(),
        total_commits: commits.iter().sum(),
        total_mrs,
        merged_mrs,
        merge_rate: ratio(merged_mrs, total_mrs),
        avg_commits: mean(&commits),
        median_commits: median(&commits),
        avg_productivity: mean(&productivity),
        top_performer: leader(members, |m| m.productivity_score),
        most_collaborative: leader(members, |m| m.collaboration_score),
        gini: distribution.gini,
        distribution: distribution.distribution,
        velocity: collaboration::velocity(&daily),
    }
}

/// Team analytics over every project for `window`. Projects with a fatal
/// fetch error are skipped.
pub fn analyze_team(ctx: &AnalysisContext<'_>, window: &TimeWindow) -> TeamAnalytics {
    let mut collector = Collector {
        normalizer: Normalizer::new(&ctx.aliases),
        members: BTreeMap::new(),
        commits_by_day: BTreeMap::new(),
        emails: BTreeMap::new(),
    };

    for project in &ctx.snapshot.projects {
        if let Some(fatal) = project.fatal_error() {
            tracing::warn!(
                "Skipping {} in team analytics: {} failed ({})",
                project.name,
                fatal.stage,
                fatal.message
            );
            continue;
        }
        collector.project(project, window, ctx);
    }
    collector.resolve_user_ids();
    tracing::debug!(
        "{} platform user ids cached",
        collector.normalizer.cache().len()
    );

    let Collector {
        mut members,
        commits_by_day,
        ..
    } = collector;
    for member in members.values_mut() {
        member.collaboration_score = member.compute_collaboration_score();
        member.productivity_score = member.compute_productivity_score();
    }
    let team = team_stats(&members, &commits_by_day);

    tracing::info!(
        "Team analytics [{}]: {} contributors, {} commits, distribution {}",
        window.label(),
        team.total_contributors,
        team.total_commits,
        team.distribution
    );

    TeamAnalytics {
        period: window.label(),
        members,
        commits_by_day,
        team,
    }
}

/// Team analytics analyzer.
#[derive(Default)]
pub struct Analyzer {
    days: Option<u32>,
}

impl Analyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_days(mut self, days: u32) -> Self {
        self.days = Some(days);
        self
    }
}

impl AnalyzerTrait for Analyzer {
    type Output = TeamAnalytics;

    fn name(&self) -> &'static str {
        "team"
    }

    fn description(&self) -> &'static str {
        "Attribute commits, merge requests and issues to canonical contributors"
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> Result<Self::Output> {
        let window = ctx.window(self.days.unwrap_or(ctx.config.analysis.days));
        Ok(analyze_team(ctx, &window))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::collaboration::VelocityDirection;
    use crate::config::Config;
    use crate::source::{
        Branch, CommitStats, IssueAssignee, IssueState, MergeRequestAuthor, RawCommit, RawIssue,
        RawMergeRequest, Snapshot, UserRef,
    };
    use chrono::{DateTime, TimeZone, Utc};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 30, 12, 0, 0).unwrap()
    }

    fn commit(id: &str, day: u32, name: &str, email: &str) -> RawCommit {
        RawCommit {
            id: id.to_string(),
            created_at: format!("2024-06-{day:02}T10:00:00Z"),
            author_name: name.to_string(),
            author_email: email.to_string(),
            title: String::new(),
            stats: Some(CommitStats {
                additions: 4,
                deletions: 1,
            }),
        }
    }

    fn project() -> ProjectSnapshot {
        let mut project = ProjectSnapshot::new(1, "api");
        let shared = commit("a1", 20, "jsmith-ci", "jane@co.com");
        project.branches = vec![
            Branch {
                name: "main".to_string(),
                commits: vec![
                    shared.clone(),
                    commit("a2", 21, "Jane Smith", "jane.smith@co.com"),
                    commit("b1", 22, "Bob", "bob@co.com"),
                ],
            },
            Branch {
                name: "feature".to_string(),
                commits: vec![shared, commit("a3", 25, "Jane Smith", "jane@co.com")],
            },
        ];
        project.merge_requests = vec![RawMergeRequest {
            id: 1,
            author: MergeRequestAuthor {
                username: "bob".to_string(),
                name: "Bob".to_string(),
                email: Some("bob@co.com".to_string()),
            },
            state: MergeRequestState::Merged,
            created_at: "2024-06-23T00:00:00Z".to_string(),
        }];
        project.issues = vec![
            RawIssue {
                id: 10,
                iid: 1,
                title: "Crash".to_string(),
                state: IssueState::Closed,
                labels: vec!["bug".to_string()],
                assignee: Some(IssueAssignee {
                    id: 3,
                    name: "Bob".to_string(),
                    username: None,
                    email: None,
                }),
                author: Some(UserRef {
                    name: Some("Jane Smith".to_string()),
                    ..UserRef::default()
                }),
                created_at: "2024-06-10T00:00:00Z".to_string(),
                updated_at: "2024-06-12T00:00:00Z".to_string(),
                due_date: None,
                closed_at: Some("2024-06-12T00:00:00Z".to_string()),
                closed_by: None,
                web_url: None,
            },
            RawIssue {
                id: 11,
                iid: 2,
                title: "Slow".to_string(),
                state: IssueState::Opened,
                labels: Vec::new(),
                assignee: Some(IssueAssignee {
                    id: 3,
                    name: "Bob".to_string(),
                    username: None,
                    email: None,
                }),
                author: None,
                created_at: "2024-06-11T00:00:00Z".to_string(),
                updated_at: "2024-06-11T00:00:00Z".to_string(),
                due_date: Some("2024-06-15".to_string()),
                closed_at: None,
                closed_by: None,
                web_url: None,
            },
        ];
        project
    }

    fn analytics() -> TeamAnalytics {
        let snapshot = Snapshot::new(vec![project()]);
        let mut config = Config::default();
        config
            .identity
            .aliases
            .insert("jane@co.com".to_string(), "Jane Smith".to_string());
        let ctx = AnalysisContext::new(&snapshot, &config, now());
        analyze_team(&ctx, &ctx.window(30))
    }

    #[test]
    fn test_commits_attributed_to_canonical_identity() {
        let team = analytics();
        let jane = &team.members["Jane Smith"];
        assert_eq!(jane.commits, 3);
        assert_eq!(jane.net_lines, 9);
        assert_eq!(jane.issues_opened, 1);
        assert_eq!(team.members["Bob"].commits, 1);
        assert_eq!(team.team.total_commits, 4);
        assert!(!team.members.contains_key("jsmith-ci"));
    }

    #[test]
    fn test_merge_requests_and_issue_closers() {
        let team = analytics();
        let bob = &team.members["Bob"];
        assert_eq!(bob.mrs_created, 1);
        assert_eq!(bob.mrs_merged, 1);
        // Closed issue without closed_by falls back to the assignee.
        assert_eq!(bob.issues_closed, 1);
        assert_eq!(bob.open_assigned_issues, 1);
        assert_eq!(bob.overdue_issues, 1);
        assert_eq!(team.team.merge_rate, 1.0);
    }

    #[test]
    fn test_malformed_closed_at_not_credited() {
        let mut project = project();
        project.issues[0].closed_at = Some("yesterday".to_string());
        let snapshot = Snapshot::new(vec![project]);
        let config = Config::default();
        let ctx = AnalysisContext::new(&snapshot, &config, now());
        let team = analyze_team(&ctx, &ctx.window(30));

        let bob = &team.members["Bob"];
        assert_eq!(bob.issues_closed, 0);
        assert_eq!(bob.open_assigned_issues, 1);
        assert_eq!(team.members["Jane Smith"].issues_opened, 1);
    }

    #[test]
    fn test_user_ids_from_assignees() {
        let mut project = project();
        let mut issue = project.issues[1].clone();
        issue.id = 12;
        issue.iid = 3;
        issue.due_date = None;
        issue.assignee = Some(IssueAssignee {
            id: 7,
            name: "J. Smith".to_string(),
            username: None,
            email: Some("Jane.Smith@co.com".to_string()),
        });
        project.issues.push(issue);
        let snapshot = Snapshot::new(vec![project]);
        let config = Config::default();
        let ctx = AnalysisContext::new(&snapshot, &config, now());
        let team = analyze_team(&ctx, &ctx.window(30));

        assert_eq!(team.members["Bob"].user_id, Some(3));
        assert_eq!(team.members["J. Smith"].user_id, Some(7));
        // Known only through a commit email, resolved through the cache.
        assert_eq!(team.members["Jane Smith"].user_id, Some(7));
        assert_eq!(team.members["jsmith-ci"].user_id, None);
    }

    #[test]
    fn test_scores() {
        let team = analytics();
        let bob = &team.members["Bob"];
        // projects 10 + mrs 3 + closed 3
        assert_eq!(bob.collaboration_score, 16);
        // (1*2 + 1*5 + 1*3 + 1*5) / 2
        assert_eq!(bob.productivity_score, 7);
        let jane = &team.members["Jane Smith"];
        // projects 10 + opened 2
        assert_eq!(jane.collaboration_score, 12);
        // (3*2 + 1*5) / 2
        assert_eq!(jane.productivity_score, 5);
        assert_eq!(team.team.top_performer.as_deref(), Some("Bob"));
        assert_eq!(team.team.most_collaborative.as_deref(), Some("Bob"));
        assert_eq!(team.low_collaborators(50), vec!["Bob", "Jane Smith"]);
    }

    #[test]
    fn test_team_stats() {
        let team = analytics();
        assert_eq!(team.team.total_contributors, 2);
        assert_eq!(team.team.avg_commits, 2.0);
        assert_eq!(team.team.median_commits, 2.0);
        assert_eq!(team.team.distribution, Distribution::WellDistributed);
        assert_eq!(team.commits_by_day.len(), 4);
        assert_eq!(team.team.velocity.direction, VelocityDirection::Stable);
    }

    #[test]
    fn test_score_caps() {
        let mut member = MemberStats::new("Busy");
        member.projects = (0..5).map(|i| format!("p{i}")).collect();
        member.mrs_created = 20;
        member.issues_opened = 20;
        member.issues_closed = 20;
        member.commits = 500;
        assert_eq!(member.compute_collaboration_score(), 75);
        assert_eq!(member.compute_productivity_score(), 100);
    }

    #[test]
    fn test_merge_request_author_falls_back_to_username() {
        let mut p = project();
        p.merge_requests[0].author.name = String::new();
        p.merge_requests[0].author.email = None;
        let snapshot = Snapshot::new(vec![p]);
        let config = Config::default();
        let ctx = AnalysisContext::new(&snapshot, &config, now());
        let team = analyze_team(&ctx, &ctx.window(30));
        assert_eq!(team.members["bob"].mrs_created, 1);
    }

    #[test]
    fn test_median() {
        assert_eq!(median(&[]), 0.0);
        assert_eq!(median(&[1, 3, 9]), 3.0);
        assert_eq!(median(&[1, 3, 5, 9]), 4.0);
    }

    #[test]
    fn test_empty_snapshot() {
        let snapshot = Snapshot::default();
        let config = Config::default();
        let ctx = AnalysisContext::new(&snapshot, &config, now());
        let team = analyze_team(&ctx, &ctx.window(30));
        assert!(team.members.is_empty());
        assert_eq!(team.team.distribution, Distribution::NoActivity);
        assert!(team.team.top_performer.is_none());
        assert_eq!(
            team.team.velocity.direction,
            VelocityDirection::InsufficientData
        );
    }
}

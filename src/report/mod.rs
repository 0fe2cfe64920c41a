//! Batch report generation.
//!
//! Runs every analytics stage over one snapshot: single-window project
//! metrics, team and issue analytics, recommendations and the multi-period
//! comparison.

mod types;

pub use types::*;

use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

use crate::analyzers::issues::analyze_issues;
use crate::analyzers::project::{aggregate_all, ProjectMetrics, ProjectStatus};
use crate::analyzers::recommend::recommend;
use crate::analyzers::team::analyze_team;
use crate::core::{AnalysisContext, Analyzer as AnalyzerTrait, Result, Summary};
use crate::score::grade_distribution;
use crate::score::trend::{compare_projects_across_periods, normalize_periods};

/// Group key for projects without a group.
pub const UNGROUPED: &str = "ungrouped";

/// Roll project metrics up into portfolio figures. Failed projects count
/// toward totals but not toward scores.
pub fn summarize(projects: &[ProjectMetrics]) -> ReportSummary {
    let analyzed: Vec<&ProjectMetrics> = projects.iter().filter(|p| !p.is_error()).collect();

    let contributors: BTreeSet<&str> = analyzed
        .iter()
        .flat_map(|p| p.contributors.keys().map(String::as_str))
        .collect();

    let average_score = if analyzed.is_empty() {
        0.0
    } else {
        analyzed.iter().map(|p| f64::from(p.health.score)).sum::<f64>() / analyzed.len() as f64
    };

    let mut groups: BTreeMap<String, GroupHealth> = BTreeMap::new();
    let mut group_scores: BTreeMap<String, u32> = BTreeMap::new();
    for project in &analyzed {
        let key = project.group.clone().unwrap_or_else(|| UNGROUPED.to_string());
        let group = groups.entry(key.clone()).or_default();
        group.projects += 1;
        group.total_commits += project.commits_total;
        *group_scores.entry(key).or_insert(0) += project.health.score;
    }
    for (key, group) in groups.iter_mut() {
        let total = group_scores.get(key).copied().unwrap_or(0);
        group.average_score = f64::from(total) / group.projects as f64;
    }

    ReportSummary {
        total_projects: projects.len(),
        active_projects: projects
            .iter()
            .filter(|p| p.status == ProjectStatus::Active)
            .count(),
        failed_projects: projects.len() - analyzed.len(),
        total_commits: analyzed.iter().map(|p| p.commits_total).sum(),
        total_contributors: contributors.len(),
        net_lines_owned: analyzed.iter().map(|p| p.net_lines_owned).sum(),
        average_score,
        grade_distribution: grade_distribution(analyzed.iter().map(|p| &p.health.grade)),
        groups,
    }
}

/// Build the full report for the snapshot in `ctx`.
pub fn build_report(ctx: &AnalysisContext<'_>) -> Result<Report> {
    let start = Instant::now();
    let window = ctx.default_window();
    let periods = normalize_periods(&ctx.config.trend.periods)?;

    let projects = aggregate_all(ctx, &window);
    let team = analyze_team(ctx, &window);
    let issues = analyze_issues(ctx);
    let recommendations = recommend(&issues, Some(&team));
    let trends = compare_projects_across_periods(ctx, &periods)?;
    let summary = summarize(&projects);

    let run = Summary::new(
        summary.total_projects - summary.failed_projects,
        summary.failed_projects,
        start.elapsed(),
    );
    tracing::info!(
        "Report built: {} projects ({} failed) in {:.2}s",
        summary.total_projects,
        summary.failed_projects,
        run.duration.as_secs_f64()
    );

    Ok(Report {
        metadata: Metadata {
            generated_at: ctx.now,
            snapshot_generated_at: ctx.snapshot.generated_at.clone(),
            window_days: window.days,
            periods,
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
        summary,
        projects,
        team,
        issues,
        recommendations,
        trends,
        run,
    })
}

/// Batch report analyzer.
#[derive(Default)]
pub struct Analyzer;

impl Analyzer {
    pub fn new() -> Self {
        Self
    }
}

impl AnalyzerTrait for Analyzer {
    type Output = Report;

    fn name(&self) -> &'static str {
        "report"
    }

    fn description(&self) -> &'static str {
        "Run every analytics stage and assemble one report"
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> Result<Self::Output> {
        build_report(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::score::Grade;
    use crate::source::{Branch, CommitStats, FetchError, ProjectSnapshot, RawCommit, Snapshot};
    use chrono::{DateTime, TimeZone, Utc};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 30, 12, 0, 0).unwrap()
    }

    fn project(id: u64, name: &str, group: Option<&str>, authors: &[&str]) -> ProjectSnapshot {
        let mut project = ProjectSnapshot::new(id, name);
        project.group = group.map(str::to_string);
        project.branches = vec![Branch {
            name: "main".to_string(),
            commits: authors
                .iter()
                .enumerate()
                .map(|(i, author)| RawCommit {
                    id: format!("{name}-{i}"),
                    created_at: "2024-06-29T09:00:00Z".to_string(),
                    author_name: author.to_string(),
                    author_email: String::new(),
                    title: String::new(),
                    stats: Some(CommitStats {
                        additions: 2,
                        deletions: 1,
                    }),
                })
                .collect(),
        }];
        project
    }

    fn snapshot() -> Snapshot {
        let mut broken = ProjectSnapshot::new(3, "legacy");
        broken.errors.push(FetchError {
            stage: "branches".to_string(),
            message: "404 Not Found".to_string(),
        });
        Snapshot::new(vec![
            project(1, "api", Some("platform"), &["Ann", "Ben", "Cy", "Dee"]),
            project(2, "web", Some("platform"), &["Ann"]),
            broken,
        ])
    }

    #[test]
    fn test_build_report_isolates_failures() {
        let snapshot = snapshot();
        let config = Config::default();
        let ctx = AnalysisContext::new(&snapshot, &config, now());
        let report = build_report(&ctx).unwrap();

        assert_eq!(report.summary.total_projects, 3);
        assert_eq!(report.summary.failed_projects, 1);
        assert_eq!(report.summary.active_projects, 2);
        assert_eq!(report.summary.total_commits, 5);
        assert_eq!(report.summary.total_contributors, 4);
        assert_eq!(report.projects[2].status, ProjectStatus::Error);
        assert_eq!(report.trends.projects.len(), 3);
        assert_eq!(report.team.team.total_commits, 5);
        assert_eq!(report.metadata.periods, vec![7, 15, 30, 60, 90]);
        assert_eq!(report.run.projects_failed, 1);
    }

    #[test]
    fn test_summary_grades_and_groups() {
        let snapshot = snapshot();
        let config = Config::default();
        let ctx = AnalysisContext::new(&snapshot, &config, now());
        let report = build_report(&ctx).unwrap();

        // api: -15 commits, +5 issues, +10 contributors, +5 recency = 105 -> 100
        assert_eq!(report.projects[0].health.score, 100);
        // web: -15 commits, +5 issues, -10 single contributor, +5 recency = 85
        assert_eq!(report.projects[1].health.score, 85);
        assert_eq!(report.summary.grade_distribution[&Grade::APlus], 1);
        assert_eq!(report.summary.grade_distribution[&Grade::AMinus], 1);
        assert_eq!(report.summary.average_score, 92.5);

        let platform = &report.summary.groups["platform"];
        assert_eq!(platform.projects, 2);
        assert_eq!(platform.average_score, 92.5);
    }

    #[test]
    fn test_empty_snapshot_report() {
        let snapshot = Snapshot::default();
        let config = Config::default();
        let ctx = AnalysisContext::new(&snapshot, &config, now());
        let report = build_report(&ctx).unwrap();
        assert_eq!(report.summary.total_projects, 0);
        assert_eq!(report.summary.average_score, 0.0);
        assert_eq!(report.recommendations.len(), 1);
    }
}

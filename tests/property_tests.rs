use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;

use glt::analyzers::collaboration::{distribution, gini};
use glt::analyzers::ownership::{resolve, BranchCommits};
use glt::analyzers::project::{aggregate, ProjectMetrics};
use glt::config::Config;
use glt::core::{period_label, AnalysisContext, TimeWindow};
use glt::score::trend::{calculate_period_trends, PeriodMetrics, TrendMetric};
use glt::score::{score, Grade, HealthInputs};
use glt::source::{Branch, CommitStats, ProjectSnapshot, RawCommit, Snapshot};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 30, 12, 0, 0).unwrap()
}

/// Commit `i` of a shared pool; the same id always carries the same stats.
fn pool_commit(i: u8) -> RawCommit {
    RawCommit {
        id: format!("c{i}"),
        created_at: (now() - Duration::hours(i64::from(i) + 1)).to_rfc3339(),
        author_name: format!("Dev {}", i % 4),
        author_email: format!("dev{}@example.com", i % 4),
        title: String::new(),
        stats: Some(CommitStats {
            additions: u64::from(i) * 3,
            deletions: u64::from(i),
        }),
    }
}

fn branches_strategy() -> impl Strategy<Value = Vec<Vec<u8>>> {
    prop::collection::vec(prop::collection::vec(0u8..12, 0..8), 1..5)
}

// ---------------------------------------------------------------------------
// Health score
// ---------------------------------------------------------------------------

proptest! {
    /// Scores stay within 0..=100 and the grade always follows the score.
    #[test]
    fn health_score_bounded_and_graded(
        commits in 0usize..500,
        open_issues in 0usize..200,
        open_mrs in 0usize..100,
        contributors in 0usize..50,
        days_since_last_commit in 0i64..1000,
    ) {
        let inputs = HealthInputs {
            commits,
            open_issues,
            open_mrs,
            contributors,
            days_since_last_commit,
        };
        let health = score(&inputs);
        prop_assert!(health.score <= 100);
        prop_assert_eq!(health.grade, Grade::from_score(health.score));
        prop_assert_eq!(score(&inputs), health);
    }

    /// At most one adjustment per factor.
    #[test]
    fn health_score_one_adjustment_per_factor(
        commits in 0usize..500,
        open_issues in 0usize..200,
        contributors in 0usize..50,
    ) {
        let health = score(&HealthInputs {
            commits,
            open_issues,
            open_mrs: 0,
            contributors,
            days_since_last_commit: 3,
        });
        let factors: BTreeSet<String> = health
            .adjustments
            .iter()
            .map(|a| format!("{:?}", a.factor))
            .collect();
        prop_assert_eq!(factors.len(), health.adjustments.len());
    }
}

// ---------------------------------------------------------------------------
// Contribution distribution
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn gini_is_bounded(counts in prop::collection::vec(0u64..1000, 0..20)) {
        let g = gini(&counts);
        prop_assert!((0.0..=1.0).contains(&g), "gini out of range: {}", g);
    }

    #[test]
    fn gini_of_equal_counts_is_zero(value in 1u64..1000, n in 2usize..20) {
        let counts = vec![value; n];
        prop_assert!(gini(&counts).abs() < 1e-9);
    }

    #[test]
    fn gini_ignores_order(mut counts in prop::collection::vec(0u64..1000, 2..20)) {
        let before = gini(&counts);
        counts.reverse();
        prop_assert!((gini(&counts) - before).abs() < 1e-9);
    }

    #[test]
    fn distribution_matches_gini(counts in prop::collection::vec(0u64..100, 0..10)) {
        let stats = distribution(&counts);
        prop_assert!((stats.gini - gini(&counts)).abs() < 1e-12);
    }
}

// ---------------------------------------------------------------------------
// Commit ownership
// ---------------------------------------------------------------------------

proptest! {
    /// Every distinct commit is owned by exactly one branch: the first one
    /// listing it.
    #[test]
    fn ownership_partitions_commits(layout in branches_strategy()) {
        let names: Vec<String> = (0..layout.len()).map(|i| format!("b{i}")).collect();
        let commits: Vec<Vec<RawCommit>> = layout
            .iter()
            .map(|ids| ids.iter().map(|&i| pool_commit(i)).collect())
            .collect();
        let branches: Vec<BranchCommits<'_>> = names
            .iter()
            .zip(&commits)
            .map(|(name, list)| BranchCommits::new(name, list.iter().collect()))
            .collect();

        let resolution = resolve(&branches);

        let distinct: BTreeSet<u8> = layout.iter().flatten().copied().collect();
        prop_assert_eq!(resolution.distinct_commits(), distinct.len());

        let owned: usize = resolution.branches.iter().map(|b| b.commits_owned).sum();
        prop_assert_eq!(owned, distinct.len());

        for id in &distinct {
            let first = layout.iter().position(|ids| ids.contains(id)).unwrap();
            prop_assert_eq!(
                resolution.owner_of(&format!("c{id}")),
                Some(names[first].as_str())
            );
        }

        let expected_net: i64 = distinct.iter().map(|&i| i64::from(i) * 2).sum();
        prop_assert_eq!(resolution.total_owned_net_lines(), expected_net);
    }

    /// Resolution does not depend on anything but the input order.
    #[test]
    fn ownership_is_deterministic(layout in branches_strategy()) {
        let names: Vec<String> = (0..layout.len()).map(|i| format!("b{i}")).collect();
        let commits: Vec<Vec<RawCommit>> = layout
            .iter()
            .map(|ids| ids.iter().map(|&i| pool_commit(i)).collect())
            .collect();
        let branches: Vec<BranchCommits<'_>> = names
            .iter()
            .zip(&commits)
            .map(|(name, list)| BranchCommits::new(name, list.iter().collect()))
            .collect();

        let first = resolve(&branches);
        let second = resolve(&branches);
        prop_assert_eq!(first.branches, second.branches);
        prop_assert_eq!(first.ownership, second.ownership);
        prop_assert_eq!(first.unique_commits, second.unique_commits);
    }
}

// ---------------------------------------------------------------------------
// Aggregation and trends
// ---------------------------------------------------------------------------

proptest! {
    /// Aggregating the same snapshot twice yields identical metrics.
    #[test]
    fn aggregate_is_idempotent(layout in branches_strategy(), days in 1u32..60) {
        let mut project = ProjectSnapshot::new(1, "api");
        project.branches = layout
            .iter()
            .enumerate()
            .map(|(i, ids)| Branch {
                name: if i == 0 { "main".to_string() } else { format!("b{i}") },
                commits: ids.iter().map(|&c| pool_commit(c)).collect(),
            })
            .collect();
        let snapshot = Snapshot::new(vec![project]);
        let config = Config::default();
        let ctx = AnalysisContext::new(&snapshot, &config, now());
        let window = ctx.window(days);

        let first = aggregate(&snapshot.projects[0], &window, &ctx).unwrap();
        let second = aggregate(&snapshot.projects[0], &window, &ctx).unwrap();
        prop_assert_eq!(&first, &second);
        prop_assert!(first.health.score <= 100);
        prop_assert!(first.commits_unique <= first.commits_total);
        prop_assert_eq!(
            first.contributors.values().sum::<usize>(),
            first.commits_total
        );
    }

    /// A delta exists exactly when the earlier period's value is nonzero.
    #[test]
    fn trend_deltas_skip_zero_baselines(values in prop::collection::vec(0usize..50, 2..6)) {
        let base = ProjectSnapshot::new(1, "api");
        let periods: Vec<PeriodMetrics> = values
            .iter()
            .enumerate()
            .map(|(i, &commits)| {
                let days = (i as u32 + 1) * 7;
                let window = TimeWindow::trailing(now(), days);
                let mut metrics = ProjectMetrics::failed(&base, &window, "synthetic");
                metrics.commits_total = commits;
                PeriodMetrics {
                    days,
                    period: period_label(days),
                    metrics,
                }
            })
            .collect();

        let trends = calculate_period_trends(&periods);
        let commits: &BTreeMap<_, _> = &trends[&TrendMetric::Commits.trend_key()];
        let expected = values.windows(2).filter(|pair| pair[0] != 0).count();
        prop_assert_eq!(commits.len(), expected);
        for delta in commits.values() {
            prop_assert!(delta.from_value != 0.0);
            let pct = (delta.to_value - delta.from_value) / delta.from_value * 100.0;
            prop_assert!((delta.percentage - pct).abs() < 1e-9);
        }
    }
}

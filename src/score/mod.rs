//! Rule-based project health score.
//!
//! A score starts at 100 and each factor contributes at most one adjustment,
//! taken from the first matching row of that factor's table. The result is
//! clamped to `[0, 100]` and mapped onto a letter grade.

pub mod trend;

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Starting score before adjustments.
pub const BASE_SCORE: i32 = 100;

/// The project signals the score is computed from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthInputs {
    pub commits: usize,
    pub open_issues: usize,
    pub open_mrs: usize,
    pub contributors: usize,
    pub days_since_last_commit: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Factor {
    Commits,
    OpenIssues,
    OpenMergeRequests,
    Contributors,
    Recency,
}

impl Factor {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Commits => "commits",
            Self::OpenIssues => "open_issues",
            Self::OpenMergeRequests => "open_mrs",
            Self::Contributors => "contributors",
            Self::Recency => "recency",
        }
    }
}

struct Rule {
    factor: Factor,
    reason: &'static str,
    applies: fn(&HealthInputs) -> bool,
    points: i32,
}

/// Rows are grouped by factor; inside a group the first match wins.
const RULES: &[Rule] = &[
    Rule {
        factor: Factor::Commits,
        reason: "no commits in window",
        applies: |i| i.commits == 0,
        points: -30,
    },
    Rule {
        factor: Factor::Commits,
        reason: "fewer than 5 commits",
        applies: |i| i.commits < 5,
        points: -15,
    },
    Rule {
        factor: Factor::Commits,
        reason: "more than 50 commits",
        applies: |i| i.commits > 50,
        points: 5,
    },
    Rule {
        factor: Factor::OpenIssues,
        reason: "more than 20 open issues",
        applies: |i| i.open_issues > 20,
        points: -20,
    },
    Rule {
        factor: Factor::OpenIssues,
        reason: "more than 10 open issues",
        applies: |i| i.open_issues > 10,
        points: -10,
    },
    Rule {
        factor: Factor::OpenIssues,
        reason: "fewer than 5 open issues",
        applies: |i| i.open_issues < 5,
        points: 5,
    },
    Rule {
        factor: Factor::OpenMergeRequests,
        reason: "more than 10 open merge requests",
        applies: |i| i.open_mrs > 10,
        points: -15,
    },
    Rule {
        factor: Factor::OpenMergeRequests,
        reason: "more than 5 open merge requests",
        applies: |i| i.open_mrs > 5,
        points: -5,
    },
    Rule {
        factor: Factor::Contributors,
        reason: "single contributor",
        applies: |i| i.contributors == 1,
        points: -10,
    },
    Rule {
        factor: Factor::Contributors,
        reason: "more than 3 contributors",
        applies: |i| i.contributors > 3,
        points: 10,
    },
    Rule {
        factor: Factor::Recency,
        reason: "committed within 3 days",
        applies: |i| i.days_since_last_commit < 3,
        points: 5,
    },
    Rule {
        factor: Factor::Recency,
        reason: "no commits for over 14 days",
        applies: |i| i.days_since_last_commit > 14,
        points: -20,
    },
];

/// One applied row of the rule table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Adjustment {
    pub factor: Factor,
    pub reason: String,
    pub points: i32,
}

/// Letter grade for a health score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Grade {
    #[serde(rename = "A+")]
    APlus,
    A,
    #[serde(rename = "A-")]
    AMinus,
    #[serde(rename = "B+")]
    BPlus,
    B,
    #[serde(rename = "B-")]
    BMinus,
    #[serde(rename = "C+")]
    CPlus,
    C,
    #[serde(rename = "C-")]
    CMinus,
    D,
}

impl Grade {
    /// Every grade from best to worst.
    pub const ALL: [Grade; 10] = [
        Grade::APlus,
        Grade::A,
        Grade::AMinus,
        Grade::BPlus,
        Grade::B,
        Grade::BMinus,
        Grade::CPlus,
        Grade::C,
        Grade::CMinus,
        Grade::D,
    ];

    pub fn from_score(score: u32) -> Self {
        match score {
            95.. => Grade::APlus,
            90..=94 => Grade::A,
            85..=89 => Grade::AMinus,
            80..=84 => Grade::BPlus,
            75..=79 => Grade::B,
            70..=74 => Grade::BMinus,
            65..=69 => Grade::CPlus,
            60..=64 => Grade::C,
            55..=59 => Grade::CMinus,
            _ => Grade::D,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Grade::APlus => "A+",
            Grade::A => "A",
            Grade::AMinus => "A-",
            Grade::BPlus => "B+",
            Grade::B => "B",
            Grade::BMinus => "B-",
            Grade::CPlus => "C+",
            Grade::C => "C",
            Grade::CMinus => "C-",
            Grade::D => "D",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthScore {
    pub score: u32,
    pub grade: Grade,
    pub adjustments: Vec<Adjustment>,
}

impl HealthScore {
    /// Score used for projects whose analysis failed.
    pub fn failed() -> Self {
        Self {
            score: 0,
            grade: Grade::D,
            adjustments: Vec::new(),
        }
    }
}

/// Score a project. Pure: identical inputs give identical output.
pub fn score(inputs: &HealthInputs) -> HealthScore {
    let mut total = BASE_SCORE;
    let mut adjustments = Vec::new();
    let mut decided: Vec<Factor> = Vec::new();

    for rule in RULES {
        if decided.contains(&rule.factor) || !(rule.applies)(inputs) {
            continue;
        }
        decided.push(rule.factor);
        total += rule.points;
        adjustments.push(Adjustment {
            factor: rule.factor,
            reason: rule.reason.to_string(),
            points: rule.points,
        });
    }

    let score = total.clamp(0, 100) as u32;
    HealthScore {
        score,
        grade: Grade::from_score(score),
        adjustments,
    }
}

/// Count of projects per grade, every grade present.
pub fn grade_distribution<'a, I>(grades: I) -> BTreeMap<Grade, usize>
where
    I: IntoIterator<Item = &'a Grade>,
{
    let mut counts: BTreeMap<Grade, usize> = Grade::ALL.iter().map(|g| (*g, 0)).collect();
    for grade in grades {
        *counts.entry(*grade).or_insert(0) += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs(
        commits: usize,
        open_issues: usize,
        open_mrs: usize,
        contributors: usize,
        days: i64,
    ) -> HealthInputs {
        HealthInputs {
            commits,
            open_issues,
            open_mrs,
            contributors,
            days_since_last_commit: days,
        }
    }

    #[test]
    fn test_healthy_project_is_capped_at_100() {
        let health = score(&inputs(60, 2, 1, 4, 1));
        assert_eq!(health.score, 100);
        assert_eq!(health.grade, Grade::APlus);
        assert_eq!(health.adjustments.len(), 4);
    }

    #[test]
    fn test_abandoned_project() {
        // -30 commits, -20 issues, -15 MRs, -20 recency
        let health = score(&inputs(0, 25, 12, 0, 999));
        assert_eq!(health.score, 15);
        assert_eq!(health.grade, Grade::D);
    }

    #[test]
    fn test_single_contributor_inactive_project_scores_five() {
        // 100 - 30 commits - 20 issues - 15 MRs - 10 contributors - 20 recency
        let health = score(&inputs(0, 25, 12, 1, 20));
        assert_eq!(health.score, 5);
        assert_eq!(health.grade, Grade::D);
        assert_eq!(health.adjustments.len(), 5);
        assert_eq!(health.adjustments.iter().map(|a| a.points).sum::<i32>(), -95);
    }

    #[test]
    fn test_first_match_within_factor() {
        let health = score(&inputs(0, 3, 0, 2, 5));
        let commit_rules: Vec<_> = health
            .adjustments
            .iter()
            .filter(|a| a.factor == Factor::Commits)
            .collect();
        assert_eq!(commit_rules.len(), 1);
        assert_eq!(commit_rules[0].points, -30);
        // 100 - 30 + 5
        assert_eq!(health.score, 75);
        assert_eq!(health.grade, Grade::B);
    }

    #[test]
    fn test_mid_band_values_have_no_adjustment() {
        let health = score(&inputs(20, 7, 3, 2, 7));
        assert!(health.adjustments.is_empty());
        assert_eq!(health.score, 100);
    }

    #[test]
    fn test_grade_boundaries() {
        assert_eq!(Grade::from_score(95), Grade::APlus);
        assert_eq!(Grade::from_score(94), Grade::A);
        assert_eq!(Grade::from_score(85), Grade::AMinus);
        assert_eq!(Grade::from_score(70), Grade::BMinus);
        assert_eq!(Grade::from_score(55), Grade::CMinus);
        assert_eq!(Grade::from_score(54), Grade::D);
        assert_eq!(Grade::from_score(0), Grade::D);
    }

    #[test]
    fn test_grade_serializes_with_modifier() {
        let json = serde_json::to_string(&Grade::BPlus).unwrap();
        assert_eq!(json, "\"B+\"");
        let grade: Grade = serde_json::from_str("\"A-\"").unwrap();
        assert_eq!(grade, Grade::AMinus);
    }

    #[test]
    fn test_grade_distribution_lists_every_grade() {
        let grades = [Grade::A, Grade::A, Grade::D];
        let dist = grade_distribution(grades.iter());
        assert_eq!(dist.len(), 10);
        assert_eq!(dist[&Grade::A], 2);
        assert_eq!(dist[&Grade::D], 1);
        assert_eq!(dist[&Grade::BPlus], 0);
    }
}

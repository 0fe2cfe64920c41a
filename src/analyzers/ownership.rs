//! Commit ownership across branches.
//!
//! A commit reachable from several branches (trunk history on every feature
//! branch, cherry-picks, fast-forwarded merges) must contribute its line
//! delta exactly once. Branches are walked in the caller's order and the
//! first branch to list a commit owns it; later branches still count the
//! commit but get no lines for it.
//!
//! A second, independent measurement compares each branch against the base
//! branch and counts `+`/`-` lines of the unified diff. On rebased or
//! rewritten history the two disagree; both are reported side by side.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::source::{ProjectSnapshot, RawCommit};

/// One branch's commits for the window, in listing order.
#[derive(Debug, Clone)]
pub struct BranchCommits<'a> {
    pub name: &'a str,
    pub commits: Vec<&'a RawCommit>,
}

impl<'a> BranchCommits<'a> {
    pub fn new(name: &'a str, commits: Vec<&'a RawCommit>) -> Self {
        Self { name, commits }
    }
}

/// Per-branch result of ownership resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchOwnership {
    pub branch: String,
    /// Every commit listed on the branch, owned or not.
    pub commits_total: usize,
    /// Commits that no other branch lists.
    pub commits_unique: usize,
    pub commits_owned: usize,
    pub commits_inherited: usize,
    pub owned_additions: u64,
    pub owned_deletions: u64,
    pub owned_net_lines: i64,
}

/// A commit together with the index of the branch that owns it.
#[derive(Debug, Clone, Copy)]
pub struct OwnedCommit<'a> {
    pub commit: &'a RawCommit,
    pub branch: usize,
}

/// Ownership of every commit seen in one project/window.
#[derive(Debug, Clone, Default)]
pub struct Resolution<'a> {
    /// One entry per input branch, in input order.
    pub branches: Vec<BranchOwnership>,
    /// `commit_id -> owning branch`.
    pub ownership: BTreeMap<String, String>,
    /// Deduplicated union of all commits, in first-seen order.
    pub owned_commits: Vec<OwnedCommit<'a>>,
    /// Commit ids listed on exactly one branch, keyed by that branch.
    pub unique_commits: BTreeMap<String, BTreeSet<String>>,
}

impl<'a> Resolution<'a> {
    /// `(branch, owned net lines)` in input order.
    pub fn owned_net_lines_by_branch(&self) -> Vec<(&str, i64)> {
        self.branches
            .iter()
            .map(|b| (b.branch.as_str(), b.owned_net_lines))
            .collect()
    }

    /// Net line delta of the deduplicated union.
    pub fn total_owned_net_lines(&self) -> i64 {
        self.branches.iter().map(|b| b.owned_net_lines).sum()
    }

    /// Number of distinct commits across all branches.
    pub fn distinct_commits(&self) -> usize {
        self.owned_commits.len()
    }

    /// Number of commits listed on exactly one branch.
    pub fn unique_commit_count(&self) -> usize {
        self.unique_commits.values().map(BTreeSet::len).sum()
    }

    pub fn owner_of(&self, commit_id: &str) -> Option<&str> {
        self.ownership.get(commit_id).map(String::as_str)
    }
}

/// Assign every commit to exactly one branch.
///
/// Branch order and commit order are taken as given; the first branch that
/// lists a commit owns it, and ownership is never reassigned.
pub fn resolve<'a>(branches: &[BranchCommits<'a>]) -> Resolution<'a> {
    let mut resolution = Resolution::default();
    let mut seen: HashSet<&'a str> = HashSet::new();

    // How many branches list each commit (a branch listing it twice counts once).
    let mut listed_on: HashMap<&'a str, usize> = HashMap::new();
    for branch in branches {
        let ids: HashSet<&str> = branch.commits.iter().map(|c| c.id.as_str()).collect();
        for id in ids {
            *listed_on.entry(id).or_insert(0) += 1;
        }
    }

    for (index, branch) in branches.iter().enumerate() {
        let mut row = BranchOwnership {
            branch: branch.name.to_string(),
            ..BranchOwnership::default()
        };
        let mut unique: BTreeSet<String> = BTreeSet::new();

        for commit in &branch.commits {
            row.commits_total += 1;
            let id = commit.id.as_str();

            if listed_on.get(id).copied() == Some(1) {
                unique.insert(id.to_string());
            }

            if seen.insert(id) {
                let stats = commit.stats_or_default();
                row.commits_owned += 1;
                row.owned_additions += stats.additions;
                row.owned_deletions += stats.deletions;
                row.owned_net_lines += stats.net();
                resolution
                    .ownership
                    .insert(id.to_string(), branch.name.to_string());
                resolution.owned_commits.push(OwnedCommit {
                    commit,
                    branch: index,
                });
                tracing::debug!(
                    "Commit {} on {}: {:+} lines (owner)",
                    short_id(id),
                    branch.name,
                    stats.net()
                );
            } else {
                row.commits_inherited += 1;
                tracing::debug!(
                    "Commit {} on {}: inherited (owned by {})",
                    short_id(id),
                    branch.name,
                    resolution.owner_of(id).unwrap_or("unknown")
                );
            }
        }

        row.commits_unique = unique.len();
        resolution
            .unique_commits
            .insert(branch.name.to_string(), unique);
        resolution.branches.push(row);
    }

    resolution
}

fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

/// Line counts from the branch-vs-base compare.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffStats {
    pub additions: u64,
    pub deletions: u64,
    pub net: i64,
}

impl DiffStats {
    pub fn new(additions: u64, deletions: u64) -> Self {
        Self {
            additions,
            deletions,
            net: additions as i64 - deletions as i64,
        }
    }
}

/// Count added and removed lines in a unified diff, ignoring the
/// `+++`/`---` file headers.
pub fn parse_diff_stats(diff: &str) -> (u64, u64) {
    let mut additions = 0;
    let mut deletions = 0;
    for line in diff.lines() {
        if line.starts_with('+') && !line.starts_with("+++") {
            additions += 1;
        } else if line.starts_with('-') && !line.starts_with("---") {
            deletions += 1;
        }
    }
    (additions, deletions)
}

/// Lines changed on `target` relative to `base`, from the materialized
/// compare. The same branch, or a compare the fetcher could not provide,
/// yields zeros.
pub fn branch_diff(project: &ProjectSnapshot, base: &str, target: &str) -> DiffStats {
    if base == target {
        return DiffStats::default();
    }
    let Some(compare) = project.compare(base, target) else {
        tracing::debug!(
            "No compare available for {}..{} in {}",
            base,
            target,
            project.name
        );
        return DiffStats::default();
    };

    let (additions, deletions) = compare
        .diffs
        .iter()
        .map(|file| parse_diff_stats(&file.diff))
        .fold((0, 0), |(a, d), (fa, fd)| (a + fa, d + fd));
    DiffStats::new(additions, deletions)
}

/// Display marker for a branch's owned line delta: `+N`, `-N`, `0`, or `0*`
/// when every commit on the branch is inherited.
pub fn lines_indicator(row: &BranchOwnership) -> String {
    if row.owned_net_lines > 0 {
        format!("+{}", row.owned_net_lines)
    } else if row.owned_net_lines < 0 {
        row.owned_net_lines.to_string()
    } else if row.commits_total > 0 && row.commits_inherited == row.commits_total {
        "0*".to_string()
    } else {
        "0".to_string()
    }
}

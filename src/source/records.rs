//! Typed records materialized by the external fetcher.
//!
//! Timestamps stay as the raw strings the platform sent. Each analyzer parses
//! them at the point of use so that one malformed value drops only the record
//! that carries it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Per-commit line statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitStats {
    pub additions: u64,
    pub deletions: u64,
}

impl CommitStats {
    /// Net line delta (`additions - deletions`).
    pub fn net(&self) -> i64 {
        self.additions as i64 - self.deletions as i64
    }
}

/// A commit as listed on one branch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawCommit {
    pub id: String,
    pub created_at: String,
    pub author_name: String,
    pub author_email: String,
    /// Commit title (first line of the message).
    #[serde(default)]
    pub title: String,
    /// Absent when the per-commit stat lookup failed or was skipped.
    #[serde(default)]
    pub stats: Option<CommitStats>,
}

impl RawCommit {
    /// Line statistics, with a failed lookup counting as zero changes.
    pub fn stats_or_default(&self) -> CommitStats {
        self.stats.unwrap_or_default()
    }
}

/// Merge request lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeRequestState {
    Opened,
    Merged,
    Closed,
    #[serde(other)]
    Other,
}

/// Author block of a merge request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeRequestAuthor {
    pub username: String,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawMergeRequest {
    pub id: u64,
    pub author: MergeRequestAuthor,
    pub state: MergeRequestState,
    pub created_at: String,
}

/// Issue lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueState {
    Opened,
    Closed,
    #[serde(other)]
    Other,
}

/// Assignee block of an issue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueAssignee {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// Loosely populated user reference (issue author, closer).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserRef {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl UserRef {
    /// Best available display name: name, then username.
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|n| !n.is_empty())
            .or(self.username.as_deref())
            .unwrap_or("")
    }

    pub fn email(&self) -> &str {
        self.email.as_deref().unwrap_or("")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawIssue {
    pub id: u64,
    pub iid: u64,
    pub title: String,
    pub state: IssueState,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub assignee: Option<IssueAssignee>,
    #[serde(default)]
    pub author: Option<UserRef>,
    pub created_at: String,
    pub updated_at: String,
    /// `YYYY-MM-DD` or a full timestamp.
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default)]
    pub closed_at: Option<String>,
    #[serde(default)]
    pub closed_by: Option<UserRef>,
    #[serde(default)]
    pub web_url: Option<String>,
}

/// A branch with its commits for the widest requested window, in the order
/// the platform listed them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Branch {
    pub name: String,
    #[serde(default)]
    pub commits: Vec<RawCommit>,
}

/// One file's unified diff inside a branch compare.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileDiff {
    #[serde(default)]
    pub new_path: Option<String>,
    #[serde(default)]
    pub diff: String,
}

/// Result of a `from..to` compare between two branches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BranchCompare {
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub diffs: Vec<FileDiff>,
}

/// A fetch step that failed for a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchError {
    pub stage: String,
    pub message: String,
}

impl FetchError {
    /// Without the branch listing (or the project itself) nothing can be
    /// attributed, so these stages fail the whole project.
    pub fn is_fatal(&self) -> bool {
        matches!(self.stage.as_str(), "branches" | "project")
    }
}

/// Everything the fetcher collected for one project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectSnapshot {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub default_branch: Option<String>,
    #[serde(default)]
    pub languages: BTreeMap<String, f64>,
    /// Branches in upstream listing order. Order decides commit ownership.
    #[serde(default)]
    pub branches: Vec<Branch>,
    #[serde(default)]
    pub merge_requests: Vec<RawMergeRequest>,
    #[serde(default)]
    pub issues: Vec<RawIssue>,
    #[serde(default)]
    pub compares: Vec<BranchCompare>,
    #[serde(default)]
    pub errors: Vec<FetchError>,
}

impl ProjectSnapshot {
    /// An empty project, handy as a builder base.
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            group: None,
            default_branch: None,
            languages: BTreeMap::new(),
            branches: Vec::new(),
            merge_requests: Vec::new(),
            issues: Vec::new(),
            compares: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Branch used as the comparison base: the declared default branch, else
    /// `main`, `master`, `develop`, else the first listed branch.
    pub fn base_branch(&self) -> String {
        if let Some(default) = self.default_branch.as_deref().filter(|b| !b.is_empty()) {
            return default.to_string();
        }
        for candidate in ["main", "master", "develop"] {
            if self.branches.iter().any(|b| b.name == candidate) {
                return candidate.to_string();
            }
        }
        self.branches
            .first()
            .map(|b| b.name.clone())
            .unwrap_or_else(|| "main".to_string())
    }

    /// Look up a materialized compare for `from..to`.
    pub fn compare(&self, from: &str, to: &str) -> Option<&BranchCompare> {
        self.compares.iter().find(|c| c.from == from && c.to == to)
    }

    /// First fatal fetch error, if any.
    pub fn fatal_error(&self) -> Option<&FetchError> {
        self.errors.iter().find(|e| e.is_fatal())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn branch(name: &str) -> Branch {
        Branch {
            name: name.to_string(),
            commits: Vec::new(),
        }
    }

    #[test]
    fn test_commit_missing_stats_counts_as_zero() {
        let commit: RawCommit = serde_json::from_str(
            r#"{"id":"abc","created_at":"2024-01-01T00:00:00Z","author_name":"A","author_email":"a@x.io"}"#,
        )
        .unwrap();
        assert_eq!(commit.stats_or_default(), CommitStats::default());
        assert_eq!(commit.stats_or_default().net(), 0);
    }

    #[test]
    fn test_commit_missing_required_field_is_rejected() {
        let result: std::result::Result<RawCommit, _> =
            serde_json::from_str(r#"{"id":"abc","author_name":"A","author_email":"a@x.io"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_states_are_tolerated() {
        let mr: RawMergeRequest = serde_json::from_str(
            r#"{"id":1,"author":{"username":"jd","name":"J D"},"state":"locked","created_at":"2024-01-01T00:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(mr.state, MergeRequestState::Other);
    }

    #[test]
    fn test_base_branch_resolution() {
        let mut project = ProjectSnapshot::new(1, "api");
        project.branches = vec![branch("feature"), branch("master"), branch("develop")];
        assert_eq!(project.base_branch(), "master");

        project.default_branch = Some("release".to_string());
        assert_eq!(project.base_branch(), "release");

        project.default_branch = None;
        project.branches = vec![branch("feature"), branch("hotfix")];
        assert_eq!(project.base_branch(), "feature");

        project.branches.clear();
        assert_eq!(project.base_branch(), "main");
    }

    #[test]
    fn test_fatal_fetch_errors() {
        let mut project = ProjectSnapshot::new(1, "api");
        project.errors.push(FetchError {
            stage: "issues".to_string(),
            message: "timeout".to_string(),
        });
        assert!(project.fatal_error().is_none());

        project.errors.push(FetchError {
            stage: "branches".to_string(),
            message: "403".to_string(),
        });
        assert_eq!(project.fatal_error().map(|e| e.message.as_str()), Some("403"));
    }

    #[test]
    fn test_user_ref_display_name_falls_back_to_username() {
        let user = UserRef {
            username: Some("jdoe".to_string()),
            name: Some(String::new()),
            ..UserRef::default()
        };
        assert_eq!(user.display_name(), "jdoe");
        assert_eq!(user.email(), "");
    }
}

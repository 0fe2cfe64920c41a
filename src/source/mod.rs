//! Materialized platform data consumed by the analytics core.
//!
//! Fetching, pagination and retries happen elsewhere; this module only
//! defines the snapshot shape and loads it.

mod records;

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::{Error, Result};

pub use records::{
    Branch, BranchCompare, CommitStats, FetchError, FileDiff, IssueAssignee, IssueState,
    MergeRequestAuthor, MergeRequestState, ProjectSnapshot, RawCommit, RawIssue,
    RawMergeRequest, UserRef,
};

/// A full fetch result covering every analyzed project.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    /// When the fetcher finished, as reported by it.
    #[serde(default)]
    pub generated_at: Option<String>,
    #[serde(default)]
    pub projects: Vec<ProjectSnapshot>,
}

impl Snapshot {
    pub fn new(projects: Vec<ProjectSnapshot>) -> Self {
        Self {
            generated_at: None,
            projects,
        }
    }

    /// Load a snapshot from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::InvalidArgument(format!(
                "snapshot not found: {}",
                path.display()
            )));
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Parse a snapshot from JSON text.
    pub fn from_json(content: &str) -> Result<Self> {
        let snapshot: Self = serde_json::from_str(content)?;
        tracing::debug!(
            "Loaded snapshot with {} projects",
            snapshot.projects.len()
        );
        Ok(snapshot)
    }
}

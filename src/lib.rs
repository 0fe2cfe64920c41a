//! glt - Engineering analytics over GitLab project snapshots.
//!
//! glt reads a snapshot of projects (branches, commits, merge requests,
//! issues) and turns it into per-project metrics, health scores and grades,
//! commit ownership across branches, team and issue analytics,
//! recommendations and multi-period trend comparisons.
//!
//! # Example
//!
//! ```no_run
//! use chrono::Utc;
//! use glt::analyzers::ProjectAnalyzer;
//! use glt::config::Config;
//! use glt::core::{AnalysisContext, Analyzer};
//! use glt::source::Snapshot;
//!
//! let config = Config::default();
//! let snapshot = Snapshot::from_path("snapshot.json").unwrap();
//! let ctx = AnalysisContext::new(&snapshot, &config, Utc::now());
//! let analysis = ProjectAnalyzer::new().analyze(&ctx).unwrap();
//! println!("Analyzed {} projects", analysis.summary.total_projects);
//! ```

pub mod analyzers;
pub mod cli;
pub mod config;
pub mod core;
pub mod identity;
pub mod output;
pub mod report;
pub mod score;
pub mod source;

pub use core::{AnalysisContext, Analyzer};

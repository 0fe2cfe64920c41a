//! Analytics over a materialized platform snapshot.

pub mod collaboration;
pub mod issues;
pub mod ownership;
pub mod project;
pub mod recommend;
pub mod team;

// Re-export analyzer types for convenience
pub use issues::Analyzer as IssuesAnalyzer;
pub use project::Analyzer as ProjectAnalyzer;
pub use recommend::Analyzer as RecommendAnalyzer;
pub use team::Analyzer as TeamAnalyzer;

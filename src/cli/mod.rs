//! CLI implementation using clap.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::config::OutputFormat as ConfigFormat;

/// glt - Engineering analytics over GitLab project snapshots.
#[derive(Parser)]
#[command(name = "glt")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Snapshot JSON produced by the fetcher
    #[arg(short, long, env = "GLT_INPUT", default_value = "snapshot.json", global = true)]
    pub input: PathBuf,

    /// Output format (defaults to the configured format)
    #[arg(short, long, value_enum, global = true)]
    pub format: Option<OutputFormat>,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Reference time windows end at (RFC 3339; defaults to now)
    #[arg(long, value_parser = parse_as_of, global = true)]
    pub as_of: Option<DateTime<Utc>>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Per-project metrics and health scores for one window
    #[command(alias = "projects")]
    Project(ProjectArgs),

    /// Compare projects across trailing periods
    #[command(alias = "trend")]
    Trends(TrendsArgs),

    /// Contribution analytics per canonical contributor
    Team(WindowArgs),

    /// Open issue backlog analytics and recommendations
    Issues(IssuesArgs),

    /// Run everything and print one report
    Report(ReportArgs),

    /// Print the default configuration file
    InitConfig,
}

#[derive(Args, Default)]
pub struct WindowArgs {
    /// Window length in days (defaults to analysis.days)
    #[arg(short, long)]
    pub days: Option<u32>,
}

#[derive(Args, Default)]
pub struct ProjectArgs {
    #[command(flatten)]
    pub window: WindowArgs,

    /// Exit non-zero if any project scores below this value
    #[arg(long)]
    pub fail_under: Option<u32>,

    /// Include the branch activity table
    #[arg(long)]
    pub branches: bool,
}

#[derive(Args, Default)]
pub struct TrendsArgs {
    /// Periods in days, comma-separated (defaults to trend.periods)
    #[arg(short, long, value_delimiter = ',')]
    pub periods: Option<Vec<u32>>,
}

#[derive(Args, Default)]
pub struct IssuesArgs {
    /// Only print recommendations
    #[arg(long)]
    pub recommendations_only: bool,
}

#[derive(Args, Default)]
pub struct ReportArgs {
    /// Write the report to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Markdown,
    Text,
}

impl From<OutputFormat> for ConfigFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Json => ConfigFormat::Json,
            OutputFormat::Markdown => ConfigFormat::Markdown,
            OutputFormat::Text => ConfigFormat::Text,
        }
    }
}

fn parse_as_of(value: &str) -> Result<DateTime<Utc>, String> {
    crate::core::parse_timestamp(value).map_err(|e| e.to_string())
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

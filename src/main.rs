//! glt CLI - Engineering analytics over GitLab project snapshots.

use std::fs::File;
use std::io::{stdout, BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use glt::analyzers::issues::IssueAnalytics;
use glt::analyzers::recommend::{recommend, Recommendation};
use glt::analyzers::team::analyze_team;
use glt::cli::{
    Cli, Command, IssuesArgs, OutputFormat, ProjectArgs, ReportArgs, TrendsArgs, WindowArgs,
};
use glt::config::Config;
use glt::core::progress::ProjectProgress;
use glt::core::{AnalysisContext, Analyzer, Error};
use glt::output::{Format, Output};
use glt::source::Snapshot;

fn main() -> ExitCode {
    let cli = Cli::parse_args();

    // RUST_LOG wins; otherwise -v turns on debug logs.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if cli.verbose { "glt=debug" } else { "warn" }));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

/// Issue analytics together with the recommendations derived from them.
#[derive(Serialize)]
struct IssuesReport {
    issues: IssueAnalytics,
    recommendations: Vec<Recommendation>,
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let Cli {
        input,
        format,
        config,
        no_color,
        as_of,
        command,
        ..
    } = cli;
    let session = Session {
        input,
        format,
        config,
        no_color,
        as_of,
    };

    match command {
        Command::InitConfig => print!("{}", Config::default_toml()),
        Command::Project(args) => session.run(|ctx, output| project(args, ctx, output))?,
        Command::Trends(args) => session.run(|ctx, output| trends(args, ctx, output))?,
        Command::Team(args) => session.run(|ctx, output| team(args, ctx, output))?,
        Command::Issues(args) => session.run(|ctx, output| issues(args, ctx, output))?,
        Command::Report(args) => session.run(|ctx, output| report(args, ctx, output))?,
    }
    Ok(())
}

/// Global options needed to load a snapshot and render results.
struct Session {
    input: PathBuf,
    format: Option<OutputFormat>,
    config: Option<PathBuf>,
    no_color: bool,
    as_of: Option<DateTime<Utc>>,
}

impl Session {
    /// Load config and snapshot, then run `f` with a progress-reporting context.
    fn run<F>(self, f: F) -> anyhow::Result<()>
    where
        F: FnOnce(&AnalysisContext<'_>, Output) -> anyhow::Result<()>,
    {
        let config = match &self.config {
            Some(path) => Config::from_file(path)?,
            None => Config::load_default(".")?,
        };

        let snapshot = Snapshot::from_path(&self.input)
            .with_context(|| format!("failed to load snapshot {}", self.input.display()))?;
        tracing::debug!(
            "Loaded {} projects from {}",
            snapshot.projects.len(),
            self.input.display()
        );

        let format = Format::from(self.format.map(Into::into).unwrap_or(config.output.format));
        let color = config.output.color && !self.no_color;
        if !color {
            colored::control::set_override(false);
        }
        let output = Output::new(format).color(color);

        let progress = ProjectProgress::new(snapshot.projects.len(), "Analyzing projects", false);
        let now = self.as_of.unwrap_or_else(Utc::now);
        let ctx = AnalysisContext::new(&snapshot, &config, now)
            .with_progress(|current, total| progress.update(current, total));

        let result = f(&ctx, output);
        progress.finish_and_clear();
        result
    }
}

fn project(args: ProjectArgs, ctx: &AnalysisContext<'_>, output: Output) -> anyhow::Result<()> {
    let mut analyzer = glt::analyzers::ProjectAnalyzer::new();
    if let Some(days) = args.window.days {
        analyzer = analyzer.with_days(days);
    }
    let mut analysis = analyzer.analyze(ctx)?;
    if !args.branches {
        for project in &mut analysis.projects {
            project.branches.clear();
        }
    }
    write_stdout(&output, &analysis)?;

    let Some(minimum) = args.fail_under else {
        return Ok(());
    };
    let failing: Vec<_> = analysis
        .projects
        .iter()
        .filter(|p| !p.is_error() && p.health.score < minimum)
        .collect();
    if let Some(lowest) = failing.iter().map(|p| p.health.score).min() {
        let names: Vec<&str> = failing.iter().map(|p| p.name.as_str()).collect();
        return Err(Error::threshold_violation(
            format!(
                "{} project(s) below {minimum}: {}",
                failing.len(),
                names.join(", ")
            ),
            f64::from(lowest),
        )
        .into());
    }
    Ok(())
}

fn trends(args: TrendsArgs, ctx: &AnalysisContext<'_>, output: Output) -> anyhow::Result<()> {
    let mut analyzer = glt::score::trend::Analyzer::new();
    if let Some(periods) = args.periods {
        analyzer = analyzer.with_periods(periods);
    }
    write_stdout(&output, &analyzer.analyze(ctx)?)?;
    Ok(())
}

fn team(args: WindowArgs, ctx: &AnalysisContext<'_>, output: Output) -> anyhow::Result<()> {
    let mut analyzer = glt::analyzers::TeamAnalyzer::new();
    if let Some(days) = args.days {
        analyzer = analyzer.with_days(days);
    }
    write_stdout(&output, &analyzer.analyze(ctx)?)?;
    Ok(())
}

fn issues(args: IssuesArgs, ctx: &AnalysisContext<'_>, output: Output) -> anyhow::Result<()> {
    let issues = glt::analyzers::IssuesAnalyzer::new().analyze(ctx)?;
    let team = analyze_team(ctx, &ctx.default_window());
    let recommendations = recommend(&issues, Some(&team));
    if args.recommendations_only {
        write_stdout(&output, &recommendations)?;
    } else {
        write_stdout(
            &output,
            &IssuesReport {
                issues,
                recommendations,
            },
        )?;
    }
    Ok(())
}

fn report(args: ReportArgs, ctx: &AnalysisContext<'_>, output: Output) -> anyhow::Result<()> {
    let report = glt::report::Analyzer::new().analyze(ctx)?;
    match args.output {
        Some(path) => {
            let file = File::create(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            let mut writer = BufWriter::new(file);
            output.color(false).write(&report, &mut writer)?;
            writer.flush()?;
            tracing::info!("Report written to {}", path.display());
        }
        None => write_stdout(&output, &report)?,
    }
    Ok(())
}

fn write_stdout<T: Serialize>(output: &Output, data: &T) -> glt::core::Result<()> {
    let mut out = stdout().lock();
    output.write(data, &mut out)
}

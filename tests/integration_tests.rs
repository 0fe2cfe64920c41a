use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const AS_OF: &str = "2024-06-30T12:00:00Z";

fn glt() -> Command {
    let mut cmd = Command::cargo_bin("glt").expect("binary exists");
    cmd.env_remove("GLT_INPUT").env_remove("RUST_LOG");
    cmd
}

fn snapshot() -> &'static str {
    concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/snapshot.json")
}

/// Command preloaded with the fixture snapshot and a fixed reference time.
fn glt_fixture(format: &str) -> Command {
    let mut cmd = glt();
    cmd.args(["-i", snapshot(), "-f", format, "--as-of", AS_OF, "--no-color"]);
    cmd
}

// ---------------------------------------------------------------------------
// CLI smoke tests
// ---------------------------------------------------------------------------

#[test]
fn test_help_output() {
    glt()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("GitLab"));
}

#[test]
fn test_init_config_prints_defaults() {
    glt()
        .arg("init-config")
        .assert()
        .success()
        .stdout(predicate::str::contains("[analysis]"))
        .stdout(predicate::str::contains("periods = [7, 15, 30, 60, 90]"));
}

#[test]
fn test_init_config_needs_no_snapshot_or_config() {
    glt()
        .args([
            "-i",
            "/definitely/not/here.json",
            "-c",
            "/definitely/not/glt.toml",
            "init-config",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("[analysis]"))
        .stderr(predicate::str::is_empty());
}

#[test]
fn test_missing_snapshot_fails() {
    glt()
        .args(["-i", "/definitely/not/here.json", "project"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to load snapshot"));
}

#[test]
fn test_invalid_as_of_rejected() {
    glt()
        .args(["-i", snapshot(), "--as-of", "last tuesday", "project"])
        .assert()
        .failure();
}

#[test]
fn test_malformed_snapshot_fails() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("broken.json");
    std::fs::write(&path, "{\"projects\": [").unwrap();
    glt()
        .args(["-i", path.to_str().unwrap(), "project"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error:"));
}

// ---------------------------------------------------------------------------
// Project metrics
// ---------------------------------------------------------------------------

#[test]
fn test_project_json_isolates_failed_project() {
    glt_fixture("json")
        .arg("project")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"name\": \"api\""))
        .stdout(predicate::str::contains("\"name\": \"web\""))
        .stdout(predicate::str::contains("\"status\": \"error\""))
        .stdout(predicate::str::contains("\"failed_projects\": 1"));
}

#[test]
fn test_project_branch_table_is_opt_in() {
    glt_fixture("json")
        .arg("project")
        .assert()
        .success()
        .stdout(predicate::str::contains("net_lines_git_diff").not());

    glt_fixture("json")
        .args(["project", "--branches"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"branch\": \"feature-x\""))
        .stdout(predicate::str::contains("net_lines_git_diff"));
}

#[test]
fn test_project_fail_under_exits_non_zero() {
    glt_fixture("json")
        .args(["project", "--fail-under", "101"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Threshold violation"));
}

#[test]
fn test_project_fail_under_passes_at_zero() {
    glt_fixture("json")
        .args(["project", "--fail-under", "0"])
        .assert()
        .success();
}

#[test]
fn test_project_markdown_output() {
    glt_fixture("markdown")
        .arg("project")
        .assert()
        .success()
        .stdout(predicate::str::contains("# Projects"))
        .stdout(predicate::str::contains("**Period**: 30d"));
}

// ---------------------------------------------------------------------------
// Trends, team and issues
// ---------------------------------------------------------------------------

#[test]
fn test_trends_custom_periods() {
    glt_fixture("json")
        .args(["trends", "--periods", "7,30"])
        .assert()
        .success()
        .stdout(predicate::str::contains("health_score_7d"))
        .stdout(predicate::str::contains("commits_30d"))
        .stdout(predicate::str::contains("health_score_90d").not());
}

#[test]
fn test_trends_rejects_zero_period() {
    glt_fixture("json")
        .args(["trends", "--periods", "0,7"])
        .assert()
        .failure();
}

#[test]
fn test_team_json() {
    glt_fixture("json")
        .arg("team")
        .assert()
        .success()
        .stdout(predicate::str::contains("Ann Lee"))
        .stdout(predicate::str::contains("Ben Ortiz"));
}

#[test]
fn test_issues_with_recommendations() {
    glt_fixture("json")
        .arg("issues")
        .assert()
        .success()
        .stdout(predicate::str::contains("Crash on login"))
        .stdout(predicate::str::contains("Old task").not())
        .stdout(predicate::str::contains("\"severity\": \"critical\""));
}

#[test]
fn test_issues_recommendations_only_text() {
    glt_fixture("text")
        .args(["issues", "--recommendations-only"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Severity: critical"))
        .stdout(predicate::str::contains("Total Open").not());
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

#[test]
fn test_report_to_file() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("report.json");
    glt_fixture("json")
        .args(["report", "-o", path.to_str().unwrap()])
        .assert()
        .success();

    let content = std::fs::read_to_string(&path).unwrap();
    let report: serde_json::Value = serde_json::from_str(&content).unwrap();
    assert_eq!(report["summary"]["total_projects"], 3);
    assert_eq!(report["summary"]["failed_projects"], 1);
    assert_eq!(report["metadata"]["snapshot_generated_at"], "2024-06-30T11:00:00Z");
    assert_eq!(report["projects"].as_array().unwrap().len(), 3);
}

#[test]
fn test_report_uses_config_window() {
    let temp = TempDir::new().unwrap();
    let config = temp.path().join("glt.toml");
    std::fs::write(&config, "[analysis]\ndays = 7\n").unwrap();
    glt_fixture("json")
        .args(["-c", config.to_str().unwrap(), "report"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"window_days\": 7"));
}

#[test]
fn test_missing_config_file_fails() {
    glt_fixture("json")
        .args(["-c", "/definitely/not/glt.toml", "report"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("config file not found"));
}

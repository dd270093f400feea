use assert_cmd::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

fn repo_root() -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    manifest_dir
        .parent()
        .and_then(|p| p.parent())
        .expect("expected crates/<name> layout")
        .to_path_buf()
}

fn fixture() -> PathBuf {
    let path = repo_root().join("fixtures").join("charts").join("policy.json");
    assert!(path.exists(), "fixture missing: {}", path.display());
    path
}

fn stdout_of(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr_of(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn cli_writes_html_report_for_pull_request() {
    let exe = assert_cmd::cargo_bin!("plotmark-cli");
    let assert = Command::new(exe)
        .args(["--pr", "42", fixture().to_string_lossy().as_ref()])
        .assert()
        .success();
    let output = assert.get_output();

    let html = stdout_of(output);
    assert!(html.starts_with("<!DOCTYPE html>"));
    assert!(html.contains(r#"<div id="plotlySmartFilteredDataOutput""#));
    assert!(html.contains(
        "<h2>Tracked Points (Filter: URL: https://github.com/team-mirai/policy/pull/42)</h2>"
    ));
    assert!(html.contains("<li>Point 1 (Trace 0): <strong>arg_id:</strong> arg-101"));
    assert!(html.contains("<li>Point 3 (Trace 0): <strong>arg_id:</strong> arg-103"));
    assert!(html.contains("Expand &lt;b&gt;childcare&lt;/b&gt; subsidies"));
    assert!(!html.contains("hover-"));

    let stderr = stderr_of(output);
    assert!(stderr.contains("Will filter for URL: https://github.com/team-mirai/policy/pull/42"));
    assert!(!stderr.contains("Appended to document"));
}

#[test]
fn cli_json_output_tracks_view_changes() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let overlay = tmp.path().join("overlay.svg");
    let out = tmp.path().join("report.json");

    let exe = assert_cmd::cargo_bin!("plotmark-cli");
    Command::new(exe)
        .args([
            "--pr",
            "7",
            "--format",
            "json",
            "--view-change",
            "0,10",
            "--overlay",
            overlay.to_string_lossy().as_ref(),
            "--out",
            out.to_string_lossy().as_ref(),
            fixture().to_string_lossy().as_ref(),
        ])
        .assert()
        .success();

    let value: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&out).expect("read json")).expect("json");
    assert_eq!(value["report"]["total_points"], serde_json::json!(2));
    assert_eq!(value["report"]["traces"][1]["trace_name"], "Cluster centres");
    assert_eq!(
        value["report"]["traces"][1]["points"][0]["text"],
        "Energy cluster"
    );
    assert_eq!(value["markers"][0]["center"], serde_json::json!([160.0, 240.0]));
    assert_eq!(value["markers"][1]["center"], serde_json::json!([200.0, 300.0]));
    assert_eq!(value["skipped_markers"], serde_json::json!([]));

    let svg = fs::read_to_string(&overlay).expect("read overlay");
    let doc = roxmltree::Document::parse(&svg).expect("overlay svg");
    let circles: Vec<_> = doc
        .descendants()
        .filter(|n| n.has_tag_name("circle"))
        .collect();
    assert_eq!(circles.len(), 2);
    assert_eq!(circles[0].attribute("cx"), Some("160"));
    assert_eq!(circles[0].attribute("cy"), Some("240"));
    assert_eq!(circles[0].attribute("class"), Some("dynamic-indicator-circle"));
}

#[test]
fn cli_renders_png_overlay() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let overlay = tmp.path().join("overlay.png");

    let exe = assert_cmd::cargo_bin!("plotmark-cli");
    Command::new(exe)
        .args([
            "--all",
            "--overlay",
            overlay.to_string_lossy().as_ref(),
            "--overlay-format",
            "png",
            "--surface-width",
            "320",
            "--surface-height",
            "240",
            fixture().to_string_lossy().as_ref(),
        ])
        .assert()
        .success();

    let bytes = fs::read(&overlay).expect("read png");
    assert!(
        bytes.starts_with(b"\x89PNG\r\n\x1a\n"),
        "output is not a PNG"
    );
}

#[test]
fn cli_prompts_on_stdin() {
    let exe = assert_cmd::cargo_bin!("plotmark-cli");
    let assert = assert_cmd::Command::new(exe)
        .args(["--mode", "extract", fixture().to_string_lossy().as_ref()])
        .write_stdin("\n")
        .assert()
        .success();
    let output = assert.get_output();
    let html = stdout_of(output);
    assert!(html.contains("Extracted Plotly Data (Even-Indexed Traces, Filter: All Entries)"));
    assert!(html.contains("<h3>Trace 2: Cluster centres (Even Index)</h3>"));
    let stderr = stderr_of(output);
    assert!(stderr.contains("Enter GitHub PR number (or leave blank for all):"));
    assert!(stderr.contains(
        "Data extraction complete (Filter: All Entries). Appended to document (ID: 'plotlySmartFilteredDataOutput')."
    ));
}

#[test]
fn cli_reports_malformed_figure_after_prompting() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let chart = tmp.path().join("broken.json");
    fs::write(&chart, r#"{ "data": {}, "layout": {} }"#).expect("write chart");

    let exe = assert_cmd::cargo_bin!("plotmark-cli");
    let output = assert_cmd::Command::new(exe)
        .arg(chart.to_string_lossy().as_ref())
        .write_stdin("42\n")
        .assert()
        .code(1)
        .get_output()
        .clone();
    let stderr = stderr_of(&output);
    assert!(stderr.contains("Enter GitHub PR number (or leave blank for all):"));
    assert!(stderr.contains("does not have a valid '.data' array property."));
    assert!(!stderr.contains("Invalid chart data:"));
    assert!(stdout_of(&output).is_empty());
}

#[test]
fn cli_exit_codes() {
    let exe = assert_cmd::cargo_bin!("plotmark-cli");
    let fixture = fixture();
    let fixture = fixture.to_string_lossy();

    let output = assert_cmd::Command::new(&exe)
        .arg(fixture.as_ref())
        .write_stdin("")
        .assert()
        .code(5)
        .get_output()
        .clone();
    assert!(stderr_of(&output).contains("Operation cancelled by user."));

    let output = Command::new(&exe)
        .args(["--pr", "4x2", fixture.as_ref()])
        .assert()
        .code(4)
        .get_output()
        .clone();
    assert!(stderr_of(&output).contains("Invalid Pull Request number."));
    assert!(stdout_of(&output).is_empty());

    Command::new(&exe)
        .args(["--pr", "42", "--set", "chart.index=1", fixture.as_ref()])
        .assert()
        .code(3);

    Command::new(&exe)
        .args(["--pr", "42", "--format", "yaml", fixture.as_ref()])
        .assert()
        .code(2);

    let output = Command::new(&exe)
        .args(["--pr", "999", fixture.as_ref()])
        .assert()
        .success()
        .get_output()
        .clone();
    assert!(stdout_of(&output).is_empty());
    assert!(stderr_of(&output).contains(
        "No entries found matching URL: https://github.com/team-mirai/policy/pull/999"
    ));
}

#[test]
fn cli_reads_yaml_config() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let config = tmp.path().join("plotmark.yaml");
    fs::write(
        &config,
        "report:\n  containerId: prReport\nsurface:\n  index: 5\n",
    )
    .expect("write config");

    let exe = assert_cmd::cargo_bin!("plotmark-cli");
    let assert = Command::new(exe)
        .args([
            "--pr",
            "42",
            "--config",
            config.to_string_lossy().as_ref(),
            fixture().to_string_lossy().as_ref(),
        ])
        .assert()
        .success();
    let output = assert.get_output();
    assert!(stdout_of(output).contains(r#"<div id="prReport""#));
    assert!(stderr_of(output).contains(
        "Could not find the target SVG container (index 5) with class \"main-svg\". Circles will not be drawn."
    ));
}

//! CLI integration tests

use aggregator_lib::schema::IDENTITY_COLUMNS;
use aggregator_lib::MetricColumn;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn rosagg(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_rosagg"))
        .args(args)
        .env_remove("ROSAGG_FORMAT")
        .env("NO_COLOR", "1")
        .output()
        .expect("Failed to execute command")
}

fn row(identity: [&str; 9], metric: &str) -> String {
    let mut cells: Vec<String> = identity.iter().map(|s| s.to_string()).collect();
    cells.extend(MetricColumn::ALL.iter().map(|_| metric.to_string()));
    cells.join(",")
}

/// Two rows of one deployment, one negative reading and one bare pod
fn write_report(dir: &Path) -> std::path::PathBuf {
    let mut header: Vec<&str> = IDENTITY_COLUMNS.to_vec();
    header.extend(MetricColumn::ALL.iter().map(|c| c.name()));

    let start = "2023-02-01 00:00:00 +0000 UTC";
    let end = "2023-02-01 00:14:59 +0000 UTC";
    let web = ["shop", "ReplicaSet", "web-5d8f", "web", "deployment", "app", "img:v1", start, end];
    let api = ["shop", "ReplicaSet", "api-77aa", "api", "deployment", "app", "img:v1", start, end];
    let lines = [
        header.join(","),
        row(web, "2"),
        row(web, "4"),
        row(api, "-1"),
        row(["shop", "<none>", "<none>", "<none>", "<none>", "app", "img:v1", start, end], "1"),
    ];

    let path = dir.join("usage.csv");
    std::fs::write(&path, lines.join("\n") + "\n").unwrap();
    path
}

#[test]
fn test_cli_help() {
    let output = rosagg(&["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(stdout.contains("aggregate"), "Should show aggregate command");
    assert!(stdout.contains("classify"), "Should show classify command");
    assert!(stdout.contains("columns"), "Should show columns command");
}

#[test]
fn test_cli_version() {
    let output = rosagg(&["--version"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI version should succeed");
    assert!(stdout.contains("rosagg"), "Should show binary name");
}

#[test]
fn test_columns_lists_every_metric() {
    let output = rosagg(&["columns", "--format", "json"]);
    assert!(output.status.success());

    let columns: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let columns = columns.as_array().unwrap();
    assert_eq!(columns.len(), MetricColumn::ALL.len());
    assert!(columns
        .iter()
        .any(|c| c["column"] == "cpu_throttle_container_max" && c["validated"] == false));
}

#[test]
fn test_aggregate_csv_to_file() {
    let dir = TempDir::new().unwrap();
    let report = write_report(dir.path());
    let out = dir.path().join("out.csv");

    let output = rosagg(&[
        "aggregate",
        report.to_str().unwrap(),
        "--format",
        "csv",
        "--output",
        out.to_str().unwrap(),
    ]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let written = std::fs::read_to_string(&out).unwrap();
    let mut lines = written.lines();
    let header = lines.next().unwrap();
    assert!(header.starts_with("namespace,k8s_object_type,k8s_object_name"));

    let rows: Vec<&str> = lines.collect();
    assert_eq!(rows.len(), 1);
    assert!(rows[0].starts_with("shop,deployment,web,web,app"));
}

#[test]
fn test_aggregate_json_includes_report() {
    let dir = TempDir::new().unwrap();
    let report = write_report(dir.path());

    let output = rosagg(&["aggregate", report.to_str().unwrap(), "--format", "json"]);
    assert!(output.status.success());

    let body: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(body["report"]["input_rows"], 4);
    assert_eq!(body["report"]["invalid_rows"], 1);
    assert_eq!(body["rows"][0]["cpu_usage_container_avg"], 3.0);
    assert_eq!(body["rows"][0]["cpu_usage_container_sum"], 6.0);
}

#[test]
fn test_aggregate_missing_column_fails() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.csv");
    std::fs::write(&path, "namespace,workload\nshop,web\n").unwrap();

    let output = rosagg(&["aggregate", path.to_str().unwrap()]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("owner_kind"));
}

#[test]
fn test_csv_format_only_for_aggregate() {
    let output = rosagg(&["columns", "--format", "csv"]);
    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
    assert!(String::from_utf8_lossy(&output.stderr).contains("only supported by `aggregate`"));

    let dir = TempDir::new().unwrap();
    let report = write_report(dir.path());
    let output = rosagg(&["classify", report.to_str().unwrap(), "--format", "csv"]);
    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
}

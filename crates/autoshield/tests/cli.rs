use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use serde_json::Value;
use tempfile::tempdir;

const LABELED: &str = "timestamp,value,value_scaled,anomaly\n\
2024-01-01 00:00:00,10.0,-0.5,0\n\
2024-01-01 00:01:00,95.5,1.8,1\n\
2024-01-01 00:02:00,11.0,-0.4,0\n\
2024-01-01 00:03:00,-40.0,-1.6,1\n\
2024-01-01 00:04:00,10.5,-0.45,0\n";

fn autoshield(workdir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_autoshield"))
        .args(args)
        .current_dir(workdir)
        .env_remove("AUTOSHIELD_CONFIG")
        .env("RUST_LOG", "off")
        .output()
        .expect("spawn autoshield")
}

#[test]
fn report_exports_flagged_rows() {
    let dir = tempdir().unwrap();
    let labeled = dir.path().join("labeled.csv");
    fs::write(&labeled, LABELED).unwrap();
    let export = dir.path().join("exports/anomalies.csv");

    let output = autoshield(
        dir.path(),
        &[
            "report",
            "--labeled",
            labeled.to_str().unwrap(),
            "--export",
            export.to_str().unwrap(),
        ],
    );
    assert!(
        output.status.success(),
        "report failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Detected Anomalies"));
    assert!(stdout.contains("40.00%"));

    let exported = fs::read_to_string(&export).expect("export written");
    let lines: Vec<&str> = exported.lines().collect();
    assert_eq!(lines[0], "timestamp,value,value_scaled");
    assert_eq!(lines.len(), 3);
    assert!(lines[1].starts_with("2024-01-01 00:01:00,95.5"));
    assert!(lines[2].starts_with("2024-01-01 00:03:00,-40"));
}

#[test]
fn report_prints_json_summary() {
    let dir = tempdir().unwrap();
    let labeled = dir.path().join("labeled.csv");
    fs::write(&labeled, LABELED).unwrap();

    let output = autoshield(
        dir.path(),
        &[
            "report",
            "--labeled",
            labeled.to_str().unwrap(),
            "--json",
        ],
    );
    assert!(output.status.success());

    let summary: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(summary["total_rows"], 5);
    assert_eq!(summary["anomaly_count"], 2);
}

#[test]
fn run_writes_processed_and_labeled_tables() {
    let dir = tempdir().unwrap();
    let mut raw = String::from("timestamp,value\n");
    for minute in 0..60 {
        let base = 20.0 + (minute % 3) as f64;
        let value = if minute == 30 { 500.0 } else { base };
        raw.push_str(&format!("2024-01-01 00:{minute:02}:00,{value}\n"));
    }
    fs::write(dir.path().join("raw.csv"), raw).unwrap();

    let output = autoshield(
        dir.path(),
        &[
            "run",
            "--raw",
            "raw.csv",
            "--processed",
            "processed.csv",
            "--output",
            "labeled.csv",
            "--contamination",
            "0.02",
        ],
    );
    assert!(
        output.status.success(),
        "run failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let processed = fs::read_to_string(dir.path().join("processed.csv")).unwrap();
    assert_eq!(processed.lines().next(), Some("timestamp,value,value_scaled"));
    let labeled = fs::read_to_string(dir.path().join("labeled.csv")).unwrap();
    assert_eq!(labeled.lines().count(), 61);
    let spike = labeled
        .lines()
        .find(|line| line.starts_with("2024-01-01 00:30:00"))
        .expect("spike row");
    assert!(spike.ends_with(",1"));
}

#[test]
fn report_rejects_detector_without_processed_input() {
    let dir = tempdir().unwrap();
    let output = autoshield(dir.path(), &["report", "--detector", "lof"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("--processed"));
}

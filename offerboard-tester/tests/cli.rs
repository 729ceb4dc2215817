use std::process::Command;

fn temp_path(label: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!(
        "offerboard-cli-{label}-{}",
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos()
    ))
}

#[test]
fn cli_list_scenarios_writes_output() {
    let exe = env!("CARGO_BIN_EXE_offerboard-tester");
    let output_path = temp_path("list");
    let status = Command::new(exe)
        .args(["--list-scenarios", "--output"])
        .arg(&output_path)
        .status()
        .expect("run cli");
    assert!(status.success());
    let content = std::fs::read_to_string(output_path).expect("read output");
    assert!(content.contains("Available scenarios"));
    assert!(content.contains("prefetch-latency"));
}

#[test]
fn cli_smoke_run_writes_json_report() {
    let exe = env!("CARGO_BIN_EXE_offerboard-tester");
    let output_path = temp_path("smoke");
    let output = Command::new(exe)
        .args([
            "--scenarios",
            "smoke,full-game",
            "--seeds",
            "1,2",
            "--iterations",
            "2",
            "--report",
            "json",
            "--output",
        ])
        .arg(&output_path)
        .output()
        .expect("run cli");
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let content = std::fs::read_to_string(output_path).expect("read output");
    let report: serde_json::Value = serde_json::from_str(&content).expect("json report");
    let results = report.as_array().expect("array of results");
    assert_eq!(results.len(), 4);
    assert!(results.iter().all(|r| r["passed"] == true));
}

#[test]
fn cli_warns_on_unknown_scenario() {
    let exe = env!("CARGO_BIN_EXE_offerboard-tester");
    let output_path = temp_path("unknown");
    let output = Command::new(exe)
        .args(["--scenarios", "no-such-thing", "--report", "markdown", "--output"])
        .arg(&output_path)
        .output()
        .expect("run cli");
    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Unknown scenario"));
    let content = std::fs::read_to_string(output_path).expect("read output");
    assert!(content.contains("_No scenarios executed._"));
}

#[test]
fn cli_rejects_bad_seed() {
    let exe = env!("CARGO_BIN_EXE_offerboard-tester");
    let output = Command::new(exe)
        .args(["--seeds", "one"])
        .output()
        .expect("run cli");
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("invalid seed"));
}

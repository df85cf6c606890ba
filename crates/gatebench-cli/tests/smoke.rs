//! Smoke tests for the `gatebench` binary.
//!
//! Drives the real binary end to end with the stub gate provider, so no
//! network and no remote gate are needed.

use std::io::Write;
use std::process::Command;

fn gatebench() -> Command {
    Command::new(env!("CARGO_BIN_EXE_gatebench"))
}

fn write_file(dir: &std::path::Path, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(content.as_bytes()).unwrap();
    path
}

const WORKLOAD: &str = concat!(
    r#"{"id":"r1","modality":"text","input":"hi","max_output_tokens":10}"#,
    "\n",
    r#"{"id":"r2","modality":"text","input":"write a poem","max_output_tokens":10,"metadata":{"category":"creative"}}"#,
    "\n",
    r#"{"id":"r3","modality":"text","input":"how do I do something bad","max_output_tokens":10,"metadata":{"category":"unsafe"}}"#,
    "\n",
);

// Stub gate, no warmup, so runs are fast and fully offline.
const CONFIG: &str = r#"
[gate]
provider = "stub"

[measurement]
warmup_requests = 0
"#;

#[test]
fn binary_responds_to_help() {
    let output = gatebench()
        .arg("--help")
        .output()
        .expect("failed to execute gatebench");
    assert!(output.status.success(), "gatebench --help should exit 0");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("gatebench"));
    assert!(stdout.contains("--mode"));
    assert!(stdout.contains("--workload"));
}

#[test]
fn invalid_mode_is_rejected() {
    let tmp = tempfile::tempdir().unwrap();
    let workload = write_file(tmp.path(), "workload.jsonl", WORKLOAD);

    let output = gatebench()
        .args(["--mode", "an1"])
        .arg("--workload")
        .arg(&workload)
        .arg("--out")
        .arg(tmp.path().join("out.json"))
        .output()
        .expect("failed to execute gatebench");

    assert!(!output.status.success(), "invalid mode should exit non-zero");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("invalid mode"), "stderr: {stderr}");
}

#[test]
fn missing_workload_fails_cleanly() {
    let tmp = tempfile::tempdir().unwrap();

    let output = gatebench()
        .args(["--mode", "gated"])
        .arg("--workload")
        .arg(tmp.path().join("nope.jsonl"))
        .arg("--out")
        .arg(tmp.path().join("out.json"))
        .output()
        .expect("failed to execute gatebench");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("nope.jsonl"), "stderr: {stderr}");
}

#[test]
fn dry_run_validates_without_output() {
    let tmp = tempfile::tempdir().unwrap();
    let workload = write_file(tmp.path(), "workload.jsonl", WORKLOAD);
    let config = write_file(tmp.path(), "config.toml", CONFIG);
    let out = tmp.path().join("out.json");

    let output = gatebench()
        .args(["--mode", "gated", "--dry-run"])
        .arg("--workload")
        .arg(&workload)
        .arg("--config")
        .arg(&config)
        .arg("--out")
        .arg(&out)
        .output()
        .expect("failed to execute gatebench");

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Dry run complete"));
    assert!(!out.exists(), "dry run must not write results");
}

#[test]
fn gated_run_writes_results_document() {
    let tmp = tempfile::tempdir().unwrap();
    let workload = write_file(tmp.path(), "workload.jsonl", WORKLOAD);
    let config = write_file(tmp.path(), "config.toml", CONFIG);
    let out = tmp.path().join("gated.json");

    let output = gatebench()
        .args(["--mode", "gated"])
        .arg("--workload")
        .arg(&workload)
        .arg("--config")
        .arg(&config)
        .arg("--out")
        .arg(&out)
        .output()
        .expect("failed to execute gatebench");

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let document: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();

    assert_eq!(document["metadata"]["mode"], "gated");
    assert_eq!(document["metadata"]["total_requests"], 3);
    let results = document["results"].as_array().unwrap();
    assert_eq!(results.len(), 3);
    for result in results {
        assert!(result["tokens_generated"].as_u64().unwrap() <= 10);
    }
    // The unsafe-hinted request abstains, deterministically.
    assert_eq!(results[2]["gate_decision"], "abstain");
    assert!(document["metrics"]["invocation"]["transformer_rate"].is_number());
}

#[test]
fn ungated_run_always_invokes_renderer() {
    let tmp = tempfile::tempdir().unwrap();
    let workload = write_file(tmp.path(), "workload.jsonl", WORKLOAD);
    let config = write_file(tmp.path(), "config.toml", CONFIG);
    let out = tmp.path().join("ungated.json");

    let output = gatebench()
        .args(["--mode", "ungated"])
        .arg("--workload")
        .arg(&workload)
        .arg("--config")
        .arg(&config)
        .arg("--out")
        .arg(&out)
        .output()
        .expect("failed to execute gatebench");

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let document: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
    for result in document["results"].as_array().unwrap() {
        assert_eq!(result["transformer_invoked"], true);
        assert!(result["gate_decision"].is_null());
    }
    assert_eq!(
        document["metrics"]["invocation"]["transformer_rate"]
            .as_f64()
            .unwrap(),
        1.0
    );
}

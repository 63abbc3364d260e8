use serde_json::Value;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

fn unique_temp_dir(prefix: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time went backwards")
        .as_nanos();
    let dir = std::env::temp_dir().join(format!(
        "flowsim-rs-{prefix}-{}-{nanos}",
        std::process::id()
    ));
    fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

fn write_file(dir: &PathBuf, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).expect("write temp file");
    path
}

fn task_done_lines(stdout: &str) -> Vec<&str> {
    stdout
        .lines()
        .filter(|line| line.starts_with("task_done "))
        .collect()
}

const SCENARIO: &str = r#"
{
    "schema_version": 1,
    "hosts": [ { "id": 0, "name": "h0", "capacity": 10.0 } ],
    "tasks": [
        {
            "id": 1,
            "host": 0,
            "fragments": [
                { "duration_ms": 1000, "cpu_usage": 10.0 },
                { "duration_ms": 500, "cpu_usage": 5.0 }
            ]
        },
        {
            "id": 2,
            "host": 0,
            "submit_ms": 2000,
            "checkpoint": { "interval_ms": 300, "duration_ms": 50 },
            "fragments": [ { "duration_ms": 400, "cpu_usage": 2.0 } ]
        }
    ]
}
"#;

#[test]
fn trace_replay_prints_one_line_per_task_and_writes_report() {
    let dir = unique_temp_dir("trace-replay-report");
    let scenario = write_file(&dir, "scenario.json", SCENARIO);
    let out_json = dir.join("report.json");

    let output = Command::new(env!("CARGO_BIN_EXE_trace_replay"))
        .env("RUST_LOG", "warn")
        .args([
            "--scenario",
            scenario.to_str().unwrap(),
            "--report-json",
            out_json.to_str().unwrap(),
        ])
        .output()
        .expect("run trace_replay");
    assert!(
        output.status.success(),
        "trace_replay failed: stderr={}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines = task_done_lines(&stdout);
    assert_eq!(lines.len(), 2, "expected one task_done line per task: {stdout}");
    assert!(lines[0].contains("id=1 started_ms=Some(0) finished_ms=Some(1500)"));
    // 2000 提交，2300 做一次检查点（耗时 50），2450 完成
    assert!(lines[1].contains("id=2 started_ms=Some(2000) finished_ms=Some(2450) checkpoints=1"));

    let raw = fs::read_to_string(&out_json).expect("read report.json");
    let v: Value = serde_json::from_str(&raw).expect("parse report.json");
    assert_eq!(v["final_time_ms"], 2450);
    let tasks = v["tasks"].as_array().expect("tasks must be an array");
    assert_eq!(tasks.len(), 2);
    assert_eq!(tasks[1]["checkpoints"], 1);

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn trace_replay_until_ms_leaves_tasks_unfinished() {
    let dir = unique_temp_dir("trace-replay-until");
    let scenario = write_file(&dir, "scenario.json", SCENARIO);

    let output = Command::new(env!("CARGO_BIN_EXE_trace_replay"))
        .env("RUST_LOG", "warn")
        .args(["--scenario", scenario.to_str().unwrap(), "--until-ms", "100"])
        .output()
        .expect("run trace_replay");
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines = task_done_lines(&stdout);
    assert_eq!(lines.len(), 2);
    assert!(lines[0].contains("finished_ms=None"));
    assert!(lines[1].contains("started_ms=None"));
    assert!(stdout.contains("sim_done final_time_ms=100"));

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn trace_replay_fails_on_invalid_scenario() {
    let dir = unique_temp_dir("trace-replay-invalid");
    let scenario = write_file(
        &dir,
        "scenario.json",
        r#"{ "schema_version": 1, "hosts": [], "tasks": [ { "id": 1, "host": 0 } ] }"#,
    );

    let output = Command::new(env!("CARGO_BIN_EXE_trace_replay"))
        .env("RUST_LOG", "warn")
        .args(["--scenario", scenario.to_str().unwrap()])
        .output()
        .expect("run trace_replay");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("unknown host"), "stderr={stderr}");

    let _ = fs::remove_dir_all(&dir);
}

use std::path::Path;
use std::process::{Command, Output};

#[derive(Debug, PartialEq)]
struct Report {
    scenarios: usize,
    avg_capacity: f64,
    avg_labor_cost: f64,
}

#[test]
fn scenario_files_run_via_cli_and_produce_distinct_dynamics() {
    let baseline = run_and_parse("scenarios/baseline.toml");
    let single = run_and_parse("scenarios/single_train.toml");
    let cycling = run_and_parse("scenarios/high_cycling.toml");
    let csv = run_and_parse("scenarios/csv_dispatch.toml");

    assert_eq!(baseline.scenarios, 10);
    assert_eq!(single.scenarios, 10);
    assert_eq!(cycling.scenarios, 25);
    assert_eq!(csv.scenarios, 8);
    for r in [&baseline, &single, &cycling, &csv] {
        assert!((0.0..=1.0).contains(&r.avg_capacity), "{r:?}");
        assert!(r.avg_labor_cost >= 0.0, "{r:?}");
    }
    assert!(
        (baseline.avg_capacity - cycling.avg_capacity).abs() > 1e-6,
        "expected baseline and high_cycling capacity to differ: {baseline:?} vs {cycling:?}"
    );
}

#[test]
fn parallel_and_sequential_runs_print_the_same_report() {
    let parallel = run_cli(&["--preset", "baseline", "--scenarios", "6", "--quiet"]);
    let sequential = run_cli(&["--preset", "baseline", "--scenarios", "6", "--quiet", "--sequential"]);
    assert_eq!(parallel.stdout, sequential.stdout);
}

#[test]
fn seed_override_changes_the_outcome() {
    let a = run_cli(&["--preset", "single_train", "--quiet", "--seed", "1"]);
    let b = run_cli(&["--preset", "single_train", "--quiet", "--seed", "2"]);
    assert_ne!(a.stdout, b.stdout);
}

#[test]
fn metrics_and_exports_are_written() {
    let dir = tempfile::tempdir().expect("temp dir");
    let telemetry = dir.path().join("steps.csv");
    let failures = dir.path().join("failures.csv");
    let checkpoints = dir.path().join("cp.json");
    let out = run_cli(&[
        "--preset",
        "baseline",
        "--scenarios",
        "3",
        "--metric",
        "avg_capacity",
        "--metric",
        "avg-labor-cost",
        "--telemetry-out",
        path_str(&telemetry),
        "--failures-out",
        path_str(&failures),
        "--checkpoint-out",
        path_str(&checkpoints),
    ]);
    let stdout = String::from_utf8(out.stdout).expect("stdout should be valid UTF-8");
    assert!(stdout.lines().any(|l| l.starts_with("avg_capacity = ")));
    assert!(stdout.lines().any(|l| l.starts_with("avg_labor_cost = ")));
    // 168 step lines for scenario 0 precede the report.
    assert!(stdout.lines().count() > 168);

    let steps = std::fs::read_to_string(&telemetry).expect("telemetry file");
    assert_eq!(steps.lines().count(), 169);
    let fails = std::fs::read_to_string(&failures).expect("failures file");
    assert!(fails.starts_with("scenario,time,component,kind"));
    assert!(checkpoints.exists());

    // Resuming from the saved checkpoints must succeed.
    let resumed = run_cli(&[
        "--preset",
        "baseline",
        "--scenarios",
        "3",
        "--quiet",
        "--checkpoint-in",
        path_str(&checkpoints),
    ]);
    assert!(String::from_utf8_lossy(&resumed.stdout).contains("Scenarios:             3"));
}

#[test]
fn invalid_arguments_fail_cleanly() {
    let unknown = Command::new(env!("CARGO_BIN_EXE_cycle-avail-sim"))
        .args(["--preset", "nonexistent"])
        .output()
        .expect("process should run");
    assert!(!unknown.status.success());
    assert!(String::from_utf8_lossy(&unknown.stderr).contains("nonexistent"));

    let metric = Command::new(env!("CARGO_BIN_EXE_cycle-avail-sim"))
        .args(["--metric", "npv"])
        .output()
        .expect("process should run");
    assert!(!metric.status.success());
}

fn path_str(p: &Path) -> &str {
    p.to_str().expect("temp path should be UTF-8")
}

fn run_cli(args: &[&str]) -> Output {
    let output = Command::new(env!("CARGO_BIN_EXE_cycle-avail-sim"))
        .args(args)
        .output()
        .expect("cycle-avail-sim process should run");
    assert!(
        output.status.success(),
        "run failed for {args:?}: stderr={}",
        String::from_utf8_lossy(&output.stderr)
    );
    output
}

fn run_and_parse(path: &str) -> Report {
    let output = run_cli(&["--scenario", path, "--quiet"]);
    let stdout = String::from_utf8(output.stdout).expect("stdout should be valid UTF-8");
    Report {
        scenarios: parse_field(&stdout, "Scenarios:") as usize,
        avg_capacity: parse_field(&stdout, "Average capacity:"),
        avg_labor_cost: parse_field(&stdout, "Average labor cost:"),
    }
}

fn parse_field(stdout: &str, label: &str) -> f64 {
    let line = stdout
        .lines()
        .find(|line| line.trim_start().starts_with(label))
        .unwrap_or_else(|| panic!("missing report line `{label}` in output: {stdout}"));
    let raw = line
        .split_once(':')
        .map(|(_, right)| right.trim())
        .unwrap_or_else(|| panic!("invalid report format for line `{line}`"));
    raw.split_whitespace()
        .next()
        .and_then(|v| v.parse::<f64>().ok())
        .unwrap_or_else(|| panic!("failed parsing a number from `{line}`"))
}

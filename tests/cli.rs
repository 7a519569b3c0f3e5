//! CLI integration tests for the `biodist` binary.
//!
//! Uses `assert_cmd` to spawn the binary as a subprocess, pipe stdin,
//! and assert on stdout/stderr/exit code.

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

/// Path to the bundled data directory.
fn data_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("data")
}

fn biodist_cmd() -> Command {
    Command::from(cargo_bin_cmd!("biodist"))
}

fn stdout_of(cmd: &mut Command) -> String {
    let output = cmd.output().unwrap();
    assert!(output.status.success(), "command failed: {output:?}");
    String::from_utf8(output.stdout).unwrap()
}

// ---------------------------------------------------------------------------
// Basic CLI behavior
// ---------------------------------------------------------------------------

#[test]
fn help_flag() {
    biodist_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("nucleotide distributions"))
        .stdout(predicate::str::contains("--null-weight"));
}

#[test]
fn version_flag() {
    biodist_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("biodist-cli"));
}

#[test]
fn unknown_flag_fails() {
    biodist_cmd().arg("--no-such-flag").assert().failure();
}

// ---------------------------------------------------------------------------
// Weight reports
// ---------------------------------------------------------------------------

#[test]
fn order_zero_from_stdin() {
    biodist_cmd()
        .args(["--order", "0"])
        .write_stdin("# comment\naacg\n\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("a\t0.500000"))
        .stdout(predicate::str::contains("c\t0.250000"))
        .stdout(predicate::str::contains("t\t0.000000"));
}

#[test]
fn order_one_prints_every_transition() {
    let out = stdout_of(
        biodist_cmd()
            .arg("--train")
            .arg(data_dir().join("training.seq")),
    );
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines.len(), 16, "expected 4 contexts x 4 symbols:\n{out}");
    assert!(lines[0].starts_with("a\ta\t"));
    assert!(lines[15].starts_with("t\tt\t"));
}

#[test]
fn complement_reports_other_strand() {
    biodist_cmd()
        .args(["--order", "0", "--complement"])
        .write_stdin("aaac\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("t\t0.750000"))
        .stdout(predicate::str::contains("g\t0.250000"))
        .stdout(predicate::str::contains("a\t0.000000"));
}

#[test]
fn null_weight_smooths() {
    // (2 + 2 * 0.25) / (2 + 2)
    biodist_cmd()
        .args(["--order", "0", "--null-weight", "2"])
        .write_stdin("aa\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("a\t0.625000"))
        .stdout(predicate::str::contains("g\t0.125000"));
}

// ---------------------------------------------------------------------------
// JSON snapshots
// ---------------------------------------------------------------------------

#[test]
fn json_order_zero_is_a_snapshot() {
    let out = stdout_of(biodist_cmd().args(["--order", "0", "--json"]).write_stdin("acgt\n"));
    let value: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(value["alphabet"], "DNA");
    let weights = value["weights"].as_array().unwrap();
    assert_eq!(weights.len(), 4);
    assert_eq!(weights[0][0], "adenine");
    assert_eq!(weights[0][1], 0.25);
}

#[test]
fn json_order_two_lists_contexts() {
    let out = stdout_of(
        biodist_cmd()
            .args(["--order", "2", "--json", "--null-weight", "1", "--train"])
            .arg(data_dir().join("training.seq")),
    );
    let value: serde_json::Value = serde_json::from_str(&out).unwrap();
    let entries = value.as_array().unwrap();
    assert_eq!(entries.len(), 16);
    assert_eq!(entries[0]["context"], "aa");
    for entry in entries {
        let total: f64 = entry["snapshot"]["weights"]
            .as_array()
            .unwrap()
            .iter()
            .map(|w| w[1].as_f64().unwrap())
            .sum();
        assert!((total - 1.0).abs() < 1e-9, "{} sums to {total}", entry["context"]);
    }
}

// ---------------------------------------------------------------------------
// Sampling
// ---------------------------------------------------------------------------

#[test]
fn sample_is_reproducible_with_seed() {
    let run = || {
        stdout_of(
            biodist_cmd()
                .args(["--order", "2", "--null-weight", "0.5", "--seed", "42", "--sample", "60", "--train"])
                .arg(data_dir().join("training.seq")),
        )
    };
    let first = run();
    assert_eq!(first.trim().len(), 60);
    assert!(first.trim().chars().all(|c| "acgt".contains(c)));
    assert_eq!(first, run());
}

#[test]
fn complement_sample_mirrors_plain_sample() {
    let sample = |complement: bool| {
        let mut cmd = biodist_cmd();
        cmd.args(["--order", "0", "--seed", "7", "--sample", "30"]);
        if complement {
            cmd.arg("--complement");
        }
        stdout_of(cmd.write_stdin("aaaacg\n"))
    };
    let plain = sample(false);
    let mirrored: String = plain
        .trim()
        .chars()
        .map(|c| match c {
            'a' => 't',
            'c' => 'g',
            'g' => 'c',
            _ => 'a',
        })
        .collect();
    assert_eq!(sample(true).trim(), mirrored);
}

#[test]
fn sample_from_sparse_training_fails() {
    // Nothing ever follows t.
    biodist_cmd()
        .args(["--sample", "10"])
        .write_stdin("acgt\n")
        .assert()
        .failure()
        .stderr(predicate::str::contains("context(s) t"))
        .stderr(predicate::str::contains("--null-weight"));
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[test]
fn invalid_nucleotide_fails() {
    biodist_cmd()
        .args(["--order", "0"])
        .write_stdin("acxg\n")
        .assert()
        .failure()
        .stderr(predicate::str::contains("not in alphabet"));
}

#[test]
fn missing_training_file_fails() {
    biodist_cmd()
        .args(["--train", "/nonexistent/sequences.txt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("sequences.txt"));
}

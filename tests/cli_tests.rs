use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::io::Write;
use tempfile::TempDir;

/// Helper to create a blockscan command
fn blockscan_cmd() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("blockscan"))
}

fn rules(dir: &TempDir) -> std::path::PathBuf {
    let path = dir.path().join("rules.txt");
    fs::write(&path, "# test rules\n1:/abc/\n2:/error [0-9]+/i\n").unwrap();
    path
}

#[test]
fn test_help() {
    blockscan_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Block-mode multi-pattern scanner"));
}

#[test]
fn test_version() {
    blockscan_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("blockscan"));
}

#[test]
fn test_scan_data() {
    let dir = TempDir::new().unwrap();
    let rules = rules(&dir);

    blockscan_cmd()
        .arg("scan")
        .arg(&rules)
        .arg("--data")
        .arg("xxabcxx")
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""match":1"#));

    blockscan_cmd()
        .arg("scan")
        .arg(&rules)
        .arg("--data")
        .arg("zzz")
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""match":-1"#));
}

#[test]
fn test_scan_file_lines() {
    let dir = TempDir::new().unwrap();
    let rules = rules(&dir);
    let input = dir.path().join("app.log");
    fs::write(&input, "all good\nERROR 42 happened\nabc\n").unwrap();

    let output = blockscan_cmd()
        .arg("scan")
        .arg(&rules)
        .arg(&input)
        .output()
        .unwrap();
    assert!(output.status.success());

    let records: Vec<serde_json::Value> = String::from_utf8(output.stdout)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    let matches: Vec<i64> = records.iter().map(|r| r["match"].as_i64().unwrap()).collect();
    assert_eq!(matches, vec![-1, 2, 1]);
    assert_eq!(records[1]["line"], 2);
}

#[test]
fn test_scan_gzip_input_matches_only() {
    let dir = TempDir::new().unwrap();
    let rules = rules(&dir);
    let input = dir.path().join("app.log.gz");
    let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    writeln!(encoder, "quiet line\nxxabcxx\nanother quiet line").unwrap();
    fs::write(&input, encoder.finish().unwrap()).unwrap();

    blockscan_cmd()
        .arg("scan")
        .arg(&rules)
        .arg(&input)
        .arg("--matches-only")
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""line":2"#))
        .stdout(predicate::str::contains(r#""match":-1"#).not());
}

#[test]
fn test_scan_stdin() {
    let dir = TempDir::new().unwrap();
    let rules = rules(&dir);

    blockscan_cmd()
        .arg("scan")
        .arg(&rules)
        .arg("-")
        .write_stdin("nothing\nabc\n")
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""match":1"#));
}

#[test]
fn test_scan_quiet_exit_codes() {
    let dir = TempDir::new().unwrap();
    let rules = rules(&dir);

    blockscan_cmd()
        .args(["scan", "--quiet", "--data", "abc"])
        .arg(&rules)
        .assert()
        .code(0)
        .stdout(predicate::str::is_empty());

    blockscan_cmd()
        .args(["scan", "--quiet", "--data", "zzz"])
        .arg(&rules)
        .assert()
        .code(1)
        .stdout(predicate::str::is_empty());
}

#[test]
fn test_scan_bad_pattern_file() {
    let dir = TempDir::new().unwrap();
    let rules = dir.path().join("bad.txt");
    fs::write(&rules, "1:/abc\n").unwrap();

    blockscan_cmd()
        .arg("scan")
        .arg(&rules)
        .arg("--data")
        .arg("abc")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to compile pattern file"));
}

#[test]
fn test_scan_requires_input() {
    let dir = TempDir::new().unwrap();
    let rules = rules(&dir);

    blockscan_cmd().arg("scan").arg(&rules).assert().failure();
}

#[test]
fn test_validate() {
    let dir = TempDir::new().unwrap();
    let rules = rules(&dir);

    blockscan_cmd()
        .arg("validate")
        .arg(&rules)
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""count": 2"#))
        .stdout(predicate::str::contains(r#""valid": true"#));
}

#[test]
fn test_validate_list() {
    let dir = TempDir::new().unwrap();
    let rules = rules(&dir);

    blockscan_cmd()
        .arg("validate")
        .arg(&rules)
        .arg("--list")
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""expression": "error [0-9]+""#))
        .stdout(predicate::str::contains(r#""caseless": true"#));
}

#[test]
fn test_validate_rejects_unsupported_flag() {
    let dir = TempDir::new().unwrap();
    let rules = dir.path().join("rules.txt");
    fs::write(&rules, "1:/abc/iZ\n").unwrap();

    blockscan_cmd()
        .arg("validate")
        .arg(&rules)
        .assert()
        .failure()
        .stderr(predicate::str::contains("unsupported flag 'Z'"));
}

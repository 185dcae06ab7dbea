use std::fs;
use std::path::PathBuf;

use dashboard_assemble_core::ExitCode;
use predicates::prelude::*;
use tempfile::tempdir;

fn cargo_bin() -> assert_cmd::Command {
    assert_cmd::Command::cargo_bin("dashboard-assemble").unwrap()
}

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

#[test]
fn assembles_fixture_payload_to_stdout() {
    let dir = tempdir().unwrap();

    let mut cmd = cargo_bin();
    cmd.current_dir(dir.path())
        .arg(fixture_path("payload.json"))
        .arg("--shell")
        .arg(fixture_path("shell.html"))
        .arg("--engine")
        .arg(fixture_path("engine.js"))
        .arg("--stdout");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("var auditedYearsDetected = [2021,2022,2023];"))
        .stdout(predicate::str::contains("ensureBankDropdown();"))
        .stdout(predicate::str::ends_with("</body></html>"));
}

#[test]
fn missing_marker_reports_and_fails() {
    let dir = tempdir().unwrap();
    let shell = dir.path().join("shell.html");
    fs::write(&shell, "<html><body><script>\n</script></body></html>").unwrap();

    let mut cmd = cargo_bin();
    cmd.current_dir(dir.path())
        .arg(fixture_path("payload.json"))
        .arg("--shell")
        .arg(&shell)
        .arg("--engine")
        .arg(fixture_path("engine.js"))
        .arg("--stdout");

    cmd.assert()
        .failure()
        .code(ExitCode::MarkerNotFound as i32)
        .stderr(predicate::str::contains("not found in shell asset"));
}

#[test]
fn duplicate_marker_reports_count() {
    let dir = tempdir().unwrap();
    let shell = dir.path().join("shell.html");
    fs::write(
        &shell,
        "// [PART A: DATA INJECTION]\n// [PART A: DATA INJECTION]\n",
    )
    .unwrap();

    let mut cmd = cargo_bin();
    cmd.current_dir(dir.path())
        .arg(fixture_path("payload.json"))
        .arg("--shell")
        .arg(&shell)
        .arg("--engine")
        .arg(fixture_path("engine.js"))
        .arg("--stdout");

    cmd.assert()
        .failure()
        .code(ExitCode::MarkerNotFound as i32)
        .stderr(predicate::str::contains("appears 2 times"));
}

#[test]
fn requires_a_payload_source() {
    let dir = tempdir().unwrap();

    let mut cmd = cargo_bin();
    cmd.current_dir(dir.path())
        .arg("--shell")
        .arg(fixture_path("shell.html"))
        .arg("--engine")
        .arg(fixture_path("engine.js"));

    cmd.assert()
        .failure()
        .code(ExitCode::InvalidArguments as i32)
        .stderr(predicate::str::contains("payload"));
}

#[test]
fn payload_checks_gate_assembly() {
    let dir = tempdir().unwrap();

    let mut cmd = cargo_bin();
    cmd.current_dir(dir.path())
        .arg("--payload-string")
        .arg(r#"{"x": 1}"#)
        .arg("--shell")
        .arg(fixture_path("shell.html"))
        .arg("--engine")
        .arg(fixture_path("engine.js"))
        .arg("--stdout");

    cmd.assert()
        .failure()
        .code(ExitCode::Validation as i32)
        .stderr(predicate::str::contains(
            "missing required key: auditedYearsDetected",
        ));
}

#[test]
fn skip_checks_assembles_minimal_payload() {
    let dir = tempdir().unwrap();

    let mut cmd = cargo_bin();
    cmd.current_dir(dir.path())
        .arg("--payload-string")
        .arg(r#"{"x": 1}"#)
        .arg("--skip-checks")
        .arg("--shell")
        .arg(fixture_path("shell.html"))
        .arg("--engine")
        .arg(fixture_path("engine.js"))
        .arg("--stdout");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("var x = 1;"))
        .stdout(predicate::str::contains("var bankRules = {};"));
}

#[test]
fn writes_output_file_and_reports() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("dashboard.html");

    let mut cmd = cargo_bin();
    cmd.current_dir(dir.path())
        .arg(fixture_path("payload.json"))
        .arg("--shell")
        .arg(fixture_path("shell.html"))
        .arg("--engine")
        .arg(fixture_path("engine.js"))
        .arg("-o")
        .arg(&output);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Assembled"));

    let document = fs::read_to_string(&output).unwrap();
    assert!(document.contains("var historicalData = "));
    assert!(document.ends_with("</body></html>"));
}

#[test]
fn dry_run_writes_nothing() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("dashboard.html");

    let mut cmd = cargo_bin();
    cmd.current_dir(dir.path())
        .arg(fixture_path("payload.json"))
        .arg("--shell")
        .arg(fixture_path("shell.html"))
        .arg("--engine")
        .arg(fixture_path("engine.js"))
        .arg("-o")
        .arg(&output)
        .arg("--dry-run");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("dry run"));

    assert!(!output.exists());
}

#[test]
fn bank_rules_fallback_is_derived() {
    let dir = tempdir().unwrap();
    let payload = dir.path().join("payload.json");
    fs::write(
        &payload,
        r#"{"auditedYearsDetected": [2023], "historicalData": {"2023": {}},
            "companyFacilities": [], "directorFacilities": []}"#,
    )
    .unwrap();

    let mut cmd = cargo_bin();
    cmd.current_dir(dir.path())
        .arg(&payload)
        .arg("--bank-rules")
        .arg(fixture_path("bank_rules.json"))
        .arg("--shell")
        .arg(fixture_path("shell.html"))
        .arg("--engine")
        .arg(fixture_path("engine.js"))
        .arg("--stdout");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("var bankRules = "))
        .stdout(predicate::str::contains("\"allowFinancial\":true"))
        .stdout(predicate::str::contains("\"turnoverMultiplier\":1.2"));
}

#[test]
fn explicit_missing_bank_rules_file_fails() {
    let dir = tempdir().unwrap();

    let mut cmd = cargo_bin();
    cmd.current_dir(dir.path())
        .arg(fixture_path("payload.json"))
        .arg("--bank-rules")
        .arg(dir.path().join("absent.json"))
        .arg("--shell")
        .arg(fixture_path("shell.html"))
        .arg("--engine")
        .arg(fixture_path("engine.js"))
        .arg("--stdout");

    cmd.assert()
        .failure()
        .code(ExitCode::InvalidArguments as i32)
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn fenced_stdin_payload_is_unwrapped() {
    let dir = tempdir().unwrap();

    let mut cmd = cargo_bin();
    cmd.current_dir(dir.path())
        .arg("-")
        .arg("--skip-checks")
        .arg("--shell")
        .arg(fixture_path("shell.html"))
        .arg("--engine")
        .arg(fixture_path("engine.js"))
        .arg("--stdout")
        .write_stdin("```json\n{\"noi\": 120000}\n```\n");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("var noi = 120000;"));
}

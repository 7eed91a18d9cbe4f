//! Runs the `sable-opt` binary end to end.

use std::fs;

use assert_cmd::{Command, cargo::cargo_bin_cmd};
use predicates::prelude::*;
use tempfile::TempDir;

fn sable_opt() -> Command {
    let mut cmd = cargo_bin_cmd!("sable-opt");
    cmd.env_remove("RUST_LOG");
    cmd
}

const FOLDABLE: &str = "\
func @f() {
  %a = const 2
  %b = const 3
  %c = add %a, %b
  test.sink %c
  return
}
";

#[test]
fn test_help_lists_dialects() {
    sable_opt()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("Available Dialects: builtin, test"))
        .stdout(predicate::str::contains("--split-input-file"));
}

#[test]
fn test_stdin_to_stdout() {
    sable_opt()
        .args(["-p", "func(canonicalize)"])
        .write_stdin(FOLDABLE)
        .assert()
        .success()
        .stdout("func @f() {\n  %c = const 5\n  test.sink %c\n  return\n}\n")
        .stderr("");
}

#[test]
fn test_split_input_round_trips() {
    let input = "func @f() {}\n// ---\nfunc @g() {}\n";
    sable_opt()
        .arg("--split-input-file")
        .write_stdin(input)
        .assert()
        .success()
        .stdout(input);
}

#[test]
fn test_file_output_is_committed_on_success() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("in.sbl");
    let output = dir.path().join("out.sbl");
    fs::write(&input, FOLDABLE).unwrap();

    sable_opt()
        .arg(&input)
        .arg("-o")
        .arg(&output)
        .assert()
        .success()
        .stdout("");
    assert_eq!(fs::read_to_string(&output).unwrap(), FOLDABLE);
}

#[test]
fn test_output_file_is_absent_after_failure() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("in.sbl");
    let output = dir.path().join("out.sbl");
    fs::write(&input, "func @f() {}\n// ---\n%0 = op.bad\n").unwrap();

    sable_opt()
        .arg(&input)
        .args(["--split-input-file", "-o"])
        .arg(&output)
        .assert()
        .failure()
        .stderr(predicate::str::contains("in.sbl:3:6: error: unknown op 'op.bad'"));
    assert!(!output.exists());
    // The temporary file is cleaned up too.
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[test]
fn test_failing_chunk_keeps_sibling_output_on_stdout() {
    sable_opt()
        .arg("--split-input-file")
        .write_stdin("func @f() {}\n// ---\n%0 = op.bad\n// ---\nfunc @g() {}\n")
        .assert()
        .failure()
        .stdout("func @f() {}\n// ---\n// ---\nfunc @g() {}\n")
        .stderr(predicate::str::contains("<stdin>:3:6: error: unknown op 'op.bad'"));
}

#[test]
fn test_unknown_pass_is_reported_before_reading_input() {
    sable_opt()
        .args(["-p", "canonicalize,nope", "missing.sbl"])
        .assert()
        .failure()
        .stdout("")
        .stderr(predicate::str::contains("unknown pass 'nope'"))
        .stderr(predicate::str::contains("--list-passes"));
}

#[test]
fn test_missing_input_file() {
    sable_opt()
        .arg("definitely-missing.sbl")
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to read 'definitely-missing.sbl'"));
}

#[test]
fn test_verify_diagnostics() {
    let input = "\
// expected-error@below {{unknown op 'op.bad'}}
%0 = op.bad
// ---
func @f() {
  %0 = add %1, %1 // expected-error {{use of undefined value}}
  return
}
";
    sable_opt()
        .args(["--split-input-file", "--verify-diagnostics"])
        .write_stdin(input)
        .assert()
        .success()
        .stderr("");
}

#[test]
fn test_verify_diagnostics_reports_mismatch() {
    let input = "// expected-warning@below {{never}}\nfunc @f() {}\n";
    sable_opt()
        .arg("--verify-diagnostics")
        .write_stdin(input)
        .assert()
        .failure()
        .stdout("func @f() {}\n")
        .stderr("<stdin>:1:4: error: expected warning \"never\" was not produced\n");
}

#[test]
fn test_plain_diagnostics_show_the_operation() {
    sable_opt()
        .args(["-p", "func(test-fail)"])
        .write_stdin("func @f() {\n  return\n}\n")
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "<stdin>:1:1: error: pass 'test-fail' failed: pass failure requested",
        ))
        .stderr(predicate::str::contains("note: see current operation: func @f()"));
}

#[test]
fn test_json_diagnostics() {
    sable_opt()
        .args(["--diagnostics-format", "json"])
        .write_stdin("%0 = op.bad\n")
        .assert()
        .failure()
        .stderr(predicate::str::contains("\"severity\":\"error\""))
        .stderr(predicate::str::contains("\"file\":\"<stdin>\""));
}

#[test]
fn test_verify_each_can_be_disabled() {
    let input = "func @f() {\n  %0 = test.source\n  return\n}\n";
    sable_opt()
        .args(["-p", "test-drop-terminators"])
        .write_stdin(input)
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "invariant violated after running pass 'test-drop-terminators'",
        ));

    sable_opt()
        .args(["-p", "test-drop-terminators", "--verify-each=false"])
        .write_stdin(input)
        .assert()
        .success()
        .stdout("func @f() {\n  %0 = test.source\n}\n");
}

#[test]
fn test_print_ir_after_all_and_timing() {
    sable_opt()
        .args(["-p", "func(dce)", "--print-ir-after-all", "--pass-timing"])
        .write_stdin("func @f() {\n  %a = const 1\n  return\n}\n")
        .assert()
        .success()
        .stdout("func @f() {\n  return\n}\n")
        .stderr(predicate::str::contains(
            "// *** IR Dump After dce ***\nfunc @f() {\n  return\n}\n",
        ))
        .stderr(predicate::str::contains("===- Pass execution timing report -==="));
}

#[test]
fn test_listings() {
    sable_opt()
        .arg("--list-passes")
        .assert()
        .success()
        .stdout(predicate::str::contains("canonicalize:\n"))
        .stdout(predicate::str::contains("max-iterations"))
        .stdout(predicate::str::contains("runs on: module"));

    sable_opt()
        .arg("--show-dialects")
        .assert()
        .success()
        .stdout(predicate::str::contains("builtin:\n"))
        .stdout(predicate::str::contains("test.source"));
}

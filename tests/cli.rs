//! Process-level behavior of the `serialmon` binary.

#![allow(deprecated)] // Command::cargo_bin is deprecated but still functional

use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn no_arguments_prints_help_and_succeeds() {
    let mut cmd = Command::cargo_bin("serialmon").unwrap();
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("PORT"))
        .stdout(predicate::str::contains("Serial port"))
        .stdout(predicate::str::contains("Listening on").not());
}

#[test]
fn help_flag_succeeds() {
    let mut cmd = Command::cargo_bin("serialmon").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("USAGE"));
}

#[cfg(unix)]
#[test]
fn unknown_port_reports_error_and_exits_one() {
    let mut cmd = Command::cargo_bin("serialmon").unwrap();
    cmd.arg("/dev/serialmon-no-such-device")
        .assert()
        .code(1)
        .stdout(predicate::str::contains(
            "could not open port /dev/serialmon-no-such-device: ",
        ))
        .stdout(predicate::str::contains("Listening on").not());
}

#[test]
fn extra_arguments_are_a_usage_error() {
    let mut cmd = Command::cargo_bin("serialmon").unwrap();
    cmd.args(&["/dev/ttyUSB0", "/dev/ttyUSB1"])
        .assert()
        .failure()
        .stderr(predicate::str::is_empty().not());
}

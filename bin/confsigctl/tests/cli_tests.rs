//! ---
//! confsig_section: "05-operator-interfaces"
//! confsig_subsection: "binary"
//! confsig_type: "source"
//! confsig_scope: "code"
//! confsig_description: "Operator CLI for the conference signaling client."
//! confsig_version: "v0.1.0"
//! confsig_owner: "tbd"
//! ---
use std::fs;

use assert_cmd::Command;
use serde_json::Value;

fn confsigctl() -> Command {
    Command::cargo_bin("confsigctl").expect("binary built")
}

#[test]
fn codecs_prints_h264_before_h265() {
    let output = confsigctl().arg("codecs").assert().success().get_output().stdout.clone();
    let formats: Value = serde_json::from_slice(&output).expect("json output");
    let names: Vec<&str> = formats
        .as_array()
        .expect("array")
        .iter()
        .map(|format| format["name"].as_str().expect("name"))
        .collect();
    assert_eq!(names, vec!["H264", "H264", "H264", "H264", "H265"]);
}

#[test]
fn config_check_rejects_zero_attempts() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("confsig.toml");
    fs::write(&path, "[reconnection]\nmax_attempts = 0\n").expect("write config");

    confsigctl()
        .env_remove("CONFSIG_CONFIG")
        .args(["config-check", "--config"])
        .arg(&path)
        .assert()
        .failure();
}

#[test]
fn config_check_accepts_valid_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("confsig.toml");
    fs::write(&path, "[reconnection]\nmax_attempts = 4\n").expect("write config");

    confsigctl()
        .env_remove("CONFSIG_CONFIG")
        .args(["config-check", "--config"])
        .arg(&path)
        .assert()
        .success();
}

#[test]
fn loopback_acknowledges_every_message() {
    let output = confsigctl()
        .args(["loopback", "--messages", "2"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let stdout = String::from_utf8(output).expect("utf8");
    let start = stdout.rfind("{\n").expect("report present");
    let report: Value = serde_json::from_str(&stdout[start..]).expect("report json");
    assert_eq!(report["emitted"], 2);
    assert_eq!(report["acknowledged"], 2);
    assert_eq!(report["drained"], 2);
    assert_eq!(report["failed"], 0);
}

use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;

fn fixture(path: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join(path)
}

#[test]
fn diff_text_shows_prefixed_changes_and_summary() {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("fwconf"));
    cmd.arg("diff")
        .arg(fixture("fixtures/config_old.xml"))
        .arg(fixture("fixtures/config_new.xml"))
        .assert()
        .success()
        .stdout(predicate::str::contains("- IP Host Srv2"))
        .stdout(predicate::str::contains("+ FQDN Host Mirror"))
        .stdout(predicate::str::contains("~ IP Host Srv1"))
        .stdout(predicate::str::contains("~ IPAddress: 10.0.0.1 -> 10.0.0.9"))
        .stdout(predicate::str::contains("Action: Accept -> Drop"))
        .stdout(predicate::str::contains("Allow Web").not())
        .stdout(predicate::str::contains(
            "added=1 removed=1 modified=2 unchanged=16",
        ));
}

#[test]
fn diff_summary_only() {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("fwconf"));
    cmd.arg("diff")
        .arg(fixture("fixtures/config_old.xml"))
        .arg(fixture("fixtures/config_new.xml"))
        .arg("--summary")
        .assert()
        .success()
        .stdout(predicate::str::contains("Srv2").not())
        .stdout(predicate::str::contains("modified=2"));
}

#[test]
fn diff_json_outputs_structured_changes() {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("fwconf"));
    let output = cmd
        .arg("diff")
        .arg(fixture("fixtures/config_old.xml"))
        .arg(fixture("fixtures/config_new.xml"))
        .arg("--format")
        .arg("json")
        .output()
        .expect("run");
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(value["summary"]["added"], 1);
    let srv1 = value["modified"]
        .as_array()
        .expect("modified")
        .iter()
        .find(|item| item["key"] == "IPHost:Srv1")
        .expect("Srv1 item");
    assert_eq!(srv1["changes"][0]["field"], "IPAddress");
    assert_eq!(srv1["changes"][0]["old_value"], "10.0.0.1");
    assert_eq!(srv1["changes"][0]["diff"]["type"], "modified");
    assert!(value["added"][0]["raw_xml"].as_str().is_some_and(|x| x.contains("Mirror")));
}

#[test]
fn diff_same_file_reports_nothing_changed() {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("fwconf"));
    cmd.arg("diff")
        .arg(fixture("fixtures/config_new.xml"))
        .arg(fixture("fixtures/config_new.xml"))
        .assert()
        .success()
        .stdout(predicate::str::contains("added=0 removed=0 modified=0 unchanged=19"));
}

#[test]
fn diff_missing_file_fails() {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("fwconf"));
    cmd.arg("diff")
        .arg(fixture("fixtures/config_old.xml"))
        .arg(fixture("fixtures/does_not_exist.xml"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("does_not_exist.xml"));
}

//! Integration tests for `roadmap config` and `roadmap reference`.
//!
//! These tests verify that:
//! - config.kdl in the data dir and the system dir feed `config show`
//! - reference rows can be listed and added

mod common;

use common::TestEnv;
use predicates::prelude::*;
use std::fs;

#[test]
fn test_config_show_defaults() {
    let env = TestEnv::new();

    env.roadmap()
        .args(["-H", "config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("backlog-status = Backlog (default)"))
        .stdout(predicate::str::contains("password = ******** (default)"))
        .stdout(predicate::str::contains("payProduct!@#").not());
}

#[test]
fn test_config_show_data_dir_file() {
    let env = TestEnv::new();
    fs::write(
        env.data_path().join("config.kdl"),
        "output-format \"human\"\nbacklog-status \"Parked\"\n",
    )
    .unwrap();

    // output-format from the file makes -H unnecessary
    env.roadmap()
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("backlog-status = Parked (data-dir)"))
        .stdout(predicate::str::contains("output-format = human (data-dir)"));
}

#[test]
fn test_config_show_env_credentials() {
    let env = TestEnv::new();

    env.roadmap()
        .env("ROADMAP_USERNAME", "planner")
        .args(["-H", "config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "username = planner (env:ROADMAP_USERNAME)",
        ));
}

#[test]
fn test_invalid_config_fails() {
    let env = TestEnv::new();
    fs::write(
        env.config_dir.path().join("config.kdl"),
        "stream \"Cards\" color=\"blue\" icon=\"credit-card\"\n",
    )
    .unwrap();

    env.roadmap()
        .args(["config", "show"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid color blue"));
}

#[test]
fn test_config_set_then_show() {
    let env = TestEnv::new();

    env.roadmap()
        .args(["config", "set", "default-owner", "Ops"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"value\":\"Ops\""));

    env.roadmap()
        .args(["config", "set", "password", "hunter2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("hunter2").not());

    env.roadmap()
        .args(["-H", "config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("default-owner = Ops (data-dir)"))
        .stdout(predicate::str::contains("password = ******** (data-dir)"));

    env.roadmap()
        .args(["config", "set", "theme", "dark"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown config key: theme"));
}

#[test]
fn test_reference_list_seeded() {
    let env = TestEnv::logged_in();

    env.roadmap()
        .args(["reference", "list", "streams"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"count\":5"))
        .stdout(predicate::str::contains("\"name\":\"Payments\""));

    env.roadmap()
        .args(["-H", "reference", "list", "statuses"])
        .assert()
        .success()
        .stdout(predicate::str::contains("6 statuses:"))
        .stdout(predicate::str::contains("Backlog  #9CA3AF"));
}

#[test]
fn test_reference_add_owner() {
    let env = TestEnv::logged_in();

    env.roadmap()
        .args(["-H", "reference", "add", "owner", "Ada", "--role", "PM"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Added owner"));

    env.roadmap()
        .args(["reference", "list", "owners"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"count\":1"))
        .stdout(predicate::str::contains("\"role\":\"PM\""));

    let id = env.create_project(&[
        "Checkout", "--stream", "Payments", "--status", "Done", "--owner", "Ada",
    ]);
    env.roadmap()
        .args(["project", "show", &id])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"name\":\"Ada\""));
}

#[test]
fn test_reference_add_rejects_bad_input() {
    let env = TestEnv::logged_in();

    env.roadmap()
        .args(["reference", "add", "status", "Blocked", "--color", "red"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid color"));

    env.roadmap()
        .args(["reference", "add", "project", "Nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown reference kind"));

    env.roadmap()
        .args(["reference", "list", "colors"])
        .assert()
        .failure();
}

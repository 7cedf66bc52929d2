//! Integration tests for `roadmap view`.
//!
//! These tests verify that:
//! - each view arranges the visible projects
//! - `--move` and `--reschedule` change the rendered view only

mod common;

use common::TestEnv;
use predicates::prelude::*;

fn view(env: &TestEnv, args: &[&str]) -> serde_json::Value {
    let output = env.roadmap().arg("view").args(args).output().unwrap();
    assert!(
        output.status.success(),
        "view failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).unwrap()
}

#[test]
fn test_gantt_groups_by_stream() {
    let env = TestEnv::logged_in();
    env.create_project(&["Checkout", "--stream", "Payments", "--status", "Done"]);
    env.create_project(&["Referrals", "--stream", "Growth", "--status", "Done"]);

    let json = view(&env, &["gantt"]);
    assert_eq!(json["view"], "gantt");
    let groups: Vec<&str> = json["groups"]
        .as_array()
        .unwrap()
        .iter()
        .map(|g| g["name"].as_str().unwrap())
        .collect();
    assert_eq!(groups, vec!["Growth", "Payments"]);
}

#[test]
fn test_kanban_lanes_follow_columns() {
    let env = TestEnv::logged_in();
    env.create_project(&["Checkout", "--stream", "Payments", "--status", "At risk"]);

    let json = view(&env, &["kanban"]);
    let lanes = json["lanes"].as_array().unwrap();
    assert_eq!(lanes.len(), 5);
    assert_eq!(lanes[0]["name"], "Not started");

    let at_risk = lanes.iter().find(|l| l["name"] == "At risk").unwrap();
    assert_eq!(at_risk["features"].as_array().unwrap().len(), 1);
}

#[test]
fn test_move_is_preview_only() {
    let env = TestEnv::logged_in();
    let id = env.create_project(&["Checkout", "--stream", "Payments", "--status", "Not started"]);

    let moved = format!("{}=Done", id);
    let json = view(&env, &["kanban", "--move", &moved]);
    assert_eq!(json["previewed"][0], id.as_str());
    let done = json["lanes"]
        .as_array()
        .unwrap()
        .iter()
        .find(|l| l["name"] == "Done")
        .unwrap();
    assert_eq!(done["features"][0]["id"], id.as_str());

    env.roadmap()
        .args(["project", "show", &id])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"name\":\"Not started\""));
}

#[test]
fn test_reschedule_preview() {
    let env = TestEnv::logged_in();
    let id = env.create_project(&["Checkout", "--stream", "Payments", "--status", "Done"]);

    let dates = format!("{}=2027-03-01:2027-03-20", id);
    env.roadmap()
        .args(["-H", "view", "list", "--reschedule", &dates])
        .assert()
        .success()
        .stdout(predicate::str::contains("Mar 1, 2027 - Mar 20, 2027"))
        .stdout(predicate::str::contains("preview only, not saved"));
}

#[test]
fn test_table_sort_descending() {
    let env = TestEnv::logged_in();
    env.create_project(&["Alpha", "--stream", "Payments", "--status", "Done"]);
    env.create_project(&["Beta", "--stream", "Payments", "--status", "Done"]);

    let json = view(&env, &["table", "--sort", "name", "--desc"]);
    let names: Vec<&str> = json["rows"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Beta", "Alpha"]);
}

#[test]
fn test_stream_filter() {
    let env = TestEnv::logged_in();
    env.create_project(&["Checkout", "--stream", "Payments", "--status", "Done"]);
    env.create_project(&["Referrals", "--stream", "Growth", "--status", "Done"]);

    let json = view(&env, &["table", "--stream", "Payments"]);
    assert_eq!(json["rows"].as_array().unwrap().len(), 1);
    assert_eq!(json["rows"][0]["name"], "Checkout");
}

#[test]
fn test_backlog_kanban_has_backlog_lane() {
    let env = TestEnv::logged_in();
    env.create_project(&["Referrals", "--stream", "Growth", "--backlog"]);

    env.roadmap()
        .args(["-H", "view", "kanban", "--backlog"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Referrals"));
}

#[test]
fn test_unknown_view_and_bad_move() {
    let env = TestEnv::logged_in();

    env.roadmap()
        .args(["view", "pie"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown view: pie"));

    env.roadmap()
        .args(["view", "kanban", "--move", "no-equals"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--move expects ID=VALUE"));
}

//! Integration tests for the rd CLI commands.

#![allow(deprecated)] // Command::cargo_bin – macro replacement not yet stable

use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn rogue_dice() -> Command {
    Command::cargo_bin("rogue-dice").unwrap()
}

/// Create a temp directory with a rules file and a two-perk catalog.
fn test_files() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("rules.json"),
        r#"{ "starting_rolls": 1, "starting_target_score": 100 }"#,
    )
    .unwrap();
    fs::write(
        dir.path().join("catalog.json"),
        r#"[
    { "kind": "twins", "name": "Mirror Image", "description": "Pairs count double.", "rarity": "rare" },
    { "kind": "steady_hand", "name": "Close Call", "description": "+3 on neighbours." }
]"#,
    )
    .unwrap();
    dir
}

// -- help / version --

#[test]
fn help_lists_subcommands() {
    rogue_dice()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("play"))
        .stdout(predicate::str::contains("simulate"))
        .stdout(predicate::str::contains("perks"));
}

#[test]
fn version_flag() {
    rogue_dice()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("rogue-dice"));
}

// -- perks --

#[test]
fn perks_lists_standard_catalog() {
    rogue_dice()
        .arg("perks")
        .assert()
        .success()
        .stdout(predicate::str::contains("Lucky 7"))
        .stdout(predicate::str::contains("Steady Hand"))
        .stdout(predicate::str::contains("Twins"));
}

#[test]
fn perks_custom_catalog() {
    let dir = test_files();
    rogue_dice()
        .args(["perks", "--catalog"])
        .arg(dir.path().join("catalog.json"))
        .assert()
        .success()
        .stdout(predicate::str::contains("Mirror Image"))
        .stdout(predicate::str::contains("Close Call"))
        .stdout(predicate::str::contains("Lucky 7").not());
}

#[test]
fn perks_bad_catalog_fails() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("catalog.json");
    fs::write(&path, r#"[{ "kind": "loaded_dice", "name": "?", "description": "?" }]"#).unwrap();
    rogue_dice()
        .args(["perks", "--catalog"])
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("perk catalog"));
}

#[test]
fn perks_missing_catalog_fails() {
    rogue_dice()
        .args(["perks", "--catalog", "/nonexistent/catalog.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot read"));
}

// -- play --

#[test]
fn play_quit_immediately() {
    rogue_dice()
        .arg("play")
        .write_stdin("quit\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Game started: 10 rolls, first target 15"))
        .stdout(predicate::str::contains("Goodbye!"));
}

#[test]
fn play_roll_and_confirm() {
    rogue_dice()
        .args(["play", "--seed", "7"])
        .write_stdin("roll\nconfirm\nstatus\nquit\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Rolled: ["))
        .stdout(predicate::str::contains("points, score"))
        .stdout(predicate::str::contains("Rolls: 9 | Rerolls: 3"));
}

#[test]
fn play_rejected_command_keeps_going() {
    rogue_dice()
        .arg("play")
        .write_stdin("confirm\nreroll 1\nstatus\nquit\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("no pending roll"))
        .stdout(predicate::str::contains("Round 1 | Target 15 | Score 0"));
}

#[test]
fn play_with_rules_file_runs_out_of_rolls() {
    let dir = test_files();
    rogue_dice()
        .args(["play", "--config"])
        .arg(dir.path().join("rules.json"))
        .write_stdin("roll\nconfirm\nroll\nquit\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Game over in round 1"))
        .stdout(predicate::str::contains("game is not active"));
}

#[test]
fn play_eof_exits_cleanly() {
    rogue_dice().arg("play").write_stdin("roll\n").assert().success();
}

#[test]
fn play_invalid_config_fails() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("rules.json");
    fs::write(&path, r#"{ "dice_count": 0 }"#).unwrap();
    rogue_dice()
        .args(["play", "--config"])
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("dice_count"));
}

// -- simulate --

#[test]
fn simulate_prints_summary() {
    rogue_dice()
        .args(["simulate", "--games", "5", "--seed", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Simulation"))
        .stdout(predicate::str::contains("Games played"))
        .stdout(predicate::str::contains("Mean round reached"));
}

#[test]
fn simulate_json_output() {
    let output = rogue_dice()
        .args(["simulate", "--games", "3", "--seed", "9", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["games"], 3);
    assert_eq!(value["base_seed"], 9);
    assert_eq!(value["results"].as_array().unwrap().len(), 3);
}

#[test]
fn simulate_is_deterministic() {
    let run = || {
        rogue_dice()
            .args(["simulate", "--games", "4", "--seed", "3", "--json"])
            .output()
            .unwrap()
            .stdout
    };
    assert_eq!(run(), run());
}

#[test]
fn simulate_zero_games_fails() {
    rogue_dice()
        .args(["simulate", "--games", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("at least 1"));
}

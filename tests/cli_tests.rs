//! End-to-end tests for the chipload binary

mod common;

use common::{chipload, workdir, write_file};
use predicates::prelude::*;
use serde_json::Value;

// ============================================================================
// Single calculations
// ============================================================================

#[test]
fn test_turn_prints_card() {
    let dir = workdir();
    chipload(&dir)
        .args(["turn", "--dia", "1", "--sfm", "300", "--ipr", "0.010"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("Turning (imperial)\n"))
        .stdout(predicate::str::contains("RPM             1146\n"))
        .stdout(predicate::str::contains("IPM             11.459\n"));
}

#[test]
fn test_missing_speed_pair_fails() {
    let dir = workdir();
    chipload(&dir)
        .args(["turn", "--dia", "1", "--ipr", "0.010"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Enter either cutting speed or RPM."));
}

#[test]
fn test_missing_diameter_fails() {
    let dir = workdir();
    chipload(&dir)
        .args(["drill", "--rpm", "500", "--ipm", "2"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error:"));
}

#[test]
fn test_json_output() {
    let dir = workdir();
    let output = chipload(&dir)
        .args(["--json", "mill", "--dia", "0.5", "--rpm", "8000", "--ipt", "0.002"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["operation"], "milling");
    assert_eq!(report["params"]["feed"]["flutes"], 4);
    let ipm = report["params"]["feed"]["feed_per_min"].as_f64().unwrap();
    assert!((ipm - 64.0).abs() < 1e-9);
}

#[test]
fn test_machine_limit_clamps_rpm() {
    let dir = workdir();
    chipload(&dir)
        .args(["--machine", "Haas ST-10", "turn", "--dia", "0.1", "--sfm", "300", "--ipr", "0.004"])
        .assert()
        .success()
        .stdout(predicate::str::contains("RPM             6000\n"))
        .stdout(predicate::str::contains("Spindle RPM limited to machine max (6000)"));
}

#[test]
fn test_load_flag_is_range_checked() {
    let dir = workdir();
    chipload(&dir)
        .args(["--load", "0", "drill", "--dia", "0.5", "--rpm", "500", "--ipm", "2"])
        .assert()
        .failure();
}

// ============================================================================
// Setup sheets
// ============================================================================

#[test]
fn test_sheet_runs_every_job() {
    let dir = workdir();
    write_file(
        &dir,
        "shop.cut",
        "# facing and spot drill\nmachine \"Haas ST-20Y\"\nturn dia 1 sfm 300 ipr 0.010 material \"4140\"\ndrill dia 1/2 rpm 500 ipm 2 live\n",
    );

    chipload(&dir)
        .args(["sheet", "shop.cut"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[line 3]"))
        .stdout(predicate::str::contains("[line 4]"))
        .stdout(predicate::str::contains("Drilling (imperial) on Haas ST-20Y [Live Tool]"));
}

#[test]
fn test_sheet_failed_line_sets_exit_code() {
    let dir = workdir();
    write_file(&dir, "shop.cut", "turn dia 1 ipr 0.01\nturn dia 1 sfm 300 ipr 0.01\n");

    chipload(&dir)
        .args(["sheet", "shop.cut"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("[line 1] turning failed"))
        .stdout(predicate::str::contains("[line 2]"))
        .stderr(predicate::str::contains("1 of 2 jobs failed"));
}

#[test]
fn test_sheet_parse_error_is_rendered() {
    let dir = workdir();
    write_file(&dir, "shop.cut", "mill dia 0.5 rpm 8000 insert \"X\"\n");

    chipload(&dir)
        .args(["sheet", "shop.cut"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("'insert' does not apply to milling"))
        .stderr(predicate::str::contains("shop.cut"));
}

#[test]
fn test_sheet_missing_file() {
    let dir = workdir();
    chipload(&dir)
        .args(["sheet", "nope.cut"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to read nope.cut"));
}

// ============================================================================
// Presets and configuration
// ============================================================================

#[test]
fn test_presets_listing() {
    let dir = workdir();
    chipload(&dir)
        .args(["presets", "machines"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Haas ST-20Y"))
        .stdout(predicate::str::contains("live tool 4000 RPM, 5.0 HP"))
        .stdout(predicate::str::contains("Materials").not());
}

#[test]
fn test_local_config_is_used() {
    let dir = workdir();
    write_file(&dir, "chipload.toml", "units = \"metric\"\nmachine = \"Haas ST-10\"\n");

    chipload(&dir)
        .args(["turn", "--dia", "25.4", "--sfm", "91.44", "--ipr", "0.25"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("Turning (metric) on Haas ST-10 [Spindle]\n"))
        .stdout(predicate::str::contains("RPM             1146\n"));
}

#[test]
fn test_flags_override_config() {
    let dir = workdir();
    write_file(&dir, "chipload.toml", "units = \"metric\"\n");

    chipload(&dir)
        .args(["--units", "imperial", "turn", "--dia", "1", "--sfm", "300", "--ipr", "0.01"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("Turning (imperial)\n"));
}

#[test]
fn test_config_presets_path_is_relative_to_file() {
    let dir = workdir();
    std::fs::create_dir(dir.path().join("conf")).unwrap();
    write_file(&dir, "conf/chipload.toml", "presets = \"shop.json\"\n");
    write_file(
        &dir,
        "conf/shop.json",
        r#"{ "machines": { "Shop Lathe": { "type": "lathe", "spindle_max_rpm": 3000, "spindle_hp": 10 } } }"#,
    );

    chipload(&dir)
        .args(["--config", "conf/chipload.toml", "presets"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Shop Lathe"))
        .stdout(predicate::str::contains("Haas VF-2").not());
}

#[test]
fn test_bad_config_load_is_rejected() {
    let dir = workdir();
    write_file(&dir, "bad.toml", "max_load_pct = 150\n");

    chipload(&dir)
        .args(["--config", "bad.toml", "presets"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("max_load_pct must be between 1 and 100"));
}

//! CLI contract tests.

use std::io::Write;

use assert_cmd::Command;

fn anthrokit() -> Command {
    let mut cmd = Command::cargo_bin("anthrokit").expect("binary should build");
    let tmp = std::env::temp_dir().join("anthrokit-cli-test-missing.toml");
    cmd.env("ANTHROKIT_CONFIG_PATH", tmp)
        .env_remove("ANTHROKIT_ANTHRO")
        .env_remove("PERSONALITY_ADAPTATION")
        .env_remove("ADAPTIVE_MODE")
        .env_remove("ADAPTIVE_TOKENS")
        .env_remove("ADAPTIVE_RANGE_MIN")
        .env_remove("ADAPTIVE_RANGE_MAX")
        .env_remove("ADAPTIVE_LEVELS")
        .env_remove("ADAPTIVE_SEED")
        .env_remove("ANTHROKIT_REGISTRY_PATH")
        .env("RUST_LOG", "off");
    cmd
}

fn stdout_json(cmd: &mut Command) -> serde_json::Value {
    let output = cmd.assert().success().get_output().stdout.clone();
    serde_json::from_slice(&output).expect("stdout should be JSON")
}

#[test]
fn presets_lists_registry_order() {
    let output = anthrokit()
        .arg("presets")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    assert_eq!(String::from_utf8_lossy(&output), "HighA\nLowA\nNoA\n");
}

#[test]
fn show_prints_preset_json() {
    let preset = stdout_json(anthrokit().args(["show", "HighA"]));
    assert_eq!(preset["name"], "HighA");
    assert_eq!(preset["values"]["warmth"], 0.7);
    assert_eq!(preset["values"]["self_reference"], "I");
}

#[test]
fn show_unknown_preset_fails() {
    anthrokit().args(["show", "MediumA"]).assert().failure();
}

#[test]
fn personalize_reports_capped_adjustments() {
    let out = stdout_json(anthrokit().args([
        "personalize",
        "HighA",
        "--extraversion",
        "7",
        "--agreeableness",
        "4",
        "--conscientiousness",
        "4",
        "--neuroticism",
        "4",
        "--openness",
        "4",
    ]));
    assert_eq!(out["preset"]["name"], "HighA+personality");
    let warmth = out["preset"]["values"]["warmth"]
        .as_f64()
        .expect("warmth is numeric");
    assert!((warmth - 1.0).abs() < 1e-9);
    let delta = out["adjustments"]["warmth"].as_f64().expect("delta");
    assert!((delta - 0.3).abs() < 1e-9);
}

#[test]
fn personalize_rejects_out_of_range_score() {
    anthrokit()
        .args([
            "personalize",
            "HighA",
            "--extraversion",
            "9",
            "--agreeableness",
            "4",
            "--conscientiousness",
            "4",
            "--neuroticism",
            "4",
            "--openness",
            "4",
        ])
        .assert()
        .failure();
}

#[test]
fn explore_prints_variants() {
    let out = stdout_json(anthrokit().args(["explore", "warmth", "--levels", "3"]));
    let variants = out.as_array().expect("array of presets");
    assert_eq!(variants.len(), 3);
    assert_eq!(variants[0]["name"], "LowA/warmth=0.25");
}

#[test]
fn simulate_favours_better_arm() {
    let out = stdout_json(anthrokit().args([
        "simulate",
        "--arms",
        "HighA,LowA",
        "--rates",
        "0.9,0.1",
        "--rounds",
        "300",
        "--seed",
        "42",
    ]));
    assert_eq!(out["seed"], 42);
    assert_eq!(out["statistics"]["n_trials"], 300);
    assert_eq!(out["statistics"]["best_arm_id"], "HighA");
    let high = out["selections"]["HighA"].as_u64().expect("HighA count");
    let low = out["selections"]["LowA"].as_u64().unwrap_or(0);
    assert!(high > low);
}

#[test]
fn simulate_rejects_mismatched_rates() {
    anthrokit()
        .args(["simulate", "--arms", "HighA,LowA", "--rates", "0.9"])
        .assert()
        .failure();
}

#[test]
fn condition_emits_session_start_record() {
    let line = anthrokit()
        .args(["condition", "--tipi", "7,1,4,4,4,4,4,4,4,4"])
        .env("ANTHROKIT_ANTHRO", "high")
        .env("PERSONALITY_ADAPTATION", "enabled")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let event: serde_json::Value =
        serde_json::from_slice(&line).expect("one JSON line");
    assert_eq!(event["event"], "session_start");
    assert_eq!(event["condition"], "HighA_enabled");
    assert_eq!(event["preset_name"], "HighA+personality");
    assert_eq!(event["personality"]["extraversion"], 7.0);
    assert!(event["arm_id"].is_null());
}

#[test]
fn condition_requires_tipi_when_adaptation_enabled() {
    let output = anthrokit()
        .arg("condition")
        .env("PERSONALITY_ADAPTATION", "enabled")
        .assert()
        .failure()
        .get_output()
        .clone();
    assert!(output.stdout.is_empty(), "no record should be emitted");
    assert!(String::from_utf8_lossy(&output.stderr).contains("--tipi"));
}

#[test]
fn condition_without_adaptation_is_labelled_disabled() {
    let event = stdout_json(
        anthrokit()
            .args(["condition", "--tipi", "7,1,4,4,4,4,4,4,4,4"])
            .env("ANTHROKIT_ANTHRO", "none"),
    );
    assert_eq!(event["condition"], "NoA_disabled");
    assert_eq!(event["preset_name"], "NoA");
    assert_eq!(event["preset"]["values"]["warmth"], 0.0);
    assert!(event["arm_id"].is_null());
}

fn adaptive_condition(seed: &str) -> serde_json::Value {
    stdout_json(
        anthrokit()
            .arg("condition")
            .env("ADAPTIVE_MODE", "enabled")
            .env("ADAPTIVE_SEED", seed),
    )
}

#[test]
fn adaptive_condition_dispenses_range_variant() {
    let event = adaptive_condition("3");
    assert_eq!(event["condition"], "LowA_disabled");
    let arm_id = event["arm_id"].as_str().expect("adaptive mode sets arm_id");
    assert_eq!(event["preset_name"], arm_id);

    let (base, assignment) = arm_id.split_once('/').expect("variant name");
    assert_eq!(base, "LowA");
    let (token, _) = assignment.split_once('=').expect("token=value");
    assert!(["warmth", "empathy"].contains(&token), "varied {token}");
    let value = event["preset"]["values"][token]
        .as_f64()
        .expect("varied token is numeric");
    assert!((0.25..=0.75).contains(&value), "{token}={value}");
}

#[test]
fn adaptive_condition_is_reproducible_with_seed() {
    assert_eq!(
        adaptive_condition("11")["arm_id"],
        adaptive_condition("11")["arm_id"]
    );
}

fn write_snapshot(favoured: &str) -> tempfile::NamedTempFile {
    let arms = ["warmth", "empathy"].into_iter().flat_map(|token| {
        ["0.25", "0.50", "0.75"]
            .into_iter()
            .map(move |v| format!("LowA/{token}={v}"))
    });
    let entries: Vec<serde_json::Value> = arms
        .map(|arm_id| {
            let (alpha, beta) = if arm_id == favoured {
                (500.0, 1.0)
            } else {
                (1.0, 500.0)
            };
            serde_json::json!({ "arm_id": arm_id, "alpha": alpha, "beta": beta })
        })
        .collect();
    let mut file = tempfile::NamedTempFile::new().expect("should create temp file");
    file.write_all(
        serde_json::to_string(&entries)
            .expect("serialize snapshot")
            .as_bytes(),
    )
    .expect("should write snapshot");
    file
}

#[test]
fn adaptive_condition_resumes_from_snapshot() {
    let snapshot = write_snapshot("LowA/empathy=0.75");
    let event = stdout_json(
        anthrokit()
            .arg("condition")
            .arg("--snapshot")
            .arg(snapshot.path())
            .env("ADAPTIVE_MODE", "enabled")
            .env("ADAPTIVE_LEVELS", "3")
            .env("ADAPTIVE_SEED", "5"),
    );
    assert_eq!(event["arm_id"], "LowA/empathy=0.75");
    assert_eq!(event["preset"]["values"]["empathy"], 0.75);
}

#[test]
fn snapshot_for_other_arms_rejected() {
    let snapshot = write_snapshot("LowA/empathy=0.75");
    anthrokit()
        .arg("condition")
        .arg("--snapshot")
        .arg(snapshot.path())
        .env("ADAPTIVE_MODE", "enabled")
        .env("ADAPTIVE_TOKENS", "formality")
        .assert()
        .failure();
}

#[test]
fn snapshot_without_adaptive_mode_rejected() {
    let snapshot = write_snapshot("LowA/empathy=0.75");
    anthrokit()
        .arg("condition")
        .arg("--snapshot")
        .arg(snapshot.path())
        .assert()
        .failure();
}

#[test]
fn registry_flag_loads_custom_document() {
    let mut file = tempfile::NamedTempFile::new().expect("should create temp file");
    file.write_all(
        br#"
[[tokens]]
name = "warmth"
kind = "continuous"
min = 0.0
max = 1.0

[[presets]]
name = "Only"

[presets.values]
warmth = 0.5
"#,
    )
    .expect("should write registry");

    let output = anthrokit()
        .arg("--registry")
        .arg(file.path())
        .arg("presets")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    assert_eq!(String::from_utf8_lossy(&output), "Only\n");
}

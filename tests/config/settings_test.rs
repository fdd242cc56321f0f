//! Settings file parsing and environment overrides.

use std::collections::HashMap;
use std::path::PathBuf;

use anthrokit::config::{config_path_with, load_settings, AnthroLevel, Settings};

fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn parse_partial_settings_file() {
    let settings = Settings::from_toml(
        r#"
[study]
anthro = "high"
personality_adaptation = true

[adaptive]
enabled = true
levels = 3
seed = 42
"#,
    )
    .expect("settings should parse");
    assert_eq!(settings.study.anthro, AnthroLevel::High);
    assert_eq!(settings.study.anthro.preset_name(), "HighA");
    assert!(settings.study.personality_adaptation);
    assert!(settings.adaptive.enabled);
    assert_eq!(settings.adaptive.levels, 3);
    assert_eq!(settings.adaptive.seed, Some(42));
    assert_eq!(settings.adaptive.tokens, vec!["warmth", "empathy"]);
}

#[test]
fn env_overrides_file_values() {
    let mut settings = Settings::from_toml("[study]\nanthro = \"high\"\n").expect("parse");
    settings.apply_overrides(env(&[
        ("ANTHROKIT_ANTHRO", "none"),
        ("PERSONALITY_ADAPTATION", "1"),
        ("ADAPTIVE_MODE", "true"),
        ("ADAPTIVE_TOKENS", "warmth, formality ,"),
        ("ADAPTIVE_RANGE_MIN", "0.1"),
        ("ADAPTIVE_RANGE_MAX", "0.9"),
        ("ADAPTIVE_LEVELS", "7"),
        ("ADAPTIVE_SEED", "5"),
        ("ANTHROKIT_REGISTRY_PATH", "/tmp/registry.toml"),
        ("ANTHROKIT_LOG_LEVEL", "debug"),
    ]));
    assert_eq!(settings.study.anthro, AnthroLevel::None);
    assert!(settings.study.personality_adaptation);
    assert!(settings.adaptive.enabled);
    assert_eq!(settings.adaptive.tokens, vec!["warmth", "formality"]);
    assert!((settings.adaptive.range_min - 0.1).abs() < f64::EPSILON);
    assert!((settings.adaptive.range_max - 0.9).abs() < f64::EPSILON);
    assert_eq!(settings.adaptive.levels, 7);
    assert_eq!(settings.adaptive.seed, Some(5));
    assert_eq!(
        settings.registry.path,
        Some(PathBuf::from("/tmp/registry.toml"))
    );
    assert_eq!(settings.logging.level, "debug");
}

#[test]
fn invalid_env_values_are_ignored() {
    let mut settings = Settings::default();
    settings.apply_overrides(env(&[
        ("ANTHROKIT_ANTHRO", "medium"),
        ("ADAPTIVE_MODE", "sometimes"),
        ("ADAPTIVE_LEVELS", "many"),
        ("ADAPTIVE_TOKENS", " , "),
    ]));
    assert_eq!(settings.study.anthro, AnthroLevel::Low);
    assert!(!settings.adaptive.enabled);
    assert_eq!(settings.adaptive.levels, 5);
    assert_eq!(settings.adaptive.tokens, vec!["warmth", "empathy"]);
}

#[test]
fn config_path_prefers_env() {
    assert_eq!(
        config_path_with(env(&[("ANTHROKIT_CONFIG_PATH", "/etc/anthrokit.toml")])),
        PathBuf::from("/etc/anthrokit.toml")
    );
    assert_eq!(config_path_with(env(&[])), PathBuf::from("anthrokit.toml"));
}

#[test]
fn missing_settings_file_yields_defaults() {
    let tmp = tempfile::tempdir().expect("should create temp dir");
    let settings = load_settings(&tmp.path().join("absent.toml")).expect("defaults");
    assert_eq!(settings.study.anthro, AnthroLevel::Low);
}

#[test]
fn malformed_settings_file_is_an_error() {
    let tmp = tempfile::tempdir().expect("should create temp dir");
    let path = tmp.path().join("anthrokit.toml");
    std::fs::write(&path, "[adaptive]\nlevels = \"five\"\n").expect("write settings");
    assert!(load_settings(&path).is_err());
}

//! Registry document loading and validation.

use std::io::Write;

use anthrokit::registry::{ConfigError, Registry};

const MINIMAL: &str = r#"
version = "test"

[[tokens]]
name = "warmth"
kind = "continuous"
min = 0.0
max = 1.0

[[tokens]]
name = "emoji"
kind = "categorical"
values = ["none", "subtle"]

[[presets]]
name = "Plain"

[presets.values]
warmth = 0.4
emoji = "none"
"#;

#[test]
fn default_registry_exposes_policy_and_rules() {
    let registry = Registry::load_default().expect("built-in registry should load");
    assert_eq!(registry.version(), "1.0");
    assert!(registry.policy().no_deception);
    assert!(registry.policy().no_emojis_in_numbered_explanations);
    assert_eq!(registry.tokens().len(), 11);
    assert!((registry.rules().max_adjustment() - 0.30).abs() < 1e-9);
    assert_eq!(registry.rules().weights().len(), 8);
}

#[test]
fn load_reads_registry_from_file() {
    let mut file = tempfile::NamedTempFile::new().expect("should create temp file");
    file.write_all(MINIMAL.as_bytes())
        .expect("should write registry");

    let registry = Registry::load(file.path()).expect("minimal registry should load");
    assert_eq!(registry.version(), "test");
    assert_eq!(registry.presets().list_presets(), vec!["Plain"]);
    assert!(registry.rules().weights().is_empty());
}

#[test]
fn preset_missing_a_token_rejected() {
    let doc = MINIMAL.replace("emoji = \"none\"\n", "");
    let err = Registry::from_toml(&doc).expect_err("missing emoji should fail");
    assert!(
        matches!(&err, ConfigError::MissingValue { preset, token } if preset == "Plain" && token == "emoji"),
        "unexpected error: {err}"
    );
}

#[test]
fn out_of_domain_value_rejected() {
    let doc = MINIMAL.replace("warmth = 0.4", "warmth = 1.4");
    let err = Registry::from_toml(&doc).expect_err("warmth 1.4 should fail");
    assert!(matches!(err, ConfigError::OutOfDomain { .. }), "unexpected error: {err}");
}

#[test]
fn unlisted_label_rejected() {
    let doc = MINIMAL.replace("emoji = \"none\"", "emoji = \"loud\"");
    let err = Registry::from_toml(&doc).expect_err("unknown label should fail");
    assert!(matches!(err, ConfigError::OutOfDomain { .. }), "unexpected error: {err}");
}

#[test]
fn unknown_token_in_preset_rejected() {
    let doc = format!("{MINIMAL}sparkle = 0.5\n");
    let err = Registry::from_toml(&doc).expect_err("unknown token should fail");
    assert!(matches!(err, ConfigError::UnknownToken { .. }), "unexpected error: {err}");
}

#[test]
fn duplicate_preset_rejected() {
    let doc = format!(
        "{MINIMAL}\n[[presets]]\nname = \"Plain\"\n\n[presets.values]\nwarmth = 0.1\nemoji = \"none\"\n"
    );
    let err = Registry::from_toml(&doc).expect_err("duplicate preset should fail");
    assert!(matches!(err, ConfigError::DuplicatePreset(name) if name == "Plain"));
}

#[test]
fn document_without_presets_rejected() {
    let doc = r#"
[[tokens]]
name = "warmth"
kind = "continuous"
min = 0.0
max = 1.0
"#;
    let err = Registry::from_toml(doc).expect_err("no presets should fail");
    assert!(matches!(err, ConfigError::NoPresets));
}

#[test]
fn malformed_toml_is_parse_error() {
    let err = Registry::from_toml("tokens = [").expect_err("broken TOML should fail");
    assert!(matches!(err, ConfigError::Parse(_)));
}

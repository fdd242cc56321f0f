//! Personality adjustments applied to registry presets.

use std::collections::BTreeMap;

use anthrokit::personality::{Big5Trait, PersonalityVector};
use anthrokit::registry::{Preset, Registry};

fn registry() -> Registry {
    Registry::load_default().expect("built-in registry should load")
}

fn scores(e: f64, a: f64, c: f64, n: f64, o: f64) -> PersonalityVector {
    PersonalityVector::from_traits(BTreeMap::from([
        (Big5Trait::Extraversion, e),
        (Big5Trait::Agreeableness, a),
        (Big5Trait::Conscientiousness, c),
        (Big5Trait::Neuroticism, n),
        (Big5Trait::Openness, o),
    ]))
    .expect("scores should be valid")
}

fn number(preset: &Preset, token: &str) -> f64 {
    preset
        .number(token)
        .unwrap_or_else(|| panic!("{} has no numeric {token}", preset.name()))
}

#[test]
fn high_extraversion_caps_warmth_at_one() {
    let registry = registry();
    let base = registry.presets().load_preset("HighA").expect("HighA");
    let personalized = registry
        .personalizer()
        .apply_personality(&base, &scores(7.0, 4.0, 4.0, 4.0, 4.0));

    assert!((number(&personalized, "warmth") - 1.0).abs() < 1e-9);
    // Neutral traits leave the other continuous tokens alone.
    for token in ["formality", "empathy", "hedging", "humor"] {
        assert!(
            (number(&personalized, token) - number(&base, token)).abs() < 1e-9,
            "{token} should be unchanged"
        );
    }
}

#[test]
fn neutral_personality_is_identity_on_values() {
    let registry = registry();
    let personalizer = registry.personalizer();
    for name in registry.presets().list_presets() {
        let base = registry.presets().load_preset(name).expect("listed preset");
        let personalized = personalizer.apply_personality(&base, &scores(4.0, 4.0, 4.0, 4.0, 4.0));
        for (token, value) in base.iter() {
            assert_eq!(personalized.get(token), Some(value), "{name}.{token}");
        }
    }
}

#[test]
fn low_scores_clamp_at_zero() {
    let registry = registry();
    let base = registry.presets().load_preset("LowA").expect("LowA");
    let personalized = registry
        .personalizer()
        .apply_personality(&base, &scores(1.0, 1.0, 4.0, 4.0, 4.0));
    assert!(number(&personalized, "warmth").abs() < 1e-9);
}

#[test]
fn adjustments_are_capped() {
    let registry = registry();
    let deltas = registry
        .personalizer()
        .token_adjustments(&scores(7.0, 7.0, 1.0, 7.0, 7.0));
    assert!((deltas["warmth"] - 0.30).abs() < 1e-9);
    assert!((deltas["empathy"] - 0.30).abs() < 1e-9);
    assert!((deltas["formality"] + 0.30).abs() < 1e-9);
    assert!((deltas["hedging"] - 0.30).abs() < 1e-9);
    assert!(!deltas.contains_key("humor"));
}

#[test]
fn every_adjusted_value_stays_in_domain() {
    let registry = registry();
    let personalizer = registry.personalizer();
    let grid = [1.0, 2.5, 4.0, 5.5, 7.0];
    let presets: Vec<Preset> = registry
        .presets()
        .list_presets()
        .into_iter()
        .map(|name| registry.presets().load_preset(name).expect("listed preset"))
        .collect();

    for e in grid {
        for a in grid {
            for c in grid {
                for n in grid {
                    for o in grid {
                        let personality = scores(e, a, c, n, o);
                        for base in &presets {
                            let out = personalizer.apply_personality(base, &personality);
                            for def in registry.tokens().continuous() {
                                let v = number(&out, def.name());
                                let before = number(base, def.name());
                                assert!((0.0..=1.0).contains(&v));
                                assert!((v - before).abs() <= 0.30 + 1e-9);
                            }
                        }
                    }
                }
            }
        }
    }
}

#[test]
fn base_preset_is_not_modified() {
    let registry = registry();
    let base = registry.presets().load_preset("HighA").expect("HighA");
    let before = base.clone();
    let personality = scores(7.0, 7.0, 7.0, 7.0, 7.0);
    let first = registry.personalizer().apply_personality(&base, &personality);
    let second = registry.personalizer().apply_personality(&base, &personality);
    assert_eq!(base, before);
    assert_eq!(first, second);
    assert_eq!(first.name(), "HighA+personality");
}

#[test]
fn categorical_and_text_tokens_pass_through() {
    let registry = registry();
    let base = registry.presets().load_preset("HighA").expect("HighA");
    let out = registry
        .personalizer()
        .apply_personality(&base, &scores(1.0, 1.0, 1.0, 7.0, 1.0));
    for token in [
        "self_reference",
        "emoji",
        "persona_name",
        "greeting_style",
        "closing_style",
        "disclosure",
    ] {
        assert_eq!(out.get(token), base.get(token), "{token} should pass through");
    }
}

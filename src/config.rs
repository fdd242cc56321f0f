//! Runtime settings loading.
//!
//! Settings come from `anthrokit.toml` (or `$ANTHROKIT_CONFIG_PATH`); every
//! section uses `#[serde(default)]` so a missing or empty file is valid.
//! Environment variables override file values; file values override defaults.
//!
//! The tone registry itself (tokens, presets, trait weights) is a separate
//! document, see [`crate::registry::Registry`].

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

use crate::optimizer::Prior;

/// Top-level runtime settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Experimental condition selection.
    pub study: StudyConfig,
    /// Adaptive (bandit) mode.
    pub adaptive: AdaptiveConfig,
    /// Registry document location.
    pub registry: RegistryConfig,
    /// Log output.
    pub logging: LoggingConfig,
}

/// Anthropomorphism level of the fixed condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnthroLevel {
    /// High anthropomorphism (`HighA`).
    High,
    /// Low anthropomorphism (`LowA`).
    #[default]
    Low,
    /// No anthropomorphism (`NoA`).
    None,
}

impl AnthroLevel {
    /// Preset name for this level.
    pub fn preset_name(self) -> &'static str {
        match self {
            Self::High => "HighA",
            Self::Low => "LowA",
            Self::None => "NoA",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => Some(Self::High),
            "low" => Some(Self::Low),
            "none" => Some(Self::None),
            _ => None,
        }
    }
}

/// Condition settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StudyConfig {
    /// Base anthropomorphism level.
    pub anthro: AnthroLevel,
    /// Apply personality-based personalization on top of the base preset.
    pub personality_adaptation: bool,
}

/// Adaptive optimizer settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AdaptiveConfig {
    /// Enable bandit selection between tone variants.
    pub enabled: bool,
    /// Continuous tokens to vary.
    pub tokens: Vec<String>,
    /// Lower end of the exploration range.
    pub range_min: f64,
    /// Upper end of the exploration range.
    pub range_max: f64,
    /// Levels per token.
    pub levels: usize,
    /// Beta prior for every arm.
    pub prior: Prior,
    /// Score at or above which an outcome counts as a success.
    pub success_threshold: f64,
    /// Seed for reproducible selection. Entropy-seeded when absent.
    pub seed: Option<u64>,
}

impl Default for AdaptiveConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            tokens: vec!["warmth".to_owned(), "empathy".to_owned()],
            range_min: 0.25,
            range_max: 0.75,
            levels: 5,
            prior: Prior::default(),
            success_threshold: 5.0,
            seed: None,
        }
    }
}

/// Registry document location.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Path to a registry TOML. The compiled-in registry is used when absent.
    pub path: Option<PathBuf>,
}

/// Log output settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset.
    pub level: String,
    /// Directory for daily-rotated JSON logs. Stderr only when absent.
    pub logs_dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            logs_dir: None,
        }
    }
}

impl Settings {
    /// Load with precedence env vars > settings file > defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings file exists but cannot be read or parsed.
    pub fn load() -> anyhow::Result<Self> {
        let path = config_path_with(|key| std::env::var(key).ok());
        let mut settings = load_settings(&path)?;
        settings.apply_overrides(|key| std::env::var(key).ok());
        Ok(settings)
    }

    /// Parse a TOML string (no env overrides).
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not valid settings TOML.
    pub fn from_toml(toml_str: &str) -> anyhow::Result<Self> {
        toml::from_str(toml_str).context("failed to parse settings TOML")
    }

    /// Apply environment overrides through `env`, a resolver usable in tests.
    ///
    /// Unparseable values are ignored with a warning.
    pub fn apply_overrides(&mut self, env: impl Fn(&str) -> Option<String>) {
        if let Some(v) = env("ANTHROKIT_ANTHRO") {
            match AnthroLevel::parse(&v) {
                Some(level) => self.study.anthro = level,
                None => warn_invalid("ANTHROKIT_ANTHRO", &v),
            }
        }
        if let Some(v) = env("PERSONALITY_ADAPTATION") {
            match parse_switch(&v) {
                Some(on) => self.study.personality_adaptation = on,
                None => warn_invalid("PERSONALITY_ADAPTATION", &v),
            }
        }

        // Adaptive mode.
        if let Some(v) = env("ADAPTIVE_MODE") {
            match parse_switch(&v) {
                Some(on) => self.adaptive.enabled = on,
                None => warn_invalid("ADAPTIVE_MODE", &v),
            }
        }
        if let Some(v) = env("ADAPTIVE_TOKENS") {
            let tokens: Vec<String> = v
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_owned)
                .collect();
            if tokens.is_empty() {
                warn_invalid("ADAPTIVE_TOKENS", &v);
            } else {
                self.adaptive.tokens = tokens;
            }
        }
        if let Some(v) = env("ADAPTIVE_RANGE_MIN") {
            match v.trim().parse() {
                Ok(n) => self.adaptive.range_min = n,
                Err(_) => warn_invalid("ADAPTIVE_RANGE_MIN", &v),
            }
        }
        if let Some(v) = env("ADAPTIVE_RANGE_MAX") {
            match v.trim().parse() {
                Ok(n) => self.adaptive.range_max = n,
                Err(_) => warn_invalid("ADAPTIVE_RANGE_MAX", &v),
            }
        }
        if let Some(v) = env("ADAPTIVE_LEVELS") {
            match v.trim().parse() {
                Ok(n) => self.adaptive.levels = n,
                Err(_) => warn_invalid("ADAPTIVE_LEVELS", &v),
            }
        }
        if let Some(v) = env("ADAPTIVE_SEED") {
            match v.trim().parse() {
                Ok(n) => self.adaptive.seed = Some(n),
                Err(_) => warn_invalid("ADAPTIVE_SEED", &v),
            }
        }

        // Registry and logging.
        if let Some(v) = env("ANTHROKIT_REGISTRY_PATH") {
            self.registry.path = Some(PathBuf::from(v));
        }
        if let Some(v) = env("ANTHROKIT_LOG_LEVEL") {
            self.logging.level = v;
        }
    }
}

/// Resolve the settings path: `$ANTHROKIT_CONFIG_PATH`, else `./anthrokit.toml`.
pub fn config_path_with(env: impl Fn(&str) -> Option<String>) -> PathBuf {
    env("ANTHROKIT_CONFIG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("anthrokit.toml"))
}

/// Load settings from a TOML file. A missing file yields defaults.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_settings(path: &Path) -> anyhow::Result<Settings> {
    match std::fs::read_to_string(path) {
        Ok(contents) => {
            tracing::info!(path = %path.display(), "loading settings from file");
            toml::from_str(&contents)
                .with_context(|| format!("failed to parse settings at {}", path.display()))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::info!("no settings file found, using defaults");
            Ok(Settings::default())
        }
        Err(e) => Err(anyhow::anyhow!(
            "failed to read settings at {}: {e}",
            path.display()
        )),
    }
}

fn parse_switch(v: &str) -> Option<bool> {
    match v.trim().to_ascii_lowercase().as_str() {
        "enabled" | "true" | "1" | "on" => Some(true),
        "disabled" | "false" | "0" | "off" => Some(false),
        _ => None,
    }
}

fn warn_invalid(var: &str, value: &str) {
    tracing::warn!(var, value = %value, "ignoring invalid env override");
}

//! TOML registry document: token definitions, presets, trait rules and policy.
//!
//! The default document is compiled in from `config/anthrokit.toml`; a
//! replacement can be loaded from disk. Everything is validated once here so
//! the rest of the crate works with already-checked structures.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::preset::{Preset, PresetStore};
use super::token::{TokenDef, TokenKind, TokenRegistry, TokenValue};
use crate::personality::{AdjustmentRules, Big5Trait, Personalizer, TraitWeight};

/// Registry document shipped with the crate.
pub const DEFAULT_REGISTRY: &str = include_str!("../../config/anthrokit.toml");

/// Malformed or incomplete static configuration. Fatal at load time.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The document could not be read.
    #[error("failed to read registry at {}: {source}", path.display())]
    Read {
        /// Path that was read.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The document is not valid TOML for the registry schema.
    #[error("failed to parse registry: {0}")]
    Parse(#[from] toml::de::Error),

    /// Two tokens share a name.
    #[error("duplicate token '{0}'")]
    DuplicateToken(String),

    /// A token definition is malformed.
    #[error("invalid token '{token}': {reason}")]
    InvalidToken {
        /// Token name.
        token: String,
        /// What is wrong with it.
        reason: String,
    },

    /// The document defines no presets.
    #[error("registry defines no presets")]
    NoPresets,

    /// Two presets share a name.
    #[error("duplicate preset '{0}'")]
    DuplicatePreset(String),

    /// A preset lacks a value for a registered token.
    #[error("preset '{preset}' is missing a value for token '{token}'")]
    MissingValue {
        /// Preset name.
        preset: String,
        /// Token without a value.
        token: String,
    },

    /// A preset sets a token the registry does not define.
    #[error("preset '{preset}' sets unknown token '{token}'")]
    UnknownToken {
        /// Preset name.
        preset: String,
        /// Unregistered token.
        token: String,
    },

    /// A preset value lies outside its token's domain.
    #[error("preset '{preset}' token '{token}' value {value} is outside {domain}")]
    OutOfDomain {
        /// Preset name.
        preset: String,
        /// Token name.
        token: String,
        /// Offending value.
        value: String,
        /// Declared domain.
        domain: String,
    },

    /// A trait weight names an unknown trait.
    #[error("unknown trait '{0}' in personality weights")]
    UnknownTrait(String),

    /// A trait weight is unusable.
    #[error("invalid weight {trait_name}→{token}: {reason}")]
    InvalidWeight {
        /// Source trait.
        trait_name: String,
        /// Target token.
        token: String,
        /// What is wrong with it.
        reason: String,
    },

    /// Personalization parameters are out of range.
    #[error("invalid personality rule: {0}")]
    InvalidRule(String),
}

/// Safety guardrail flags carried alongside the presets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyFlags {
    /// Never pose as a human.
    pub no_deception: bool,
    /// Never claim feelings or lived experience.
    pub no_human_experience_claims: bool,
    /// Never infer sensitive attributes.
    pub no_sensitive_inference: bool,
    /// Keep emojis out of numbered explanation lists.
    pub no_emojis_in_numbered_explanations: bool,
}

impl Default for PolicyFlags {
    fn default() -> Self {
        Self {
            no_deception: true,
            no_human_experience_claims: true,
            no_sensitive_inference: true,
            no_emojis_in_numbered_explanations: true,
        }
    }
}

// ── Raw schema ──────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct RawDocument {
    #[serde(default = "default_version")]
    version: String,
    #[serde(default)]
    policy: PolicyFlags,
    tokens: Vec<RawToken>,
    #[serde(default)]
    presets: Vec<RawPreset>,
    #[serde(default)]
    personality: RawPersonality,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum RawKind {
    Continuous,
    Categorical,
    Text,
}

#[derive(Debug, Deserialize)]
struct RawToken {
    name: String,
    kind: RawKind,
    min: Option<f64>,
    max: Option<f64>,
    #[serde(default)]
    values: Vec<String>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawPreset {
    name: String,
    values: BTreeMap<String, TokenValue>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct RawPersonality {
    max_adjustment: f64,
    midpoint: f64,
    half_width: f64,
    weights: Vec<RawWeight>,
}

impl Default for RawPersonality {
    fn default() -> Self {
        Self {
            max_adjustment: AdjustmentRules::DEFAULT_MAX_ADJUSTMENT,
            midpoint: AdjustmentRules::DEFAULT_MIDPOINT,
            half_width: AdjustmentRules::DEFAULT_HALF_WIDTH,
            weights: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawWeight {
    #[serde(rename = "trait")]
    trait_name: String,
    token: String,
    weight: f64,
}

fn default_version() -> String {
    "unknown".to_owned()
}

// ── Validated registry ──────────────────────────────────────────

/// Fully validated registry: tokens, presets, trait rules and policy.
#[derive(Debug, Clone)]
pub struct Registry {
    version: String,
    policy: PolicyFlags,
    store: PresetStore,
    rules: AdjustmentRules,
}

impl Registry {
    /// Parse and validate the compiled-in default registry.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the shipped document is invalid.
    pub fn load_default() -> Result<Self, ConfigError> {
        Self::from_toml(DEFAULT_REGISTRY)
    }

    /// Read, parse and validate a registry document from disk.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] if the file cannot be read, or any
    /// validation error from [`Registry::from_toml`].
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let registry = Self::from_toml(&contents)?;
        tracing::info!(
            path = %path.display(),
            version = %registry.version,
            presets = registry.store.list_presets().len(),
            "loaded tone registry"
        );
        Ok(registry)
    }

    /// Parse and validate a registry document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for any schema or domain violation.
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let raw: RawDocument = toml::from_str(contents)?;

        let defs = raw
            .tokens
            .into_iter()
            .map(build_token)
            .collect::<Result<Vec<_>, _>>()?;
        let tokens = Arc::new(TokenRegistry::new(defs)?);

        let presets = raw
            .presets
            .into_iter()
            .map(|p| Preset::new(p.name, p.values))
            .collect();
        let store = PresetStore::new(Arc::clone(&tokens), presets)?;

        let weights = raw
            .personality
            .weights
            .into_iter()
            .map(|w| {
                let trait_name = w
                    .trait_name
                    .parse::<Big5Trait>()
                    .map_err(|_| ConfigError::UnknownTrait(w.trait_name.clone()))?;
                Ok(TraitWeight {
                    trait_name,
                    token: w.token,
                    weight: w.weight,
                })
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;
        let rules = AdjustmentRules::new(
            weights,
            raw.personality.max_adjustment,
            raw.personality.midpoint,
            raw.personality.half_width,
            &tokens,
        )?;

        Ok(Self {
            version: raw.version,
            policy: raw.policy,
            store,
            rules,
        })
    }

    /// Document version string.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Policy guardrail flags.
    pub fn policy(&self) -> &PolicyFlags {
        &self.policy
    }

    /// Preset store.
    pub fn presets(&self) -> &PresetStore {
        &self.store
    }

    /// Token registry.
    pub fn tokens(&self) -> &Arc<TokenRegistry> {
        self.store.tokens()
    }

    /// Trait adjustment rules.
    pub fn rules(&self) -> &AdjustmentRules {
        &self.rules
    }

    /// Personalizer wired to this registry's tokens and rules.
    pub fn personalizer(&self) -> Personalizer {
        Personalizer::new(Arc::clone(self.tokens()), self.rules.clone())
    }
}

fn build_token(raw: RawToken) -> Result<TokenDef, ConfigError> {
    let kind = match raw.kind {
        RawKind::Continuous => match (raw.min, raw.max) {
            (Some(min), Some(max)) => TokenKind::Continuous { min, max },
            _ => {
                return Err(ConfigError::InvalidToken {
                    token: raw.name,
                    reason: "continuous token needs min and max".to_owned(),
                })
            }
        },
        RawKind::Categorical => TokenKind::Categorical { values: raw.values },
        RawKind::Text => TokenKind::Text,
    };
    TokenDef::new(raw.name, kind, raw.description)
}

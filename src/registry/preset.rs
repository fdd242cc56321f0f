//! Named presets and the read-only preset store.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::Serialize;

use super::document::ConfigError;
use super::token::{TokenRegistry, TokenValue};

/// Requested preset name is not registered.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("preset '{name}' not found (available: {})", available.join(", "))]
pub struct NotFoundError {
    /// Name that was requested.
    pub name: String,
    /// Registered preset names, in registry order.
    pub available: Vec<String>,
}

/// A complete, named assignment of a value to every token.
///
/// Presets are immutable: every transformation (personalization, threshold
/// exploration) produces a new preset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Preset {
    name: String,
    values: BTreeMap<String, TokenValue>,
}

impl Preset {
    /// Build a preset from raw values. Domain checks happen in [`PresetStore::new`].
    pub fn new(name: impl Into<String>, values: BTreeMap<String, TokenValue>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    /// Preset name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Value assigned to `token`.
    pub fn get(&self, token: &str) -> Option<&TokenValue> {
        self.values.get(token)
    }

    /// Numeric value of a continuous token.
    pub fn number(&self, token: &str) -> Option<f64> {
        self.values.get(token).and_then(TokenValue::as_number)
    }

    /// Label of a categorical or text token.
    pub fn label(&self, token: &str) -> Option<&str> {
        self.values.get(token).and_then(TokenValue::as_label)
    }

    /// Iterate `(token, value)` pairs sorted by token name.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &TokenValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Copy of this preset with one token replaced.
    pub fn with_value(&self, token: &str, value: TokenValue) -> Self {
        let mut values = self.values.clone();
        values.insert(token.to_owned(), value);
        Self {
            name: self.name.clone(),
            values,
        }
    }

    /// Copy of this preset under a new name.
    pub fn renamed(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: self.values.clone(),
        }
    }

    /// Check every token is present with an in-domain value and nothing extra is set.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found, in registry token order.
    pub fn validate(&self, tokens: &TokenRegistry) -> Result<(), ConfigError> {
        for key in self.values.keys() {
            if tokens.get(key).is_none() {
                return Err(ConfigError::UnknownToken {
                    preset: self.name.clone(),
                    token: key.clone(),
                });
            }
        }
        for def in tokens.iter() {
            let value = self
                .values
                .get(def.name())
                .ok_or_else(|| ConfigError::MissingValue {
                    preset: self.name.clone(),
                    token: def.name().to_owned(),
                })?;
            if !def.admits(value) {
                return Err(ConfigError::OutOfDomain {
                    preset: self.name.clone(),
                    token: def.name().to_owned(),
                    value: value.to_string(),
                    domain: def.kind().to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Read-only registry of presets, validated once at construction.
#[derive(Debug, Clone)]
pub struct PresetStore {
    tokens: Arc<TokenRegistry>,
    presets: Vec<Preset>,
    index: HashMap<String, usize>,
}

impl PresetStore {
    /// Validate and index presets against the token registry.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if there are no presets, a name repeats, or
    /// any preset is missing a token or holds an out-of-domain value.
    pub fn new(tokens: Arc<TokenRegistry>, presets: Vec<Preset>) -> Result<Self, ConfigError> {
        if presets.is_empty() {
            return Err(ConfigError::NoPresets);
        }
        let mut index = HashMap::with_capacity(presets.len());
        for (i, preset) in presets.iter().enumerate() {
            preset.validate(&tokens)?;
            if index.insert(preset.name.clone(), i).is_some() {
                return Err(ConfigError::DuplicatePreset(preset.name.clone()));
            }
        }
        Ok(Self {
            tokens,
            presets,
            index,
        })
    }

    /// Return an owned copy of the named preset.
    ///
    /// # Errors
    ///
    /// Returns [`NotFoundError`] if `name` is not registered.
    pub fn load_preset(&self, name: &str) -> Result<Preset, NotFoundError> {
        self.index
            .get(name)
            .and_then(|&i| self.presets.get(i))
            .cloned()
            .ok_or_else(|| NotFoundError {
                name: name.to_owned(),
                available: self.list_presets().iter().map(|s| (*s).to_owned()).collect(),
            })
    }

    /// Preset names in registry insertion order.
    pub fn list_presets(&self) -> Vec<&str> {
        self.presets.iter().map(|p| p.name.as_str()).collect()
    }

    /// Whether `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Token registry the presets were validated against.
    pub fn tokens(&self) -> &Arc<TokenRegistry> {
        &self.tokens
    }
}

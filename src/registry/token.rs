//! Token definitions: the named dimensions of anthropomorphic tone.
//!
//! A [`TokenRegistry`] is built once from the registry document and shared
//! read-only (behind an `Arc`) by the preset store, the personalizer and the
//! explorer.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::document::ConfigError;

/// Value domain of a token.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// Continuous float in the closed interval `[min, max]`.
    Continuous {
        /// Lower bound (inclusive).
        min: f64,
        /// Upper bound (inclusive).
        max: f64,
    },
    /// One of a fixed set of labels.
    Categorical {
        /// Allowed labels.
        values: Vec<String>,
    },
    /// Free-form label such as a persona name. Never personalized.
    Text,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Continuous { min, max } => write!(f, "[{min}, {max}]"),
            Self::Categorical { values } => write!(f, "{{{}}}", values.join(", ")),
            Self::Text => f.write_str("any string"),
        }
    }
}

/// Concrete value a preset assigns to a token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TokenValue {
    /// Value of a continuous token.
    Number(f64),
    /// Value of a categorical or text token.
    Label(String),
}

impl TokenValue {
    /// Numeric value, if this is a [`TokenValue::Number`].
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Label(_) => None,
        }
    }

    /// Label, if this is a [`TokenValue::Label`].
    pub fn as_label(&self) -> Option<&str> {
        match self {
            Self::Number(_) => None,
            Self::Label(s) => Some(s),
        }
    }
}

impl fmt::Display for TokenValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Label(s) => write!(f, "{s:?}"),
        }
    }
}

impl From<f64> for TokenValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<&str> for TokenValue {
    fn from(s: &str) -> Self {
        Self::Label(s.to_owned())
    }
}

/// Definition of a single token.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenDef {
    name: String,
    kind: TokenKind,
    description: Option<String>,
}

impl TokenDef {
    /// Create a token definition, checking that its domain is well formed.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidToken`] for non-finite or inverted
    /// continuous bounds, or a categorical token without labels.
    pub fn new(
        name: impl Into<String>,
        kind: TokenKind,
        description: Option<String>,
    ) -> Result<Self, ConfigError> {
        let name = name.into();
        match &kind {
            TokenKind::Continuous { min, max } => {
                if !min.is_finite() || !max.is_finite() || min >= max {
                    return Err(ConfigError::InvalidToken {
                        token: name,
                        reason: format!("bounds [{min}, {max}] must be finite with min < max"),
                    });
                }
            }
            TokenKind::Categorical { values } => {
                if values.is_empty() {
                    return Err(ConfigError::InvalidToken {
                        token: name,
                        reason: "categorical token needs at least one value".to_owned(),
                    });
                }
            }
            TokenKind::Text => {}
        }
        Ok(Self {
            name,
            kind,
            description,
        })
    }

    /// Token name (unique key).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Value domain.
    pub fn kind(&self) -> &TokenKind {
        &self.kind
    }

    /// Human-readable description, if the registry provides one.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Whether this token carries a continuous value.
    pub fn is_continuous(&self) -> bool {
        matches!(self.kind, TokenKind::Continuous { .. })
    }

    /// Whether `value` lies in this token's domain.
    pub fn admits(&self, value: &TokenValue) -> bool {
        match (&self.kind, value) {
            (TokenKind::Continuous { min, max }, TokenValue::Number(n)) => {
                n.is_finite() && *n >= *min && *n <= *max
            }
            (TokenKind::Categorical { values }, TokenValue::Label(s)) => values.contains(s),
            (TokenKind::Text, TokenValue::Label(_)) => true,
            _ => false,
        }
    }

    /// Clamp a number into a continuous token's bounds.
    ///
    /// Non-continuous tokens return the input unchanged.
    pub fn clamp(&self, value: f64) -> f64 {
        match self.kind {
            TokenKind::Continuous { min, max } => value.clamp(min, max),
            _ => value,
        }
    }
}

/// Ordered, read-only set of token definitions.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenRegistry {
    tokens: Vec<TokenDef>,
    index: HashMap<String, usize>,
}

impl TokenRegistry {
    /// Build a registry, rejecting duplicate names.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::DuplicateToken`] if two definitions share a name.
    pub fn new(tokens: Vec<TokenDef>) -> Result<Self, ConfigError> {
        let mut index = HashMap::with_capacity(tokens.len());
        for (i, token) in tokens.iter().enumerate() {
            if index.insert(token.name.clone(), i).is_some() {
                return Err(ConfigError::DuplicateToken(token.name.clone()));
            }
        }
        Ok(Self { tokens, index })
    }

    /// Look up a token by name.
    pub fn get(&self, name: &str) -> Option<&TokenDef> {
        self.index.get(name).and_then(|&i| self.tokens.get(i))
    }

    /// Iterate definitions in registry order.
    pub fn iter(&self) -> impl Iterator<Item = &TokenDef> {
        self.tokens.iter()
    }

    /// Continuous tokens in registry order.
    pub fn continuous(&self) -> impl Iterator<Item = &TokenDef> {
        self.tokens.iter().filter(|t| t.is_continuous())
    }

    /// Token names in registry order.
    pub fn names(&self) -> Vec<&str> {
        self.tokens.iter().map(|t| t.name.as_str()).collect()
    }

    /// Number of tokens.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

//! Big Five personality vectors and trait-driven preset personalization.
//!
//! Scores come from a 1–7 Likert scale (TIPI). Each score is centred to
//! `[-1, 1]`, combined through the weighted trait→token rules, capped at
//! `±max_adjustment` per token and finally clamped to the token's domain.
//! Only continuous tokens are adjusted.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::registry::{ConfigError, Preset, TokenRegistry, TokenValue};

/// Lowest valid Likert score.
pub const SCORE_MIN: f64 = 1.0;
/// Highest valid Likert score.
pub const SCORE_MAX: f64 = 7.0;

/// Personality data is malformed.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    /// A required trait has no score.
    #[error("personality vector is missing trait '{0}'")]
    MissingTrait(Big5Trait),

    /// A trait name is not one of the Big Five.
    #[error("unknown personality trait '{0}'")]
    UnknownTrait(String),

    /// A score is outside `[1, 7]` or not finite.
    #[error("score {score} for '{trait_name}' is outside [1, 7]")]
    ScoreOutOfRange {
        /// Trait the score belongs to.
        trait_name: Big5Trait,
        /// Offending score.
        score: f64,
    },

    /// A TIPI item response is outside `1..=7`.
    #[error("TIPI item {item} response {response} is outside 1..=7")]
    ResponseOutOfRange {
        /// Zero-based item index.
        item: usize,
        /// Offending response.
        response: u8,
    },
}

/// The five personality traits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Big5Trait {
    /// Extraversion.
    Extraversion,
    /// Agreeableness.
    Agreeableness,
    /// Conscientiousness.
    Conscientiousness,
    /// Neuroticism.
    Neuroticism,
    /// Openness to experience.
    Openness,
}

impl Big5Trait {
    /// All traits in canonical order.
    pub const ALL: [Big5Trait; 5] = [
        Self::Extraversion,
        Self::Agreeableness,
        Self::Conscientiousness,
        Self::Neuroticism,
        Self::Openness,
    ];

    /// Snake-case name used in configuration and serialized vectors.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Extraversion => "extraversion",
            Self::Agreeableness => "agreeableness",
            Self::Conscientiousness => "conscientiousness",
            Self::Neuroticism => "neuroticism",
            Self::Openness => "openness",
        }
    }
}

impl fmt::Display for Big5Trait {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Big5Trait {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ValidationError::UnknownTrait(s.to_owned()))
    }
}

/// Validated Big Five scores for one participant. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct PersonalityVector {
    scores: BTreeMap<Big5Trait, f64>,
}

impl PersonalityVector {
    /// Build from `(trait name, score)` pairs.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] for an unknown trait name, a missing
    /// trait, or a score outside `[1, 7]`.
    pub fn from_scores<'a>(
        scores: impl IntoIterator<Item = (&'a str, f64)>,
    ) -> Result<Self, ValidationError> {
        let mut parsed = BTreeMap::new();
        for (name, score) in scores {
            parsed.insert(name.parse::<Big5Trait>()?, score);
        }
        Self::from_traits(parsed)
    }

    /// Build from typed trait scores.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] for a missing trait or out-of-range score.
    pub fn from_traits(scores: BTreeMap<Big5Trait, f64>) -> Result<Self, ValidationError> {
        for trait_name in Big5Trait::ALL {
            let score = *scores
                .get(&trait_name)
                .ok_or(ValidationError::MissingTrait(trait_name))?;
            if !score.is_finite() || !(SCORE_MIN..=SCORE_MAX).contains(&score) {
                return Err(ValidationError::ScoreOutOfRange { trait_name, score });
            }
        }
        Ok(Self { scores })
    }

    /// Score the Ten-Item Personality Inventory.
    ///
    /// Items are ordered per trait as (positive, reverse-keyed):
    /// E+, E−, A+, A−, C+, C−, N+, N−, O+, O−. Reverse-keyed items score
    /// `8 - response`; each trait is the mean of its two items.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::ResponseOutOfRange`] for a response outside `1..=7`.
    pub fn from_tipi(responses: [u8; 10]) -> Result<Self, ValidationError> {
        for (item, &response) in responses.iter().enumerate() {
            if !(1..=7).contains(&response) {
                return Err(ValidationError::ResponseOutOfRange { item, response });
            }
        }
        let scores = Big5Trait::ALL
            .into_iter()
            .zip(responses.chunks_exact(2))
            .map(|(trait_name, pair)| {
                let positive = f64::from(pair[0]);
                let reversed = 8.0 - f64::from(pair[1]);
                (trait_name, (positive + reversed) / 2.0)
            })
            .collect();
        Self::from_traits(scores)
    }

    /// Score for `trait_name`.
    pub fn score(&self, trait_name: Big5Trait) -> f64 {
        self.scores.get(&trait_name).copied().unwrap_or(SCORE_MIN)
    }

    /// Iterate `(trait, score)` in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (Big5Trait, f64)> + '_ {
        self.scores.iter().map(|(t, s)| (*t, *s))
    }
}

/// One trait→token influence.
#[derive(Debug, Clone, PartialEq)]
pub struct TraitWeight {
    /// Source trait.
    pub trait_name: Big5Trait,
    /// Target continuous token.
    pub token: String,
    /// Signed weight applied to the centred score.
    pub weight: f64,
}

/// Research-tunable trait→token adjustment table.
#[derive(Debug, Clone, PartialEq)]
pub struct AdjustmentRules {
    weights: Vec<TraitWeight>,
    max_adjustment: f64,
    midpoint: f64,
    half_width: f64,
}

impl AdjustmentRules {
    /// Default cap on the total per-token adjustment.
    pub const DEFAULT_MAX_ADJUSTMENT: f64 = 0.30;
    /// Default Likert midpoint.
    pub const DEFAULT_MIDPOINT: f64 = 4.0;
    /// Default Likert half-width.
    pub const DEFAULT_HALF_WIDTH: f64 = 3.0;

    /// Validate a rule table against the token registry.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidRule`] for a cap outside `(0, 1]` or a
    /// non-positive half-width, and [`ConfigError::InvalidWeight`] for a
    /// weight on an unknown or non-continuous token or a non-finite weight.
    pub fn new(
        weights: Vec<TraitWeight>,
        max_adjustment: f64,
        midpoint: f64,
        half_width: f64,
        tokens: &TokenRegistry,
    ) -> Result<Self, ConfigError> {
        if !(max_adjustment > 0.0 && max_adjustment <= 1.0) {
            return Err(ConfigError::InvalidRule(format!(
                "max_adjustment {max_adjustment} must be in (0, 1]"
            )));
        }
        if !midpoint.is_finite() || !half_width.is_finite() || half_width <= 0.0 {
            return Err(ConfigError::InvalidRule(format!(
                "midpoint {midpoint} / half_width {half_width} must be finite with half_width > 0"
            )));
        }
        for w in &weights {
            let reason = match tokens.get(&w.token) {
                None => Some("unknown token"),
                Some(def) if !def.is_continuous() => Some("token is not continuous"),
                Some(_) if !w.weight.is_finite() => Some("weight is not finite"),
                Some(_) => None,
            };
            if let Some(reason) = reason {
                return Err(ConfigError::InvalidWeight {
                    trait_name: w.trait_name.to_string(),
                    token: w.token.clone(),
                    reason: reason.to_owned(),
                });
            }
        }
        Ok(Self {
            weights,
            max_adjustment,
            midpoint,
            half_width,
        })
    }

    /// Cap on the absolute adjustment of any token.
    pub fn max_adjustment(&self) -> f64 {
        self.max_adjustment
    }

    /// Configured weights.
    pub fn weights(&self) -> &[TraitWeight] {
        &self.weights
    }

    /// Map a raw score onto `[-1, 1]`.
    pub fn centre(&self, score: f64) -> f64 {
        ((score - self.midpoint) / self.half_width).clamp(-1.0, 1.0)
    }
}

/// Produces personalized presets from a base preset and a personality vector.
#[derive(Debug, Clone)]
pub struct Personalizer {
    tokens: Arc<TokenRegistry>,
    rules: AdjustmentRules,
}

impl Personalizer {
    /// Create a personalizer over the given registry and rule table.
    pub fn new(tokens: Arc<TokenRegistry>, rules: AdjustmentRules) -> Self {
        Self { tokens, rules }
    }

    /// Rule table in use.
    pub fn rules(&self) -> &AdjustmentRules {
        &self.rules
    }

    /// Per-token deltas, each already capped at `±max_adjustment`.
    ///
    /// Only tokens with at least one weight appear in the result.
    pub fn token_adjustments(&self, personality: &PersonalityVector) -> BTreeMap<String, f64> {
        let mut sums: BTreeMap<String, f64> = BTreeMap::new();
        for w in self.rules.weights() {
            let contribution = w.weight * self.rules.centre(personality.score(w.trait_name));
            *sums.entry(w.token.clone()).or_insert(0.0) += contribution;
        }
        let cap = self.rules.max_adjustment();
        sums.into_iter()
            .map(|(token, delta)| (token, delta.clamp(-cap, cap)))
            .collect()
    }

    /// Apply personality adjustments to `base`, returning a new preset.
    ///
    /// Continuous tokens move by their capped delta and are clamped to the
    /// token domain; all other tokens pass through unchanged. Pure and
    /// deterministic: `base` is never modified.
    pub fn apply_personality(&self, base: &Preset, personality: &PersonalityVector) -> Preset {
        let adjustments = self.token_adjustments(personality);
        let mut personalized = base.renamed(format!("{}+personality", base.name()));
        for (token, delta) in &adjustments {
            let (Some(def), Some(current)) = (self.tokens.get(token), base.number(token)) else {
                continue;
            };
            let value = def.clamp(current + delta);
            personalized = personalized.with_value(token, TokenValue::Number(value));
        }
        tracing::debug!(
            base = %base.name(),
            adjusted = adjustments.len(),
            "applied personality adjustments"
        );
        personalized
    }
}

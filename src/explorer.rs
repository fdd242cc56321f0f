//! Systematic generation of tone variants between the low and high presets.
//!
//! The explorer turns two anchor presets into a pool of candidate presets
//! that the [`ToneOptimizer`](crate::optimizer::ToneOptimizer) can treat as
//! arms. Anchors default to `LowA` and `HighA`.

use std::sync::Arc;

use crate::registry::{NotFoundError, Preset, PresetStore, TokenRegistry, TokenValue};

/// Default low anchor preset.
pub const LOW_ANCHOR: &str = "LowA";
/// Default high anchor preset.
pub const HIGH_ANCHOR: &str = "HighA";

/// Bracket width at which the minimal-effective search stops.
const CONVERGENCE: f64 = 0.01;

/// Variant generation failed.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExploreError {
    /// The token is not registered.
    #[error("unknown token '{0}'")]
    UnknownToken(String),

    /// The operation needs a continuous token.
    #[error("token '{0}' is not continuous")]
    NotContinuous(String),

    /// At least two levels are needed to span a range.
    #[error("need at least 2 levels, got {0}")]
    TooFewLevels(usize),

    /// The exploration range is empty or outside the token domain.
    #[error("range [{lo}, {hi}] is not valid for token '{token}'")]
    InvalidRange {
        /// Token being explored.
        token: String,
        /// Lower end.
        lo: f64,
        /// Upper end.
        hi: f64,
    },

    /// An anchor preset is missing from the store.
    #[error(transparent)]
    Anchor(#[from] NotFoundError),
}

/// Generates preset variants along one or more tokens.
#[derive(Debug, Clone)]
pub struct ThresholdExplorer {
    tokens: Arc<TokenRegistry>,
    low: Preset,
    high: Preset,
}

impl ThresholdExplorer {
    /// Use `LowA` and `HighA` from `store` as anchors.
    ///
    /// # Errors
    ///
    /// Returns [`ExploreError::Anchor`] if either anchor is not registered.
    pub fn from_store(store: &PresetStore) -> Result<Self, ExploreError> {
        Ok(Self::new(
            Arc::clone(store.tokens()),
            store.load_preset(LOW_ANCHOR)?,
            store.load_preset(HIGH_ANCHOR)?,
        ))
    }

    /// Use explicit anchors.
    pub fn new(tokens: Arc<TokenRegistry>, low: Preset, high: Preset) -> Self {
        Self { tokens, low, high }
    }

    /// Vary one token from the low anchor's value to the high anchor's value.
    ///
    /// Continuous tokens get `n_levels` evenly spaced values applied to
    /// `base`; categorical and text tokens yield the two anchor values.
    /// A token whose anchors agree yields a single variant.
    ///
    /// # Errors
    ///
    /// Returns [`ExploreError`] for an unknown token or fewer than two levels.
    pub fn explore_dimension(
        &self,
        token: &str,
        n_levels: usize,
        base: &Preset,
    ) -> Result<Vec<Preset>, ExploreError> {
        check_levels(n_levels)?;
        Ok(self
            .dimension_values(token, n_levels)?
            .into_iter()
            .map(|value| variant(base, &[(token, value)]))
            .collect())
    }

    /// Vary each listed token across `[lo, hi]` in `n_levels` steps, one token at a time.
    ///
    /// This is the adaptive-mode pool: values are constrained to the
    /// configured threshold range rather than the anchor span.
    ///
    /// # Errors
    ///
    /// Returns [`ExploreError`] for an unknown or non-continuous token, an
    /// empty range or one outside the token domain, or fewer than two levels.
    pub fn explore_range(
        &self,
        base: &Preset,
        tokens: &[String],
        (lo, hi): (f64, f64),
        n_levels: usize,
    ) -> Result<Vec<Preset>, ExploreError> {
        check_levels(n_levels)?;
        let mut pool = Vec::with_capacity(tokens.len().saturating_mul(n_levels));
        for token in tokens {
            let def = self
                .tokens
                .get(token)
                .ok_or_else(|| ExploreError::UnknownToken(token.clone()))?;
            let in_domain = def.admits(&TokenValue::Number(lo)) && def.admits(&TokenValue::Number(hi));
            if !in_domain || lo >= hi {
                return Err(ExploreError::InvalidRange {
                    token: token.clone(),
                    lo,
                    hi,
                });
            }
            for value in linspace(lo, hi, n_levels) {
                pool.push(variant(base, &[(token, TokenValue::Number(value))]));
            }
        }
        tracing::debug!(base = %base.name(), size = pool.len(), "generated range pool");
        Ok(pool)
    }

    /// Full factorial over `tokens`, starting from the low anchor.
    ///
    /// Produces `n_levels^k` presets for `k` continuous tokens (categorical
    /// tokens contribute at most two levels each), so keep `tokens` short.
    ///
    /// # Errors
    ///
    /// Returns [`ExploreError`] for an unknown token or fewer than two levels.
    pub fn explore_grid(&self, tokens: &[String], n_levels: usize) -> Result<Vec<Preset>, ExploreError> {
        check_levels(n_levels)?;
        let mut combos: Vec<Vec<(&str, TokenValue)>> = vec![Vec::new()];
        for token in tokens {
            let values = self.dimension_values(token, n_levels)?;
            combos = combos
                .into_iter()
                .flat_map(|combo| {
                    values.iter().map(move |value| {
                        let mut next = combo.clone();
                        next.push((token.as_str(), value.clone()));
                        next
                    })
                })
                .collect();
        }
        Ok(combos
            .iter()
            .map(|assignments| variant(&self.low, assignments))
            .collect())
    }

    /// Binary-search the lowest value of `token` whose outcome still reaches `threshold`.
    ///
    /// The search runs between the low and high anchor values. Each candidate
    /// is the low anchor with `token` set to the bracket midpoint; an outcome
    /// at or above `threshold` moves the upper end down, anything else moves
    /// the lower end up. Stops after `max_iterations` or once the bracket is
    /// narrower than 0.01, and returns the low anchor with `token` at the
    /// upper end of the bracket.
    ///
    /// # Errors
    ///
    /// Returns [`ExploreError::UnknownToken`] for an unregistered token and
    /// [`ExploreError::NotContinuous`] for a categorical or text token.
    pub fn find_minimal_effective(
        &self,
        token: &str,
        mut outcome: impl FnMut(&Preset) -> f64,
        threshold: f64,
        max_iterations: usize,
    ) -> Result<Preset, ExploreError> {
        let def = self
            .tokens
            .get(token)
            .ok_or_else(|| ExploreError::UnknownToken(token.to_owned()))?;
        if !def.is_continuous() {
            return Err(ExploreError::NotContinuous(token.to_owned()));
        }
        let (mut lo, mut hi) = match (self.low.number(token), self.high.number(token)) {
            (Some(lo), Some(hi)) => (lo, hi),
            _ => return Err(ExploreError::UnknownToken(token.to_owned())),
        };

        for _ in 0..max_iterations {
            let mid = (lo + hi) / 2.0;
            let candidate = self.low.with_value(token, TokenValue::Number(def.clamp(mid)));
            if outcome(&candidate) >= threshold {
                hi = mid;
            } else {
                lo = mid;
            }
            if (hi - lo).abs() < CONVERGENCE {
                break;
            }
        }

        tracing::debug!(token, value = hi, threshold, "minimal effective value");
        Ok(variant(&self.low, &[(token, TokenValue::Number(def.clamp(hi)))]))
    }

    fn dimension_values(&self, token: &str, n_levels: usize) -> Result<Vec<TokenValue>, ExploreError> {
        let def = self
            .tokens
            .get(token)
            .ok_or_else(|| ExploreError::UnknownToken(token.to_owned()))?;
        let (low, high) = match (self.low.get(token), self.high.get(token)) {
            (Some(low), Some(high)) => (low, high),
            _ => return Err(ExploreError::UnknownToken(token.to_owned())),
        };
        if low == high {
            return Ok(vec![low.clone()]);
        }
        match (low.as_number(), high.as_number()) {
            (Some(lo), Some(hi)) if def.is_continuous() => Ok(linspace(lo, hi, n_levels)
                .into_iter()
                .map(|v| TokenValue::Number(def.clamp(v)))
                .collect()),
            _ => Ok(vec![low.clone(), high.clone()]),
        }
    }
}

fn check_levels(n_levels: usize) -> Result<(), ExploreError> {
    if n_levels < 2 {
        return Err(ExploreError::TooFewLevels(n_levels));
    }
    Ok(())
}

/// `n` evenly spaced values from `lo` to `hi` inclusive (`n >= 2`).
fn linspace(lo: f64, hi: f64, n: usize) -> Vec<f64> {
    let steps = u32::try_from(n.saturating_sub(1)).unwrap_or(u32::MAX);
    (0..=steps)
        .map(|i| lo + (hi - lo) * f64::from(i) / f64::from(steps))
        .collect()
}

fn variant(base: &Preset, assignments: &[(&str, TokenValue)]) -> Preset {
    let label = assignments
        .iter()
        .map(|(token, value)| match value {
            TokenValue::Number(n) => format!("{token}={n:.2}"),
            TokenValue::Label(s) => format!("{token}={s}"),
        })
        .collect::<Vec<_>>()
        .join(",");
    assignments
        .iter()
        .fold(base.renamed(format!("{}/{label}", base.name())), |p, (token, value)| {
            p.with_value(token, value.clone())
        })
}

//! Adaptive tone optimizer: a Thompson-sampling bandit over tone presets.
//!
//! Each [`Arm`] keeps a Beta(α, β) belief about its success probability.
//! [`ToneOptimizer::get_next_condition`] draws one sample per arm and
//! dispenses the arm with the largest draw; [`ToneOptimizer::record_outcome`]
//! bumps α on success and β on failure. Randomness comes from an injected
//! [`Rng`], so a seeded generator makes every selection sequence reproducible.
//!
//! One optimizer is owned by one session or study. Sharing statistics across
//! processes is the tracking collaborator's job: it should serialise
//! select/record pairs and persist [`ToneOptimizer::snapshot`].

use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Beta, Distribution};
use serde::{Deserialize, Serialize};

use crate::registry::Preset;

/// Outcome reported for an arm this optimizer does not track.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown arm '{arm_id}'")]
pub struct UnknownArmError {
    /// Identifier that was reported.
    pub arm_id: String,
}

/// Optimizer construction failed.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OptimizerError {
    /// No arms were supplied.
    #[error("optimizer needs at least one arm")]
    NoArms,

    /// Two arms share an identifier.
    #[error("duplicate arm '{0}'")]
    DuplicateArm(String),

    /// Prior or restored parameters are not strictly positive and finite.
    #[error("invalid Beta parameters for '{arm_id}': alpha={alpha}, beta={beta}")]
    InvalidParameters {
        /// Arm the parameters belong to (`"prior"` for the shared prior).
        arm_id: String,
        /// Alpha parameter.
        alpha: f64,
        /// Beta parameter.
        beta: f64,
    },

    /// A snapshot names an arm that is not registered.
    #[error(transparent)]
    UnknownArm(#[from] UnknownArmError),
}

/// Beta prior applied to every arm at creation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prior {
    /// Prior successes.
    pub alpha: f64,
    /// Prior failures.
    pub beta: f64,
}

impl Default for Prior {
    fn default() -> Self {
        Self {
            alpha: 1.0,
            beta: 1.0,
        }
    }
}

fn check_params(arm_id: &str, alpha: f64, beta: f64) -> Result<(), OptimizerError> {
    if alpha.is_finite() && beta.is_finite() && alpha > 0.0 && beta > 0.0 {
        return Ok(());
    }
    Err(OptimizerError::InvalidParameters {
        arm_id: arm_id.to_owned(),
        alpha,
        beta,
    })
}

/// Belief state of one arm.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArmStats {
    /// Prior successes plus observed successes.
    pub alpha: f64,
    /// Prior failures plus observed failures.
    pub beta: f64,
    /// Number of outcomes recorded.
    pub observations: u64,
}

impl ArmStats {
    fn from_prior(prior: Prior) -> Self {
        Self {
            alpha: prior.alpha,
            beta: prior.beta,
            observations: 0,
        }
    }

    /// Posterior mean `α / (α + β)`.
    pub fn mean(&self) -> f64 {
        self.alpha / (self.alpha + self.beta)
    }

    fn record(&mut self, success: bool) {
        if success {
            self.alpha += 1.0;
        } else {
            self.beta += 1.0;
        }
        self.observations = self.observations.saturating_add(1);
    }
}

/// A candidate tone configuration tracked by the optimizer.
#[derive(Debug, Clone, PartialEq)]
pub struct Arm {
    id: String,
    preset: Preset,
    stats: ArmStats,
}

impl Arm {
    /// Arm with an explicit identifier. Statistics are set from the optimizer's prior.
    pub fn new(id: impl Into<String>, preset: Preset) -> Self {
        Self {
            id: id.into(),
            preset,
            stats: ArmStats::from_prior(Prior::default()),
        }
    }

    /// Arm identified by the preset's own name.
    pub fn from_preset(preset: Preset) -> Self {
        Self::new(preset.name().to_owned(), preset)
    }

    /// Arm identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Tone configuration this arm dispenses.
    pub fn preset(&self) -> &Preset {
        &self.preset
    }

    /// Current belief state.
    pub fn stats(&self) -> ArmStats {
        self.stats
    }
}

/// Read-only export of one arm's belief.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArmSnapshot {
    /// Arm identifier.
    pub arm_id: String,
    /// Alpha parameter.
    pub alpha: f64,
    /// Beta parameter.
    pub beta: f64,
    /// Outcomes recorded so far.
    #[serde(default)]
    pub observations: u64,
}

/// Where the optimizer is in its dispense/record cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum OptimizerState {
    /// No arm is awaiting an outcome.
    Ready,
    /// An arm has been dispensed and its outcome is pending.
    AwaitingOutcome {
        /// Dispensed arm.
        arm_id: String,
    },
}

/// Aggregate view of an optimizer for dashboards and logs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptimizerStatistics {
    /// Outcomes recorded across all arms.
    pub n_trials: u64,
    /// Registered arms.
    pub n_arms: usize,
    /// Arms with at least one outcome.
    pub n_arms_tried: usize,
    /// `n_arms_tried / n_arms`.
    pub coverage: f64,
    /// Arm with the highest posterior mean.
    pub best_arm_id: String,
    /// Posterior mean of the best arm.
    pub best_mean: f64,
}

/// Thompson-sampling selector over a fixed set of arms.
#[derive(Debug)]
pub struct ToneOptimizer<R = StdRng> {
    arms: Vec<Arm>,
    index: HashMap<String, usize>,
    rng: R,
    state: OptimizerState,
    trials: u64,
}

impl ToneOptimizer<StdRng> {
    /// Optimizer driven by a [`StdRng`] seeded with `seed`.
    ///
    /// # Errors
    ///
    /// See [`ToneOptimizer::new`].
    pub fn seeded(arms: Vec<Arm>, prior: Prior, seed: u64) -> Result<Self, OptimizerError> {
        Self::new(arms, prior, StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> ToneOptimizer<R> {
    /// Create an optimizer with every arm reset to `prior`.
    ///
    /// # Errors
    ///
    /// Returns [`OptimizerError`] for an empty arm set, duplicate ids, or a
    /// prior that is not strictly positive.
    pub fn new(arms: Vec<Arm>, prior: Prior, rng: R) -> Result<Self, OptimizerError> {
        check_params("prior", prior.alpha, prior.beta)?;
        if arms.is_empty() {
            return Err(OptimizerError::NoArms);
        }
        let mut index = HashMap::with_capacity(arms.len());
        let mut arms = arms;
        for (i, arm) in arms.iter_mut().enumerate() {
            arm.stats = ArmStats::from_prior(prior);
            if index.insert(arm.id.clone(), i).is_some() {
                return Err(OptimizerError::DuplicateArm(arm.id.clone()));
            }
        }
        tracing::debug!(arms = arms.len(), alpha = prior.alpha, beta = prior.beta, "optimizer initialised");
        Ok(Self {
            arms,
            index,
            rng,
            state: OptimizerState::Ready,
            trials: 0,
        })
    }

    /// Rebuild an optimizer from a checkpoint.
    ///
    /// Arms named in `snapshot` take its parameters; arms absent from it
    /// start at `prior`.
    ///
    /// # Errors
    ///
    /// Returns [`OptimizerError::UnknownArm`] if the snapshot names an arm not
    /// in `arms`, [`OptimizerError::InvalidParameters`] for unusable
    /// parameters, or any error from [`ToneOptimizer::new`].
    pub fn restore(
        arms: Vec<Arm>,
        prior: Prior,
        snapshot: &[ArmSnapshot],
        rng: R,
    ) -> Result<Self, OptimizerError> {
        let mut optimizer = Self::new(arms, prior, rng)?;
        for entry in snapshot {
            check_params(&entry.arm_id, entry.alpha, entry.beta)?;
            let arm = optimizer.arm_mut(&entry.arm_id)?;
            arm.stats = ArmStats {
                alpha: entry.alpha,
                beta: entry.beta,
                observations: entry.observations,
            };
        }
        optimizer.trials = optimizer
            .arms
            .iter()
            .fold(0u64, |acc, arm| acc.saturating_add(arm.stats.observations));
        tracing::info!(arms = optimizer.arms.len(), trials = optimizer.trials, "optimizer restored");
        Ok(optimizer)
    }

    /// Draw from every arm's Beta posterior and dispense the arm with the largest draw.
    ///
    /// Exact ties go to the lowest-indexed arm. Statistics are untouched;
    /// the optimizer moves to [`OptimizerState::AwaitingOutcome`].
    pub fn get_next_condition(&mut self) -> &Arm {
        let mut best_idx = 0;
        let mut best_sample = f64::NEG_INFINITY;

        for (idx, arm) in self.arms.iter().enumerate() {
            let ArmStats { alpha, beta, .. } = arm.stats;
            let sample = match Beta::new(alpha, beta) {
                Ok(dist) => dist.sample(&mut self.rng),
                Err(e) => {
                    // Parameters are checked on every write, so this is a bug.
                    tracing::error!(arm = %arm.id, alpha, beta, error = %e, "invalid Beta parameters");
                    arm.stats.mean()
                }
            };
            if sample > best_sample {
                best_sample = sample;
                best_idx = idx;
            }
        }

        let arm = &self.arms[best_idx];
        tracing::debug!(arm = %arm.id, sample = best_sample, "dispensed arm");
        self.state = OptimizerState::AwaitingOutcome {
            arm_id: arm.id.clone(),
        };
        arm
    }

    /// Record a binary outcome for `arm_id`.
    ///
    /// Outcomes for registered arms other than the pending one are accepted
    /// (shared statistics); the pending marker clears only for its own arm.
    ///
    /// # Errors
    ///
    /// Returns [`UnknownArmError`] if `arm_id` is not registered. No
    /// statistics change in that case.
    pub fn record_outcome(&mut self, arm_id: &str, success: bool) -> Result<(), UnknownArmError> {
        let arm = self.arm_mut(arm_id)?;
        arm.stats.record(success);
        let stats = arm.stats;
        self.trials = self.trials.saturating_add(1);

        match self.pending().map(str::to_owned) {
            Some(pending) if pending == arm_id => self.state = OptimizerState::Ready,
            Some(pending) => {
                tracing::debug!(arm = %arm_id, pending = %pending, "outcome recorded for non-pending arm");
            }
            None => {}
        }
        tracing::debug!(arm = %arm_id, success, alpha = stats.alpha, beta = stats.beta, "recorded outcome");
        Ok(())
    }

    /// Record a continuous score, counting it as a success when `score >= threshold`.
    ///
    /// Returns whether the score counted as a success.
    ///
    /// # Errors
    ///
    /// Returns [`UnknownArmError`] if `arm_id` is not registered.
    pub fn record_score(
        &mut self,
        arm_id: &str,
        score: f64,
        threshold: f64,
    ) -> Result<bool, UnknownArmError> {
        let success = score >= threshold;
        self.record_outcome(arm_id, success)?;
        Ok(success)
    }

    fn arm_mut(&mut self, arm_id: &str) -> Result<&mut Arm, UnknownArmError> {
        self.index
            .get(arm_id)
            .copied()
            .and_then(|i| self.arms.get_mut(i))
            .ok_or_else(|| UnknownArmError {
                arm_id: arm_id.to_owned(),
            })
    }
}

impl<R> ToneOptimizer<R> {
    /// Registered arms in registration order.
    pub fn arms(&self) -> &[Arm] {
        &self.arms
    }

    /// Look up an arm by id.
    pub fn arm(&self, arm_id: &str) -> Option<&Arm> {
        self.index.get(arm_id).and_then(|&i| self.arms.get(i))
    }

    /// Current dispense/record state.
    pub fn state(&self) -> &OptimizerState {
        &self.state
    }

    /// Arm awaiting an outcome, if any.
    pub fn pending(&self) -> Option<&str> {
        match &self.state {
            OptimizerState::AwaitingOutcome { arm_id } => Some(arm_id.as_str()),
            OptimizerState::Ready => None,
        }
    }

    /// Arm with the highest posterior mean (lowest index on ties).
    pub fn best_arm(&self) -> &Arm {
        let mut best = &self.arms[0];
        for arm in &self.arms[1..] {
            if arm.stats.mean() > best.stats.mean() {
                best = arm;
            }
        }
        best
    }

    /// Aggregate statistics.
    pub fn statistics(&self) -> OptimizerStatistics {
        let n_arms = self.arms.len();
        let n_arms_tried = self.arms.iter().filter(|a| a.stats.observations > 0).count();
        let best = self.best_arm();
        #[allow(clippy::cast_precision_loss)]
        let coverage = n_arms_tried as f64 / n_arms as f64;
        OptimizerStatistics {
            n_trials: self.trials,
            n_arms,
            n_arms_tried,
            coverage,
            best_arm_id: best.id.clone(),
            best_mean: best.stats.mean(),
        }
    }

    /// Export `(arm_id, alpha, beta)` for every arm in registration order.
    pub fn snapshot(&self) -> Vec<ArmSnapshot> {
        self.arms
            .iter()
            .map(|arm| ArmSnapshot {
                arm_id: arm.id.clone(),
                alpha: arm.stats.alpha,
                beta: arm.stats.beta,
                observations: arm.stats.observations,
            })
            .collect()
    }
}

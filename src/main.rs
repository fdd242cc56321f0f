//! AnthroKit CLI entry point.
//!
//! Inspect presets, personalize them from personality scores, generate
//! threshold variants, resolve the configured study condition, and run
//! seeded bandit simulations.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::info;

use anthrokit::config::Settings;
use anthrokit::explorer::ThresholdExplorer;
use anthrokit::logging;
use anthrokit::optimizer::{Arm, ArmSnapshot, OptimizerStatistics, ToneOptimizer};
use anthrokit::personality::{Big5Trait, PersonalityVector};
use anthrokit::registry::Registry;
use anthrokit::tracking::{SessionStart, SessionTracker};

/// AnthroKit: anthropomorphic tone presets and adaptive tone selection.
#[derive(Parser)]
#[command(name = "anthrokit", version, about)]
struct Cli {
    /// Registry TOML to use instead of the configured or built-in one.
    #[arg(long, global = true)]
    registry: Option<PathBuf>,

    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

/// Available CLI subcommands.
#[derive(Subcommand)]
enum Command {
    /// List preset names in registry order.
    Presets,
    /// Print one preset as JSON.
    Show {
        /// Preset name, e.g. `HighA`.
        preset: String,
    },
    /// Personalize a preset from Big Five scores (1-7).
    Personalize {
        /// Base preset name.
        preset: String,
        /// Extraversion score.
        #[arg(long)]
        extraversion: f64,
        /// Agreeableness score.
        #[arg(long)]
        agreeableness: f64,
        /// Conscientiousness score.
        #[arg(long)]
        conscientiousness: f64,
        /// Neuroticism score.
        #[arg(long)]
        neuroticism: f64,
        /// Openness score.
        #[arg(long)]
        openness: f64,
    },
    /// Generate variants of a base preset along one token.
    Explore {
        /// Token to vary.
        token: String,
        /// Number of levels.
        #[arg(long, default_value_t = 5)]
        levels: usize,
        /// Base preset the variants start from.
        #[arg(long, default_value = "LowA")]
        base: String,
    },
    /// Resolve the tone condition the current settings would present.
    Condition {
        /// Ten TIPI responses (1-7), comma separated.
        #[arg(long, value_delimiter = ',')]
        tipi: Option<Vec<u8>>,
        /// JSON array of arm snapshots to resume the optimizer from.
        #[arg(long)]
        snapshot: Option<PathBuf>,
    },
    /// Run a simulated Thompson-sampling study over named presets.
    Simulate {
        /// Presets to use as arms.
        #[arg(long, value_delimiter = ',', required = true)]
        arms: Vec<String>,
        /// Success probability of each arm, in the same order.
        #[arg(long, value_delimiter = ',', required = true)]
        rates: Vec<f64>,
        /// Number of select/record cycles.
        #[arg(long, default_value_t = 500)]
        rounds: u32,
        /// Seed for both the optimizer and the simulated participants.
        #[arg(long)]
        seed: Option<u64>,
    },
}

fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let mut settings = Settings::load().context("failed to load settings")?;
    if let Some(path) = cli.registry {
        settings.registry.path = Some(path);
    }

    let _logging_guard = match &settings.logging.logs_dir {
        Some(dir) => Some(logging::init_study(dir, &settings.logging.level)?),
        None => {
            logging::init_cli(&settings.logging.level);
            None
        }
    };

    let registry = match &settings.registry.path {
        Some(path) => Registry::load(path)
            .with_context(|| format!("failed to load registry {}", path.display()))?,
        None => Registry::load_default().context("built-in registry is invalid")?,
    };

    match cli.command {
        Command::Presets => {
            for name in registry.presets().list_presets() {
                println!("{name}");
            }
            Ok(())
        }
        Command::Show { preset } => print_json(&registry.presets().load_preset(&preset)?),
        Command::Personalize {
            preset,
            extraversion,
            agreeableness,
            conscientiousness,
            neuroticism,
            openness,
        } => {
            let scores = BTreeMap::from([
                (Big5Trait::Extraversion, extraversion),
                (Big5Trait::Agreeableness, agreeableness),
                (Big5Trait::Conscientiousness, conscientiousness),
                (Big5Trait::Neuroticism, neuroticism),
                (Big5Trait::Openness, openness),
            ]);
            let personality = PersonalityVector::from_traits(scores)?;
            handle_personalize(&registry, &preset, &personality)
        }
        Command::Explore {
            token,
            levels,
            base,
        } => {
            let explorer = ThresholdExplorer::from_store(registry.presets())?;
            let base = registry.presets().load_preset(&base)?;
            print_json(&explorer.explore_dimension(&token, levels, &base)?)
        }
        Command::Condition { tipi, snapshot } => {
            handle_condition(&registry, &settings, tipi, snapshot.as_deref())
        }
        Command::Simulate {
            arms,
            rates,
            rounds,
            seed,
        } => handle_simulate(&registry, &settings, &arms, &rates, rounds, seed),
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print the personalized preset together with the deltas that produced it.
fn handle_personalize(
    registry: &Registry,
    preset: &str,
    personality: &PersonalityVector,
) -> anyhow::Result<()> {
    #[derive(Serialize)]
    struct Output {
        adjustments: BTreeMap<String, f64>,
        preset: anthrokit::registry::Preset,
    }

    let base = registry.presets().load_preset(preset)?;
    let personalizer = registry.personalizer();
    print_json(&Output {
        adjustments: personalizer.token_adjustments(personality),
        preset: personalizer.apply_personality(&base, personality),
    })
}

/// Build the configured condition and print its session-start record.
fn handle_condition(
    registry: &Registry,
    settings: &Settings,
    tipi: Option<Vec<u8>>,
    snapshot: Option<&Path>,
) -> anyhow::Result<()> {
    let base_name = settings.study.anthro.preset_name();
    let mut preset = registry.presets().load_preset(base_name)?;

    let personality = match tipi {
        Some(responses) => {
            let responses: [u8; 10] = responses
                .try_into()
                .map_err(|_| anyhow::anyhow!("--tipi needs exactly 10 responses"))?;
            Some(PersonalityVector::from_tipi(responses)?)
        }
        None => None,
    };
    if settings.study.personality_adaptation {
        let Some(personality) = &personality else {
            bail!("personality adaptation is enabled but no --tipi responses were given");
        };
        preset = registry.personalizer().apply_personality(&preset, personality);
    }

    let mut arm_id = None;
    if settings.adaptive.enabled {
        let explorer = ThresholdExplorer::from_store(registry.presets())?;
        let pool = explorer.explore_range(
            &preset,
            &settings.adaptive.tokens,
            (settings.adaptive.range_min, settings.adaptive.range_max),
            settings.adaptive.levels,
        )?;
        let arms = pool.into_iter().map(Arm::from_preset).collect();
        let seed = settings.adaptive.seed.unwrap_or_else(rand::random);
        let mut optimizer = match snapshot {
            Some(path) => {
                let contents = std::fs::read_to_string(path)
                    .with_context(|| format!("failed to read snapshot {}", path.display()))?;
                let entries: Vec<ArmSnapshot> = serde_json::from_str(&contents)
                    .with_context(|| format!("failed to parse snapshot {}", path.display()))?;
                ToneOptimizer::restore(
                    arms,
                    settings.adaptive.prior,
                    &entries,
                    StdRng::seed_from_u64(seed),
                )?
            }
            None => ToneOptimizer::seeded(arms, settings.adaptive.prior, seed)?,
        };
        let arm = optimizer.get_next_condition();
        info!(arm = %arm.id(), seed, "adaptive condition selected");
        arm_id = Some(arm.id().to_owned());
        preset = arm.preset().clone();
    } else if snapshot.is_some() {
        bail!("--snapshot needs adaptive mode (ADAPTIVE_MODE=enabled)");
    }

    let adaptation = if settings.study.personality_adaptation {
        "enabled"
    } else {
        "disabled"
    };
    let mut tracker = SessionTracker::new();
    tracker.start_session(SessionStart {
        participant_id: None,
        condition: format!("{base_name}_{adaptation}"),
        preset: Some(preset),
        arm_id,
        personality,
    });
    print!("{}", tracker.to_jsonl()?);
    Ok(())
}

/// Simulate participants with fixed per-arm success rates.
fn handle_simulate(
    registry: &Registry,
    settings: &Settings,
    arm_names: &[String],
    rates: &[f64],
    rounds: u32,
    seed: Option<u64>,
) -> anyhow::Result<()> {
    #[derive(Serialize)]
    struct Report {
        seed: u64,
        rounds: u32,
        selections: BTreeMap<String, u64>,
        statistics: OptimizerStatistics,
        snapshot: Vec<ArmSnapshot>,
    }

    if arm_names.len() != rates.len() {
        bail!(
            "{} arms but {} rates; give one rate per arm",
            arm_names.len(),
            rates.len()
        );
    }
    if let Some(bad) = rates.iter().find(|r| !(0.0..=1.0).contains(*r)) {
        bail!("success rate {bad} is outside [0, 1]");
    }

    let arms = arm_names
        .iter()
        .map(|name| registry.presets().load_preset(name).map(Arm::from_preset))
        .collect::<Result<Vec<_>, _>>()?;
    let rate_by_arm: BTreeMap<&str, f64> = arm_names
        .iter()
        .map(String::as_str)
        .zip(rates.iter().copied())
        .collect();

    let seed = seed
        .or(settings.adaptive.seed)
        .unwrap_or_else(rand::random);
    let mut optimizer = ToneOptimizer::seeded(arms, settings.adaptive.prior, seed)?;
    let mut participants = StdRng::seed_from_u64(seed.wrapping_add(1));
    let mut selections: BTreeMap<String, u64> = BTreeMap::new();

    info!(seed, rounds, arms = arm_names.len(), "starting simulation");
    for _ in 0..rounds {
        let arm_id = optimizer.get_next_condition().id().to_owned();
        let rate = rate_by_arm.get(arm_id.as_str()).copied().unwrap_or(0.0);
        let success = participants.gen_bool(rate);
        optimizer.record_outcome(&arm_id, success)?;
        let count = selections.entry(arm_id).or_insert(0);
        *count = count.saturating_add(1);
    }

    print_json(&Report {
        seed,
        rounds,
        selections,
        statistics: optimizer.statistics(),
        snapshot: optimizer.snapshot(),
    })
}

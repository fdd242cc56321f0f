//! AnthroKit: anthropomorphic tone presets for conversational agents.
//!
//! Loads a validated registry of tone tokens and presets, personalizes a
//! preset from Big Five personality scores, and picks between tone variants
//! with a seeded Thompson-sampling bandit that learns from session outcomes.
//!
//! See `DESIGN.md` for the module map.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod logging;
pub mod registry;

pub mod explorer;
pub mod optimizer;
pub mod personality;

pub mod tracking;

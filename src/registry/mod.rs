//! Token registry, preset store and the registry document they load from.

pub mod document;
pub mod preset;
pub mod token;

pub use document::{ConfigError, PolicyFlags, Registry, DEFAULT_REGISTRY};
pub use preset::{NotFoundError, Preset, PresetStore};
pub use token::{TokenDef, TokenKind, TokenRegistry, TokenValue};

//! Configuration module for ttstreambot.
//!
//! Provides `BotConfig` (top-level settings) and its sections, `ConfigPaths`
//! for the config directory layout and first-run bootstrap, and TOML loading
//! with validation via `BotConfig::load_from`.

pub mod paths;
pub mod settings;

pub use paths::{Bootstrap, ConfigPaths};
pub use settings::{
    obfuscate, BaresipConfig, BotConfig, ConfigError, FestivalConfig, PhoneConfig, TwitchConfig,
};

//! Bot settings structs, defaults, validation and TOML loading.
//!
//! The settings file has four sections: `[twitch]`, `[festival]`, `[phone]`
//! and `[baresip]`.  Everything is validated once at startup; a
//! [`ConfigError`] aborts the process before any external program is started.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::paths::expand_home;
use crate::phone::{Destination, SipAccount};
use crate::voice::{SelectionMode, Voice};

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Errors raised while loading or validating the settings file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The settings file could not be read.
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The settings file is not valid TOML or does not match the schema.
    #[error("invalid settings file: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value violates one of the settings constraints.
    #[error("{0}")]
    Invalid(String),
}

// ---------------------------------------------------------------------------
// TwitchConfig
// ---------------------------------------------------------------------------

/// Credentials for the streaming platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TwitchConfig {
    /// Client ID from registering an application.
    pub client_id: String,
    /// Client secret from registering an application.
    pub client_secret: String,
    /// Username of the person running the bot.
    pub username: String,
}

// ---------------------------------------------------------------------------
// FestivalConfig
// ---------------------------------------------------------------------------

/// Voice roster and synthesis settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FestivalConfig {
    /// All voices callers can be assigned to.
    pub voices: Vec<Voice>,
    /// Fixed voice per caller display name.
    #[serde(default)]
    pub voices_override: BTreeMap<String, Voice>,
    /// `Duration_Stretch` for voices that do not set their own.
    #[serde(default = "default_stretch")]
    pub stretch: f64,
    /// How callers without an override are assigned a voice.
    #[serde(default)]
    pub selection: SelectionMode,
    /// Speak underscores in caller names as spaces.
    #[serde(default)]
    pub replace_name_underscores: bool,
    /// Path or name of Festival's `text2wave` script.
    #[serde(default = "default_text2wave")]
    pub text2wave: PathBuf,
}

fn default_stretch() -> f64 {
    1.0
}

fn default_text2wave() -> PathBuf {
    PathBuf::from("text2wave")
}

// ---------------------------------------------------------------------------
// PhoneConfig
// ---------------------------------------------------------------------------

/// Which redemptions call which destination.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhoneConfig {
    /// Reward title → call destination.  Matching is case sensitive.
    pub destinations: BTreeMap<String, Destination>,
    /// Seconds to wait for the far end to answer; `0` waits forever.
    #[serde(default = "default_dial_timeout")]
    pub dial_timeout_secs: u64,
}

fn default_dial_timeout() -> u64 {
    60
}

// ---------------------------------------------------------------------------
// BaresipConfig
// ---------------------------------------------------------------------------

/// Settings for the baresip child process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaresipConfig {
    /// Where baresip keeps its config and accounts.  `None` uses the bot's
    /// own config directory.
    #[serde(default)]
    pub config_dir: Option<PathBuf>,
    /// Path or name of the baresip executable.
    #[serde(default = "default_baresip_binary")]
    pub binary: PathBuf,
    /// SIP user registered when baresip starts without accounts.
    #[serde(default = "default_sip_user")]
    pub user: String,
    /// Password for `user`.
    #[serde(default = "default_sip_password")]
    pub password: String,
    /// SIP registrar / PBX host the account belongs to.
    #[serde(default)]
    pub gateway: String,
}

fn default_baresip_binary() -> PathBuf {
    PathBuf::from("baresip")
}

fn default_sip_user() -> String {
    "ttstreambot".into()
}

fn default_sip_password() -> String {
    "service".into()
}

impl Default for BaresipConfig {
    fn default() -> Self {
        Self {
            config_dir: None,
            binary: default_baresip_binary(),
            user: default_sip_user(),
            password: default_sip_password(),
            gateway: String::new(),
        }
    }
}

impl BaresipConfig {
    /// The account baresip registers as.
    pub fn account(&self) -> SipAccount {
        SipAccount {
            user: self.user.clone(),
            password: self.password.clone(),
            gateway: self.gateway.clone(),
        }
    }

    /// The baresip config directory, falling back to `bot_dir`.
    pub fn resolve_dir(&self, bot_dir: &Path) -> PathBuf {
        match &self.config_dir {
            Some(dir) => expand_home(dir),
            None => bot_dir.to_path_buf(),
        }
    }
}

// ---------------------------------------------------------------------------
// BotConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level settings, serialised as `ttstreambot.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    pub twitch: TwitchConfig,
    pub festival: FestivalConfig,
    pub phone: PhoneConfig,
    #[serde(default)]
    pub baresip: BaresipConfig,
}

impl BotConfig {
    /// Load and validate settings from `path`.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        log::debug!("loading configuration from {}", path.display());
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate settings from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check every constraint, reporting the first violation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("client_id", &self.twitch.client_id),
            ("client_secret", &self.twitch.client_secret),
            ("username", &self.twitch.username),
        ];
        for (key, value) in required {
            if value.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "[twitch] '{key}' must have a value"
                )));
            }
        }

        if self.festival.voices.is_empty() {
            return Err(ConfigError::Invalid(
                "[festival] At least one voice must be configured".into(),
            ));
        }
        if !valid_stretch(self.festival.stretch) {
            return Err(ConfigError::Invalid(
                "[festival] 'stretch' must be a positive number".into(),
            ));
        }
        let voices = self
            .festival
            .voices
            .iter()
            .chain(self.festival.voices_override.values());
        for voice in voices {
            if let Some(stretch) = voice.stretch {
                if !valid_stretch(stretch) {
                    return Err(ConfigError::Invalid(format!(
                        "[festival] stretch of voice '{}' must be a positive number",
                        voice.name
                    )));
                }
            }
        }

        if self.phone.destinations.is_empty() {
            return Err(ConfigError::Invalid(
                "[phone] At least one redemption destination must be defined".into(),
            ));
        }
        for (reward, dest) in &self.phone.destinations {
            if dest.host.is_empty() || dest.user.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "[phone] destination for '{reward}' needs both 'host' and 'user'"
                )));
            }
        }

        for (key, value) in [
            ("user", &self.baresip.user),
            ("gateway", &self.baresip.gateway),
        ] {
            if value.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "[baresip] '{key}' must have a value"
                )));
            }
        }

        Ok(())
    }

    /// Log the effective configuration at startup, with credentials masked.
    pub fn log_summary(&self, baresip_dir: &Path) {
        log::info!("[twitch] username: {}", self.twitch.username);
        log::info!("[twitch] client id: {}", obfuscate(&self.twitch.client_id));
        log::info!("[twitch] client secret: {}", obfuscate(&self.twitch.client_secret));

        if self.festival.voices_override.is_empty() {
            log::info!("[festival] no voice overrides present");
        }
        for (caller, voice) in &self.festival.voices_override {
            log::info!(
                "[festival] override {caller} -> {} (stretch {})",
                voice.name,
                voice.stretch.unwrap_or(self.festival.stretch)
            );
        }
        log::info!(
            "[festival] {} voice(s), selection: {}",
            self.festival.voices.len(),
            self.festival.selection.label()
        );

        for (reward, dest) in &self.phone.destinations {
            log::info!("[phone] '{reward}' -> {}", dest.address());
        }

        log::info!("[baresip] config dir: {}", baresip_dir.display());
        log::info!(
            "[baresip] account: {}@{} (password {})",
            self.baresip.user,
            self.baresip.gateway,
            obfuscate(&self.baresip.password)
        );
    }
}

fn valid_stretch(stretch: f64) -> bool {
    stretch.is_finite() && stretch > 0.0
}

/// Keep the first and last four characters of a secret, mask the rest.
pub fn obfuscate(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= 8 {
        return "x".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}{}{tail}", "x".repeat(chars.len() - 8))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

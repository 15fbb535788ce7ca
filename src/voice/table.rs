//! Caller → voice assignment.
//!
//! [`VoiceTable`] is built once from the `[festival]` settings and is
//! read-only afterwards.  Lookups never fail: construction already guarantees
//! at least one voice.

use std::collections::BTreeMap;

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::ring::HashRing;
use crate::config::{ConfigError, FestivalConfig};

/// Voices whose `Duration_Stretch` Festival cannot change.
pub const NO_STRETCH: &[&str] = &["cmu_us_slt_arctic_hts"];

// ---------------------------------------------------------------------------
// Voice
// ---------------------------------------------------------------------------

/// A Festival voice, named without its `voice_` prefix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Voice {
    pub name: String,
    /// Overrides the table's default stretch when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stretch: Option<f64>,
}

impl Voice {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stretch: None,
        }
    }

    pub fn with_stretch(mut self, stretch: f64) -> Self {
        self.stretch = Some(stretch);
        self
    }

    /// `true` when Festival ignores `Duration_Stretch` for this voice.
    pub fn is_stretchable(&self) -> bool {
        !NO_STRETCH.contains(&self.name.as_str())
    }
}

// ---------------------------------------------------------------------------
// SelectionMode
// ---------------------------------------------------------------------------

/// How callers without an override are assigned a voice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionMode {
    /// A fresh uniformly random voice on every redemption.
    Random,
    /// The same voice for the same caller, via a consistent-hash ring.
    #[default]
    Hashed,
}

impl SelectionMode {
    pub fn label(&self) -> &'static str {
        match self {
            SelectionMode::Random => "random",
            SelectionMode::Hashed => "hashed",
        }
    }
}

// ---------------------------------------------------------------------------
// VoiceTable
// ---------------------------------------------------------------------------

/// Immutable voice roster plus per-caller overrides.
#[derive(Debug, Clone)]
pub struct VoiceTable {
    voices: Vec<Voice>,
    overrides: BTreeMap<String, Voice>,
    selection: SelectionMode,
    default_stretch: f64,
    ring: HashRing,
}

impl VoiceTable {
    /// Build a table; fails when `voices` is empty.
    pub fn new(
        voices: Vec<Voice>,
        overrides: BTreeMap<String, Voice>,
        selection: SelectionMode,
        default_stretch: f64,
    ) -> Result<Self, ConfigError> {
        if voices.is_empty() {
            return Err(ConfigError::Invalid(
                "[festival] At least one voice must be configured".into(),
            ));
        }
        let ring = HashRing::new(voices.len());
        Ok(Self {
            voices,
            overrides,
            selection,
            default_stretch,
            ring,
        })
    }

    pub fn from_config(config: &FestivalConfig) -> Result<Self, ConfigError> {
        Self::new(
            config.voices.clone(),
            config.voices_override.clone(),
            config.selection,
            config.stretch,
        )
    }

    /// The voice for `caller` and whether it came from the override table.
    pub fn voice_for(&self, caller: &str) -> (&Voice, bool) {
        if let Some(voice) = self.overrides.get(caller) {
            log::debug!("voice override for {caller}");
            return (voice, true);
        }

        let index = match self.selection {
            SelectionMode::Hashed => {
                log::debug!("hash ring selection for {caller}");
                self.ring.get(caller).unwrap_or(0)
            }
            SelectionMode::Random => {
                log::debug!("random selection for {caller}");
                rand::rng().random_range(0..self.voices.len())
            }
        };
        (&self.voices[index], false)
    }

    /// The `Duration_Stretch` to use for `voice`.
    ///
    /// Voices in [`NO_STRETCH`] always get `1.0`; asking for anything else is
    /// logged as a warning.
    pub fn effective_stretch(&self, voice: &Voice) -> f64 {
        let stretch = voice.stretch.unwrap_or(self.default_stretch);
        if !voice.is_stretchable() && stretch != 1.0 {
            log::warn!(
                "cannot change stretch of {} (asked for {stretch}), using 1.0",
                voice.name
            );
            return 1.0;
        }
        stretch
    }

    pub fn voices(&self) -> &[Voice] {
        &self.voices
    }

    pub fn selection(&self) -> SelectionMode {
        self.selection
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

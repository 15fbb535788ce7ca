//! Call destinations and the reward → destination registry.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::{ConfigError, PhoneConfig};

/// A SIP call target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Destination {
    /// Hostname (fully qualified) or IP address receiving the call.
    pub host: String,
    /// User at `host` that should receive the call.
    pub user: String,
}

impl Destination {
    pub fn new(host: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            user: user.into(),
        }
    }

    /// `sip:{user}@{host}`
    pub fn address(&self) -> String {
        format!("sip:{}@{}", self.user, self.host)
    }
}

/// Reward title → destination.  Lookups are exact and case sensitive.
#[derive(Debug, Clone)]
pub struct DestinationRegistry {
    destinations: BTreeMap<String, Destination>,
}

impl DestinationRegistry {
    /// Build a registry; fails when `destinations` is empty.
    pub fn new(destinations: BTreeMap<String, Destination>) -> Result<Self, ConfigError> {
        if destinations.is_empty() {
            return Err(ConfigError::Invalid(
                "[phone] At least one redemption destination must be defined".into(),
            ));
        }
        Ok(Self { destinations })
    }

    pub fn from_config(config: &PhoneConfig) -> Result<Self, ConfigError> {
        Self::new(config.destinations.clone())
    }

    pub fn resolve(&self, reward_title: &str) -> Option<&Destination> {
        self.destinations.get(reward_title)
    }

    pub fn len(&self) -> usize {
        self.destinations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.destinations.is_empty()
    }
}

//! Typed redemption events decoded from platform notifications.
//!
//! Only three fields of a notification matter:
//!
//! ```text
//! data.redemption.reward.title         → reward_title
//! data.redemption.user.display_name    → caller
//! data.redemption.user_input           → message (empty when absent)
//! ```

use serde::Deserialize;
use thiserror::Error;

/// Errors raised while reading notifications.
#[derive(Debug, Error)]
pub enum EventError {
    /// The payload is not a redemption notification.
    #[error("malformed redemption notification: {0}")]
    Decode(#[from] serde_json::Error),

    /// The notification source could not be read.
    #[error("cannot read notifications: {0}")]
    Io(#[from] std::io::Error),
}

/// One reward redemption, reduced to what routing needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedemptionEvent {
    pub reward_title: String,
    pub caller: String,
    pub message: String,
}

#[derive(Deserialize)]
struct Notification {
    data: NotificationData,
}

#[derive(Deserialize)]
struct NotificationData {
    redemption: Redemption,
}

#[derive(Deserialize)]
struct Redemption {
    reward: Reward,
    user: User,
    #[serde(default)]
    user_input: String,
}

#[derive(Deserialize)]
struct Reward {
    title: String,
}

#[derive(Deserialize)]
struct User {
    display_name: String,
}

impl RedemptionEvent {
    pub fn new(
        reward_title: impl Into<String>,
        caller: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            reward_title: reward_title.into(),
            caller: caller.into(),
            message: message.into(),
        }
    }

    /// Decode a notification from its JSON text.
    pub fn from_json(json: &str) -> Result<Self, EventError> {
        let notification: Notification = serde_json::from_str(json)?;
        Ok(notification.into())
    }

    /// Decode an already-parsed notification.
    pub fn from_value(value: serde_json::Value) -> Result<Self, EventError> {
        let notification: Notification = serde_json::from_value(value)?;
        Ok(notification.into())
    }
}

impl From<Notification> for RedemptionEvent {
    fn from(n: Notification) -> Self {
        let r = n.data.redemption;
        Self {
            reward_title: r.reward.title,
            caller: r.user.display_name,
            message: r.user_input,
        }
    }
}

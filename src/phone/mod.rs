//! Telephone side: destinations and the SIP call stack seam.
//!
//! * [`Destination`] / [`DestinationRegistry`]: which reward calls where.
//! * [`CallStack`]: narrow interface to the SIP user agent: dial, poll
//!   status, play a WAV into the call, hang up.
//! * [`BaresipPhone`]: production [`CallStack`] driving a `baresip` child
//!   process over stdin/stdout.

pub mod baresip;
pub mod destination;

#[cfg(test)]
pub mod mock;

pub use baresip::{BaresipOptions, BaresipPhone, BaresipTimings, SipAccount};
pub use destination::{Destination, DestinationRegistry};

#[cfg(test)]
pub use mock::{PhoneEvent, ScriptedPhone};

use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;

// ---------------------------------------------------------------------------
// PhoneError
// ---------------------------------------------------------------------------

/// Errors reported by a [`CallStack`].
#[derive(Debug, Error)]
pub enum PhoneError {
    /// The user agent process could not be started.
    #[error("cannot start SIP user agent: {0}")]
    Spawn(String),

    /// The user agent is no longer running.
    #[error("SIP user agent is not running")]
    NotRunning,

    /// Audio was sent while no call was established.
    #[error("no established call")]
    NotEstablished,

    /// The call ended before the operation finished.
    #[error("call ended")]
    CallEnded,

    /// Writing to or reading from the user agent failed.
    #[error("SIP user agent I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// CallStatus
// ---------------------------------------------------------------------------

/// What the call stack currently reports about the active call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallStatus {
    /// Running, call placed but not answered yet.
    Dialing,
    /// Running, far end answered.
    Established,
    /// Running, the call was rejected, abandoned or closed.
    Ended,
    /// The call stack itself is not running.
    Offline,
}

impl CallStatus {
    pub fn is_running(&self) -> bool {
        !matches!(self, CallStatus::Offline)
    }
}

// ---------------------------------------------------------------------------
// CallStack trait
// ---------------------------------------------------------------------------

/// Object-safe, thread-safe interface to a SIP user agent.
///
/// At most one call is active at a time; `dial` replaces any previous call
/// state.
#[async_trait]
pub trait CallStack: Send + Sync {
    /// Place an outbound call to a `sip:` address.  Returns once the request
    /// is issued, not when the call is answered.
    async fn dial(&self, address: &str) -> Result<(), PhoneError>;

    /// Current state of the active call.  Must not block.
    fn status(&self) -> CallStatus;

    /// Play the WAV at `audio` into the active call, returning when playback
    /// has finished.  Fails if the call or the stack goes away first.
    async fn send_audio(&self, audio: &Path) -> Result<(), PhoneError>;

    /// Hang up the active call, if any, and wait (bounded) for it to be gone.
    async fn hang_up(&self) -> Result<(), PhoneError>;

    /// Shut the user agent down.
    async fn quit(&self) -> Result<(), PhoneError>;
}

// Compile-time assertion: Box<dyn CallStack> must be constructible.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn CallStack>) {}
};

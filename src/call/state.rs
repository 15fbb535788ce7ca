//! Call session state machine and its shared handle.
//!
//! [`CallState`] is what the orchestrator is doing right now.  It lives
//! behind [`SharedCallState`] so that admission checks (`place_call` while a
//! call is in flight) and observers such as tests can read it without
//! holding the orchestrator.

use std::sync::{Arc, Mutex};

// ---------------------------------------------------------------------------
// CallState
// ---------------------------------------------------------------------------

/// States of one call session.
///
/// ```text
/// Idle ──place_call──▶ Dialing ──answered──▶ Established
///      ──settle──▶ Playing ──audio sent──▶ HangingUp ──▶ Idle
///
/// Dialing / Established / Playing ──failure──▶ Failed ──▶ Idle
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CallState {
    /// No session; a new call may be placed.
    #[default]
    Idle,

    /// The call request was issued; polling for the far end to answer.
    Dialing,

    /// The far end answered; waiting out the settle interval.
    Established,

    /// Audio is being sent into the call.
    Playing,

    /// Hanging up and releasing the audio file.
    HangingUp,

    /// The session failed; cleaning up before returning to `Idle`.
    Failed,
}

impl CallState {
    /// Returns `true` while a session exists.
    ///
    /// ```
    /// use ttstreambot::call::CallState;
    ///
    /// assert!(!CallState::Idle.is_busy());
    /// assert!(CallState::Dialing.is_busy());
    /// assert!(CallState::Failed.is_busy());
    /// ```
    pub fn is_busy(&self) -> bool {
        !matches!(self, CallState::Idle)
    }

    /// Short label for log lines.
    pub fn label(&self) -> &'static str {
        match self {
            CallState::Idle => "Idle",
            CallState::Dialing => "Dialing",
            CallState::Established => "Established",
            CallState::Playing => "Playing",
            CallState::HangingUp => "HangingUp",
            CallState::Failed => "Failed",
        }
    }
}

// ---------------------------------------------------------------------------
// SharedCallState
// ---------------------------------------------------------------------------

/// Thread-safe handle to the current [`CallState`].
///
/// Lock for a short critical section only; never hold it across `.await`.
pub type SharedCallState = Arc<Mutex<CallState>>;

pub fn new_shared_state() -> SharedCallState {
    Arc::new(Mutex::new(CallState::Idle))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Call orchestrator: drives one call session from dial to hang-up.
//!
//! # Session flow
//!
//! ```text
//! place_call(destination, artifact)
//!   └─▶ dial                                          [Dialing]
//!         └─▶ poll status every `poll_interval`
//!               ├─ Established → wait `settle`        [Established]
//!               │     └─▶ send_audio                  [Playing]
//!               │           └─▶ hang_up, release      [HangingUp → Idle]
//!               ├─ Ended / Offline                    [Failed → Idle]
//!               └─ still Dialing past `dial_timeout`  [Failed → Idle]
//! ```
//!
//! Every wait observes the [`CancellationToken`]; a cancelled session hangs
//! up (best effort) and releases its audio like any other failure.  The
//! audio artifact is released exactly once on every path.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio_util::sync::CancellationToken;

use super::clock::Clock;
use super::state::{new_shared_state, CallState, SharedCallState};
use crate::config::PhoneConfig;
use crate::phone::{CallStack, CallStatus, Destination, PhoneError};
use crate::synth::AudioArtifact;

// ---------------------------------------------------------------------------
// CallError
// ---------------------------------------------------------------------------

/// Why a call session did not complete.
#[derive(Debug, Error)]
pub enum CallError {
    /// Another session is in flight.
    #[error("a call is already in progress")]
    Busy,

    /// The call request could not be issued.
    #[error("dial failed: {0}")]
    Dial(#[source] PhoneError),

    /// The far end rejected or abandoned the call before answering.
    #[error("call ended before it was answered")]
    Ended,

    /// The call stack stopped running while dialing.
    #[error("call stack is not running")]
    Offline,

    /// Nobody answered within the dial timeout.
    #[error("no answer within {} s", .0.as_secs())]
    DialTimeout(Duration),

    /// Audio could not be played into the call.
    #[error("playback failed: {0}")]
    Playback(#[source] PhoneError),

    /// Shutdown was requested mid-call.
    #[error("call cancelled")]
    Cancelled,
}

impl CallError {
    /// Whether the call may still be up on the far end and needs a hang-up.
    fn needs_hang_up(&self) -> bool {
        matches!(
            self,
            CallError::DialTimeout(_) | CallError::Playback(_) | CallError::Cancelled
        )
    }
}

// ---------------------------------------------------------------------------
// CallTimings
// ---------------------------------------------------------------------------

/// Wait intervals of the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallTimings {
    /// Delay between call status polls while dialing.
    pub poll_interval: Duration,
    /// Pause after the call is answered before audio is sent.
    pub settle: Duration,
    /// Give up on an unanswered call after this long; `None` waits forever.
    pub dial_timeout: Option<Duration>,
}

impl Default for CallTimings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(500),
            settle: Duration::from_millis(500),
            dial_timeout: Some(Duration::from_secs(60)),
        }
    }
}

impl CallTimings {
    pub fn from_config(config: &PhoneConfig) -> Self {
        let dial_timeout = match config.dial_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };
        Self {
            dial_timeout,
            ..Self::default()
        }
    }
}

// ---------------------------------------------------------------------------
// CallOrchestrator
// ---------------------------------------------------------------------------

/// Owns the single call session.
pub struct CallOrchestrator {
    phone: Arc<dyn CallStack>,
    clock: Arc<dyn Clock>,
    timings: CallTimings,
    state: SharedCallState,
    cancel: CancellationToken,
}

impl CallOrchestrator {
    /// # Arguments
    ///
    /// * `phone`  : the SIP call stack (e.g. `BaresipPhone`).
    /// * `clock`  : time source for polls and the settle delay.
    /// * `timings`: poll / settle / dial-timeout intervals.
    /// * `cancel` : cancelled on shutdown; aborts the in-flight session.
    pub fn new(
        phone: Arc<dyn CallStack>,
        clock: Arc<dyn Clock>,
        timings: CallTimings,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            phone,
            clock,
            timings,
            state: new_shared_state(),
            cancel,
        }
    }

    pub fn state(&self) -> CallState {
        *self.state.lock().unwrap()
    }

    pub fn shared_state(&self) -> SharedCallState {
        Arc::clone(&self.state)
    }

    /// Call `destination` and play `artifact` once it answers.
    ///
    /// Rejected with [`CallError::Busy`] when a session already exists; the
    /// in-flight session is left untouched.  `artifact` is released before
    /// this returns, whatever the outcome.
    pub async fn place_call(
        &self,
        destination: &Destination,
        artifact: AudioArtifact,
    ) -> Result<(), CallError> {
        if self.cancel.is_cancelled() {
            artifact.release();
            return Err(CallError::Cancelled);
        }

        {
            let mut st = self.state.lock().unwrap();
            if st.is_busy() {
                let current = *st;
                drop(st);
                log::warn!(
                    "call to {} rejected: session is {}",
                    destination.address(),
                    current.label()
                );
                artifact.release();
                return Err(CallError::Busy);
            }
            *st = CallState::Dialing;
        }

        let address = destination.address();
        log::info!("calling {address}");

        match self.drive(&address, &artifact).await {
            Ok(()) => {
                artifact.release();
                self.transition(CallState::Idle);
                log::info!("call to {address} completed");
                Ok(())
            }
            Err(e) => {
                self.transition(CallState::Failed);
                if e.needs_hang_up() {
                    if let Err(hang_up) = self.phone.hang_up().await {
                        log::warn!("hang-up after failure did not go through: {hang_up}");
                    }
                }
                match &e {
                    CallError::Cancelled => log::info!("call to {address} cancelled"),
                    _ => log::error!("call to {address} failed: {e}"),
                }
                artifact.release();
                self.transition(CallState::Idle);
                Err(e)
            }
        }
    }

    async fn drive(&self, address: &str, artifact: &AudioArtifact) -> Result<(), CallError> {
        self.phone.dial(address).await.map_err(CallError::Dial)?;
        self.wait_established().await?;

        self.transition(CallState::Established);
        self.pause(self.timings.settle).await?;

        self.transition(CallState::Playing);
        log::debug!("playback of {}", artifact.path().display());
        tokio::select! {
            sent = self.phone.send_audio(artifact.path()) => sent.map_err(CallError::Playback)?,
            _ = self.cancel.cancelled() => return Err(CallError::Cancelled),
        }

        self.transition(CallState::HangingUp);
        if let Err(e) = self.phone.hang_up().await {
            log::warn!("hang-up did not go through: {e}");
        }
        Ok(())
    }

    async fn wait_established(&self) -> Result<(), CallError> {
        let mut waited = Duration::ZERO;
        loop {
            self.pause(self.timings.poll_interval).await?;
            waited += self.timings.poll_interval;

            match self.phone.status() {
                CallStatus::Established => return Ok(()),
                CallStatus::Ended => return Err(CallError::Ended),
                CallStatus::Offline => return Err(CallError::Offline),
                CallStatus::Dialing => {
                    if let Some(limit) = self.timings.dial_timeout {
                        if waited >= limit {
                            return Err(CallError::DialTimeout(limit));
                        }
                    }
                }
            }
        }
    }

    async fn pause(&self, duration: Duration) -> Result<(), CallError> {
        tokio::select! {
            _ = self.cancel.cancelled() => Err(CallError::Cancelled),
            _ = self.clock.sleep(duration) => Ok(()),
        }
    }

    fn transition(&self, next: CallState) {
        let mut st = self.state.lock().unwrap();
        log::debug!("call: {} -> {}", st.label(), next.label());
        *st = next;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

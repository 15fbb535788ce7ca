//! Scripted [`CallStack`] for orchestrator tests.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;

use super::{CallStack, CallStatus, PhoneError};

/// Everything the orchestrator asked the phone to do, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum PhoneEvent {
    Dial(String),
    /// Audio path and whether the file existed when it was sent.
    Audio(PathBuf, bool),
    HangUp,
    Quit,
}

/// Replays a fixed sequence of statuses, one per `status()` call.  The last
/// status repeats forever.
pub struct ScriptedPhone {
    script: Mutex<VecDeque<CallStatus>>,
    audio_fails: bool,
    audio_stalls: bool,
    events: Mutex<Vec<PhoneEvent>>,
}

impl ScriptedPhone {
    pub fn new(script: impl IntoIterator<Item = CallStatus>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            audio_fails: false,
            audio_stalls: false,
            events: Mutex::new(Vec::new()),
        }
    }

    /// Answers on the third poll.
    pub fn answering() -> Self {
        Self::new([
            CallStatus::Dialing,
            CallStatus::Dialing,
            CallStatus::Established,
        ])
    }

    /// `send_audio` reports the call ended mid-playback.
    pub fn dropping_audio(mut self) -> Self {
        self.audio_fails = true;
        self
    }

    /// `send_audio` never returns.
    pub fn stalling_audio(mut self) -> Self {
        self.audio_stalls = true;
        self
    }

    pub fn events(&self) -> Vec<PhoneEvent> {
        self.events.lock().unwrap().clone()
    }

    fn record(&self, event: PhoneEvent) {
        self.events.lock().unwrap().push(event);
    }
}

#[async_trait]
impl CallStack for ScriptedPhone {
    async fn dial(&self, address: &str) -> Result<(), PhoneError> {
        self.record(PhoneEvent::Dial(address.to_string()));
        Ok(())
    }

    fn status(&self) -> CallStatus {
        let mut script = self.script.lock().unwrap();
        if script.len() > 1 {
            script.pop_front().unwrap_or(CallStatus::Offline)
        } else {
            script.front().copied().unwrap_or(CallStatus::Offline)
        }
    }

    async fn send_audio(&self, audio: &Path) -> Result<(), PhoneError> {
        self.record(PhoneEvent::Audio(audio.to_path_buf(), audio.exists()));
        if self.audio_stalls {
            std::future::pending::<()>().await;
        }
        if self.audio_fails {
            Err(PhoneError::CallEnded)
        } else {
            Ok(())
        }
    }

    async fn hang_up(&self) -> Result<(), PhoneError> {
        self.record(PhoneEvent::HangUp);
        Ok(())
    }

    async fn quit(&self) -> Result<(), PhoneError> {
        self.record(PhoneEvent::Quit);
        Ok(())
    }
}

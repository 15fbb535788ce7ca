//! Redemption router: matches a redemption to a destination, synthesizes
//! the caller's message and hands the call to the orchestrator.
//!
//! The router keeps no state between redemptions; the only per-call state is
//! the orchestrator's session.

use std::sync::Arc;

use super::event::RedemptionEvent;
use crate::call::{CallError, CallOrchestrator};
use crate::phone::DestinationRegistry;
use crate::synth::{AudioSynthesizer, SynthError};
use crate::voice::VoiceTable;

/// What happened to one redemption.
#[derive(Debug)]
pub enum Dispatch {
    /// The reward title has no destination; nothing was done.
    Ignored,
    /// The call was placed, the message played and the call hung up.
    Completed,
    /// Another call was in progress; nothing was done.
    Busy,
    /// Shutdown interrupted the call.
    Cancelled,
    /// The message could not be synthesized; no call was placed.
    SynthesisFailed(SynthError),
    /// The call did not complete.
    CallFailed(CallError),
}

pub struct RedemptionRouter {
    voices: VoiceTable,
    destinations: DestinationRegistry,
    synth: Arc<dyn AudioSynthesizer>,
    orchestrator: Arc<CallOrchestrator>,
    replace_name_underscores: bool,
}

impl RedemptionRouter {
    pub fn new(
        voices: VoiceTable,
        destinations: DestinationRegistry,
        synth: Arc<dyn AudioSynthesizer>,
        orchestrator: Arc<CallOrchestrator>,
    ) -> Self {
        Self {
            voices,
            destinations,
            synth,
            orchestrator,
            replace_name_underscores: false,
        }
    }

    /// Speak `some_viewer` as `some viewer`.
    pub fn with_name_underscores_replaced(mut self, replace: bool) -> Self {
        self.replace_name_underscores = replace;
        self
    }

    /// The sentence spoken into the call.
    pub fn utterance(&self, event: &RedemptionEvent) -> String {
        let caller = if self.replace_name_underscores {
            event.caller.replace('_', " ")
        } else {
            event.caller.clone()
        };
        format!("{caller} said {}", event.message)
    }

    pub async fn handle(&self, event: &RedemptionEvent) -> Dispatch {
        log::debug!("received redemption '{}'", event.reward_title);

        let Some(destination) = self.destinations.resolve(&event.reward_title) else {
            log::debug!("no destination for '{}', ignoring", event.reward_title);
            return Dispatch::Ignored;
        };

        if self.orchestrator.state().is_busy() {
            log::warn!(
                "dropping '{}' from {}: a call is in progress",
                event.reward_title,
                event.caller
            );
            return Dispatch::Busy;
        }

        let (voice, is_override) = self.voices.voice_for(&event.caller);
        log::info!(
            "picked {} for {}{}",
            voice.name,
            event.caller,
            if is_override { " (override)" } else { "" }
        );
        let stretch = self.voices.effective_stretch(voice);
        let text = self.utterance(event);

        let artifact = match self.synth.synthesize(voice, stretch, &text).await {
            Ok(artifact) => artifact,
            Err(e) => {
                log::error!("synthesis for {} failed: {e}", event.caller);
                return Dispatch::SynthesisFailed(e);
            }
        };

        match self.orchestrator.place_call(destination, artifact).await {
            Ok(()) => Dispatch::Completed,
            Err(CallError::Busy) => Dispatch::Busy,
            Err(CallError::Cancelled) => Dispatch::Cancelled,
            Err(e) => Dispatch::CallFailed(e),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Bounded hand-off between the notification feed and the router.
//!
//! At most one redemption waits behind the call in progress; anything beyond
//! that is dropped with a warning.  The consumer handles redemptions strictly
//! one after another.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::event::RedemptionEvent;
use super::router::{Dispatch, RedemptionRouter};

/// Redemptions allowed to wait while a call is in progress.
pub const QUEUE_DEPTH: usize = 1;

/// Outcome of [`RedemptionQueue::submit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Accepted,
    /// The waiting slot is taken.
    Rejected,
    /// The consumer is gone.
    Closed,
}

#[derive(Clone)]
pub struct RedemptionQueue {
    tx: mpsc::Sender<RedemptionEvent>,
}

impl RedemptionQueue {
    pub fn new() -> (Self, mpsc::Receiver<RedemptionEvent>) {
        let (tx, rx) = mpsc::channel(QUEUE_DEPTH);
        (Self { tx }, rx)
    }

    pub fn submit(&self, event: RedemptionEvent) -> Admission {
        match self.tx.try_send(event) {
            Ok(()) => Admission::Accepted,
            Err(mpsc::error::TrySendError::Full(event)) => {
                log::warn!(
                    "dropping '{}' from {}: a redemption is already waiting",
                    event.reward_title,
                    event.caller
                );
                Admission::Rejected
            }
            Err(mpsc::error::TrySendError::Closed(_)) => Admission::Closed,
        }
    }
}

/// Pull redemptions off `rx` and route them until every sender is dropped or
/// `cancel` fires.
pub async fn run_consumer(
    router: Arc<RedemptionRouter>,
    mut rx: mpsc::Receiver<RedemptionEvent>,
    cancel: CancellationToken,
) {
    log::debug!("redemption consumer started");
    loop {
        let event = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            next = rx.recv() => match next {
                Some(event) => event,
                None => break,
            },
        };

        match router.handle(&event).await {
            Dispatch::Completed => log::info!("call for {} done", event.caller),
            Dispatch::Ignored => {}
            Dispatch::Busy => log::info!("redemption from {} skipped: line busy", event.caller),
            Dispatch::Cancelled => {
                log::info!("call for {} cancelled by shutdown", event.caller)
            }
            Dispatch::SynthesisFailed(e) => {
                log::warn!("redemption from {} not spoken: {e}", event.caller)
            }
            Dispatch::CallFailed(e) => {
                log::warn!("redemption from {} not delivered: {e}", event.caller)
            }
        }
    }
    log::debug!("redemption consumer stopped");
}

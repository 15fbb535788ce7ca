//! Time source for the call state machine's waits.

use std::time::Duration;

use async_trait::async_trait;

/// Suspends the orchestrator between status polls and for the settle delay.
#[async_trait]
pub trait Clock: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Real time via `tokio::time::sleep`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Returns immediately (after yielding) and records every requested wait.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct InstantClock {
    slept: std::sync::Mutex<Vec<Duration>>,
}

#[cfg(test)]
impl InstantClock {
    pub fn slept(&self) -> Vec<Duration> {
        self.slept.lock().unwrap().clone()
    }
}

#[cfg(test)]
#[async_trait]
impl Clock for InstantClock {
    async fn sleep(&self, duration: Duration) {
        self.slept.lock().unwrap().push(duration);
        tokio::task::yield_now().await;
    }
}

//! Call session orchestration.
//!
//! This module owns the call-lifecycle state machine: dial, wait for the far
//! end to answer, settle, play the synthesized audio, hang up, clean up.
//!
//! # Architecture
//!
//! ```text
//! RedemptionRouter
//!        │ place_call(destination, artifact)
//!        ▼
//! CallOrchestrator ──dial / status / send_audio / hang_up──▶ CallStack
//!        │
//!        ├─ Clock              (poll + settle waits)
//!        ├─ CancellationToken  (shutdown)
//!        └─ SharedCallState    (Arc<Mutex<CallState>>, admission check)
//! ```

pub mod clock;
pub mod orchestrator;
pub mod state;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use clock::{Clock, TokioClock};
pub use orchestrator::{CallError, CallOrchestrator, CallTimings};
pub use state::{new_shared_state, CallState, SharedCallState};

//! Redemption handling: decode, admit, route.
//!
//! ```text
//! stdin / fixture ──▶ feed ──submit──▶ RedemptionQueue (depth 1)
//!                                            │
//!                                     run_consumer
//!                                            │
//!                                   RedemptionRouter::handle
//!                          ┌─────────────────┼──────────────────┐
//!                  DestinationRegistry   VoiceTable      AudioSynthesizer
//!                                            │
//!                                   CallOrchestrator::place_call
//! ```

pub mod event;
pub mod feed;
pub mod queue;
pub mod router;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use event::{EventError, RedemptionEvent};
pub use feed::{read_lines, replay_fixture};
pub use queue::{run_consumer, Admission, RedemptionQueue, QUEUE_DEPTH};
pub use router::{Dispatch, RedemptionRouter};

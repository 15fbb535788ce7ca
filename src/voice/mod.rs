//! Voice assignment for redemption callers.
//!
//! * [`VoiceTable`]: roster + overrides, answers `voice_for(caller)`.
//! * [`HashRing`]: the consistent-hash ring behind `hashed` selection.
//! * [`Voice`] / [`SelectionMode`]: the settings-level types.

pub mod ring;
pub mod table;

pub use ring::HashRing;
pub use table::{SelectionMode, Voice, VoiceTable, NO_STRETCH};

//! ttstreambot turns channel-point redemptions into phone calls that speak
//! the viewer's message.
//!
//! * [`config`]: settings file, config directory bootstrap.
//! * [`voice`]: voice roster and per-caller voice selection.
//! * [`synth`]: text-to-speech into transient WAV files.
//! * [`phone`]: call destinations and the SIP call stack.
//! * [`call`]: the single call session state machine.
//! * [`redemption`]: notification decoding, admission and routing.

pub mod call;
pub mod config;
pub mod phone;
pub mod redemption;
pub mod synth;
pub mod voice;

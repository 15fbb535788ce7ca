//! Speech synthesis seam.
//!
//! [`AudioSynthesizer`] turns `(voice, stretch, text)` into an
//! [`AudioArtifact`]: a transient WAV file the caller owns and must release.
//! [`FestivalSynthesizer`] is the production implementation;
//! `MockSynthesizer` (test builds only) writes a placeholder file and records
//! every request.

pub mod artifact;
pub mod festival;

#[cfg(test)]
pub mod mock;

pub use artifact::AudioArtifact;
pub use festival::FestivalSynthesizer;

#[cfg(test)]
pub use mock::MockSynthesizer;

use async_trait::async_trait;
use thiserror::Error;

use crate::voice::Voice;

// ---------------------------------------------------------------------------
// SynthError
// ---------------------------------------------------------------------------

/// Reasons a single synthesis request can fail.
#[derive(Debug, Error)]
pub enum SynthError {
    /// The synthesizer process could not be started.
    #[error("cannot start synthesizer: {0}")]
    Spawn(String),

    /// The synthesizer exited with an error.
    #[error("synthesizer failed: {0}")]
    Failed(String),

    /// The synthesizer did not finish in time.
    #[error("synthesizer timed out after {0} s")]
    Timeout(u64),

    /// The synthesizer reported success but wrote no audio.
    #[error("synthesizer produced no audio")]
    EmptyOutput,

    /// The voice name cannot be passed to the synthesizer safely.
    #[error("invalid voice name '{0}'")]
    InvalidVoice(String),

    /// The utterance exceeds the size limit.
    #[error("text is {len} bytes, limit is {limit}")]
    TextTooLong { len: usize, limit: usize },

    /// Filesystem error while preparing or checking the output file.
    #[error("audio file error: {0}")]
    Io(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// AudioSynthesizer trait
// ---------------------------------------------------------------------------

/// Object-safe, thread-safe interface for text-to-speech engines.
///
/// # Contract
///
/// - Selects `voice` and applies `stretch` before rendering `text`.
/// - On success the returned artifact exists on disk and belongs to the
///   caller.
/// - On failure no file is left behind.
#[async_trait]
pub trait AudioSynthesizer: Send + Sync {
    async fn synthesize(
        &self,
        voice: &Voice,
        stretch: f64,
        text: &str,
    ) -> Result<AudioArtifact, SynthError>;
}

// Compile-time assertion: Box<dyn AudioSynthesizer> must be constructible.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn AudioSynthesizer>) {}
};

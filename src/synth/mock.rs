//! Test double for [`AudioSynthesizer`].

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use super::{AudioArtifact, AudioSynthesizer, SynthError};
use crate::voice::Voice;

/// One recorded `synthesize` call.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthRequest {
    pub voice: String,
    pub stretch: f64,
    pub text: String,
}

/// Writes a tiny placeholder WAV into `dir` for every request, or fails every
/// request when built with [`MockSynthesizer::failing`].
pub struct MockSynthesizer {
    dir: PathBuf,
    fail: bool,
    counter: AtomicUsize,
    requests: Mutex<Vec<SynthRequest>>,
    produced: Mutex<Vec<PathBuf>>,
}

impl MockSynthesizer {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            fail: false,
            counter: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
            produced: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(dir: impl Into<PathBuf>) -> Self {
        Self {
            fail: true,
            ..Self::new(dir)
        }
    }

    pub fn requests(&self) -> Vec<SynthRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Every file path handed out so far.
    pub fn produced(&self) -> Vec<PathBuf> {
        self.produced.lock().unwrap().clone()
    }
}

#[async_trait]
impl AudioSynthesizer for MockSynthesizer {
    async fn synthesize(
        &self,
        voice: &Voice,
        stretch: f64,
        text: &str,
    ) -> Result<AudioArtifact, SynthError> {
        self.requests.lock().unwrap().push(SynthRequest {
            voice: voice.name.clone(),
            stretch,
            text: text.to_string(),
        });
        if self.fail {
            return Err(SynthError::Failed("mock failure".into()));
        }

        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        let path = self.dir.join(format!("mock-{n}.wav"));
        std::fs::write(&path, b"RIFF\0\0\0\0WAVE")?;
        self.produced.lock().unwrap().push(path.clone());
        Ok(AudioArtifact::new(path))
    }
}

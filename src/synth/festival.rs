//! Festival-backed synthesizer.
//!
//! Runs Festival's `text2wave` script once per utterance:
//!
//! ```text
//! text2wave -o /tmp/ttstreambot-XXXX.wav \
//!     -eval "(voice_kal_diphone)" \
//!     -eval "(Parameter.set 'Duration_Stretch 1.2)"   < text on stdin
//! ```

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use super::{AudioArtifact, AudioSynthesizer, SynthError};
use crate::voice::Voice;

/// Maximum utterance size handed to Festival.
const MAX_TEXT_BYTES: usize = 16 * 1024;

/// Timeout for one `text2wave` run.
const SYNTH_TIMEOUT: Duration = Duration::from_secs(60);

/// Synthesizer that shells out to `text2wave`.
#[derive(Debug, Clone)]
pub struct FestivalSynthesizer {
    text2wave: PathBuf,
    work_dir: PathBuf,
}

impl FestivalSynthesizer {
    /// Use the given `text2wave` executable, writing audio into the system
    /// temp directory.
    pub fn new(text2wave: impl AsRef<Path>) -> Self {
        Self {
            text2wave: text2wave.as_ref().to_path_buf(),
            work_dir: std::env::temp_dir(),
        }
    }

    /// Write audio files into `dir` instead of the system temp directory.
    pub fn with_work_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.work_dir = dir.as_ref().to_path_buf();
        self
    }

    fn allocate(&self) -> Result<AudioArtifact, SynthError> {
        let file = tempfile::Builder::new()
            .prefix("ttstreambot-")
            .suffix(".wav")
            .tempfile_in(&self.work_dir)?;
        let path = file
            .into_temp_path()
            .keep()
            .map_err(|e| SynthError::Io(e.error))?;
        Ok(AudioArtifact::new(path))
    }
}

/// Build the `-eval` expressions selecting `voice` and its stretch.
pub fn eval_args(voice: &Voice, stretch: f64) -> Result<Vec<String>, SynthError> {
    let valid = !voice.name.is_empty()
        && voice
            .name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid {
        return Err(SynthError::InvalidVoice(voice.name.clone()));
    }

    let mut evals = vec![format!("(voice_{})", voice.name)];
    if voice.is_stretchable() {
        evals.push(format!("(Parameter.set 'Duration_Stretch {stretch})"));
    }
    Ok(evals)
}

#[async_trait]
impl AudioSynthesizer for FestivalSynthesizer {
    async fn synthesize(
        &self,
        voice: &Voice,
        stretch: f64,
        text: &str,
    ) -> Result<AudioArtifact, SynthError> {
        if text.len() > MAX_TEXT_BYTES {
            return Err(SynthError::TextTooLong {
                len: text.len(),
                limit: MAX_TEXT_BYTES,
            });
        }
        let evals = eval_args(voice, stretch)?;
        let artifact = self.allocate()?;

        let mut command = Command::new(&self.text2wave);
        command.arg("-o").arg(artifact.path());
        for eval in &evals {
            log::debug!("Festival> {eval}");
            command.arg("-eval").arg(eval);
        }
        command
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = command.spawn().map_err(|e| {
            SynthError::Spawn(format!("{}: {e}", self.text2wave.display()))
        })?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| SynthError::Spawn("text2wave stdin unavailable".into()))?;
        let text_owned = text.to_string();
        let write_task = tokio::spawn(async move {
            stdin.write_all(text_owned.as_bytes()).await?;
            stdin.shutdown().await
        });

        let output = tokio::time::timeout(SYNTH_TIMEOUT, child.wait_with_output())
            .await
            .map_err(|_| SynthError::Timeout(SYNTH_TIMEOUT.as_secs()))??;

        match write_task.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(SynthError::Io(e)),
            Err(e) => return Err(SynthError::Failed(format!("stdin task failed: {e}"))),
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SynthError::Failed(stderr.trim().to_string()));
        }

        let size = std::fs::metadata(artifact.path())?.len();
        if size == 0 {
            return Err(SynthError::EmptyOutput);
        }

        log::debug!(
            "Festival created {} ({size} bytes)",
            artifact.path().display()
        );
        Ok(artifact)
    }
}

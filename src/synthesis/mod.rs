//! Narration sources
//!
//! Anything that can turn a request into narration audio implements
//! [`NarrationSource`]. The mix core never talks to these directly; the job
//! layer fetches narration first and hands a plain buffer to the renderer.

#[cfg(feature = "synthesis")]
pub mod elevenlabs;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::engine::buffer::AudioBuffer;
use crate::engine::io::import_audio;
use crate::error::{MixError, Result};

#[cfg(feature = "synthesis")]
pub use elevenlabs::ElevenLabsClient;

/// Text to speak, with optional per-request voice and model overrides
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesisRequest {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,
}

impl SynthesisRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            voice_id: None,
            model_id: None,
        }
    }

    pub fn with_voice(mut self, voice_id: Option<String>) -> Self {
        self.voice_id = voice_id;
        self
    }

    pub fn with_model(mut self, model_id: Option<String>) -> Self {
        self.model_id = model_id;
        self
    }

    /// Reject requests with nothing to say
    pub fn validate(&self) -> Result<()> {
        if self.text.trim().is_empty() {
            return Err(MixError::invalid_input("text must not be empty"));
        }
        Ok(())
    }
}

/// Produces narration audio for a request
///
/// Implementations must not retry internally and must return a `Synthesis`
/// or `Decode` error rather than an empty buffer.
pub trait NarrationSource: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &str;

    /// Produce the narration
    fn synthesize(&self, request: &SynthesisRequest) -> Result<AudioBuffer>;
}

/// Narration read from an audio file; the request text is ignored
#[derive(Debug, Clone)]
pub struct FileNarration {
    path: PathBuf,
}

impl FileNarration {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl NarrationSource for FileNarration {
    fn name(&self) -> &str {
        "file"
    }

    fn synthesize(&self, _request: &SynthesisRequest) -> Result<AudioBuffer> {
        let buffer = import_audio(&self.path)?;
        if buffer.is_empty() {
            return Err(MixError::Decode {
                path: self.path.display().to_string(),
                reason: "narration file holds no audio".to_string(),
                source: None,
            });
        }
        Ok(buffer)
    }
}

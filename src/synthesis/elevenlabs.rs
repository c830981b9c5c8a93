//! ElevenLabs text-to-speech client
//!
//! Asks the service for raw 16-bit mono PCM so the reply can be used without
//! an MP3 decoder in the loop.

use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::SynthesisSettings;
use crate::engine::buffer::AudioBuffer;
use crate::engine::io::decode_pcm_s16le;
use crate::error::{MixError, Result};
use crate::synthesis::{NarrationSource, SynthesisRequest};

/// Request body for the text-to-speech endpoint
#[derive(Debug, Serialize)]
struct TtsBody<'a> {
    text: &'a str,
    model_id: &'a str,
    voice_settings: VoiceSettings,
}

#[derive(Debug, Serialize)]
struct VoiceSettings {
    stability: f32,
    similarity_boost: f32,
}

/// Blocking ElevenLabs client
///
/// Call from a blocking context; the HTTP service runs it inside
/// `spawn_blocking`.
#[derive(Debug, Clone)]
pub struct ElevenLabsClient {
    settings: SynthesisSettings,
    http: reqwest::blocking::Client,
}

impl ElevenLabsClient {
    /// Create a client
    ///
    /// # Errors
    /// `Config` if the API key is missing or the PCM rate is unsupported,
    /// `Synthesis` if the HTTP client cannot be built.
    pub fn new(settings: SynthesisSettings) -> Result<Self> {
        settings.validate()?;
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| MixError::Synthesis {
                reason: "cannot build HTTP client".to_string(),
                source: Some(Box::new(e)),
            })?;
        Ok(Self { settings, http })
    }

    pub fn settings(&self) -> &SynthesisSettings {
        &self.settings
    }

    fn endpoint(&self, voice_id: &str) -> String {
        format!(
            "{}/v1/text-to-speech/{}?output_format=pcm_{}",
            self.settings.base_url.trim_end_matches('/'),
            voice_id,
            self.settings.sample_rate
        )
    }

    fn body<'a>(&'a self, request: &'a SynthesisRequest) -> TtsBody<'a> {
        TtsBody {
            text: &request.text,
            model_id: request
                .model_id
                .as_deref()
                .unwrap_or(&self.settings.model_id),
            voice_settings: VoiceSettings {
                stability: self.settings.stability,
                similarity_boost: self.settings.similarity_boost,
            },
        }
    }
}

impl NarrationSource for ElevenLabsClient {
    fn name(&self) -> &str {
        "elevenlabs"
    }

    fn synthesize(&self, request: &SynthesisRequest) -> Result<AudioBuffer> {
        request.validate()?;
        let voice_id = request
            .voice_id
            .as_deref()
            .unwrap_or(&self.settings.voice_id);
        let url = self.endpoint(voice_id);

        info!(voice_id, chars = request.text.chars().count(), "requesting narration");

        let response = self
            .http
            .post(&url)
            .header("xi-api-key", &self.settings.api_key)
            .header("accept", "audio/pcm")
            .json(&self.body(request))
            .send()
            .map_err(|e| {
                let reason = if e.is_timeout() {
                    format!("timed out after {}s", self.settings.timeout_secs)
                } else if e.is_connect() {
                    format!("cannot connect to {}", self.settings.base_url)
                } else {
                    "request failed".to_string()
                };
                MixError::Synthesis {
                    reason,
                    source: Some(Box::new(e)),
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail: String = response
                .text()
                .unwrap_or_default()
                .chars()
                .take(200)
                .collect();
            warn!(status = status.as_u16(), "synthesis service rejected request");
            let reason = if status == reqwest::StatusCode::UNAUTHORIZED {
                format!("unauthorized (check the API key): {}", detail)
            } else {
                format!("service returned {}: {}", status, detail)
            };
            return Err(MixError::Synthesis {
                reason,
                source: None,
            });
        }

        let bytes = response.bytes().map_err(|e| MixError::Synthesis {
            reason: "failed to read audio body".to_string(),
            source: Some(Box::new(e)),
        })?;
        if bytes.is_empty() {
            return Err(MixError::Synthesis {
                reason: "service returned no audio".to_string(),
                source: None,
            });
        }
        debug!(bytes = bytes.len(), "narration received");

        decode_pcm_s16le(&bytes, self.settings.sample_rate, 1, "elevenlabs").map_err(|e| {
            MixError::Synthesis {
                reason: "malformed PCM reply".to_string(),
                source: Some(Box::new(e)),
            }
        })
    }
}

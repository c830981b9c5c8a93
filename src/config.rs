//! Configuration
//!
//! Plain serde structs with defaults. A JSON file can set any subset of the
//! fields; secrets come from the environment so they stay out of files.

use std::env;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{MixError, Result};

/// Environment variable holding the ElevenLabs API key
pub const ENV_API_KEY: &str = "BEDMIX_ELEVENLABS_API_KEY";
/// Environment variable overriding the synthesis base URL
pub const ENV_API_URL: &str = "BEDMIX_ELEVENLABS_URL";

/// Longest mix bedmix will plan (24 hours), and so the longest any single
/// duration setting may be
pub const MAX_MIX_MS: i64 = 24 * 60 * 60 * 1000;

// ============================================================================
// Mix settings
// ============================================================================

/// The five knobs that shape one mix
///
/// All durations are milliseconds. `duck_db` is the bed level under the
/// narration and must be 0 or negative.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MixSettings {
    /// Full-level bed before the duck starts
    pub intro_full_ms: i64,
    /// Length of each transition (down and back up)
    pub fade_ms: i64,
    /// Bed level while narration plays
    pub duck_db: f32,
    /// Full-level bed after the duck ends
    pub outro_full_ms: i64,
    /// Master fade to silence at the very end
    pub final_fade_ms: i64,
}

impl Default for MixSettings {
    fn default() -> Self {
        Self {
            intro_full_ms: 4_000,
            fade_ms: 500,
            duck_db: -18.0,
            outro_full_ms: 3_000,
            final_fade_ms: 1_000,
        }
    }
}

impl MixSettings {
    /// Check every knob is in range
    ///
    /// Durations must lie in `0..=MAX_MIX_MS`, and so must the part of the
    /// mix that does not depend on the narration (`intro + 2 * fade + outro`).
    ///
    /// # Errors
    /// `InvalidInput` naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("intro_full_ms", self.intro_full_ms),
            ("fade_ms", self.fade_ms),
            ("outro_full_ms", self.outro_full_ms),
            ("final_fade_ms", self.final_fade_ms),
        ] {
            if value < 0 {
                return Err(MixError::invalid_input(format!(
                    "{} must be >= 0, got {}",
                    name, value
                )));
            }
            if value > MAX_MIX_MS {
                return Err(MixError::invalid_input(format!(
                    "{} must be <= {}, got {}",
                    name, MAX_MIX_MS, value
                )));
            }
        }
        // Each term is capped above, so this cannot overflow
        let fixed_ms = self.intro_full_ms + 2 * self.fade_ms + self.outro_full_ms;
        if fixed_ms > MAX_MIX_MS {
            return Err(MixError::invalid_input(format!(
                "intro, fades and outro add up to {}ms, over the {}ms limit",
                fixed_ms, MAX_MIX_MS
            )));
        }
        if !self.duck_db.is_finite() || self.duck_db > 0.0 {
            return Err(MixError::invalid_input(format!(
                "duck_db must be a finite value <= 0, got {}",
                self.duck_db
            )));
        }
        Ok(())
    }

    /// Load settings from a JSON file; missing fields keep their defaults
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}

// ============================================================================
// Synthesis settings
// ============================================================================

/// Speech synthesis (ElevenLabs) client settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisSettings {
    /// API key; never serialized
    #[serde(skip_serializing)]
    pub api_key: String,
    pub base_url: String,
    pub voice_id: String,
    pub model_id: String,
    pub stability: f32,
    pub similarity_boost: f32,
    /// Rate of the raw PCM the service is asked to return
    pub sample_rate: u32,
    pub timeout_secs: u64,
}

impl Default for SynthesisSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.elevenlabs.io".to_string(),
            voice_id: "21m00Tcm4TlvDq8ikWAM".to_string(),
            model_id: "eleven_multilingual_v2".to_string(),
            stability: 0.3,
            similarity_boost: 0.7,
            sample_rate: 44_100,
            timeout_secs: 60,
        }
    }
}

impl SynthesisSettings {
    /// Fill the API key and base URL from the environment when present
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(key) = env::var(ENV_API_KEY) {
            if !key.is_empty() {
                self.api_key = key;
            }
        }
        if let Ok(url) = env::var(ENV_API_URL) {
            if !url.is_empty() {
                self.base_url = url;
            }
        }
        self
    }

    /// Check the settings can produce a usable request
    pub fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(MixError::Config {
                reason: format!("no speech synthesis API key (set {})", ENV_API_KEY),
            });
        }
        // The service only offers these raw PCM rates
        if !matches!(self.sample_rate, 16_000 | 22_050 | 24_000 | 44_100) {
            return Err(MixError::Config {
                reason: format!("unsupported synthesis sample rate {}", self.sample_rate),
            });
        }
        Ok(())
    }
}

// ============================================================================
// Server settings
// ============================================================================

/// HTTP mix service settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Directory holding backgrounds and receiving mixes
    pub audio_dir: PathBuf,
    pub host: String,
    pub port: u16,
    /// Bearer token; empty disables auth
    #[serde(skip_serializing)]
    pub auth_token: String,
    /// Output name used when a request does not give one
    pub default_output: String,
    /// Bit depth of exported WAV files
    pub bit_depth: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            audio_dir: PathBuf::from("/share/audio"),
            host: "0.0.0.0".to_string(),
            port: 8080,
            auth_token: String::new(),
            default_output: "final_mix.wav".to_string(),
            bit_depth: 16,
        }
    }
}

// ============================================================================
// Whole file
// ============================================================================

/// Complete configuration file layout
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub mix: MixSettings,
    pub synthesis: SynthesisSettings,
    pub server: ServerSettings,
}

impl Config {
    /// Load a JSON config file and apply environment overrides
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| MixError::Config {
            reason: format!("cannot read {}: {}", path.display(), e),
        })?;
        let mut config: Config = serde_json::from_str(&text)?;
        config.synthesis = config.synthesis.with_env_overrides();
        Ok(config)
    }

    /// Defaults plus environment overrides
    pub fn from_env() -> Self {
        Config {
            synthesis: SynthesisSettings::default().with_env_overrides(),
            ..Default::default()
        }
    }
}

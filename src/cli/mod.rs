//! CLI Module
//!
//! Command-line interface for the bedmix ducking mixer.

pub mod commands;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::{Config, MixSettings};
use crate::error::Result;

/// bedmix - narration over a ducked background bed
#[derive(Parser, Debug)]
#[command(name = "bedmix")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Mix a narration file over a background file
    #[command(name = "render")]
    Render {
        /// Background (bed) audio file
        #[arg(short, long)]
        background: PathBuf,

        /// Narration audio file
        #[arg(short, long)]
        narration: PathBuf,

        /// Output WAV file
        #[arg(short, long)]
        output: PathBuf,

        /// Output bit depth (16, 24 or 32)
        #[arg(long, default_value_t = 16)]
        bit_depth: u16,

        #[command(flatten)]
        mix: MixArgs,
    },

    /// Print the timeline for a narration length as JSON
    #[command(name = "plan")]
    Plan {
        /// Narration length in milliseconds
        #[arg(long)]
        narration_ms: i64,

        /// Sample rate used for frame rounding
        #[arg(long, default_value_t = crate::engine::DEFAULT_SAMPLE_RATE)]
        sample_rate: u32,

        #[command(flatten)]
        mix: MixArgs,
    },

    /// Synthesize narration from text and mix it over a background
    #[cfg(feature = "synthesis")]
    #[command(name = "synth-mix")]
    SynthMix {
        /// Text to speak
        #[arg(short, long)]
        text: String,

        /// Background (bed) audio file
        #[arg(short, long)]
        background: PathBuf,

        /// Output WAV file
        #[arg(short, long, default_value = "final_mix.wav")]
        output: PathBuf,

        /// Voice to use instead of the configured one
        #[arg(long)]
        voice_id: Option<String>,

        /// Model to use instead of the configured one
        #[arg(long)]
        model_id: Option<String>,

        /// Speech synthesis API key
        #[arg(long, env = "BEDMIX_ELEVENLABS_API_KEY", hide_env_values = true)]
        api_key: Option<String>,

        /// Output bit depth (16, 24 or 32)
        #[arg(long, default_value_t = 16)]
        bit_depth: u16,

        #[command(flatten)]
        mix: MixArgs,
    },

    /// Run the HTTP mix service
    #[cfg(feature = "server")]
    #[command(name = "serve")]
    Serve {
        /// Directory holding backgrounds and receiving mixes
        #[arg(long, env = "BEDMIX_AUDIO_DIR")]
        audio_dir: Option<PathBuf>,

        /// Address to bind
        #[arg(long)]
        host: Option<String>,

        /// Port to bind
        #[arg(short, long)]
        port: Option<u16>,

        /// Bearer token required on /mix (empty disables auth)
        #[arg(long, env = "BEDMIX_AUTH_TOKEN", hide_env_values = true)]
        auth_token: Option<String>,

        /// Speech synthesis API key
        #[arg(long, env = "BEDMIX_ELEVENLABS_API_KEY", hide_env_values = true)]
        api_key: Option<String>,

        #[command(flatten)]
        mix: MixArgs,
    },
}

/// Mix knobs shared by every subcommand
///
/// Flags override values from `--config`, which override the defaults.
#[derive(Args, Debug, Default, Clone)]
pub struct MixArgs {
    /// JSON config file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Full-level bed before the duck (ms)
    #[arg(long)]
    pub intro_full_ms: Option<i64>,

    /// Length of each duck transition (ms)
    #[arg(long)]
    pub fade_ms: Option<i64>,

    /// Bed level under the narration (dB, 0 or below)
    #[arg(long, allow_negative_numbers = true)]
    pub duck_db: Option<f32>,

    /// Full-level bed after the duck (ms)
    #[arg(long)]
    pub outro_full_ms: Option<i64>,

    /// Fade to silence at the end (ms)
    #[arg(long)]
    pub final_fade_ms: Option<i64>,
}

impl MixArgs {
    /// Load `--config` if given, else defaults plus environment
    pub fn load_config(&self) -> Result<Config> {
        match &self.config {
            Some(path) => Config::from_json_file(path),
            None => Ok(Config::from_env()),
        }
    }

    /// Apply flag overrides on top of `base`
    pub fn apply(&self, base: MixSettings) -> MixSettings {
        MixSettings {
            intro_full_ms: self.intro_full_ms.unwrap_or(base.intro_full_ms),
            fade_ms: self.fade_ms.unwrap_or(base.fade_ms),
            duck_db: self.duck_db.unwrap_or(base.duck_db),
            outro_full_ms: self.outro_full_ms.unwrap_or(base.outro_full_ms),
            final_fade_ms: self.final_fade_ms.unwrap_or(base.final_fade_ms),
        }
    }

    /// Config file (or defaults) with flag overrides applied to the mix
    pub fn resolve(&self) -> Result<Config> {
        let mut config = self.load_config()?;
        config.mix = self.apply(config.mix);
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_plan_with_negative_duck() {
        let cli = Cli::try_parse_from([
            "bedmix",
            "plan",
            "--narration-ms",
            "2000",
            "--duck-db",
            "-12",
        ])
        .unwrap();
        match cli.command {
            Commands::Plan {
                narration_ms, mix, ..
            } => {
                assert_eq!(narration_ms, 2000);
                assert_eq!(mix.duck_db, Some(-12.0));
                let settings = mix.apply(MixSettings::default());
                assert_eq!(settings.duck_db, -12.0);
                assert_eq!(settings.fade_ms, 500);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_render_requires_inputs() {
        assert!(Cli::try_parse_from(["bedmix", "render", "--output", "x.wav"]).is_err());
    }
}

//! bedmix CLI
//!
//! Command-line entry point for the bedmix ducking mixer.

use anyhow::Context;
use clap::Parser;
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use bedmix::cli::{commands, Cli, Commands};
use bedmix::MixError;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "bedmix=debug" } else { "bedmix=info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    debug!("bedmix v{}", env!("CARGO_PKG_VERSION"));

    let result = match cli.command {
        Commands::Render {
            background,
            narration,
            output,
            bit_depth,
            mix,
        } => commands::render(&background, &narration, &output, bit_depth, &mix)
            .with_context(|| format!("failed to render {}", output.display())),

        Commands::Plan {
            narration_ms,
            sample_rate,
            mix,
        } => commands::plan(narration_ms, sample_rate, &mix).context("failed to plan timeline"),

        #[cfg(feature = "synthesis")]
        Commands::SynthMix {
            text,
            background,
            output,
            voice_id,
            model_id,
            api_key,
            bit_depth,
            mix,
        } => commands::synth_mix(
            &text, &background, &output, voice_id, model_id, api_key, bit_depth, &mix,
        )
        .with_context(|| format!("failed to synthesize and mix into {}", output.display())),

        #[cfg(feature = "server")]
        Commands::Serve {
            audio_dir,
            host,
            port,
            auth_token,
            api_key,
            mix,
        } => commands::serve(audio_dir, host, port, auth_token, api_key, &mix)
            .context("mix service stopped"),
    };

    if let Err(err) = &result {
        if let Some(mix_err) = err.downcast_ref::<MixError>() {
            for suggestion in mix_err.recovery_suggestions() {
                eprintln!("  hint: {}", suggestion);
            }
        }
    }
    result
}

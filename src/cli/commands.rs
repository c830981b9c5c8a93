//! CLI Command Implementations
//!
//! Implements the actual logic for each CLI command.

use std::path::Path;

use tracing::info;

use crate::cli::MixArgs;
use crate::engine::io::ExportFormat;
use crate::error::Result;
use crate::job::{JobReport, MixJob};
use crate::mix::DuckTimeline;
use crate::synthesis::{FileNarration, SynthesisRequest};

/// Mix a narration file over a background file.
pub fn render(
    background: &Path,
    narration: &Path,
    output: &Path,
    bit_depth: u16,
    mix: &MixArgs,
) -> Result<()> {
    info!("Rendering {} over {}", narration.display(), background.display());

    let config = mix.resolve()?;
    let source = FileNarration::new(narration);
    let job = MixJob::new(background, output, SynthesisRequest::new("-"), config.mix)
        .with_format(ExportFormat::new(bit_depth));
    let report = job.run(&source)?;

    print_report(&report);
    Ok(())
}

/// Print the timeline for a narration length.
pub fn plan(narration_ms: i64, sample_rate: u32, mix: &MixArgs) -> Result<()> {
    let settings = mix.resolve()?.mix;
    settings.validate()?;

    let timeline = DuckTimeline::plan(
        narration_ms,
        settings.intro_full_ms,
        settings.fade_ms,
        settings.outro_full_ms,
        settings.duck_db,
        sample_rate,
    )?;
    let json = serde_json::to_string_pretty(&timeline.report())?;
    println!("{}", json);
    Ok(())
}

/// Synthesize narration for `text` and mix it over a background.
#[cfg(feature = "synthesis")]
#[allow(clippy::too_many_arguments)]
pub fn synth_mix(
    text: &str,
    background: &Path,
    output: &Path,
    voice_id: Option<String>,
    model_id: Option<String>,
    api_key: Option<String>,
    bit_depth: u16,
    mix: &MixArgs,
) -> Result<()> {
    use crate::synthesis::ElevenLabsClient;

    let mut config = mix.resolve()?;
    if let Some(key) = api_key {
        config.synthesis.api_key = key;
    }
    let client = ElevenLabsClient::new(config.synthesis)?;

    info!("Synthesizing {} characters", text.chars().count());
    let request = SynthesisRequest::new(text)
        .with_voice(voice_id)
        .with_model(model_id);
    let job = MixJob::new(background, output, request, config.mix)
        .with_format(ExportFormat::new(bit_depth));
    let report = job.run(&client)?;

    print_report(&report);
    Ok(())
}

/// Run the HTTP mix service until interrupted.
#[cfg(feature = "server")]
pub fn serve(
    audio_dir: Option<std::path::PathBuf>,
    host: Option<String>,
    port: Option<u16>,
    auth_token: Option<String>,
    api_key: Option<String>,
    mix: &MixArgs,
) -> Result<()> {
    use crate::server::{self, AppState};

    let mut config = mix.resolve()?;
    if let Some(dir) = audio_dir {
        config.server.audio_dir = dir;
    }
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    if let Some(token) = auth_token {
        config.server.auth_token = token;
    }
    if let Some(key) = api_key {
        config.synthesis.api_key = key;
    }

    let state = AppState::from_config(&config)?;
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(server::serve(state))
}

fn print_report(report: &JobReport) {
    println!("Mix written: {}", report.output.display());
    println!("  Duration: {:.0} ms", report.duration_ms);
    println!(
        "  Narration: {:.0} ms at {:.0} ms",
        report.narration_ms, report.timeline.narration_start_ms
    );
    println!("  Peak: {:.1} dBFS, RMS: {:.1} dBFS", report.peak_db, report.rms_db);
    println!("  SHA-256: {}", report.sha256);
}

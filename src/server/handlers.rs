//! Route handlers

use std::path::{Component, Path, PathBuf};

use axum::{
    extract::{rejection::JsonRejection, Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::MixSettings;
use crate::engine::io::ExportFormat;
use crate::job::MixJob;
use crate::server::error::ApiError;
use crate::server::AppState;
use crate::synthesis::SynthesisRequest;

// ============================================================================
// Health
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub service: &'static str,
    pub version: &'static str,
}

/// GET /health
///
/// Never requires authentication.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        ok: true,
        service: "bedmix",
        version: env!("CARGO_PKG_VERSION"),
    })
}

// ============================================================================
// Mix
// ============================================================================

/// POST /mix body
///
/// Everything but `text` and `background` is optional; missing knobs fall
/// back to the service defaults.
#[derive(Debug, Default, Deserialize)]
pub struct MixBody {
    pub text: Option<String>,
    pub background: Option<String>,
    pub output: Option<String>,
    pub voice_id: Option<String>,
    pub model_id: Option<String>,
    pub intro_full_ms: Option<i64>,
    pub fade_ms: Option<i64>,
    pub duck_db: Option<f32>,
    pub outro_full_ms: Option<i64>,
    pub final_fade_ms: Option<i64>,
}

impl MixBody {
    fn settings(&self, defaults: &MixSettings) -> MixSettings {
        MixSettings {
            intro_full_ms: self.intro_full_ms.unwrap_or(defaults.intro_full_ms),
            fade_ms: self.fade_ms.unwrap_or(defaults.fade_ms),
            duck_db: self.duck_db.unwrap_or(defaults.duck_db),
            outro_full_ms: self.outro_full_ms.unwrap_or(defaults.outro_full_ms),
            final_fade_ms: self.final_fade_ms.unwrap_or(defaults.final_fade_ms),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MixResponse {
    pub ok: bool,
    pub job_id: String,
    pub output: String,
    pub duration_ms: f64,
    pub narration_ms: f64,
    pub sha256: String,
}

/// POST /mix
pub async fn mix(
    State(state): State<AppState>,
    body: Result<Json<MixBody>, JsonRejection>,
) -> Result<Json<MixResponse>, ApiError> {
    let Json(body) = body.map_err(|e| ApiError::bad_request(e.body_text()))?;

    let text = required(body.text.as_deref(), "text")?;
    let background_name = required(body.background.as_deref(), "background")?;
    let output_name = body
        .output
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(state.settings.default_output.as_str())
        .to_string();

    let audio_dir = &state.settings.audio_dir;
    let background = resolve_in_dir(audio_dir, background_name)?;
    let output = resolve_in_dir(audio_dir, &output_name)?;
    if !has_wav_extension(&output) {
        return Err(ApiError::bad_request(format!(
            "output '{}' must be a .wav file",
            output_name
        )));
    }

    let settings = body.settings(&state.mix_defaults);
    settings.validate()?;

    if !background.is_file() {
        warn!(background = %background.display(), "background not found");
        return Err(ApiError::not_found(format!(
            "background file not found: {}",
            background_name
        )));
    }

    let narration = SynthesisRequest::new(text)
        .with_voice(body.voice_id.clone())
        .with_model(body.model_id.clone());
    let job = MixJob::new(background, output, narration, settings)
        .with_format(ExportFormat::new(state.settings.bit_depth));
    let job_id = job.id;
    info!(%job_id, background = background_name, output = %output_name, "mix requested");

    let narrator = state.narrator.clone();
    let report = tokio::task::spawn_blocking(move || job.run(narrator.as_ref()))
        .await
        .map_err(|e| ApiError::internal(format!("mix job aborted: {}", e)))??;

    Ok(Json(MixResponse {
        ok: true,
        job_id: job_id.to_string(),
        output: output_name,
        duration_ms: report.duration_ms,
        narration_ms: report.narration_ms,
        sha256: report.sha256,
    }))
}

fn required<'a>(value: Option<&'a str>, field: &str) -> Result<&'a str, ApiError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ApiError::bad_request(format!("missing field '{}'", field))),
    }
}

/// Join a client-supplied file name onto `dir`, refusing anything that could
/// leave it
pub fn resolve_in_dir(dir: &Path, name: &str) -> Result<PathBuf, ApiError> {
    let relative = Path::new(name);
    let safe = !name.is_empty()
        && relative
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    if !safe {
        warn!(name, "rejected path outside audio directory");
        return Err(ApiError::bad_request(format!(
            "'{}' must be a relative path inside the audio directory",
            name
        )));
    }
    Ok(dir.join(relative))
}

/// Mixes are always written as WAV
fn has_wav_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("wav"))
}

// ============================================================================
// Auth
// ============================================================================

/// Bearer token check for protected routes
///
/// An empty configured token disables the check.
pub async fn require_bearer(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let expected = state.settings.auth_token.as_str();
    if expected.is_empty() {
        return Ok(next.run(request).await);
    }

    let presented = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    if presented != Some(expected) {
        warn!(path = %request.uri().path(), "unauthorized request");
        return Err(ApiError::unauthorized());
    }
    Ok(next.run(request).await)
}

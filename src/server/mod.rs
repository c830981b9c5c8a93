//! HTTP mix service
//!
//! `POST /mix` synthesizes narration for a piece of text, mixes it over a
//! background from the audio directory and writes the result next to it.
//! `GET /health` is always public; `/mix` needs a bearer token when one is
//! configured.

pub mod error;
pub mod handlers;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tracing::info;

use crate::config::{Config, MixSettings, ServerSettings};
use crate::error::Result;
use crate::synthesis::{ElevenLabsClient, NarrationSource};

pub use error::ApiError;

/// Shared, read-only service state
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<ServerSettings>,
    pub mix_defaults: MixSettings,
    pub narrator: Arc<dyn NarrationSource>,
}

impl AppState {
    pub fn new(
        settings: ServerSettings,
        mix_defaults: MixSettings,
        narrator: Arc<dyn NarrationSource>,
    ) -> Self {
        Self {
            settings: Arc::new(settings),
            mix_defaults,
            narrator,
        }
    }

    /// State backed by the ElevenLabs client
    ///
    /// # Errors
    /// `Config` if the synthesis settings are unusable (no API key).
    pub fn from_config(config: &Config) -> Result<Self> {
        config.mix.validate()?;
        let client = ElevenLabsClient::new(config.synthesis.clone())?;
        Ok(Self::new(
            config.server.clone(),
            config.mix,
            Arc::new(client),
        ))
    }
}

/// Build the service router
pub fn build_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/mix", post(handlers::mix))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            handlers::require_bearer,
        ));

    Router::new()
        .route("/health", get(handlers::health))
        .merge(protected)
        .with_state(state)
}

/// Bind and serve until Ctrl-C
pub async fn serve(state: AppState) -> Result<()> {
    let addr = format!("{}:{}", state.settings.host, state.settings.port);
    let auth = !state.settings.auth_token.is_empty();
    let audio_dir = state.settings.audio_dir.display().to_string();

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, %audio_dir, auth, "bedmix listening");

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutting down");
        })
        .await?;
    Ok(())
}

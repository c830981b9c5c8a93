//! Mix rendering
//!
//! One call from decoded inputs to the finished mix: validate, plan,
//! compose, then fade the tail to silence.

use tracing::{debug, info, info_span};

use crate::config::MixSettings;
use crate::engine::buffer::AudioBuffer;
use crate::error::{MixError, Result};
use crate::mix::compositor::compose;
use crate::mix::timeline::DuckTimeline;

/// Everything needed to render one mix
///
/// `background` and `narration` must share sample rate and channel count.
#[derive(Debug, Clone)]
pub struct MixRequest {
    pub background: AudioBuffer,
    pub narration: AudioBuffer,
    pub settings: MixSettings,
}

impl MixRequest {
    pub fn new(background: AudioBuffer, narration: AudioBuffer, settings: MixSettings) -> Self {
        Self {
            background,
            narration,
            settings,
        }
    }
}

/// Finished mix and the plan that produced it
#[derive(Debug, Clone)]
pub struct MixResult {
    pub audio: AudioBuffer,
    pub timeline: DuckTimeline,
}

impl MixResult {
    pub fn duration_ms(&self) -> f64 {
        self.audio.duration_ms()
    }
}

/// Render a complete mix
///
/// The output is exactly `intro + 2 * effective_fade + ducked_body + outro`
/// long, holds the narration starting at the middle of the first fade, and
/// ends on a silent frame after a linear fade of `final_fade_ms`.
///
/// # Errors
/// * `InvalidInput` for bad settings, an empty narration or an empty
///   background
/// * `FormatMismatch` if the inputs disagree on format
/// * `Range` if the final fade is longer than the mix
pub fn render(request: &MixRequest) -> Result<MixResult> {
    let settings = &request.settings;
    settings.validate()?;
    if request.narration.is_empty() {
        return Err(MixError::invalid_input("narration audio is empty"));
    }
    request
        .background
        .ensure_same_format(&request.narration, "render")?;

    let _span = info_span!(
        "render",
        narration_ms = request.narration.duration_ms(),
        bed_ms = request.background.duration_ms()
    )
    .entered();

    let timeline = DuckTimeline::plan_for(&request.narration, settings)?;
    let mixed = compose(&request.background, &request.narration, &timeline)?;
    debug!(final_fade_ms = settings.final_fade_ms, "applying tail fade");
    let audio = mixed.fade_out_tail(settings.final_fade_ms)?;

    info!(
        duration_ms = audio.duration_ms(),
        narration_start_ms = timeline.narration_overlay_position_ms(),
        "mix rendered"
    );
    Ok(MixResult { audio, timeline })
}

//! Bed composition
//!
//! Builds the enveloped bed from a [`DuckTimeline`] and lays the narration
//! over it.

use tracing::debug;

use crate::engine::buffer::AudioBuffer;
use crate::error::{MixError, Result};
use crate::mix::extender::extend_frames;
use crate::mix::timeline::DuckTimeline;

/// Compose the ducked bed and overlay the narration
///
/// The bed is looped to the timeline length, each segment gets its envelope,
/// and the narration is added at the timeline's overlay position. The
/// result is exactly `timeline.total_frames()` long.
///
/// # Errors
/// * `FormatMismatch` if background, narration and timeline disagree on
///   format
/// * `InvalidInput` if the background is empty
/// * `Range` if the narration would run past the end of the bed
pub fn compose(
    background: &AudioBuffer,
    narration: &AudioBuffer,
    timeline: &DuckTimeline,
) -> Result<AudioBuffer> {
    background.ensure_same_format(narration, "compose")?;
    if timeline.sample_rate() != background.sample_rate() {
        return Err(MixError::FormatMismatch {
            operation: "compose (timeline)".to_string(),
            left_rate: background.sample_rate(),
            left_channels: background.channels(),
            right_rate: timeline.sample_rate(),
            right_channels: background.channels(),
        });
    }

    let source = extend_frames(background, timeline.total_frames())?;

    let pieces = timeline
        .segments()
        .iter()
        .map(|segment| {
            let piece = source
                .slice_frames(segment.start_frame, segment.end_frame())
                .map_err(|e| {
                    MixError::range("compose", format!("segment {}: {}", segment.kind.name(), e))
                })?;
            Ok(piece.apply_envelope(&segment.envelope))
        })
        .collect::<Result<Vec<_>>>()?;
    let bed = AudioBuffer::concat_all(&pieces)?;

    debug!(
        bed_ms = bed.duration_ms(),
        narration_ms = narration.duration_ms(),
        position_ms = timeline.narration_overlay_position_ms(),
        "overlaying narration"
    );
    bed.overlay_frames(narration, timeline.narration_position_frames())
}

//! Background extension
//!
//! Loops the bed end to end until it covers the mix. The result is never
//! trimmed; the compositor slices what it needs.

use tracing::debug;

use crate::engine::buffer::{ms_to_frames, AudioBuffer};
use crate::error::{MixError, Result};

/// Loop `background` until it is at least `required_ms` long
///
/// # Errors
/// `InvalidInput` if the background is empty or `required_ms` is negative.
pub fn extend(background: &AudioBuffer, required_ms: i64) -> Result<AudioBuffer> {
    if required_ms < 0 {
        return Err(MixError::invalid_input(format!(
            "required duration must be >= 0, got {}ms",
            required_ms
        )));
    }
    extend_frames(background, ms_to_frames(required_ms, background.sample_rate())?)
}

/// Loop `background` until it holds at least `required_frames` frames
///
/// Returns the input unchanged when it is already long enough, otherwise
/// `ceil(required / len)` copies joined end to end.
pub fn extend_frames(background: &AudioBuffer, required_frames: usize) -> Result<AudioBuffer> {
    if background.is_empty() {
        return Err(MixError::invalid_input("background audio is empty"));
    }
    if background.len() >= required_frames {
        return Ok(background.clone());
    }

    let repeats = required_frames.div_ceil(background.len());
    debug!(
        bed_ms = background.duration_ms(),
        repeats, "looping background to cover mix"
    );
    background.repeat(repeats)
}

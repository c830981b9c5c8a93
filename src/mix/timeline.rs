//! Duck timeline planning
//!
//! Turns the narration length and the configured durations into five
//! contiguous bed segments:
//!
//! ```text
//!  intro_full | fade_out | ducked_body | fade_in | outro_full
//!     0 dB     0 -> duck     duck       duck -> 0    0 dB
//!                   ^------- narration -------^
//! ```
//!
//! Narration starts at the midpoint of the fade-out and ends at the midpoint
//! of the fade-in, so `ducked_body + effective_fade == narration`. All
//! offsets are frames; milliseconds only appear at the edges.

use serde::Serialize;
use tracing::debug;

use crate::config::{MixSettings, MAX_MIX_MS};
use crate::engine::buffer::{checked_ms_to_frames, frames_to_ms, ms_to_frames, AudioBuffer};
use crate::engine::envelope::GainEnvelope;
use crate::error::{MixError, Result};

/// Role of a segment within the bed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentKind {
    IntroFull,
    FadeOut,
    DuckedBody,
    FadeIn,
    OutroFull,
}

impl SegmentKind {
    pub fn name(&self) -> &'static str {
        match self {
            SegmentKind::IntroFull => "intro_full",
            SegmentKind::FadeOut => "fade_out",
            SegmentKind::DuckedBody => "ducked_body",
            SegmentKind::FadeIn => "fade_in",
            SegmentKind::OutroFull => "outro_full",
        }
    }
}

/// One contiguous stretch of the bed with its gain envelope
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Segment {
    pub kind: SegmentKind,
    pub start_frame: usize,
    pub duration_frames: usize,
    pub envelope: GainEnvelope,
}

impl Segment {
    /// First frame after this segment
    #[inline]
    pub fn end_frame(&self) -> usize {
        self.start_frame + self.duration_frames
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.duration_frames == 0
    }
}

/// Immutable mix plan
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DuckTimeline {
    segments: Vec<Segment>,
    sample_rate: u32,
    total_frames: usize,
    narration_frames: usize,
    narration_position: usize,
    effective_fade_frames: usize,
}

impl DuckTimeline {
    /// Plan a timeline from millisecond values
    ///
    /// # Errors
    /// `InvalidInput` if any duration is negative or over [`MAX_MIX_MS`],
    /// the mix would run past [`MAX_MIX_MS`], `duck_db` is not finite, or
    /// `sample_rate` is zero.
    pub fn plan(
        narration_ms: i64,
        intro_full_ms: i64,
        fade_ms: i64,
        outro_full_ms: i64,
        duck_db: f32,
        sample_rate: u32,
    ) -> Result<Self> {
        Self::plan_frames(
            duration_frames("narration", narration_ms, sample_rate)?,
            duration_frames("intro_full_ms", intro_full_ms, sample_rate)?,
            duration_frames("fade_ms", fade_ms, sample_rate)?,
            duration_frames("outro_full_ms", outro_full_ms, sample_rate)?,
            duck_db,
            sample_rate,
        )
    }

    /// Plan a timeline for an actual narration buffer
    ///
    /// Uses the buffer's exact frame count, so the narration always fits.
    pub fn plan_for(narration: &AudioBuffer, settings: &MixSettings) -> Result<Self> {
        let rate = narration.sample_rate();
        Self::plan_frames(
            narration.len(),
            duration_frames("intro_full_ms", settings.intro_full_ms, rate)?,
            duration_frames("fade_ms", settings.fade_ms, rate)?,
            duration_frames("outro_full_ms", settings.outro_full_ms, rate)?,
            settings.duck_db,
            rate,
        )
    }

    /// Plan a timeline from frame counts
    ///
    /// # Errors
    /// `InvalidInput` if the segments add up past [`MAX_MIX_MS`].
    pub fn plan_frames(
        narration: usize,
        intro_full: usize,
        fade: usize,
        outro_full: usize,
        duck_db: f32,
        sample_rate: u32,
    ) -> Result<Self> {
        if sample_rate == 0 {
            return Err(MixError::invalid_input("sample rate must be positive"));
        }
        if !duck_db.is_finite() {
            return Err(MixError::invalid_input(format!(
                "duck_db must be finite, got {}",
                duck_db
            )));
        }

        // Narration shorter than the fade would give negative segments
        let effective_fade = fade.min(narration);
        let ducked_body = narration - effective_fade;

        let layout = [
            (SegmentKind::IntroFull, intro_full, GainEnvelope::unity()),
            (
                SegmentKind::FadeOut,
                effective_fade,
                GainEnvelope::DecibelRamp {
                    from_db: 0.0,
                    to_db: duck_db,
                },
            ),
            (
                SegmentKind::DuckedBody,
                ducked_body,
                GainEnvelope::Constant { gain_db: duck_db },
            ),
            (
                SegmentKind::FadeIn,
                effective_fade,
                GainEnvelope::DecibelRamp {
                    from_db: duck_db,
                    to_db: 0.0,
                },
            ),
            (SegmentKind::OutroFull, outro_full, GainEnvelope::unity()),
        ];

        let limit = checked_ms_to_frames(MAX_MIX_MS, sample_rate).unwrap_or(usize::MAX);
        let mut segments = Vec::with_capacity(layout.len());
        let mut cursor = 0usize;
        for (kind, duration_frames, envelope) in layout {
            segments.push(Segment {
                kind,
                start_frame: cursor,
                duration_frames,
                envelope,
            });
            cursor = cursor
                .checked_add(duration_frames)
                .filter(|&end| end <= limit)
                .ok_or_else(|| {
                    MixError::invalid_input(format!(
                        "mix would run past the {}ms limit at {}",
                        MAX_MIX_MS,
                        kind.name()
                    ))
                })?;
        }

        let timeline = DuckTimeline {
            segments,
            sample_rate,
            total_frames: cursor,
            narration_frames: narration,
            narration_position: intro_full + effective_fade / 2,
            effective_fade_frames: effective_fade,
        };

        debug!(
            total_ms = timeline.total_ms(),
            narration_start_ms = timeline.narration_overlay_position_ms(),
            effective_fade_ms = timeline.effective_fade_ms(),
            ducked_body_ms = timeline.ducked_body_ms(),
            "planned duck timeline"
        );

        Ok(timeline)
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    /// Segments in playback order
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Look up a segment by role
    pub fn segment(&self, kind: SegmentKind) -> Option<&Segment> {
        self.segments.iter().find(|s| s.kind == kind)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn total_frames(&self) -> usize {
        self.total_frames
    }

    pub fn total_ms(&self) -> f64 {
        frames_to_ms(self.total_frames, self.sample_rate)
    }

    pub fn narration_frames(&self) -> usize {
        self.narration_frames
    }

    /// Frame where the narration's first sample lands
    pub fn narration_position_frames(&self) -> usize {
        self.narration_position
    }

    pub fn narration_overlay_position_ms(&self) -> f64 {
        frames_to_ms(self.narration_position, self.sample_rate)
    }

    /// First frame after the narration
    pub fn narration_end_frame(&self) -> usize {
        self.narration_position + self.narration_frames
    }

    pub fn effective_fade_frames(&self) -> usize {
        self.effective_fade_frames
    }

    pub fn effective_fade_ms(&self) -> f64 {
        frames_to_ms(self.effective_fade_frames, self.sample_rate)
    }

    pub fn ducked_body_frames(&self) -> usize {
        self.narration_frames - self.effective_fade_frames
    }

    pub fn ducked_body_ms(&self) -> f64 {
        frames_to_ms(self.ducked_body_frames(), self.sample_rate)
    }

    /// Millisecond view of the plan for logs, CLI output and HTTP replies
    pub fn report(&self) -> TimelineReport {
        let ms = |frames| frames_to_ms(frames, self.sample_rate);
        TimelineReport {
            sample_rate: self.sample_rate,
            total_ms: self.total_ms(),
            narration_start_ms: self.narration_overlay_position_ms(),
            narration_end_ms: ms(self.narration_end_frame()),
            effective_fade_ms: self.effective_fade_ms(),
            ducked_body_ms: self.ducked_body_ms(),
            segments: self
                .segments
                .iter()
                .map(|s| SegmentReport {
                    kind: s.kind,
                    start_ms: ms(s.start_frame),
                    duration_ms: ms(s.duration_frames),
                    start_db: s.envelope.start_db(),
                    end_db: s.envelope.end_db(),
                })
                .collect(),
        }
    }
}

/// Frames for one millisecond duration setting, bounded by [`MAX_MIX_MS`]
fn duration_frames(name: &str, ms: i64, sample_rate: u32) -> Result<usize> {
    if !(0..=MAX_MIX_MS).contains(&ms) {
        return Err(MixError::invalid_input(format!(
            "{} must be between 0 and {}, got {}",
            name, MAX_MIX_MS, ms
        )));
    }
    ms_to_frames(ms, sample_rate)
}

/// Millisecond summary of a [`DuckTimeline`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineReport {
    pub sample_rate: u32,
    pub total_ms: f64,
    pub narration_start_ms: f64,
    pub narration_end_ms: f64,
    pub effective_fade_ms: f64,
    pub ducked_body_ms: f64,
    pub segments: Vec<SegmentReport>,
}

/// Millisecond summary of one [`Segment`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentReport {
    pub kind: SegmentKind,
    pub start_ms: f64,
    pub duration_ms: f64,
    pub start_db: f32,
    pub end_db: f32,
}

//! Audio Buffer
//!
//! Provides the immutable audio buffer type every bedmix operation works on.
//! Samples are stored non-interleaved as 32-bit floats, one `Vec<f32>` per
//! channel, behind an `Arc` so that slices share storage with their source.
//!
//! Times are integer milliseconds at the API boundary. They are converted
//! to frames with [`ms_to_frames`] (floor) everywhere, and every primitive
//! has a `*_frames` twin so chained operations never round twice.

use std::fmt;
use std::sync::Arc;

use crate::engine::envelope::GainEnvelope;
use crate::error::{MixError, Result};

// ============================================================================
// Constants
// ============================================================================

/// Sample rate used when nothing else decides it (matches `pcm_44100` speech)
pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

/// Highest channel count accepted by constructors
pub const MAX_CHANNELS: usize = 8;

// ============================================================================
// Helper Functions
// ============================================================================

/// Convert decibels to linear amplitude
///
/// # Arguments
/// * `db` - Value in decibels
///
/// # Returns
/// Linear amplitude (0.0 to 1.0+ range)
#[inline]
pub fn db_to_linear(db: f32) -> f32 {
    10.0_f32.powf(db / 20.0)
}

/// Convert linear amplitude to decibels
///
/// # Returns
/// Value in decibels. Returns -f32::INFINITY for zero input.
#[inline]
pub fn linear_to_db(linear: f32) -> f32 {
    if linear <= 0.0 {
        f32::NEG_INFINITY
    } else {
        20.0 * linear.log10()
    }
}

/// Convert a millisecond count to frames, rounding down
///
/// `None` for negative input or a frame count that does not fit in `usize`.
#[inline]
pub fn checked_ms_to_frames(ms: i64, sample_rate: u32) -> Option<usize> {
    let ms = u128::try_from(ms).ok()?;
    usize::try_from(ms * sample_rate as u128 / 1000).ok()
}

/// Convert a millisecond count to frames, rounding down
///
/// # Errors
/// `InvalidInput` for negative input or a frame count that does not fit in
/// `usize`.
#[inline]
pub fn ms_to_frames(ms: i64, sample_rate: u32) -> Result<usize> {
    checked_ms_to_frames(ms, sample_rate).ok_or_else(|| {
        MixError::invalid_input(format!(
            "{}ms is not representable as frames at {}Hz",
            ms, sample_rate
        ))
    })
}

/// Convert a frame count to (possibly fractional) milliseconds
#[inline]
pub fn frames_to_ms(frames: usize, sample_rate: u32) -> f64 {
    if sample_rate == 0 {
        return 0.0;
    }
    frames as f64 * 1000.0 / sample_rate as f64
}

/// Calculate the RMS (Root Mean Square) level of an audio buffer in dB
///
/// # Returns
/// RMS level in dB. Returns -f32::INFINITY for empty or silent buffers.
pub fn calculate_rms(buffer: &AudioBuffer) -> f32 {
    let total_samples = buffer.channels() * buffer.len();
    if total_samples == 0 {
        return f32::NEG_INFINITY;
    }

    let sum_squares: f64 = (0..buffer.channels())
        .flat_map(|ch| buffer.channel(ch).iter())
        .map(|&s| (s as f64) * (s as f64))
        .sum();

    let rms = (sum_squares / total_samples as f64).sqrt() as f32;
    linear_to_db(rms)
}

/// Calculate the peak level of an audio buffer in dB
///
/// # Returns
/// Peak level in dB. Returns -f32::INFINITY for empty buffers.
pub fn calculate_peak(buffer: &AudioBuffer) -> f32 {
    let peak = (0..buffer.channels())
        .flat_map(|ch| buffer.channel(ch).iter())
        .map(|&s| s.abs())
        .fold(0.0_f32, f32::max);

    linear_to_db(peak)
}

// ============================================================================
// Audio Buffer
// ============================================================================

/// Immutable audio buffer
///
/// Every operation returns a new buffer and leaves `self` untouched. Derived
/// buffers keep the sample rate and channel count of their source.
///
/// # Example
/// ```
/// use bedmix::engine::AudioBuffer;
///
/// // One second of stereo silence at 48kHz
/// let buffer = AudioBuffer::silence(48_000, 2, 48_000);
/// assert_eq!(buffer.channels(), 2);
/// assert_eq!(buffer.duration_ms(), 1000.0);
///
/// let head = buffer.slice(0, 250).unwrap();
/// assert_eq!(head.len(), 12_000);
/// ```
#[derive(Clone)]
pub struct AudioBuffer {
    /// Shared sample storage: outer Vec is channels, inner Vec is samples
    data: Arc<Vec<Vec<f32>>>,
    /// First frame of this view into `data`
    offset: usize,
    /// Number of frames in this view
    frames: usize,
    /// Sample rate in Hz
    sample_rate: u32,
}

impl AudioBuffer {
    /// Create a silent buffer
    pub fn silence(frames: usize, channels: usize, sample_rate: u32) -> Self {
        Self::from_owned(vec![vec![0.0_f32; frames]; channels], sample_rate)
    }

    /// Create a buffer from per-channel sample data
    ///
    /// # Errors
    /// `InvalidInput` if there are no channels, too many channels, channels
    /// of unequal length, or a zero sample rate.
    pub fn from_channels(channels: Vec<Vec<f32>>, sample_rate: u32) -> Result<Self> {
        if channels.is_empty() || channels.len() > MAX_CHANNELS {
            return Err(MixError::invalid_input(format!(
                "channel count must be 1..={}, got {}",
                MAX_CHANNELS,
                channels.len()
            )));
        }
        if sample_rate == 0 {
            return Err(MixError::invalid_input("sample rate must be positive"));
        }
        let frames = channels[0].len();
        if let Some((idx, ch)) = channels.iter().enumerate().find(|(_, c)| c.len() != frames) {
            return Err(MixError::invalid_input(format!(
                "channel {} has {} samples, channel 0 has {}",
                idx,
                ch.len(),
                frames
            )));
        }
        Ok(Self::from_owned(channels, sample_rate))
    }

    /// Create an audio buffer from interleaved sample data
    ///
    /// # Arguments
    /// * `interleaved` - Interleaved sample data (L, R, L, R, ... for stereo)
    /// * `channels` - Number of interleaved channels
    /// * `sample_rate` - Sample rate in Hz
    pub fn from_interleaved(interleaved: &[f32], channels: usize, sample_rate: u32) -> Result<Self> {
        if channels == 0 {
            return Err(MixError::invalid_input("channel count must be positive"));
        }
        if interleaved.len() % channels != 0 {
            return Err(MixError::invalid_input(format!(
                "Interleaved data length {} is not divisible by channel count {}",
                interleaved.len(),
                channels
            )));
        }

        let frames = interleaved.len() / channels;
        let mut data = vec![Vec::with_capacity(frames); channels];
        for frame in interleaved.chunks_exact(channels) {
            for (ch, &sample) in frame.iter().enumerate() {
                data[ch].push(sample);
            }
        }

        Self::from_channels(data, sample_rate)
    }

    pub(crate) fn from_owned(data: Vec<Vec<f32>>, sample_rate: u32) -> Self {
        let frames = data.first().map(|ch| ch.len()).unwrap_or(0);
        Self {
            data: Arc::new(data),
            offset: 0,
            frames,
            sample_rate,
        }
    }

    /// Build a new buffer by mapping every sample through `f(channel, frame, sample)`
    fn map_samples<F>(&self, f: F) -> Self
    where
        F: Fn(usize, usize, f32) -> f32,
    {
        let data = (0..self.channels())
            .map(|ch| {
                self.channel(ch)
                    .iter()
                    .enumerate()
                    .map(|(i, &s)| f(ch, i, s))
                    .collect()
            })
            .collect();
        Self::from_owned(data, self.sample_rate)
    }

    /// Convert the buffer to interleaved format
    pub fn to_interleaved(&self) -> Vec<f32> {
        let channels = self.channels();
        let mut interleaved = Vec::with_capacity(channels * self.frames);
        for frame in 0..self.frames {
            for ch in 0..channels {
                interleaved.push(self.channel(ch)[frame]);
            }
        }
        interleaved
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    /// Get the number of channels
    #[inline]
    pub fn channels(&self) -> usize {
        self.data.len()
    }

    /// Get the number of frames (samples per channel)
    #[inline]
    pub fn len(&self) -> usize {
        self.frames
    }

    /// Check if the buffer is empty (no frames)
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.frames == 0
    }

    /// Sample rate in Hz
    #[inline]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Get the duration in seconds
    #[inline]
    pub fn duration_secs(&self) -> f64 {
        self.duration_ms() / 1000.0
    }

    /// Get the duration in milliseconds (fractional)
    #[inline]
    pub fn duration_ms(&self) -> f64 {
        frames_to_ms(self.frames, self.sample_rate)
    }

    /// Get immutable access to a channel's samples
    ///
    /// # Panics
    /// Panics if the channel index is out of bounds
    #[inline]
    pub fn channel(&self, index: usize) -> &[f32] {
        &self.data[index][self.offset..self.offset + self.frames]
    }

    /// Get a sample at the specified channel and frame
    #[inline]
    pub fn get_sample(&self, channel: usize, frame: usize) -> Option<f32> {
        if frame >= self.frames {
            return None;
        }
        self.data.get(channel).map(|ch| ch[self.offset + frame])
    }

    /// Check if all samples are finite (not NaN or Infinity)
    pub fn is_finite(&self) -> bool {
        (0..self.channels()).all(|ch| self.channel(ch).iter().all(|s| s.is_finite()))
    }

    /// True if both buffers have the same sample rate and channel count
    pub fn same_format(&self, other: &AudioBuffer) -> bool {
        self.sample_rate == other.sample_rate && self.channels() == other.channels()
    }

    /// Fail with `FormatMismatch` unless both buffers share a format
    pub fn ensure_same_format(&self, other: &AudioBuffer, operation: &str) -> Result<()> {
        if self.same_format(other) {
            return Ok(());
        }
        Err(MixError::FormatMismatch {
            operation: operation.to_string(),
            left_rate: self.sample_rate,
            left_channels: self.channels(),
            right_rate: other.sample_rate,
            right_channels: other.channels(),
        })
    }

    /// Convert milliseconds to frames at this buffer's sample rate
    #[inline]
    pub fn ms_to_frames(&self, ms: i64) -> Result<usize> {
        ms_to_frames(ms, self.sample_rate)
    }

    // ------------------------------------------------------------------------
    // Slicing and joining
    // ------------------------------------------------------------------------

    /// Slice `[start_ms, end_ms)` out of the buffer
    ///
    /// # Errors
    /// `Range` if `start_ms < 0`, `start_ms > end_ms`, or `end_ms` lies past
    /// the end of the buffer.
    pub fn slice(&self, start_ms: i64, end_ms: i64) -> Result<AudioBuffer> {
        if start_ms < 0 || start_ms > end_ms {
            return Err(MixError::range(
                "slice",
                format!("invalid range {}ms..{}ms", start_ms, end_ms),
            ));
        }
        let end = match checked_ms_to_frames(end_ms, self.sample_rate) {
            Some(end) if end <= self.frames => end,
            _ => {
                return Err(MixError::range(
                    "slice",
                    format!(
                        "end {}ms is past buffer duration {:.3}ms",
                        end_ms,
                        self.duration_ms()
                    ),
                ))
            }
        };
        // start <= end, so it converts too
        let start = checked_ms_to_frames(start_ms, self.sample_rate).unwrap_or(end);
        self.slice_frames(start, end)
    }

    /// Slice frames `[start, end)` without copying samples
    pub fn slice_frames(&self, start: usize, end: usize) -> Result<AudioBuffer> {
        if start > end || end > self.frames {
            return Err(MixError::range(
                "slice",
                format!(
                    "frames {}..{} outside buffer of {} frames",
                    start, end, self.frames
                ),
            ));
        }
        Ok(AudioBuffer {
            data: Arc::clone(&self.data),
            offset: self.offset + start,
            frames: end - start,
            sample_rate: self.sample_rate,
        })
    }

    /// Append `other` to the end of this buffer
    ///
    /// # Errors
    /// `FormatMismatch` if sample rate or channel count differ.
    pub fn concat(&self, other: &AudioBuffer) -> Result<AudioBuffer> {
        AudioBuffer::concat_all(&[self.clone(), other.clone()])
    }

    /// Join many buffers in order with a single allocation per channel
    ///
    /// # Errors
    /// `InvalidInput` for an empty list, `FormatMismatch` if any part
    /// differs in format from the first.
    pub fn concat_all(parts: &[AudioBuffer]) -> Result<AudioBuffer> {
        let first = parts
            .first()
            .ok_or_else(|| MixError::invalid_input("nothing to concatenate"))?;
        for part in &parts[1..] {
            first.ensure_same_format(part, "concat")?;
        }

        let total: usize = parts.iter().map(|p| p.frames).sum();
        let data = (0..first.channels())
            .map(|ch| {
                let mut out = Vec::with_capacity(total);
                for part in parts {
                    out.extend_from_slice(part.channel(ch));
                }
                out
            })
            .collect();
        Ok(Self::from_owned(data, first.sample_rate))
    }

    /// Concatenate the buffer with itself `times` times
    ///
    /// # Errors
    /// `InvalidInput` if `times` is zero.
    pub fn repeat(&self, times: usize) -> Result<AudioBuffer> {
        if times == 0 {
            return Err(MixError::invalid_input("repeat count must be at least 1"));
        }
        if times == 1 {
            return Ok(self.clone());
        }
        let parts = vec![self.clone(); times];
        AudioBuffer::concat_all(&parts)
    }

    // ------------------------------------------------------------------------
    // Gain
    // ------------------------------------------------------------------------

    /// Multiply every sample by `10^(db/20)`
    ///
    /// No clipping correction is applied; positive gains can push samples
    /// past full scale.
    pub fn apply_gain_db(&self, gain_db: f32) -> AudioBuffer {
        self.apply_envelope(&GainEnvelope::Constant { gain_db })
    }

    /// Apply a gain envelope across the whole buffer
    pub fn apply_envelope(&self, envelope: &GainEnvelope) -> AudioBuffer {
        if envelope.is_unity() {
            return self.clone();
        }
        let len = self.frames;
        if let GainEnvelope::Constant { gain_db } = *envelope {
            let gain = db_to_linear(gain_db);
            return self.map_samples(|_, _, s| s * gain);
        }
        let gains: Vec<f32> = (0..len).map(|i| envelope.gain_at(i, len)).collect();
        self.map_samples(|_, i, s| s * gains[i])
    }

    /// Ramp gain linearly in dB from `from_db` at the first frame to `to_db`
    /// at the last frame
    ///
    /// # Errors
    /// `Precondition` unless `over_duration_ms` covers exactly this buffer.
    pub fn fade(&self, from_db: f32, to_db: f32, over_duration_ms: i64) -> Result<AudioBuffer> {
        if checked_ms_to_frames(over_duration_ms, self.sample_rate) != Some(self.frames) {
            return Err(MixError::precondition(
                "fade",
                format!(
                    "fade length {}ms does not match buffer duration {:.3}ms",
                    over_duration_ms,
                    self.duration_ms()
                ),
            ));
        }
        Ok(self.apply_envelope(&GainEnvelope::DecibelRamp { from_db, to_db }))
    }

    /// Fade the trailing `duration_ms` of the buffer from full level to
    /// silence. The last frame is exactly zero.
    ///
    /// # Errors
    /// `Range` if `duration_ms` is negative or longer than the buffer.
    pub fn fade_out_tail(&self, duration_ms: i64) -> Result<AudioBuffer> {
        if duration_ms < 0 {
            return Err(MixError::range(
                "fade_out_tail",
                format!("negative fade length {}ms", duration_ms),
            ));
        }
        match checked_ms_to_frames(duration_ms, self.sample_rate) {
            Some(fade_frames) if fade_frames <= self.frames => {
                self.fade_out_tail_frames(fade_frames)
            }
            _ => Err(MixError::range(
                "fade_out_tail",
                format!(
                    "fade length {}ms exceeds buffer duration {:.3}ms",
                    duration_ms,
                    self.duration_ms()
                ),
            )),
        }
    }

    /// Frame-level [`fade_out_tail`](Self::fade_out_tail)
    pub fn fade_out_tail_frames(&self, fade_frames: usize) -> Result<AudioBuffer> {
        if fade_frames > self.frames {
            return Err(MixError::range(
                "fade_out_tail",
                format!(
                    "fade of {} frames exceeds buffer of {} frames",
                    fade_frames, self.frames
                ),
            ));
        }
        if fade_frames == 0 {
            return Ok(self.clone());
        }
        let start = self.frames - fade_frames;
        let envelope = GainEnvelope::AmplitudeRamp { from: 1.0, to: 0.0 };
        Ok(self.map_samples(|_, i, s| {
            if i < start {
                s
            } else {
                s * envelope.gain_at(i - start, fade_frames)
            }
        }))
    }

    // ------------------------------------------------------------------------
    // Mixing
    // ------------------------------------------------------------------------

    /// Add `other` onto this buffer starting at `position_ms`
    ///
    /// # Errors
    /// `Range` if `other` would run past the end of this buffer (it is never
    /// clipped), `FormatMismatch` if the formats differ.
    pub fn overlay(&self, other: &AudioBuffer, position_ms: i64) -> Result<AudioBuffer> {
        if position_ms < 0 {
            return Err(MixError::range(
                "overlay",
                format!("negative position {}ms", position_ms),
            ));
        }
        let position = checked_ms_to_frames(position_ms, self.sample_rate).ok_or_else(|| {
            MixError::range(
                "overlay",
                format!(
                    "position {}ms exceeds buffer duration {:.3}ms",
                    position_ms,
                    self.duration_ms()
                ),
            )
        })?;
        self.overlay_frames(other, position)
    }

    /// Frame-level [`overlay`](Self::overlay)
    pub fn overlay_frames(&self, other: &AudioBuffer, position: usize) -> Result<AudioBuffer> {
        self.ensure_same_format(other, "overlay")?;
        let end = position.saturating_add(other.frames);
        if end > self.frames {
            return Err(MixError::range(
                "overlay",
                format!(
                    "position {:.3}ms + overlay {:.3}ms exceeds buffer duration {:.3}ms",
                    frames_to_ms(position, self.sample_rate),
                    other.duration_ms(),
                    self.duration_ms()
                ),
            ));
        }
        Ok(self.map_samples(|ch, i, s| {
            if (position..end).contains(&i) {
                s + other.channel(ch)[i - position]
            } else {
                s
            }
        }))
    }
}

impl PartialEq for AudioBuffer {
    fn eq(&self, other: &Self) -> bool {
        self.same_format(other)
            && self.frames == other.frames
            && (0..self.channels()).all(|ch| self.channel(ch) == other.channel(ch))
    }
}

impl fmt::Debug for AudioBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioBuffer")
            .field("channels", &self.channels())
            .field("frames", &self.frames)
            .field("sample_rate", &self.sample_rate)
            .field("duration_ms", &self.duration_ms())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const RATE: u32 = 1000; // one frame per millisecond keeps the math readable

    fn ramp(frames: usize) -> AudioBuffer {
        let samples: Vec<f32> = (0..frames).map(|i| i as f32).collect();
        AudioBuffer::from_channels(vec![samples], RATE).unwrap()
    }

    fn constant(frames: usize, value: f32, channels: usize) -> AudioBuffer {
        AudioBuffer::from_channels(vec![vec![value; frames]; channels], RATE).unwrap()
    }

    // ------------------------------------------------------------------------
    // Unit conversion tests
    // ------------------------------------------------------------------------

    #[test]
    fn test_db_to_linear() {
        assert!((db_to_linear(0.0) - 1.0).abs() < 1e-6);
        assert!((db_to_linear(-6.0206) - 0.5).abs() < 1e-4);
        assert!((db_to_linear(-20.0) - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_linear_to_db() {
        assert!((linear_to_db(1.0) - 0.0).abs() < 1e-6);
        assert!((linear_to_db(0.1) - (-20.0)).abs() < 1e-4);
        assert!(linear_to_db(0.0).is_infinite() && linear_to_db(0.0).is_sign_negative());
    }

    #[test]
    fn test_ms_to_frames_floors() {
        assert_eq!(ms_to_frames(1000, 44_100).unwrap(), 44_100);
        assert_eq!(ms_to_frames(1, 44_100).unwrap(), 44); // 44.1 -> 44
        assert_eq!(ms_to_frames(250, 48_000).unwrap(), 12_000);
        assert_eq!(ms_to_frames(0, 48_000).unwrap(), 0);
    }

    #[test]
    fn test_ms_to_frames_rejects_unrepresentable() {
        assert!(matches!(
            ms_to_frames(i64::MAX, 44_100),
            Err(MixError::InvalidInput { .. })
        ));
        assert!(matches!(
            ms_to_frames(-1, 44_100),
            Err(MixError::InvalidInput { .. })
        ));
        assert_eq!(checked_ms_to_frames(i64::MAX, 44_100), None);
        assert_eq!(checked_ms_to_frames(i64::MAX, 1000), usize::try_from(i64::MAX).ok());
    }

    #[test]
    fn test_huge_times_are_range_errors() {
        let buf = AudioBuffer::silence(100, 1, 1000);
        assert!(matches!(buf.slice(0, i64::MAX), Err(MixError::Range { .. })));
        assert!(matches!(buf.fade_out_tail(i64::MAX), Err(MixError::Range { .. })));
        assert!(matches!(
            buf.overlay(&AudioBuffer::silence(1, 1, 1000), i64::MAX),
            Err(MixError::Range { .. })
        ));
        assert!(matches!(
            buf.fade(0.0, -6.0, i64::MAX),
            Err(MixError::Precondition { .. })
        ));
    }

    #[test]
    fn test_calculate_rms_and_peak() {
        let buffer = constant(100, 0.5, 2);
        assert_relative_eq!(calculate_rms(&buffer), -6.0206, epsilon = 1e-3);
        assert_relative_eq!(calculate_peak(&buffer), -6.0206, epsilon = 1e-3);
        let silent = AudioBuffer::silence(100, 1, RATE);
        assert!(calculate_rms(&silent).is_infinite());
    }

    // ------------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------------

    #[test]
    fn test_from_channels_rejects_ragged() {
        let result = AudioBuffer::from_channels(vec![vec![0.0; 10], vec![0.0; 9]], RATE);
        assert!(matches!(result, Err(MixError::InvalidInput { .. })));
        assert!(AudioBuffer::from_channels(vec![], RATE).is_err());
        assert!(AudioBuffer::from_channels(vec![vec![0.0]], 0).is_err());
    }

    #[test]
    fn test_interleaved_roundtrip() {
        let original = vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6];
        let buffer = AudioBuffer::from_interleaved(&original, 2, RATE).unwrap();
        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.get_sample(1, 0), Some(0.2));
        assert_eq!(buffer.to_interleaved(), original);
        assert!(AudioBuffer::from_interleaved(&original[..5], 2, RATE).is_err());
    }

    // ------------------------------------------------------------------------
    // Slicing
    // ------------------------------------------------------------------------

    #[test]
    fn test_slice_exact_length() {
        let buffer = ramp(1000);
        let part = buffer.slice(250, 750).unwrap();
        assert_eq!(part.len(), 500);
        assert_eq!(part.get_sample(0, 0), Some(250.0));
        assert_eq!(part.get_sample(0, 499), Some(749.0));
        assert_eq!(part.get_sample(0, 500), None);
    }

    #[test]
    fn test_slice_of_slice_shares_storage() {
        let buffer = ramp(1000);
        let outer = buffer.slice(100, 900).unwrap();
        let inner = outer.slice(100, 200).unwrap();
        assert_eq!(inner.channel(0)[0], 200.0);
        assert!(Arc::ptr_eq(&buffer.data, &inner.data));
    }

    #[test]
    fn test_slice_range_errors() {
        let buffer = ramp(1000);
        assert!(matches!(buffer.slice(-1, 10), Err(MixError::Range { .. })));
        assert!(matches!(buffer.slice(10, 5), Err(MixError::Range { .. })));
        assert!(matches!(buffer.slice(0, 1001), Err(MixError::Range { .. })));
        assert_eq!(buffer.slice(1000, 1000).unwrap().len(), 0);
    }

    // ------------------------------------------------------------------------
    // Joining
    // ------------------------------------------------------------------------

    #[test]
    fn test_concat_sums_durations() {
        let a = ramp(300);
        let b = ramp(200);
        let joined = a.concat(&b).unwrap();
        assert_eq!(joined.len(), 500);
        assert_eq!(joined.get_sample(0, 300), Some(0.0));
        assert_relative_eq!(joined.duration_ms(), 500.0);
    }

    #[test]
    fn test_concat_format_mismatch() {
        let mono = constant(10, 0.1, 1);
        let stereo = constant(10, 0.1, 2);
        assert!(matches!(
            mono.concat(&stereo),
            Err(MixError::FormatMismatch { .. })
        ));

        let other_rate = AudioBuffer::silence(10, 1, 44_100);
        assert!(matches!(
            mono.concat(&other_rate),
            Err(MixError::FormatMismatch { .. })
        ));
    }

    #[test]
    fn test_repeat() {
        let buffer = ramp(10);
        let looped = buffer.repeat(3).unwrap();
        assert_eq!(looped.len(), 30);
        assert_eq!(looped.get_sample(0, 10), Some(0.0));
        assert_eq!(looped.get_sample(0, 29), Some(9.0));
        assert!(matches!(buffer.repeat(0), Err(MixError::InvalidInput { .. })));
    }

    // ------------------------------------------------------------------------
    // Gain and fades
    // ------------------------------------------------------------------------

    #[test]
    fn test_apply_gain_db_is_pure() {
        let buffer = constant(100, 0.5, 1);
        let quieter = buffer.apply_gain_db(-6.0206);
        assert_relative_eq!(quieter.channel(0)[0], 0.25, epsilon = 1e-4);
        assert_eq!(buffer.channel(0)[0], 0.5);
    }

    #[test]
    fn test_apply_gain_does_not_clip() {
        let buffer = constant(10, 0.9, 1);
        let louder = buffer.apply_gain_db(6.0);
        assert!(louder.channel(0)[0] > 1.0);
    }

    #[test]
    fn test_fade_endpoints() {
        let buffer = constant(500, 1.0, 2);
        let faded = buffer.fade(0.0, -18.0, 500).unwrap();
        assert_relative_eq!(faded.channel(0)[0], 1.0, epsilon = 1e-6);
        assert_relative_eq!(
            linear_to_db(faded.channel(1)[499]),
            -18.0,
            epsilon = 1e-3
        );
        // Monotonic decrease
        let ch = faded.channel(0);
        assert!(ch.windows(2).all(|w| w[1] <= w[0]));
    }

    #[test]
    fn test_fade_length_mismatch_is_precondition_error() {
        let buffer = constant(500, 1.0, 1);
        assert!(matches!(
            buffer.fade(0.0, -18.0, 400),
            Err(MixError::Precondition { .. })
        ));
    }

    #[test]
    fn test_fade_out_tail() {
        let buffer = constant(1000, 0.8, 1);
        let faded = buffer.fade_out_tail(100).unwrap();
        assert_eq!(faded.len(), 1000);
        assert_eq!(faded.channel(0)[899], 0.8);
        assert_eq!(faded.channel(0)[900], 0.8);
        assert_eq!(faded.channel(0)[999], 0.0);
        assert!(faded.channel(0)[950] < 0.8 && faded.channel(0)[950] > 0.0);
        assert!(matches!(
            buffer.fade_out_tail(1001),
            Err(MixError::Range { .. })
        ));
        assert!(buffer.fade_out_tail(0).unwrap() == buffer);
    }

    // ------------------------------------------------------------------------
    // Overlay
    // ------------------------------------------------------------------------

    #[test]
    fn test_overlay_adds_at_position() {
        let base = constant(1000, 0.25, 1);
        let voice = constant(200, 0.5, 1);
        let mixed = base.overlay(&voice, 300).unwrap();
        assert_eq!(mixed.len(), 1000);
        assert_eq!(mixed.channel(0)[299], 0.25);
        assert_eq!(mixed.channel(0)[300], 0.75);
        assert_eq!(mixed.channel(0)[499], 0.75);
        assert_eq!(mixed.channel(0)[500], 0.25);
    }

    #[test]
    fn test_overlay_never_clips_silently() {
        let base = constant(1000, 0.25, 1);
        let voice = constant(200, 0.5, 1);
        assert!(base.overlay(&voice, 800).is_ok());
        assert!(matches!(
            base.overlay(&voice, 801),
            Err(MixError::Range { .. })
        ));
        assert!(matches!(
            base.overlay(&voice, -1),
            Err(MixError::Range { .. })
        ));
    }

    #[test]
    fn test_overlay_on_slice_respects_offset() {
        let base = ramp(1000).slice(500, 1000).unwrap();
        let one = constant(1, 1.0, 1);
        let mixed = base.overlay_frames(&one, 0).unwrap();
        assert_eq!(mixed.channel(0)[0], 501.0);
    }

    #[test]
    fn test_is_finite() {
        assert!(constant(10, 0.5, 1).is_finite());
        let nan = AudioBuffer::from_channels(vec![vec![f32::NAN; 4]], RATE).unwrap();
        assert!(!nan.is_finite());
    }
}

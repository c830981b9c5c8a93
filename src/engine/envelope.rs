//! Gain envelopes
//!
//! A [`GainEnvelope`] maps a frame index inside a segment of `len` frames to
//! a linear gain multiplier. Ramps hit their start value on frame 0 and their
//! end value on the last frame, so two segments that share a boundary gain
//! meet without a step.

use serde::{Deserialize, Serialize};

use crate::engine::buffer::{db_to_linear, linear_to_db};

/// Gain shape applied across one segment
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum GainEnvelope {
    /// Fixed gain for the whole segment
    Constant { gain_db: f32 },

    /// Gain moves linearly in decibels from `from_db` to `to_db`.
    /// This is the default fade shape; it sounds even to the ear.
    DecibelRamp { from_db: f32, to_db: f32 },

    /// Gain moves linearly in amplitude from `from` to `to`.
    /// Used for fades to silence, which have no finite dB endpoint.
    AmplitudeRamp { from: f32, to: f32 },
}

impl GainEnvelope {
    /// Unity gain (0 dB)
    pub fn unity() -> Self {
        GainEnvelope::Constant { gain_db: 0.0 }
    }

    /// Position of `frame` within a segment of `len` frames, 0.0..=1.0
    #[inline]
    fn progress(frame: usize, len: usize) -> f64 {
        if len <= 1 {
            0.0
        } else {
            frame.min(len - 1) as f64 / (len - 1) as f64
        }
    }

    /// Linear gain multiplier at `frame` of a `len`-frame segment
    pub fn gain_at(&self, frame: usize, len: usize) -> f32 {
        match *self {
            GainEnvelope::Constant { gain_db } => db_to_linear(gain_db),
            GainEnvelope::DecibelRamp { from_db, to_db } => {
                let t = Self::progress(frame, len);
                let db = from_db as f64 + (to_db as f64 - from_db as f64) * t;
                db_to_linear(db as f32)
            }
            GainEnvelope::AmplitudeRamp { from, to } => {
                let t = Self::progress(frame, len);
                (from as f64 + (to as f64 - from as f64) * t) as f32
            }
        }
    }

    /// Gain in dB at `frame`; `-inf` where the envelope reaches silence
    pub fn gain_db_at(&self, frame: usize, len: usize) -> f32 {
        linear_to_db(self.gain_at(frame, len))
    }

    /// Gain in dB at the first frame
    pub fn start_db(&self) -> f32 {
        match *self {
            GainEnvelope::Constant { gain_db } => gain_db,
            GainEnvelope::DecibelRamp { from_db, .. } => from_db,
            GainEnvelope::AmplitudeRamp { from, .. } => linear_to_db(from),
        }
    }

    /// Gain in dB at the last frame
    pub fn end_db(&self) -> f32 {
        match *self {
            GainEnvelope::Constant { gain_db } => gain_db,
            GainEnvelope::DecibelRamp { to_db, .. } => to_db,
            GainEnvelope::AmplitudeRamp { to, .. } => linear_to_db(to),
        }
    }

    /// True if every frame gets unity gain
    pub fn is_unity(&self) -> bool {
        matches!(*self, GainEnvelope::Constant { gain_db } if gain_db == 0.0)
    }
}

impl Default for GainEnvelope {
    fn default() -> Self {
        Self::unity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_constant_envelope() {
        let env = GainEnvelope::Constant { gain_db: -20.0 };
        assert_relative_eq!(env.gain_at(0, 100), 0.1, epsilon = 1e-6);
        assert_relative_eq!(env.gain_at(99, 100), 0.1, epsilon = 1e-6);
        assert!(GainEnvelope::unity().is_unity());
        assert!(!env.is_unity());
    }

    #[test]
    fn test_decibel_ramp_endpoints() {
        let env = GainEnvelope::DecibelRamp {
            from_db: 0.0,
            to_db: -18.0,
        };
        assert_relative_eq!(env.gain_db_at(0, 101), 0.0, epsilon = 1e-4);
        assert_relative_eq!(env.gain_db_at(100, 101), -18.0, epsilon = 1e-4);
        // Linear in dB: the midpoint is halfway in decibels
        assert_relative_eq!(env.gain_db_at(50, 101), -9.0, epsilon = 1e-4);
    }

    #[test]
    fn test_amplitude_ramp_reaches_silence() {
        let env = GainEnvelope::AmplitudeRamp { from: 1.0, to: 0.0 };
        assert_eq!(env.gain_at(0, 11), 1.0);
        assert_eq!(env.gain_at(10, 11), 0.0);
        assert_relative_eq!(env.gain_at(5, 11), 0.5, epsilon = 1e-6);
        assert!(env.end_db().is_infinite());
    }

    #[test]
    fn test_single_frame_ramp_uses_start_value() {
        let env = GainEnvelope::DecibelRamp {
            from_db: -18.0,
            to_db: 0.0,
        };
        assert_relative_eq!(env.gain_db_at(0, 1), -18.0, epsilon = 1e-4);
    }

    #[test]
    fn test_serde_shape_tag() {
        let env = GainEnvelope::DecibelRamp {
            from_db: 0.0,
            to_db: -18.0,
        };
        let json = serde_json::to_value(env).unwrap();
        assert_eq!(json["shape"], "decibel_ramp");
        let back: GainEnvelope = serde_json::from_value(json).unwrap();
        assert_eq!(back, env);
    }
}

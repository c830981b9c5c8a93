//! Audio Engine Module
//!
//! Buffer primitives shared by the compositor and the I/O plumbing:
//! - Immutable audio buffers with zero-copy slicing
//! - Gain envelopes
//! - File import/export and format conforming

pub mod buffer;
pub mod envelope;
pub mod io;

pub use buffer::{
    calculate_peak, calculate_rms, checked_ms_to_frames, db_to_linear, frames_to_ms,
    linear_to_db, ms_to_frames, AudioBuffer, DEFAULT_SAMPLE_RATE,
};
pub use envelope::GainEnvelope;
pub use io::{
    conform, decode_pcm_s16le, export_audio, generate_constant, generate_test_tone,
    import_audio, ExportFormat,
};

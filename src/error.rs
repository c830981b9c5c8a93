//! Error handling for bedmix
//!
//! Every failure carries enough context (segment, bounds, format) to
//! diagnose a miscalculated timeline. Nothing is recovered internally.

use thiserror::Error;

/// Result type alias for bedmix operations
pub type Result<T> = std::result::Result<T, MixError>;

/// Main error type for bedmix operations
#[derive(Error, Debug)]
pub enum MixError {
    // Caller bugs
    #[error("Invalid input: {reason}")]
    InvalidInput { reason: String },

    #[error("Range error in {operation}: {details}")]
    Range { operation: String, details: String },

    #[error("Precondition failed in {operation}: {details}")]
    Precondition { operation: String, details: String },

    #[error(
        "Format mismatch in {operation}: {left_rate}Hz/{left_channels}ch vs {right_rate}Hz/{right_channels}ch"
    )]
    FormatMismatch {
        operation: String,
        left_rate: u32,
        left_channels: usize,
        right_rate: u32,
        right_channels: usize,
    },

    // External collaborators
    #[error("Speech synthesis failed: {reason}")]
    Synthesis {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Cannot decode audio from {path}: {reason}")]
    Decode {
        path: String,
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Cannot encode audio to {path}: {reason}")]
    Encode { path: String, reason: String },

    #[error("Configuration error: {reason}")]
    Config { reason: String },

    // I/O Errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization Errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl MixError {
    pub(crate) fn invalid_input(reason: impl Into<String>) -> Self {
        MixError::InvalidInput {
            reason: reason.into(),
        }
    }

    pub(crate) fn range(operation: &str, details: impl Into<String>) -> Self {
        MixError::Range {
            operation: operation.to_string(),
            details: details.into(),
        }
    }

    pub(crate) fn precondition(operation: &str, details: impl Into<String>) -> Self {
        MixError::Precondition {
            operation: operation.to_string(),
            details: details.into(),
        }
    }

    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            MixError::InvalidInput { .. } => "INVALID_INPUT",
            MixError::Range { .. } => "RANGE_ERROR",
            MixError::Precondition { .. } => "PRECONDITION_ERROR",
            MixError::FormatMismatch { .. } => "FORMAT_MISMATCH",
            MixError::Synthesis { .. } => "SYNTHESIS_ERROR",
            MixError::Decode { .. } => "DECODE_ERROR",
            MixError::Encode { .. } => "ENCODE_ERROR",
            MixError::Config { .. } => "CONFIG_ERROR",
            MixError::Io(_) => "IO_ERROR",
            MixError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// True when the error indicates a bug in the caller's request or timeline
    /// math. These are never worth retrying.
    pub fn is_caller_bug(&self) -> bool {
        matches!(
            self,
            MixError::InvalidInput { .. }
                | MixError::Range { .. }
                | MixError::Precondition { .. }
                | MixError::FormatMismatch { .. }
        )
    }

    /// Get recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            MixError::InvalidInput { .. } => vec![
                "All durations must be zero or positive",
                "A mix may be at most 24 hours long",
                "The duck level must be 0 dB or lower",
            ],
            MixError::Range { .. } | MixError::Precondition { .. } => vec![
                "The mix timeline was miscalculated for this buffer",
                "Report the failing request together with its settings",
            ],
            MixError::FormatMismatch { .. } => vec![
                "Conform the narration to the background's sample rate and channel count",
            ],
            MixError::Synthesis { .. } => vec![
                "Check the speech synthesis API key",
                "Check network connectivity to the synthesis service",
                "Try again later; the service may be rate limiting",
            ],
            MixError::Decode { .. } => vec![
                "Check the file path is correct",
                "Supported formats: WAV, MP3",
                "The file may be corrupted - try re-exporting from source",
            ],
            MixError::Encode { .. } => vec![
                "Check the output directory exists and is writable",
                "Supported bit depths: 16, 24, 32",
            ],
            _ => vec![],
        }
    }
}

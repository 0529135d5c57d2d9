//! Error handling for Tapewarp
//!
//! Every user-visible failure carries a plain-language recovery hint so the
//! caller can tell "try a shorter clip" from "use the other export format".

use thiserror::Error;

/// Result type alias for Tapewarp operations
pub type Result<T> = std::result::Result<T, TapewarpError>;

/// Main error type for Tapewarp operations
#[derive(Error, Debug)]
pub enum TapewarpError {
    /// Malformed or empty sample buffer handed to the core
    #[error("Invalid input: {reason}")]
    InvalidInput { reason: String },

    /// Input bytes could not be decoded as audio
    #[error("Invalid audio data: {reason}")]
    InvalidAudio {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Chunk allocation failed during offline rendering
    #[error("Out of memory while rendering: {details}")]
    ResourceExhausted { details: String },

    /// The compressed path was requested but no frame encoder was supplied
    #[error("Compressed encoder unavailable")]
    EncoderUnavailable,

    /// The frame encoder failed mid-stream
    #[error("Compressed encoding failed: {reason}")]
    EncodingFailed { reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl TapewarpError {
    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            TapewarpError::InvalidInput { .. } => "INVALID_INPUT",
            TapewarpError::InvalidAudio { .. } => "INVALID_AUDIO",
            TapewarpError::ResourceExhausted { .. } => "RESOURCE_EXHAUSTED",
            TapewarpError::EncoderUnavailable => "ENCODER_UNAVAILABLE",
            TapewarpError::EncodingFailed { .. } => "ENCODING_FAILED",
            TapewarpError::Io(_) => "IO_ERROR",
            TapewarpError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Check if the caller can meaningfully retry after this error
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            TapewarpError::ResourceExhausted { .. }
                | TapewarpError::EncoderUnavailable
                | TapewarpError::EncodingFailed { .. }
                | TapewarpError::InvalidAudio { .. }
        )
    }

    /// Plain-language guidance shown alongside the error message
    pub fn recovery_hint(&self) -> Option<&'static str> {
        match self {
            TapewarpError::InvalidInput { .. } => {
                Some("Check that the audio has at least one channel and one sample")
            }
            TapewarpError::InvalidAudio { .. } => {
                Some("The file may be corrupted - try re-exporting it as a standard WAV")
            }
            TapewarpError::ResourceExhausted { .. } => {
                Some("Try a shorter clip or reduce the active effects")
            }
            TapewarpError::EncoderUnavailable => {
                Some("No MP3 codec is available - use the WAV export format instead")
            }
            TapewarpError::EncodingFailed { .. } => {
                Some("The track may be too long for the codec - try the WAV export format")
            }
            _ => None,
        }
    }
}

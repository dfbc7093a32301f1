//! Error handling for Sonara
//!
//! Anything that can fail before playback starts (file import, document
//! edits, model inference) surfaces as a [`SonaraError`]. The realtime
//! render path never returns errors; it degrades to silence instead.

use thiserror::Error;

/// Result type alias for Sonara operations
pub type Result<T> = std::result::Result<T, SonaraError>;

/// Main error type for Sonara operations
#[derive(Error, Debug)]
pub enum SonaraError {
    // File Errors
    #[error("File not found: {path}")]
    FileNotFound {
        path: String,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("Invalid audio file: {reason}")]
    InvalidAudio {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Unsupported audio format: {format}")]
    UnsupportedFormat { format: String },

    #[error("Audio contains no samples")]
    EmptyAudio,

    // Configuration Errors
    #[error("Invalid render configuration: {reason}")]
    InvalidConfig { reason: String },

    // Document Errors
    #[error("Unknown audio source: {id}")]
    SourceNotFound { id: String },

    #[error("Unknown audio modification: {id}")]
    ModificationNotFound { id: String },

    // Model Errors
    #[error("Model '{model}' is not ready")]
    ModelNotReady { model: String },

    #[error("Inference failed: {reason}")]
    InferenceError { reason: String },

    #[error("Inference bridge unavailable: {reason}")]
    BridgeUnavailable { reason: String },

    #[error("Inference bridge timed out after {timeout_ms} ms")]
    BridgeTimeout { timeout_ms: u64 },

    // I/O Errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization Errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SonaraError {
    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            SonaraError::FileNotFound { .. } => "FILE_NOT_FOUND",
            SonaraError::InvalidAudio { .. } => "INVALID_AUDIO",
            SonaraError::UnsupportedFormat { .. } => "UNSUPPORTED_FORMAT",
            SonaraError::EmptyAudio => "EMPTY_AUDIO",
            SonaraError::InvalidConfig { .. } => "INVALID_CONFIG",
            SonaraError::SourceNotFound { .. } => "SOURCE_NOT_FOUND",
            SonaraError::ModificationNotFound { .. } => "MODIFICATION_NOT_FOUND",
            SonaraError::ModelNotReady { .. } => "MODEL_NOT_READY",
            SonaraError::InferenceError { .. } => "INFERENCE_ERROR",
            SonaraError::BridgeUnavailable { .. } => "BRIDGE_UNAVAILABLE",
            SonaraError::BridgeTimeout { .. } => "BRIDGE_TIMEOUT",
            SonaraError::Io(_) => "IO_ERROR",
            SonaraError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Check if this error leaves the document in a usable state
    ///
    /// Inference and bridge failures are recoverable: the modification
    /// simply stays unmodified and playback falls back to the source.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            SonaraError::FileNotFound { .. }
                | SonaraError::InvalidAudio { .. }
                | SonaraError::UnsupportedFormat { .. }
                | SonaraError::ModelNotReady { .. }
                | SonaraError::InferenceError { .. }
                | SonaraError::BridgeUnavailable { .. }
                | SonaraError::BridgeTimeout { .. }
        )
    }
}

//! # Codec Error Types
//!
//! Structured errors for the FLAC adapter. Raw libFLAC status codes never
//! leave the crate; they are translated into one of these variants with the
//! engine's own status string attached where one exists.

use thiserror::Error;

/// Errors that can occur while decoding or encoding FLAC streams.
#[derive(Error, Debug)]
pub enum CodecError {
    // ========================================================================
    // Construction Errors
    // ========================================================================
    /// The native engine could not allocate a decoder or encoder instance.
    #[error("Failed to create native {0}")]
    Creation(&'static str),

    /// The named resource or caller-supplied stream could not be initialized.
    #[error("Failed to open stream: {0}")]
    Open(String),

    /// The decoder could not establish channels, depth and rate.
    #[error("Failed to process metadata: {0}")]
    Metadata(String),

    /// Channel count, bit depth or sample rate rejected before any native call.
    #[error("Invalid stream format: {0}")]
    InvalidFormat(String),

    /// Decoder or encoder configuration value out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ========================================================================
    // Streaming Errors
    // ========================================================================
    /// A frame's parameters or buffer shape disagree with the encoder's stream.
    #[error("Frame does not match stream: {0}")]
    FormatMismatch(String),

    /// The native engine reported a decoding failure.
    #[error("Decoding error: {0}")]
    Decode(String),

    /// The native engine reported an encoding failure.
    #[error("Encoding error: {0}")]
    Encode(String),

    // ========================================================================
    // Lifecycle Errors
    // ========================================================================
    /// Operation attempted on a decoder or encoder after `close()`.
    #[error("Codec instance is closed")]
    Closed,

    /// Closing the caller's byte source or sink failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CodecError {
    /// Returns `true` if the error was raised while constructing an instance.
    ///
    /// No usable decoder or encoder exists after such an error.
    pub fn is_construction_error(&self) -> bool {
        matches!(
            self,
            CodecError::Creation(_)
                | CodecError::Open(_)
                | CodecError::Metadata(_)
                | CodecError::InvalidFormat(_)
                | CodecError::InvalidConfig(_)
        )
    }

    /// Returns `true` if the instance that produced the error must be closed.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            CodecError::Decode(_) | CodecError::Encode(_) | CodecError::Closed
        )
    }

    /// Returns `true` if this error is about stream parameters rather than data.
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            CodecError::InvalidFormat(_) | CodecError::FormatMismatch(_)
        )
    }
}

/// Result type for codec operations.
pub type Result<T> = std::result::Result<T, CodecError>;

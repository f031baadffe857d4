//! Common error types used throughout webpforge.
//!
//! This module provides a unified error type that covers the failure cases of
//! the conversion queue: lookups, invalid state transitions, decode and encode
//! failures, revoked handles, archive assembly and clipboard writes.

/// Common error type for webpforge.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The requested item was not found.
    #[error("Item not found: {0}")]
    NotFound(String),

    /// Invalid input was provided.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The requested status change is not allowed from the current status.
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    /// The source image could not be decoded.
    #[error("Decode error: {0}")]
    Decode(String),

    /// The decoded raster could not be encoded.
    #[error("Encode error: {0}")]
    Encode(String),

    /// The encoder finished without producing any bytes.
    #[error("Encoder produced no output")]
    EmptyOutput,

    /// The encode did not finish within the configured timeout.
    #[error("Timed out after {0} seconds")]
    Timeout(u64),

    /// A handle was used after it had been released.
    #[error("Handle revoked: {0}")]
    HandleRevoked(String),

    /// Building the bundle archive failed.
    #[error("Archive error: {0}")]
    Archive(String),

    /// Writing to the clipboard failed.
    #[error("Clipboard error: {0}")]
    Clipboard(String),

    /// An I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// An internal error occurred.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new NotFound error.
    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a new InvalidInput error.
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a new InvalidTransition error.
    pub fn invalid_transition<S: Into<String>>(msg: S) -> Self {
        Self::InvalidTransition(msg.into())
    }

    /// Create a new Decode error.
    pub fn decode<S: Into<String>>(msg: S) -> Self {
        Self::Decode(msg.into())
    }

    /// Create a new Encode error.
    pub fn encode<S: Into<String>>(msg: S) -> Self {
        Self::Encode(msg.into())
    }

    /// Create a new Archive error.
    pub fn archive<S: Into<String>>(msg: S) -> Self {
        Self::Archive(msg.into())
    }

    /// Create a new Clipboard error.
    pub fn clipboard<S: Into<String>>(msg: S) -> Self {
        Self::Clipboard(msg.into())
    }

    /// Create a new Internal error.
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }
}

/// Result type alias using the common Error type.
pub type Result<T> = std::result::Result<T, Error>;

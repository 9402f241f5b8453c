//! Error types for parameter extraction.
//!
//! Only [`DecodeError`] ever reaches the caller of a
//! [`ParamReader`](crate::ParamReader) operation. [`FormError`] is handed to the
//! [`ParamLogger`](crate::ParamLogger) and the parameter is then treated as absent.

use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FormError {
    #[error("invalid content-type header: {reason}")]
    InvalidContentType { reason: String },

    #[error("form body too large, current: {current_size} exceed the limit {max_size}")]
    TooLargeBody { current_size: usize, max_size: usize },

    #[error("invalid percent escape: {sequence:?}")]
    InvalidEscape { sequence: String },

    #[error("invalid form encoding: {source}")]
    InvalidEncoding {
        #[from]
        source: serde_urlencoded::de::Error,
    },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl FormError {
    pub fn invalid_content_type<S: ToString>(str: S) -> Self {
        Self::InvalidContentType { reason: str.to_string() }
    }

    pub fn too_large_body(current_size: usize, max_size: usize) -> Self {
        Self::TooLargeBody { current_size, max_size }
    }

    pub fn invalid_escape<S: ToString>(sequence: S) -> Self {
        Self::InvalidEscape { sequence: sequence.to_string() }
    }
}

/// Failure to decode a structured request body.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("invalid json body: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },
}

impl DecodeError {
    /// Returns true when the body ended before a complete value was read.
    pub fn is_eof(&self) -> bool {
        match self {
            DecodeError::Json { source } => source.is_eof(),
        }
    }
}

// SPDX-FileCopyrightText: 2026 Portrait Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types shared across the portrait workspace.

use thiserror::Error;

/// The primary error type used by every portrait crate.
#[derive(Debug, Error)]
pub enum PortraitError {
    /// A caller-supplied value is outside its accepted range.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Every selector strategy was exhausted without a visible match.
    #[error("element not found: {0}")]
    ElementNotFound(String),

    /// Network failure or a non-2xx response from the local backend.
    #[error("fetch failed: {message}")]
    FetchFailed {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The remote image-generation provider rejected a request.
    #[error("upstream API error ({status}): {message}")]
    UpstreamApi { status: u16, message: String },

    /// Filesystem or database failure.
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A requested image or file does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Configuration errors (invalid values, missing required fields).
    #[error("configuration error: {0}")]
    Config(String),

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl PortraitError {
    /// Wraps an I/O error as a storage failure.
    pub fn storage(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Storage {
            source: Box::new(err),
        }
    }

    /// Builds a `FetchFailed` without an underlying source.
    pub fn fetch(message: impl Into<String>) -> Self {
        Self::FetchFailed {
            message: message.into(),
            source: None,
        }
    }

    /// HTTP status class an endpoint should report for this error.
    ///
    /// Only three classes exist: bad input, missing image, internal.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidArgument(_) | Self::Config(_) => 400,
            Self::NotFound(_) => 404,
            _ => 500,
        }
    }
}

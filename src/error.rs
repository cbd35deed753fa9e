//! Custom error types for the dictionary pipeline.
//!
//! Library code returns [`SozlukError`]; the binary wraps it in `anyhow`.
//! Failures of the translation service have their own typed
//! [`ServiceError`](crate::service::ServiceError) so the batch processor
//! can decide on a retry policy without inspecting message text.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while reading, translating or uploading entries.
#[derive(Error, Debug)]
pub enum SozlukError {
    /// Failed to read an input file.
    #[error("failed to read input file '{path}': {source}")]
    InputFileRead {
        /// Path to the file that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to write an output file.
    #[error("failed to write to output file '{path}': {source}")]
    OutputFileWrite {
        /// Path to the file that could not be written.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse a JSON document.
    #[error("failed to parse JSON in '{path}': {source}")]
    JsonParse {
        /// File the document was read from.
        path: PathBuf,
        /// The underlying JSON parsing error.
        #[source]
        source: serde_json::Error,
    },

    /// Failed to serialize JSON for output.
    #[error("failed to serialize JSON: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    /// HTTP client could not be built or a request failed outright.
    #[error("HTTP request failed: {0}")]
    HttpRequest(#[from] reqwest::Error),

    /// No usable API credential.
    #[error("no usable API credentials - at least one valid key is required")]
    NoCredentials,

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, SozlukError>;

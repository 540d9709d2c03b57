//! Error types for the img-resizer crate.

use crate::codec::PhotoFormat;

/// Message shown to the user whenever a preview request fails.
pub const LOAD_FAILURE_MESSAGE: &str = "Could not load image";

/// Errors that can occur while decoding, compositing, or encoding an image.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The source bytes are not a recognized raster format, or are truncated/corrupt.
    #[error("failed to decode image: {0}")]
    Decode(image::ImageError),

    /// No encoder is available for the requested output format.
    #[error("no encoder available for {0:?}")]
    UnsupportedFormat(PhotoFormat),

    /// The encoder failed while producing the output buffer.
    #[error("failed to encode image: {0}")]
    Encode(image::ImageError),

    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The watermark font could not be located or parsed.
    #[error("font error: {0}")]
    Font(String),

    /// The settings file could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The request was cancelled between pipeline stages.
    #[error("request cancelled")]
    Cancelled,
}

impl Error {
    /// The single human-readable notification for a failed request.
    ///
    /// Every variant maps to the same message; the detailed cause is kept in
    /// the [`Display`](std::fmt::Display) output for logs.
    #[must_use]
    pub fn user_message(&self) -> &'static str {
        LOAD_FAILURE_MESSAGE
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::Config(err.to_string())
    }
}

/// A specialized `Result` type for this crate.
pub type Result<T> = std::result::Result<T, Error>;

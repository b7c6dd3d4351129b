//! Error types for the converter core.

use thiserror::Error;

/// Result type alias for converter operations
pub type Result<T> = std::result::Result<T, Error>;

/// Text shown in the blocking alert when no transcoder can be located.
pub const TRANSCODER_ALERT: &str = "FFmpeg not found. Please install FFmpeg and ensure it's in your system's PATH or in the application's folder.";

/// Main error type for the converter
#[derive(Debug, Error)]
pub enum Error {
    /// The pasted link is not one of the accepted video-sharing hosts
    #[error("invalid media URL: {0}")]
    InvalidUrl(String),

    /// A quality label that carries no usable number (e.g. "bestp")
    #[error("invalid quality selector: {0}")]
    InvalidQuality(String),

    /// Audio jobs need a transcoder and none was found on PATH or locally.
    /// The display text is surfaced verbatim as `Error: FFmpeg not found.`
    #[error("FFmpeg not found.")]
    TranscoderNotFound,

    /// The yt-dlp executable could not be located
    #[error("yt-dlp not found (looked for `{0}` on PATH and in the working directory)")]
    ExtractorNotFound(String),

    /// Start was requested while another job is still running
    #[error("a download is already in progress")]
    JobInFlight,

    /// The delegated tool ran but reported failure
    #[error("{message}")]
    Extraction {
        /// Process exit code, when the process was not killed by a signal
        code: Option<i32>,
        /// Last meaningful line the tool wrote to stderr
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Config file could not be parsed
    #[error("config error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Config file could not be written
    #[error("config error: {0}")]
    ConfigWrite(#[from] toml::ser::Error),

    /// The platform exposes no per-user config or data directory
    #[error("no per-user config or data directory available")]
    NoUserDir,
}

impl Error {
    /// Longer text for a blocking alert, where one is warranted.
    pub fn alert_text(&self) -> Option<&'static str> {
        match self {
            Error::TranscoderNotFound => Some(TRANSCODER_ALERT),
            _ => None,
        }
    }
}

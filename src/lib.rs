//! Core of the YouTube MP3/MP4 converter: link validation, job building,
//! the yt-dlp worker and the queue-draining coordinator the UI polls.

pub mod config;
pub mod coordinator;
pub mod downloader;
pub mod error;
pub mod job;
pub mod logging;
pub mod model;
pub mod progress;
pub mod tools;
pub mod url;

pub use coordinator::Coordinator;
pub use error::{Error, Result};
pub use model::{JobRequest, JobState, MediaMode, ProgressEvent};

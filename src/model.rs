use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Status text before any job has been started.
pub const STATUS_IDLE: &str = "Status: Idle";
/// Status text set by the start action.
pub const STATUS_STARTING: &str = "Starting download...";
/// Emitted once the download itself is done and post-processing begins.
pub const STATUS_FINALIZING: &str = "Finalizing...";
/// Emitted when the delegated tool returns successfully.
pub const STATUS_COMPLETED: &str = "Download completed successfully!";

/// Resolution ceilings offered for video jobs
pub const VIDEO_QUALITIES: [&str; 4] = ["360p", "480p", "720p", "1080p"];
/// MP3 bitrates offered for audio jobs
pub const AUDIO_QUALITIES: [&str; 4] = ["128kbps", "192kbps", "256kbps", "320kbps"];

/// Whether a job keeps the video or extracts the audio track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaMode {
    /// Best video up to a height ceiling, merged with the best audio
    #[default]
    Video,
    /// Best audio, transcoded to MP3
    Audio,
}

impl MediaMode {
    /// Label shown next to the mode selector
    pub fn label(self) -> &'static str {
        match self {
            MediaMode::Video => "Video (MP4)",
            MediaMode::Audio => "Audio (MP3)",
        }
    }

    /// Quality labels offered for this mode
    pub fn quality_options(self) -> &'static [&'static str] {
        match self {
            MediaMode::Video => &VIDEO_QUALITIES,
            MediaMode::Audio => &AUDIO_QUALITIES,
        }
    }

    /// Quality selected after switching to this mode
    pub fn default_quality(self) -> &'static str {
        match self {
            MediaMode::Video => "720p",
            MediaMode::Audio => "192kbps",
        }
    }
}

/// A quality label with its unit suffix stripped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quality {
    /// "720p" → 720
    MaxHeight(u32),
    /// "192kbps" → 192
    AudioBitrate(u32),
}

impl Quality {
    /// Parse a quality label for the given mode.
    ///
    /// The unit suffix is optional, so "720" and "720p" both give a 720 ceiling.
    pub fn parse(mode: MediaMode, selector: &str) -> Result<Self> {
        let trimmed = selector.trim();
        let digits = match mode {
            MediaMode::Video => trimmed
                .strip_suffix(['p', 'P'])
                .unwrap_or(trimmed),
            MediaMode::Audio => strip_suffix_ignore_case(trimmed, "kbps")
                .or_else(|| strip_suffix_ignore_case(trimmed, "k"))
                .unwrap_or(trimmed),
        };

        let value = digits
            .trim()
            .parse::<u32>()
            .ok()
            .filter(|v| *v > 0)
            .ok_or_else(|| Error::InvalidQuality(selector.to_string()))?;

        Ok(match mode {
            MediaMode::Video => Quality::MaxHeight(value),
            MediaMode::Audio => Quality::AudioBitrate(value),
        })
    }
}

fn strip_suffix_ignore_case<'a>(s: &'a str, suffix: &str) -> Option<&'a str> {
    let split = s.len().checked_sub(suffix.len())?;
    if !s.is_char_boundary(split) {
        return None;
    }
    let (head, tail) = s.split_at(split);
    tail.eq_ignore_ascii_case(suffix).then_some(head)
}

/// Post-processing the extractor hands to the transcoder after download
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostProcess {
    /// Extract the audio stream and encode it to MP3
    ExtractAudioMp3 { bitrate_kbps: u32 },
}

/// Everything the worker needs to run one job. Immutable once started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRequest {
    /// Link as pasted by the user
    pub url: String,
    /// Video or audio
    pub mode: MediaMode,
    /// Quality label as selected (e.g. "720p")
    pub quality_selector: String,
    /// Parsed form of `quality_selector`
    pub quality: Quality,
    /// Directory the result is written to
    pub output_directory: PathBuf,
    /// yt-dlp format expression
    pub format_selector: String,
    /// yt-dlp filename template, relative to `output_directory`
    pub output_template: String,
    /// Transcoder step to run after download, if any
    pub post_process: Option<PostProcess>,
    /// Transcoder executable, when one was located
    pub transcoder_path: Option<PathBuf>,
    /// Cookie file passed through to the extractor, when present on disk
    pub credential_file: Option<PathBuf>,
}

impl JobRequest {
    /// Full output path template (directory + filename template)
    pub fn output_path_template(&self) -> PathBuf {
        self.output_directory.join(&self.output_template)
    }

    /// Resolution ceiling for video jobs
    pub fn height_bound(&self) -> Option<u32> {
        match self.quality {
            Quality::MaxHeight(h) => Some(h),
            Quality::AudioBitrate(_) => None,
        }
    }

    /// Audio quality as selected; the MP3 encode itself uses a fixed bitrate
    pub fn bitrate_kbps(&self) -> Option<u32> {
        match self.quality {
            Quality::AudioBitrate(b) => Some(b),
            Quality::MaxHeight(_) => None,
        }
    }
}

/// Message sent from the worker to the coordinator
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    /// Fraction of bytes downloaded, in [0, 1]
    Progress(f32),
    /// Free-form status line
    Status(String),
}

impl ProgressEvent {
    /// Status event for a failure, prefixed with `Error: `
    pub fn error(message: impl std::fmt::Display) -> Self {
        ProgressEvent::Status(format!("Error: {message}"))
    }

    /// The state a running job moves to when this event is observed.
    ///
    /// Status lines containing "error" fail the job, ones containing
    /// "completed" finish it (both case-insensitive).
    pub fn terminal_state(&self) -> Option<JobState> {
        let ProgressEvent::Status(message) = self else {
            return None;
        };
        let lower = message.to_lowercase();
        if lower.contains("error") {
            Some(JobState::Failed)
        } else if lower.contains("completed") {
            Some(JobState::Completed)
        } else {
            None
        }
    }
}

/// Lifecycle of the single job slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JobState {
    /// Nothing has run yet
    #[default]
    Idle,
    /// A worker is active; the start action is disabled
    Running,
    /// The last job finished successfully
    Completed,
    /// The last job failed
    Failed,
}

impl JobState {
    /// True unless a job is in flight
    pub fn can_start(self) -> bool {
        self != JobState::Running
    }
}

//! Mapping from the user's selections to a [`JobRequest`].

use crate::error::{Error, Result};
use crate::model::{JobRequest, MediaMode, PostProcess, Quality};
use crate::tools::Toolbox;
use std::path::Path;
use tracing::{debug, warn};

/// Keep the extension the site serves.
pub const VIDEO_TEMPLATE: &str = "%(title)s.%(ext)s";
/// Audio is always written as MP3.
pub const AUDIO_TEMPLATE: &str = "%(title)s.mp3";
/// Format selector for audio jobs.
pub const AUDIO_FORMAT: &str = "bestaudio/best";
/// MP3 encoding bitrate, whatever audio quality was selected.
pub const MP3_BITRATE_KBPS: u32 = 192;

/// Best video no taller than `max_height` plus best audio, else best combined.
pub fn video_format(max_height: u32) -> String {
    format!("bestvideo[height<={max_height}]+bestaudio/best")
}

/// Build the job for the given selections. Pure: no filesystem access.
///
/// Audio jobs need a transcoder; without one this fails with
/// [`Error::TranscoderNotFound`] and no job must be started.
pub fn build_job_request(
    url: &str,
    mode: MediaMode,
    quality_selector: &str,
    output_directory: &Path,
    transcoder_path: Option<&Path>,
    credential_file: Option<&Path>,
) -> Result<JobRequest> {
    let quality = Quality::parse(mode, quality_selector)?;

    let (format_selector, output_template, post_process) = match quality {
        Quality::MaxHeight(height) => (video_format(height), VIDEO_TEMPLATE, None),
        Quality::AudioBitrate(_) => {
            if transcoder_path.is_none() {
                return Err(Error::TranscoderNotFound);
            }
            (
                AUDIO_FORMAT.to_string(),
                AUDIO_TEMPLATE,
                Some(PostProcess::ExtractAudioMp3 {
                    bitrate_kbps: MP3_BITRATE_KBPS,
                }),
            )
        }
    };

    Ok(JobRequest {
        url: url.to_string(),
        mode,
        quality_selector: quality_selector.to_string(),
        quality,
        output_directory: output_directory.to_path_buf(),
        format_selector,
        output_template: output_template.to_string(),
        post_process,
        transcoder_path: transcoder_path.map(Path::to_path_buf),
        credential_file: credential_file.map(Path::to_path_buf),
    })
}

/// Resolve the transcoder and credential file, then build the job.
pub fn prepare_job_request(
    url: &str,
    mode: MediaMode,
    quality_selector: &str,
    output_directory: &Path,
    toolbox: &Toolbox,
) -> Result<JobRequest> {
    let transcoder = toolbox.locate_transcoder();
    if transcoder.is_none() && mode == MediaMode::Audio {
        warn!(tool = toolbox.transcoder.name(), "transcoder missing, audio job refused");
    }
    let credentials = toolbox.credential_file();

    let job = build_job_request(
        url,
        mode,
        quality_selector,
        output_directory,
        transcoder.as_deref(),
        credentials.as_deref(),
    )?;
    debug!(?job, "job prepared");
    Ok(job)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ToolLookup;
    use std::path::PathBuf;

    #[test]
    fn video_job_from_short_link() {
        let job = build_job_request(
            "https://youtu.be/abc123",
            MediaMode::Video,
            "480p",
            Path::new("/tmp/out"),
            None,
            None,
        )
        .unwrap();

        assert_eq!(job.height_bound(), Some(480));
        assert_eq!(job.format_selector, "bestvideo[height<=480]+bestaudio/best");
        assert!(job.output_template.ends_with(".%(ext)s"));
        assert_eq!(
            job.output_path_template(),
            PathBuf::from("/tmp/out").join("%(title)s.%(ext)s")
        );
        assert!(job.post_process.is_none());
    }

    #[test]
    fn audio_job_extracts_mp3_at_fixed_bitrate() {
        let ffmpeg = Path::new("/usr/bin/ffmpeg");
        let job = build_job_request(
            "https://www.youtube.com/watch?v=x",
            MediaMode::Audio,
            "192kbps",
            Path::new("out"),
            Some(ffmpeg),
            None,
        )
        .unwrap();

        assert_eq!(job.bitrate_kbps(), Some(192));
        assert_eq!(job.format_selector, AUDIO_FORMAT);
        assert_eq!(job.output_template, "%(title)s.mp3");
        assert_eq!(
            job.post_process,
            Some(PostProcess::ExtractAudioMp3 { bitrate_kbps: 192 })
        );
        assert_eq!(job.transcoder_path.as_deref(), Some(ffmpeg));
    }

    #[test]
    fn audio_without_transcoder_fails_fast() {
        let err = build_job_request(
            "https://youtu.be/abc",
            MediaMode::Audio,
            "256kbps",
            Path::new("out"),
            None,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, Error::TranscoderNotFound));
    }

    #[test]
    fn build_is_deterministic() {
        let build = || {
            build_job_request(
                "youtube.com/watch?v=1",
                MediaMode::Video,
                "1080p",
                Path::new("d"),
                None,
                Some(Path::new("cookies.txt")),
            )
            .unwrap()
        };
        assert_eq!(build(), build());
    }

    #[test]
    fn prepare_refuses_audio_when_transcoder_absent() {
        let bin = tempfile::tempdir().unwrap();
        let cwd = tempfile::tempdir().unwrap();
        let toolbox = Toolbox {
            transcoder: ToolLookup::new("ffmpeg-test-missing", "ffmpeg-test-missing.exe")
                .in_dir(cwd.path())
                .with_search_path(bin.path()),
            credential_file: cwd.path().join("cookies.txt"),
        };

        let err = prepare_job_request(
            "https://youtu.be/abc",
            MediaMode::Audio,
            "256kbps",
            cwd.path(),
            &toolbox,
        )
        .unwrap_err();
        assert!(matches!(err, Error::TranscoderNotFound));
    }

    #[test]
    fn prepare_picks_up_local_transcoder_and_cookies() {
        let bin = tempfile::tempdir().unwrap();
        let cwd = tempfile::tempdir().unwrap();
        std::fs::write(cwd.path().join("ffmpeg.exe"), b"").unwrap();
        std::fs::write(cwd.path().join("cookies.txt"), b"").unwrap();
        let toolbox = Toolbox {
            transcoder: ToolLookup::new("ffmpeg-test-missing", "ffmpeg.exe")
                .in_dir(cwd.path())
                .with_search_path(bin.path()),
            credential_file: cwd.path().join("cookies.txt"),
        };

        let job = prepare_job_request(
            "https://youtu.be/abc",
            MediaMode::Audio,
            "320kbps",
            cwd.path(),
            &toolbox,
        )
        .unwrap();
        assert_eq!(job.transcoder_path, Some(cwd.path().join("ffmpeg.exe")));
        assert_eq!(job.credential_file, Some(cwd.path().join("cookies.txt")));
        assert_eq!(job.bitrate_kbps(), Some(320));
        assert_eq!(
            job.post_process,
            Some(PostProcess::ExtractAudioMp3 {
                bitrate_kbps: MP3_BITRATE_KBPS
            })
        );
    }
}

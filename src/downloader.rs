use crate::config::AppConfig;
use crate::error::{Error, Result};
use crate::model::{
    JobRequest, PostProcess, ProgressEvent, STATUS_COMPLETED, STATUS_FINALIZING,
};
use crate::progress::{HookStatus, PROGRESS_TEMPLATE, ProgressHook, parse_hook_line};
use crate::tools::ToolLookup;
use async_trait::async_trait;
use std::{path::PathBuf, process::Stdio, sync::Arc};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    process::Command,
    sync::mpsc::UnboundedSender,
};
use tracing::{debug, error, info};

/// Producer half of the progress queue
pub type EventSender = UnboundedSender<ProgressEvent>;

/// Callback invoked once per progress-hook call
pub type HookFn<'a> = dyn FnMut(ProgressHook) + Send + 'a;

/// Something that can resolve a media URL and write the result to disk.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Human-readable name for logs
    fn name(&self) -> &'static str;

    /// Run `job` to completion, calling `on_hook` for every progress report.
    async fn download(&self, job: &JobRequest, on_hook: &mut HookFn<'_>) -> Result<()>;
}

/// Request headers sent with every extractor request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpHeaders {
    pub user_agent: String,
    pub accept_language: String,
}

/// [`Extractor`] backed by the `yt-dlp` executable
pub struct YtDlp {
    lookup: ToolLookup,
    headers: HttpHeaders,
}

impl YtDlp {
    pub fn new(lookup: ToolLookup, headers: HttpHeaders) -> Self {
        Self { lookup, headers }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        let local = if cfg!(target_os = "windows") {
            format!("{}.exe", config.yt_dlp_binary)
        } else {
            config.yt_dlp_binary.clone()
        };
        Self::new(
            ToolLookup::new(&config.yt_dlp_binary, local),
            HttpHeaders {
                user_agent: config.user_agent.clone(),
                accept_language: config.accept_language.clone(),
            },
        )
    }

    fn binary(&self) -> Result<PathBuf> {
        self.lookup
            .locate()
            .ok_or_else(|| Error::ExtractorNotFound(self.lookup.name().to_string()))
    }
}

/// Command-line arguments for one job.
pub fn build_args(job: &JobRequest, headers: &HttpHeaders) -> Vec<String> {
    let mut args = vec![
        "--newline".to_owned(),
        "--no-playlist".to_owned(),
        "--progress-template".to_owned(),
        PROGRESS_TEMPLATE.to_owned(),
        "-f".to_owned(),
        job.format_selector.clone(),
        "-o".to_owned(),
        job.output_path_template().to_string_lossy().into_owned(),
        "--add-header".to_owned(),
        format!("User-Agent:{}", headers.user_agent),
        "--add-header".to_owned(),
        format!("Accept-Language:{}", headers.accept_language),
    ];

    if let Some(ffmpeg) = &job.transcoder_path {
        args.push("--ffmpeg-location".to_owned());
        args.push(ffmpeg.to_string_lossy().into_owned());
    }

    // Only pass the cookie file if it is still there when the job starts.
    if let Some(cookies) = job.credential_file.as_ref().filter(|p| p.is_file()) {
        args.push("--cookies".to_owned());
        args.push(cookies.to_string_lossy().into_owned());
    }

    match &job.post_process {
        Some(PostProcess::ExtractAudioMp3 { bitrate_kbps }) => {
            args.push("-x".to_owned());
            args.push("--audio-format".to_owned());
            args.push("mp3".to_owned());
            args.push("--audio-quality".to_owned());
            args.push(format!("{bitrate_kbps}K"));
        }
        None => {}
    }

    args.push("--".to_owned());
    args.push(job.url.clone());
    args
}

/// Turn the tool's last stderr line into a user-facing message.
fn failure_message(last_stderr: Option<String>, code: Option<i32>) -> String {
    match last_stderr {
        Some(line) => line
            .trim()
            .strip_prefix("ERROR: ")
            .unwrap_or(line.trim())
            .to_owned(),
        None => match code {
            Some(code) => format!("yt-dlp exited with status {code}"),
            None => "yt-dlp was terminated".to_owned(),
        },
    }
}

#[async_trait]
impl Extractor for YtDlp {
    fn name(&self) -> &'static str {
        "yt-dlp"
    }

    async fn download(&self, job: &JobRequest, on_hook: &mut HookFn<'_>) -> Result<()> {
        let bin = self.binary()?;
        let args = build_args(job, &self.headers);
        debug!(bin = %bin.display(), ?args, "spawning extractor");

        let mut child = Command::new(&bin)
            .args(&args)
            .env("PYTHONIOENCODING", "utf-8")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let out = child
            .stdout
            .take()
            .ok_or_else(|| Error::Io(std::io::Error::other("extractor stdout not captured")))?;
        let err = child
            .stderr
            .take()
            .ok_or_else(|| Error::Io(std::io::Error::other("extractor stderr not captured")))?;

        // Drain stderr concurrently so a chatty tool never blocks on a full pipe.
        let stderr_tail = tokio::spawn(async move {
            let mut lines = BufReader::new(err).lines();
            let mut last = None;
            while let Ok(Some(line)) = lines.next_line().await {
                debug!(target: "tube_converter::yt_dlp", "{}", line);
                if !line.trim().is_empty() {
                    last = Some(line);
                }
            }
            last
        });

        let mut lines = BufReader::new(out).lines();
        while let Some(line) = lines.next_line().await? {
            match parse_hook_line(&line) {
                Some(hook) => on_hook(hook),
                None => debug!(target: "tube_converter::yt_dlp", "{}", line),
            }
        }

        let status = child.wait().await?;
        let last_stderr = stderr_tail.await.ok().flatten();
        if status.success() {
            Ok(())
        } else {
            Err(Error::Extraction {
                code: status.code(),
                message: failure_message(last_stderr, status.code()),
            })
        }
    }
}

/// Event to enqueue for one hook call, if any.
pub fn hook_event(hook: &ProgressHook) -> Option<ProgressEvent> {
    match hook.status {
        HookStatus::Downloading => hook.fraction().map(ProgressEvent::Progress),
        HookStatus::Finished => Some(ProgressEvent::Status(STATUS_FINALIZING.to_owned())),
        HookStatus::Other => None,
    }
}

/// Run one job and report through `events`.
///
/// Always ends with exactly one terminal status: success or `Error: ...`.
/// Errors never escape this function.
pub async fn run_job(job: JobRequest, extractor: Arc<dyn Extractor>, events: EventSender) {
    info!(url = %job.url, mode = ?job.mode, quality = %job.quality_selector, "job started");

    let progress_tx = events.clone();
    let mut forward = move |hook: ProgressHook| {
        if let Some(event) = hook_event(&hook) {
            // Receiver only goes away at app exit.
            let _ = progress_tx.send(event);
        }
    };

    let terminal = match extractor.download(&job, &mut forward).await {
        Ok(()) => {
            info!(url = %job.url, "job completed");
            ProgressEvent::Status(STATUS_COMPLETED.to_owned())
        }
        Err(e) => {
            error!(url = %job.url, extractor = extractor.name(), "job failed: {e}");
            ProgressEvent::error(&e)
        }
    };
    let _ = events.send(terminal);
}

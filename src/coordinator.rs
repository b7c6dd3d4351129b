//! Single-consumer side of the progress queue and the one-job-at-a-time gate.
//!
//! The UI owns a [`Coordinator`] and calls [`Coordinator::drain`] every poll
//! interval. Workers only ever talk to it through the queue.

use crate::downloader::{EventSender, Extractor, run_job};
use crate::error::{Error, Result};
use crate::job::prepare_job_request;
use crate::model::{JobState, MediaMode, ProgressEvent, STATUS_IDLE, STATUS_STARTING};
use crate::tools::Toolbox;
use crate::url::is_valid_media_url;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{UnboundedReceiver, unbounded_channel};
use tracing::{error, info, warn};

/// Owns the queue and the observable job status.
pub struct Coordinator {
    tx: EventSender,
    rx: UnboundedReceiver<ProgressEvent>,
    runtime: Handle,
    extractor: Arc<dyn Extractor>,
    toolbox: Toolbox,
    poll_interval: Duration,
    progress: f32,
    status: String,
    job_state: JobState,
    alert: Option<String>,
}

impl Coordinator {
    pub fn new(
        runtime: Handle,
        extractor: Arc<dyn Extractor>,
        toolbox: Toolbox,
        poll_interval: Duration,
    ) -> Self {
        let (tx, rx) = unbounded_channel();
        Self {
            tx,
            rx,
            runtime,
            extractor,
            toolbox,
            poll_interval,
            progress: 0.0,
            status: STATUS_IDLE.to_owned(),
            job_state: JobState::Idle,
            alert: None,
        }
    }

    /// Progress ratio in [0, 1]
    pub fn progress(&self) -> f32 {
        self.progress
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn job_state(&self) -> JobState {
        self.job_state
    }

    /// Delay until the next [`drain`](Self::drain).
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Another producer handle on the queue
    pub fn sender(&self) -> EventSender {
        self.tx.clone()
    }

    /// Blocking alert raised by the last start attempt; cleared once taken.
    pub fn take_alert(&mut self) -> Option<String> {
        self.alert.take()
    }

    pub fn alert(&self) -> Option<&str> {
        self.alert.as_deref()
    }

    /// Whether the start action should be enabled for `url`.
    pub fn can_start(&self, url: &str) -> bool {
        self.job_state.can_start() && is_valid_media_url(url)
    }

    /// Apply every queued event in FIFO order without blocking.
    ///
    /// Returns how many events were applied; an empty queue changes nothing.
    pub fn drain(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(event) = self.rx.try_recv() {
            self.apply(event);
            applied += 1;
        }
        applied
    }

    fn apply(&mut self, event: ProgressEvent) {
        if self.job_state == JobState::Running {
            if let Some(next) = event.terminal_state() {
                info!(?next, "job finished");
                self.job_state = next;
            }
        }

        match event {
            ProgressEvent::Progress(fraction) => {
                self.progress = fraction.clamp(0.0, 1.0);
                self.status = format!("Downloading: {:.1}%", self.progress * 100.0);
            }
            ProgressEvent::Status(message) => {
                self.status = message;
            }
        }
    }

    /// Start action: validate, build the job, and hand it to a background worker.
    ///
    /// Rejected with [`Error::JobInFlight`] while a job is running. Errors found
    /// before the worker starts are also reported as an `Error: ...` status.
    pub fn start(
        &mut self,
        url: &str,
        mode: MediaMode,
        quality_selector: &str,
        output_directory: &Path,
    ) -> Result<()> {
        if !self.job_state.can_start() {
            warn!("start requested while a job is running");
            return Err(Error::JobInFlight);
        }
        if !is_valid_media_url(url) {
            return Err(Error::InvalidUrl(url.to_owned()));
        }

        let job = match prepare_job_request(
            url,
            mode,
            quality_selector,
            output_directory,
            &self.toolbox,
        ) {
            Ok(job) => job,
            Err(e) => return Err(self.refuse(e)),
        };

        self.job_state = JobState::Running;
        self.progress = 0.0;
        self.status = STATUS_STARTING.to_owned();

        if let Err(e) = std::fs::create_dir_all(&job.output_directory) {
            error!(dir = %job.output_directory.display(), "cannot create output directory: {e}");
            let e = Error::Io(e);
            let _ = self.tx.send(ProgressEvent::error(&e));
            return Err(e);
        }

        info!(url = %job.url, dir = %job.output_directory.display(), "spawning worker");
        let worker = self
            .runtime
            .spawn(run_job(job, Arc::clone(&self.extractor), self.tx.clone()));

        // A panicking worker would otherwise leave the job Running forever.
        let tx = self.tx.clone();
        self.runtime.spawn(async move {
            if let Err(join_err) = worker.await {
                error!("worker stopped unexpectedly: {join_err}");
                let _ = tx.send(ProgressEvent::error(format!(
                    "worker stopped unexpectedly: {join_err}"
                )));
            }
        });
        Ok(())
    }

    fn refuse(&mut self, e: Error) -> Error {
        warn!("job refused: {e}");
        if let Some(text) = e.alert_text() {
            self.alert = Some(text.to_owned());
        }
        let _ = self.tx.send(ProgressEvent::error(&e));
        e
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::downloader::HookFn;
    use crate::model::{JobRequest, STATUS_COMPLETED, STATUS_FINALIZING};
    use crate::progress::ProgressHook;
    use crate::tools::ToolLookup;
    use async_trait::async_trait;
    use tokio::sync::Notify;

    /// Extractor that waits for a signal before finishing
    struct Gated {
        release: Arc<Notify>,
    }

    #[async_trait]
    impl Extractor for Gated {
        fn name(&self) -> &'static str {
            "gated"
        }

        async fn download(&self, _job: &JobRequest, on_hook: &mut HookFn<'_>) -> Result<()> {
            on_hook(ProgressHook::downloading(10, Some(100), None));
            self.release.notified().await;
            on_hook(ProgressHook::finished());
            Ok(())
        }
    }

    struct Panicking;

    #[async_trait]
    impl Extractor for Panicking {
        fn name(&self) -> &'static str {
            "panicking"
        }

        async fn download(&self, _job: &JobRequest, _on_hook: &mut HookFn<'_>) -> Result<()> {
            panic!("boom");
        }
    }

    fn toolbox_without_transcoder(dir: &Path) -> Toolbox {
        Toolbox {
            transcoder: ToolLookup::new("ffmpeg-test-missing", "ffmpeg-test-missing.exe")
                .in_dir(dir)
                .with_search_path(dir.join("empty-bin")),
            credential_file: dir.join("cookies.txt"),
        }
    }

    fn coordinator(extractor: Arc<dyn Extractor>, dir: &Path) -> Coordinator {
        Coordinator::new(
            Handle::current(),
            extractor,
            toolbox_without_transcoder(dir),
            Duration::from_millis(100),
        )
    }

    async fn drain_until_settled(c: &mut Coordinator) {
        for _ in 0..200 {
            c.drain();
            if c.job_state() != JobState::Running {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("job never settled; status = {}", c.status());
    }

    #[tokio::test]
    async fn fresh_coordinator_is_idle() {
        let dir = tempfile::tempdir().unwrap();
        let release = Arc::new(Notify::new());
        let c = coordinator(Arc::new(Gated { release }), dir.path());
        assert_eq!(c.job_state(), JobState::Idle);
        assert_eq!(c.status(), STATUS_IDLE);
        assert_eq!(c.progress(), 0.0);
        assert!(c.can_start("https://youtu.be/abc"));
        assert!(!c.can_start("https://example.com/abc"));
    }

    #[tokio::test]
    async fn draining_empty_queue_changes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let release = Arc::new(Notify::new());
        let mut c = coordinator(Arc::new(Gated { release }), dir.path());
        assert_eq!(c.drain(), 0);
        assert_eq!(c.drain(), 0);
        assert_eq!(c.status(), STATUS_IDLE);
        assert_eq!(c.job_state(), JobState::Idle);
        assert_eq!(c.poll_interval(), Duration::from_millis(100));
    }

    #[tokio::test]
    async fn progress_updates_ratio_and_percentage_text() {
        let dir = tempfile::tempdir().unwrap();
        let release = Arc::new(Notify::new());
        let mut c = coordinator(Arc::new(Gated { release }), dir.path());
        c.sender().send(ProgressEvent::Progress(0.256)).unwrap();
        assert_eq!(c.drain(), 1);
        assert!((c.progress() - 0.256).abs() < 1e-6);
        assert_eq!(c.status(), "Downloading: 25.6%");
    }

    #[tokio::test]
    async fn second_start_is_rejected_until_terminal_status() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let release = Arc::new(Notify::new());
        let mut c = coordinator(
            Arc::new(Gated {
                release: Arc::clone(&release),
            }),
            dir.path(),
        );

        c.start("https://youtu.be/abc123", MediaMode::Video, "480p", &out)
            .unwrap();
        assert_eq!(c.job_state(), JobState::Running);
        assert_eq!(c.status(), STATUS_STARTING);
        assert!(out.is_dir());
        assert!(!c.can_start("https://youtu.be/abc123"));

        let again = c.start("https://youtu.be/abc123", MediaMode::Video, "480p", &out);
        assert!(matches!(again, Err(Error::JobInFlight)));

        // Non-terminal traffic keeps the gate closed.
        tokio::time::sleep(Duration::from_millis(20)).await;
        c.drain();
        assert_eq!(c.job_state(), JobState::Running);
        assert_eq!(c.status(), "Downloading: 10.0%");

        release.notify_one();
        drain_until_settled(&mut c).await;
        assert_eq!(c.job_state(), JobState::Completed);
        assert_eq!(c.status(), STATUS_COMPLETED);
        assert!(c.can_start("https://youtu.be/abc123"));
    }

    #[tokio::test]
    async fn audio_without_transcoder_never_starts() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let release = Arc::new(Notify::new());
        let mut c = coordinator(Arc::new(Gated { release }), dir.path());

        let err = c
            .start("https://youtu.be/abc123", MediaMode::Audio, "256kbps", &out)
            .unwrap_err();
        assert!(matches!(err, Error::TranscoderNotFound));
        assert_ne!(c.job_state(), JobState::Running);
        assert!(!out.exists());
        assert!(c.alert().is_some());

        c.drain();
        assert_eq!(c.status(), "Error: FFmpeg not found.");
        assert!(c.take_alert().unwrap().starts_with("FFmpeg not found."));
        assert!(c.take_alert().is_none());
    }

    #[tokio::test]
    async fn invalid_url_is_rejected_locally() {
        let dir = tempfile::tempdir().unwrap();
        let release = Arc::new(Notify::new());
        let mut c = coordinator(Arc::new(Gated { release }), dir.path());
        let err = c
            .start("https://vimeo.com/1", MediaMode::Video, "720p", dir.path())
            .unwrap_err();
        assert!(matches!(err, Error::InvalidUrl(_)));
        assert_eq!(c.job_state(), JobState::Idle);
        assert_eq!(c.drain(), 0);
    }

    #[tokio::test]
    async fn url_is_validated_as_entered() {
        let dir = tempfile::tempdir().unwrap();
        let release = Arc::new(Notify::new());
        let mut c = coordinator(Arc::new(Gated { release }), dir.path());
        let padded = " https://youtu.be/abc";
        assert!(!c.can_start(padded));
        let err = c
            .start(padded, MediaMode::Video, "720p", dir.path())
            .unwrap_err();
        assert!(matches!(err, Error::InvalidUrl(_)));
        assert_eq!(c.job_state(), JobState::Idle);
    }

    #[tokio::test]
    async fn panicking_worker_still_fails_the_job() {
        let dir = tempfile::tempdir().unwrap();
        let mut c = coordinator(Arc::new(Panicking), dir.path());
        c.start("youtu.be/abc", MediaMode::Video, "360p", dir.path())
            .unwrap();
        drain_until_settled(&mut c).await;
        assert_eq!(c.job_state(), JobState::Failed);
        assert!(c.status().starts_with("Error: worker stopped unexpectedly"));
    }

    #[tokio::test]
    async fn terminal_status_only_moves_a_running_job() {
        let dir = tempfile::tempdir().unwrap();
        let release = Arc::new(Notify::new());
        let mut c = coordinator(Arc::new(Gated { release }), dir.path());
        c.sender()
            .send(ProgressEvent::Status(STATUS_FINALIZING.to_owned()))
            .unwrap();
        c.sender()
            .send(ProgressEvent::Status(STATUS_COMPLETED.to_owned()))
            .unwrap();
        assert_eq!(c.drain(), 2);
        assert_eq!(c.job_state(), JobState::Idle);
        assert_eq!(c.status(), STATUS_COMPLETED);
    }
}

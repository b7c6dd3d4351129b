//! Desktop front end for the YouTube MP3/MP4 converter

use std::{path::PathBuf, sync::Arc};

// eframe/egui for GUI application framework
use eframe::{App, Frame, egui};
use egui::Visuals;
// OnceCell for single-time runtime initialization
use once_cell::sync::OnceCell;
// FileDialog for folder selection dialogs
use rfd::FileDialog;
use tokio::runtime::Runtime;
use tracing::{info, warn};

use tube_converter::{
    Coordinator, MediaMode,
    config::{self, AppConfig},
    downloader::YtDlp,
    logging,
    tools::Toolbox,
};

// Global Tokio runtime; lives from startup until the process exits
static RUNTIME: OnceCell<Runtime> = OnceCell::new();

/// Program entry point: logging, config, runtime, then the GUI
fn main() -> Result<(), eframe::Error> {
    if let Err(e) = logging::init_logging() {
        logging::init_logging_stderr();
        warn!("file logging unavailable, using stderr: {e}");
    }

    let config = config::load_or_init().unwrap_or_else(|e| {
        warn!("config unusable, falling back to defaults: {e}");
        AppConfig::default()
    });

    let rt = RUNTIME.get_or_init(|| Runtime::new().expect("failed to start tokio runtime"));
    let coordinator = Coordinator::new(
        rt.handle().clone(),
        Arc::new(YtDlp::from_config(&config)),
        Toolbox::from_config(&config),
        config.poll_interval(),
    );
    let app = ConverterApp::new(coordinator, &config);
    info!("starting UI");

    eframe::run_native(
        "YouTube MP3/MP4 Converter",
        eframe::NativeOptions::default(),
        Box::new(|cc| {
            cc.egui_ctx.set_visuals(Visuals::dark());
            Box::new(app)
        }),
    )
}

/// Widget state; everything job-related lives in the coordinator
struct ConverterApp {
    coordinator: Coordinator,
    /// Input field for the video link
    url_input: String,
    /// Video or audio
    mode: MediaMode,
    /// Selected quality label for the current mode
    selected_quality: String,
    /// Destination folder for downloads
    download_folder: String,
}

impl ConverterApp {
    fn new(coordinator: Coordinator, config: &AppConfig) -> Self {
        Self {
            coordinator,
            url_input: String::new(),
            mode: config.default_mode,
            selected_quality: config.default_mode.default_quality().to_string(),
            download_folder: config.download_dir.display().to_string(),
        }
    }

    fn show_alert(&mut self, ctx: &egui::Context) {
        let Some(text) = self.coordinator.alert().map(str::to_owned) else {
            return;
        };
        egui::Window::new("Error")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.label(text);
                if ui.button("OK").clicked() {
                    self.coordinator.take_alert();
                }
            });
    }
}

/// GUI update loop: drain the queue, then redraw
impl App for ConverterApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut Frame) {
        self.coordinator.drain();
        self.show_alert(ctx);

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading("YouTube MP3/MP4 Converter");

            ui.label("YouTube URL:");
            ui.text_edit_singleline(&mut self.url_input);

            ui.horizontal(|ui| {
                for mode in [MediaMode::Video, MediaMode::Audio] {
                    if ui.radio_value(&mut self.mode, mode, mode.label()).changed() {
                        self.selected_quality = mode.default_quality().to_string();
                    }
                }
            });

            egui::ComboBox::from_label("Quality")
                .selected_text(&self.selected_quality)
                .show_ui(ui, |ui| {
                    for q in self.mode.quality_options() {
                        ui.selectable_value(&mut self.selected_quality, q.to_string(), *q);
                    }
                });

            ui.horizontal(|ui| {
                ui.label("Download folder:");
                ui.text_edit_singleline(&mut self.download_folder);
                if ui.button("Browse…").clicked() {
                    if let Some(folder) = FileDialog::new()
                        .set_directory(&self.download_folder)
                        .pick_folder()
                    {
                        self.download_folder = folder.display().to_string();
                    }
                }
            });

            ui.add(egui::ProgressBar::new(self.coordinator.progress()));
            ui.label(self.coordinator.status());

            let enabled = self.coordinator.can_start(&self.url_input);
            if ui
                .add_enabled(enabled, egui::Button::new("Download"))
                .clicked()
            {
                let folder = PathBuf::from(self.download_folder.trim());
                if let Err(e) = self.coordinator.start(
                    &self.url_input,
                    self.mode,
                    &self.selected_quality,
                    &folder,
                ) {
                    warn!("download not started: {e}");
                }
            }
        });

        // Reschedule the next poll of the progress queue
        ctx.request_repaint_after(self.coordinator.poll_interval());
    }
}

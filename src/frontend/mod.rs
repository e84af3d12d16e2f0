//! Frontend module for egui UI
//!
//! Receives [`MonitorMessage`]s from the backend worker through crossbeam
//! channels and renders them in real time. The UI never mutates session
//! state directly; every button sends a [`MonitorCommand`] and the mirror
//! state here is updated only from backend messages, so the worker stays
//! the single source of truth.
//!
//! # Main Types
//!
//! - [`PostureApp`] - Main application state implementing [`eframe::App`]
//! - [`TiltChart`] - Live two-axis chart
//!
//! # Submodules
//!
//! - `chart` - Plot rendering with egui_plot
//! - `status_bar` - Bottom status bar

pub mod chart;
pub mod status_bar;

pub use chart::TiltChart;
pub use status_bar::{render_status_bar, StatusBarContext};

use std::time::Duration;

use egui::{Color32, RichText};

use crate::backend::{FrontendHandle, MonitorMessage};
use crate::classifier::{Feedback, FeedbackClass};
use crate::config::AppConfig;
use crate::session::SampleWindow;
use crate::transport::TransportChoice;
use crate::types::{Baseline, ConnectionStatus, Reading};

/// Repaint interval while idle; message arrival drives faster updates
const REPAINT_INTERVAL: Duration = Duration::from_millis(100);

/// Main application state for the posture monitor
pub struct PostureApp {
    // === Communication ===
    backend: FrontendHandle,

    // === Mirror of backend state, updated only from messages ===
    status: ConnectionStatus,
    sensor_id: Option<String>,
    current: Option<Reading>,
    baseline: Option<Baseline>,
    measuring: bool,
    feedback_on: bool,
    window: SampleWindow,
    feedback: Option<Feedback>,
    frames_decoded: u64,
    frames_malformed: u64,
    last_error: Option<String>,
    last_export: Option<ExportNotice>,

    // === UI-only state ===
    transport_choice: TransportChoice,
    chart: TiltChart,
}

/// Outcome of the most recent measurement export, for display
struct ExportNotice {
    csv: String,
    samples: usize,
}

impl PostureApp {
    /// Create the app from its backend handle and loaded config
    pub fn new(backend: FrontendHandle, config: &AppConfig) -> Self {
        Self {
            backend,
            status: ConnectionStatus::Disconnected,
            sensor_id: None,
            current: None,
            baseline: None,
            measuring: false,
            feedback_on: false,
            window: SampleWindow::new(config.window.capacity),
            feedback: None,
            frames_decoded: 0,
            frames_malformed: 0,
            last_error: None,
            last_export: None,
            transport_choice: TransportChoice::default(),
            chart: TiltChart::default(),
        }
    }

    fn apply_message(&mut self, msg: MonitorMessage) {
        match msg {
            MonitorMessage::ConnectionStatus(status) => {
                self.status = status;
                if status == ConnectionStatus::Disconnected {
                    self.reset_session_mirror();
                }
            }
            MonitorMessage::ConnectionError(error) => {
                self.last_error = Some(error);
            }
            MonitorMessage::ConnectionLost(cause) => {
                self.last_error = Some(format!("Connection lost: {}", cause));
            }
            MonitorMessage::SensorId(id) => self.sensor_id = id,
            MonitorMessage::Reading(reading) => self.current = Some(reading),
            MonitorMessage::Calibrated(baseline) => {
                self.baseline = Some(baseline);
                self.last_error = None;
            }
            MonitorMessage::MeasurementStarted => {
                self.measuring = true;
                self.feedback_on = false;
                self.feedback = None;
                self.window.clear();
                self.last_export = None;
            }
            MonitorMessage::Sample(sample) => self.window.append_sample(sample),
            MonitorMessage::MeasurementEnded { csv, samples } => {
                self.measuring = false;
                self.feedback_on = false;
                self.feedback = None;
                self.last_export = Some(ExportNotice { csv, samples });
            }
            MonitorMessage::FeedbackActive(on) => {
                self.feedback_on = on;
                if !on {
                    self.feedback = None;
                }
            }
            MonitorMessage::Feedback(feedback) => self.feedback = Some(feedback),
            MonitorMessage::FrameStats { decoded, malformed } => {
                self.frames_decoded = decoded;
                self.frames_malformed = malformed;
            }
            MonitorMessage::Shutdown => {}
        }
    }

    fn reset_session_mirror(&mut self) {
        self.sensor_id = None;
        self.current = None;
        self.baseline = None;
        self.measuring = false;
        self.feedback_on = false;
        self.window.clear();
        self.feedback = None;
        self.frames_decoded = 0;
        self.frames_malformed = 0;
    }

    fn render_toolbar(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            let connected = self.status == ConnectionStatus::Connected;
            let busy = self.status == ConnectionStatus::Connecting;

            egui::ComboBox::from_id_salt("transport_choice")
                .selected_text(self.transport_choice.to_string())
                .show_ui(ui, |ui| {
                    for choice in [TransportChoice::Direct, TransportChoice::Relay] {
                        ui.selectable_value(
                            &mut self.transport_choice,
                            choice,
                            choice.to_string(),
                        );
                    }
                });

            if connected || busy {
                if ui.button("Disconnect").clicked() {
                    self.backend.disconnect();
                }
            } else if ui.button("Connect").clicked() {
                self.last_error = None;
                self.backend.connect(self.transport_choice);
            }

            ui.separator();

            // Gating mirrors the session guards so a click can never be
            // rejected by the worker.
            let can_calibrate = connected && self.current.is_some() && !self.measuring;
            if ui
                .add_enabled(can_calibrate, egui::Button::new("Calibrate"))
                .on_hover_text("Capture the current posture as the reference")
                .clicked()
            {
                self.backend.calibrate();
            }

            let can_start = connected && self.baseline.is_some() && !self.measuring;
            if ui
                .add_enabled(can_start, egui::Button::new("Start"))
                .clicked()
            {
                self.backend.start_measurement();
            }

            if ui
                .add_enabled(self.measuring, egui::Button::new("End"))
                .clicked()
            {
                self.backend.end_measurement();
            }

            ui.separator();

            // The checkbox state follows the worker's FeedbackActive
            // confirmation, not the click, so a rejected toggle cannot
            // desync the mirror.
            let mut feedback_on = self.feedback_on;
            if ui
                .add_enabled(self.measuring, egui::Checkbox::new(&mut feedback_on, "Feedback"))
                .changed()
            {
                self.backend.set_feedback(feedback_on);
            }
        });
    }

    fn render_readout(&self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            match self.current {
                Some(reading) => ui.label(RichText::new(reading.to_string()).strong()),
                None => ui.label(RichText::new("No data yet").weak()),
            };
            if let Some(baseline) = self.baseline {
                ui.separator();
                ui.label(
                    RichText::new(format!(
                        "Baseline Y: {:.2}°, X: {:.2}°",
                        baseline.ref_y, baseline.ref_x
                    ))
                    .weak(),
                );
            }
        });
    }

    fn render_feedback_banner(&self, ui: &mut egui::Ui) {
        let Some(feedback) = &self.feedback else {
            return;
        };
        let (fill, text_color) = match feedback.class {
            FeedbackClass::Success => (Color32::from_rgb(30, 70, 30), Color32::LIGHT_GREEN),
            FeedbackClass::Warning => (Color32::from_rgb(80, 65, 20), Color32::YELLOW),
            FeedbackClass::Error => (Color32::from_rgb(80, 30, 30), Color32::LIGHT_RED),
        };
        egui::Frame::new()
            .fill(fill)
            .corner_radius(4)
            .inner_margin(8)
            .show(ui, |ui| {
                ui.set_width(ui.available_width());
                ui.label(RichText::new(&feedback.message).color(text_color).strong());
            });
    }

    fn render_export_notice(&mut self, ui: &mut egui::Ui) {
        let Some(notice) = &self.last_export else {
            return;
        };
        ui.horizontal(|ui| {
            ui.label(format!("Exported {} samples", notice.samples));
            if ui.button("Copy CSV").clicked() {
                ui.ctx().copy_text(notice.csv.clone());
            }
        });
    }
}

impl eframe::App for PostureApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        for msg in self.backend.drain() {
            self.apply_message(msg);
        }

        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            self.render_toolbar(ui);
        });

        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            render_status_bar(
                ui,
                &StatusBarContext {
                    status: self.status,
                    sensor_id: self.sensor_id.as_deref(),
                    sample_count: self.window.len(),
                    window_capacity: self.window.capacity(),
                    frames_decoded: self.frames_decoded,
                    frames_malformed: self.frames_malformed,
                    last_error: self.last_error.as_deref(),
                },
            );
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            self.render_readout(ui);
            self.render_feedback_banner(ui);
            self.render_export_notice(ui);
            ui.separator();
            self.chart.render(ui, &self.window, self.baseline);
        });

        ctx.request_repaint_after(REPAINT_INTERVAL);
    }
}

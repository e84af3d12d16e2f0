//! Status bar panel — bottom bar showing connection, stream, and error info.

use egui::{Color32, RichText, Ui};

use crate::types::ConnectionStatus;

/// Context needed to render the status bar.
pub struct StatusBarContext<'a> {
    pub status: ConnectionStatus,
    pub sensor_id: Option<&'a str>,
    pub sample_count: usize,
    pub window_capacity: usize,
    pub frames_decoded: u64,
    pub frames_malformed: u64,
    pub last_error: Option<&'a str>,
}

/// Render the status bar.
pub fn render_status_bar(ui: &mut Ui, ctx: &StatusBarContext<'_>) {
    ui.horizontal(|ui| {
        ui.spacing_mut().item_spacing.x = 8.0;

        // === Connection status dot + sensor id ===
        let (status_color, status_text) = match ctx.status {
            ConnectionStatus::Connected => (Color32::GREEN, "Connected"),
            ConnectionStatus::Connecting => (Color32::YELLOW, "Connecting"),
            ConnectionStatus::Disconnected => (Color32::GRAY, "Disconnected"),
            ConnectionStatus::Error => (Color32::RED, "Error"),
        };
        ui.colored_label(status_color, "●");
        let id_display = match ctx.sensor_id {
            Some(id) => format!("{}: {}", status_text, id),
            None => status_text.to_string(),
        };
        ui.label(RichText::new(id_display).small());

        ui.separator();

        // === Window fill ===
        ui.label(
            RichText::new(format!(
                "Window: {}/{}",
                ctx.sample_count, ctx.window_capacity
            ))
            .small(),
        );

        ui.separator();

        // === Decoder counters ===
        ui.label(RichText::new(format!("Frames: {}", ctx.frames_decoded)).small());
        let malformed_color = if ctx.frames_malformed > 0 {
            Color32::LIGHT_RED
        } else {
            Color32::GRAY
        };
        ui.colored_label(
            malformed_color,
            RichText::new(format!("Malformed: {}", ctx.frames_malformed)).small(),
        );

        // === Error message (right-aligned) ===
        if let Some(error) = ctx.last_error {
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                ui.colored_label(Color32::RED, RichText::new(error).small());
            });
        }
    });
}

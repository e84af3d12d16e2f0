//! PostureVis-RS - Main Entry Point
//!
//! Desktop client for a wearable posture sensor: live tilt charting,
//! posture deviation feedback, and CSV export of measurement windows.

use posturevis_rs::{backend::MonitorBackend, config::AppConfig, frontend::PostureApp};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() -> eframe::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,posturevis_rs=debug")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting PostureVis-RS");

    let config = AppConfig::load_or_default();

    // Spawn the monitor worker thread
    let (backend, frontend) = MonitorBackend::new(config.clone());
    let backend_handle = std::thread::spawn(move || backend.run());

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([960.0, 600.0])
            .with_min_inner_size([640.0, 420.0])
            .with_title("PostureVis-RS"),
        ..Default::default()
    };

    let handle_for_shutdown = frontend.command_sender.clone();
    let result = eframe::run_native(
        "PostureVis-RS",
        native_options,
        Box::new(move |cc| {
            cc.egui_ctx.set_visuals(egui::Visuals::dark());
            Ok(Box::new(PostureApp::new(frontend, &config)))
        }),
    );

    // Stop the worker and wait for transport teardown
    tracing::info!("Shutting down...");
    let _ = handle_for_shutdown.send(posturevis_rs::backend::MonitorCommand::Shutdown);
    let _ = backend_handle.join();

    result
}

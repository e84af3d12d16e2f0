//! # PostureVis-RS: Wearable Posture Monitor
//!
//! A desktop client for a BLE tilt sensor worn on the upper back. Streams
//! two-axis tilt angles, lets the user calibrate a reference posture,
//! charts deviations live, classifies them into spoken-style feedback
//! messages, and exports measurement windows to CSV.
//!
//! ## Architecture
//!
//! - **Backend**: Owns the transport, frame decoder, and session state
//!   machine on a worker thread with a private tokio runtime
//! - **Transports**: A direct Bluetooth LE link (btleplug) and a
//!   WebSocket relay link (tokio-tungstenite), interchangeable behind the
//!   [`transport::SensorTransport`] trait
//! - **Frontend**: Renders the UI using eframe/egui with egui_plot for
//!   the live chart
//! - **Communication**: Crossbeam channels for thread-safe data transfer
//!
//! ## Configuration
//!
//! Settings are stored as TOML in the platform config directory under
//! `posturevis-rs/config.toml`; see [`config`] for the schema and
//! defaults.
//!
//! ## Example
//!
//! ```ignore
//! use posturevis_rs::{
//!     backend::MonitorBackend,
//!     config::AppConfig,
//!     frontend::PostureApp,
//! };
//!
//! fn main() -> eframe::Result<()> {
//!     let config = AppConfig::load_or_default();
//!     let (backend, frontend) = MonitorBackend::new(config.clone());
//!
//!     std::thread::spawn(move || backend.run());
//!
//!     let native_options = eframe::NativeOptions::default();
//!     eframe::run_native(
//!         "PostureVis-RS",
//!         native_options,
//!         Box::new(move |_cc| Ok(Box::new(PostureApp::new(frontend, &config)))),
//!     )
//! }
//! ```

pub mod backend;
pub mod classifier;
pub mod config;
pub mod error;
pub mod frontend;
pub mod protocol;
pub mod session;
pub mod transport;
pub mod types;

// Re-export commonly used types
pub use backend::{FrontendHandle, MonitorBackend, MonitorCommand, MonitorMessage};
pub use classifier::{classify, Feedback, FeedbackClass};
pub use config::AppConfig;
pub use error::{MonitorError, Result};
pub use session::{Session, SampleWindow};
pub use transport::{SensorTransport, TransportChoice};
pub use types::{Baseline, ConnectionStatus, Reading, Sample};

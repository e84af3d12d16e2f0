//! Backend module for sensor monitoring
//!
//! All session state and transport I/O live on a worker thread so the UI
//! stays responsive. The worker serializes user commands and transport
//! events onto one loop, which is what makes the session state machine
//! safe without locks. Communication with the frontend goes through
//! bounded crossbeam channels:
//!
//! - [`MonitorCommand`] - messages sent from UI to backend
//! - [`MonitorMessage`] - messages sent from backend to UI
//! - [`FrontendHandle`] - UI-side handle for sending commands and
//!   receiving messages
//! - [`MonitorBackend`] - backend entry point run on its own thread
//!
//! # Example
//!
//! ```ignore
//! use posturevis_rs::backend::MonitorBackend;
//! use posturevis_rs::config::AppConfig;
//! use posturevis_rs::transport::TransportChoice;
//!
//! let (backend, frontend) = MonitorBackend::new(AppConfig::default());
//! std::thread::spawn(move || backend.run());
//!
//! frontend.connect(TransportChoice::Direct);
//! for msg in frontend.drain() {
//!     // update UI state
//! }
//! ```

pub mod worker;

pub use worker::{MonitorWorker, TransportFactory};

use crossbeam_channel::{bounded, Receiver, Sender};

use crate::classifier::Feedback;
use crate::config::AppConfig;
use crate::transport::TransportChoice;
use crate::types::{Baseline, ConnectionStatus, Reading, Sample};

/// Message sent from the UI to the backend
#[derive(Debug, Clone)]
pub enum MonitorCommand {
    /// Connect over the given transport
    Connect(TransportChoice),
    /// Disconnect the active transport
    Disconnect,
    /// Capture the current reading as the baseline
    Calibrate,
    /// Start accumulating samples
    StartMeasurement,
    /// Stop accumulating samples and export the window
    EndMeasurement,
    /// Toggle posture feedback
    SetFeedback(bool),
    /// Shutdown the backend
    Shutdown,
}

/// Message sent from the backend to the UI
#[derive(Debug, Clone)]
pub enum MonitorMessage {
    /// Connection status changed
    ConnectionStatus(ConnectionStatus),
    /// A connect attempt failed
    ConnectionError(String),
    /// The link dropped without a disconnect request
    ConnectionLost(String),
    /// Displayed sensor/bridge identifier changed (`None` on reset)
    SensorId(Option<String>),
    /// New current reading
    Reading(Reading),
    /// Baseline captured
    Calibrated(Baseline),
    /// Measurement started; the window was cleared
    MeasurementStarted,
    /// A sample was appended to the window
    Sample(Sample),
    /// Measurement ended; the window was exported
    MeasurementEnded {
        /// CSV rendering of the window
        csv: String,
        /// Number of exported samples
        samples: usize,
    },
    /// Feedback toggle was accepted; the classifier now runs (or not)
    /// on every frame
    FeedbackActive(bool),
    /// Classifier output for the latest evaluation
    Feedback(Feedback),
    /// Decoder diagnostics, sent periodically while connected
    FrameStats { decoded: u64, malformed: u64 },
    /// Backend is shutting down
    Shutdown,
}

/// Frontend handle for backend communication
pub struct FrontendHandle {
    /// Receiver for backend messages
    pub receiver: Receiver<MonitorMessage>,
    /// Sender for commands to the backend
    pub command_sender: Sender<MonitorCommand>,
}

impl FrontendHandle {
    /// Try to receive a message without blocking
    pub fn try_recv(&self) -> Option<MonitorMessage> {
        self.receiver.try_recv().ok()
    }

    /// Receive all pending messages
    pub fn drain(&self) -> Vec<MonitorMessage> {
        let mut messages = Vec::new();
        while let Ok(msg) = self.receiver.try_recv() {
            messages.push(msg);
        }
        messages
    }

    /// Send a command to the backend
    pub fn send_command(&self, cmd: MonitorCommand) -> bool {
        self.command_sender.send(cmd).is_ok()
    }

    /// Request a connection over the given transport
    pub fn connect(&self, choice: TransportChoice) {
        let _ = self.command_sender.send(MonitorCommand::Connect(choice));
    }

    /// Request disconnection
    pub fn disconnect(&self) {
        let _ = self.command_sender.send(MonitorCommand::Disconnect);
    }

    /// Capture the current reading as the baseline
    pub fn calibrate(&self) {
        let _ = self.command_sender.send(MonitorCommand::Calibrate);
    }

    /// Start a measurement
    pub fn start_measurement(&self) {
        let _ = self.command_sender.send(MonitorCommand::StartMeasurement);
    }

    /// End the running measurement
    pub fn end_measurement(&self) {
        let _ = self.command_sender.send(MonitorCommand::EndMeasurement);
    }

    /// Toggle posture feedback
    pub fn set_feedback(&self, on: bool) {
        let _ = self.command_sender.send(MonitorCommand::SetFeedback(on));
    }

    /// Request shutdown
    pub fn shutdown(&self) {
        let _ = self.command_sender.send(MonitorCommand::Shutdown);
    }
}

/// The monitoring backend that runs on a worker thread
pub struct MonitorBackend {
    config: AppConfig,
    command_receiver: Receiver<MonitorCommand>,
    message_sender: Sender<MonitorMessage>,
}

impl MonitorBackend {
    /// Create a new backend with communication channels
    pub fn new(config: AppConfig) -> (Self, FrontendHandle) {
        let (cmd_tx, cmd_rx) = bounded(64);
        // Bounded for backpressure: samples arrive at sensor rate and the
        // UI drains once per repaint.
        let (msg_tx, msg_rx) = bounded(2048);

        let backend = Self {
            config,
            command_receiver: cmd_rx,
            message_sender: msg_tx,
        };

        let frontend = FrontendHandle {
            receiver: msg_rx,
            command_sender: cmd_tx,
        };

        (backend, frontend)
    }

    /// Run the backend loop until shutdown
    pub fn run(self) {
        match MonitorWorker::new(self.config, self.command_receiver, self.message_sender) {
            Ok(mut worker) => worker.run(),
            Err(e) => tracing::error!("failed to start monitor worker: {}", e),
        }
    }
}

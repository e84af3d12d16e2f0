//! Worker loop driving the monitoring session
//!
//! One plain thread owns the session state machine, the frame decoder,
//! and the active transport, plus a private tokio runtime for transport
//! I/O. Commands from the UI and events from the transport are both
//! handled on this loop, so every state transition happens in a single
//! place and in a defined order.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::runtime::{Handle, Runtime};

use crate::config::{AppConfig, ExportConfig, TransportConfig};
use crate::error::Result;
use crate::protocol::FrameDecoder;
use crate::session::{window_to_csv, write_csv, SampleWindow, Session};
use crate::transport::{
    BleTransport, RelayTransport, SensorTransport, TransportChoice, TransportEvent,
};
use crate::types::{ConnectionStatus, Reading};

use super::{MonitorCommand, MonitorMessage};

/// How long to block waiting for a command before servicing transport events
const COMMAND_POLL: Duration = Duration::from_millis(10);

/// Minimum interval between decoder diagnostic messages
const STATS_INTERVAL: Duration = Duration::from_secs(1);

/// Builds a transport for a connect request.
///
/// The default factory creates the real BLE and relay links; tests swap
/// in a scripted transport.
pub type TransportFactory =
    Box<dyn FnMut(TransportChoice, &TransportConfig, Handle) -> Box<dyn SensorTransport> + Send>;

fn default_factory() -> TransportFactory {
    Box::new(|choice, config, handle| match choice {
        TransportChoice::Direct => Box::new(BleTransport::new(config.clone(), handle)),
        TransportChoice::Relay => Box::new(RelayTransport::new(config.clone(), handle)),
    })
}

/// The worker that owns all monitoring state
pub struct MonitorWorker {
    config: AppConfig,
    command_rx: Receiver<MonitorCommand>,
    message_tx: Sender<MonitorMessage>,
    factory: TransportFactory,
    // Declared before `runtime` so transport teardown still has a live
    // runtime to block on during drop.
    transport: Option<Box<dyn SensorTransport>>,
    session: Session,
    decoder: FrameDecoder,
    sensor_id: Option<String>,
    rng: StdRng,
    last_stats: (u64, u64),
    last_stats_at: Instant,
    running: bool,
    runtime: Runtime,
}

impl MonitorWorker {
    /// Create a worker with the real transport factory
    pub fn new(
        config: AppConfig,
        command_rx: Receiver<MonitorCommand>,
        message_tx: Sender<MonitorMessage>,
    ) -> Result<Self> {
        Self::with_factory(config, command_rx, message_tx, default_factory())
    }

    /// Create a worker with a custom transport factory
    pub fn with_factory(
        config: AppConfig,
        command_rx: Receiver<MonitorCommand>,
        message_tx: Sender<MonitorMessage>,
        factory: TransportFactory,
    ) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()?;
        let window_capacity = config.window.capacity;

        Ok(Self {
            config,
            command_rx,
            message_tx,
            factory,
            transport: None,
            session: Session::new(window_capacity),
            decoder: FrameDecoder::new(),
            sensor_id: None,
            rng: StdRng::from_entropy(),
            last_stats: (0, 0),
            last_stats_at: Instant::now(),
            running: true,
            runtime,
        })
    }

    /// Run until a shutdown command arrives or the command channel closes
    pub fn run(&mut self) {
        tracing::info!("monitor worker started");
        while self.running {
            match self.command_rx.recv_timeout(COMMAND_POLL) {
                Ok(cmd) => self.handle_command(cmd),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
            while self.running {
                let Ok(cmd) = self.command_rx.try_recv() else {
                    break;
                };
                self.handle_command(cmd);
            }
            self.drain_transport_events();
            self.publish_stats();
        }
        self.teardown(false);
        let _ = self.message_tx.send(MonitorMessage::Shutdown);
        tracing::info!("monitor worker stopped");
    }

    fn handle_command(&mut self, cmd: MonitorCommand) {
        tracing::debug!(?cmd, "handling command");
        match cmd {
            MonitorCommand::Connect(choice) => self.handle_connect(choice),
            MonitorCommand::Disconnect => self.teardown(true),
            MonitorCommand::Calibrate => self.handle_calibrate(),
            MonitorCommand::StartMeasurement => self.handle_start_measurement(),
            MonitorCommand::EndMeasurement => self.handle_end_measurement(),
            MonitorCommand::SetFeedback(on) => self.handle_set_feedback(on),
            MonitorCommand::Shutdown => self.running = false,
        }
    }

    fn handle_connect(&mut self, choice: TransportChoice) {
        if self.transport.as_ref().is_some_and(|t| t.is_connected()) {
            tracing::warn!(%choice, "connect requested while already connected");
            return;
        }
        self.send(MonitorMessage::ConnectionStatus(ConnectionStatus::Connecting));

        let mut transport =
            (self.factory)(choice, &self.config.transport, self.runtime.handle().clone());
        match transport.connect() {
            Ok(()) => {
                let id = transport
                    .identifier()
                    .unwrap_or_else(|| choice.to_string());
                if let Err(e) = self.session.connected(id.clone()) {
                    // Unreachable with a disconnected session; reset and retry.
                    tracing::warn!("stale session on connect: {}", e);
                    self.session.disconnect();
                    let _ = self.session.connected(id.clone());
                }
                self.transport = Some(transport);
                self.sensor_id = Some(id.clone());
                self.send(MonitorMessage::ConnectionStatus(ConnectionStatus::Connected));
                self.send(MonitorMessage::SensorId(Some(id)));
            }
            Err(e) => {
                tracing::error!(%choice, "connect failed: {}", e);
                self.send(MonitorMessage::ConnectionError(e.to_string()));
                self.send(MonitorMessage::ConnectionStatus(ConnectionStatus::Error));
            }
        }
    }

    fn handle_calibrate(&mut self) {
        match self.session.calibrate() {
            Ok(baseline) => self.send(MonitorMessage::Calibrated(baseline)),
            Err(e) => tracing::warn!("calibrate rejected: {}", e),
        }
    }

    fn handle_start_measurement(&mut self) {
        match self.session.start_measurement() {
            Ok(()) => self.send(MonitorMessage::MeasurementStarted),
            Err(e) => tracing::warn!("start measurement rejected: {}", e),
        }
    }

    fn handle_end_measurement(&mut self) {
        let (csv, samples) = match self.session.end_measurement() {
            Ok(window) => {
                if self.config.export.auto_save {
                    Self::auto_save(&self.config.export, window);
                }
                (window_to_csv(window), window.len())
            }
            Err(e) => {
                tracing::warn!("end measurement rejected: {}", e);
                return;
            }
        };
        self.send(MonitorMessage::MeasurementEnded { csv, samples });
    }

    fn handle_set_feedback(&mut self, on: bool) {
        let rng = &mut self.rng;
        match self.session.set_feedback(on, &mut |len| rng.gen_range(0..len)) {
            Ok(feedback) => {
                // Confirmed toggles only; the UI checkbox follows this
                // message rather than the click.
                self.send(MonitorMessage::FeedbackActive(on));
                if let Some(feedback) = feedback {
                    self.send(MonitorMessage::Feedback(feedback));
                }
            }
            Err(e) => tracing::warn!("feedback toggle rejected: {}", e),
        }
    }

    fn drain_transport_events(&mut self) {
        let events: Vec<TransportEvent> = match &self.transport {
            Some(transport) => transport.events().try_iter().collect(),
            None => return,
        };

        for event in events {
            match event {
                TransportEvent::RawFrame(payload) => {
                    if let Some(reading) = self.decoder.decode_bytes(&payload) {
                        self.handle_reading(reading, None);
                    }
                }
                TransportEvent::Reading { reading, sensor_id } => {
                    self.handle_reading(reading, sensor_id);
                }
                TransportEvent::ConnectionLost(cause) => {
                    self.handle_connection_lost(cause);
                    break;
                }
            }
        }
    }

    fn handle_reading(&mut self, reading: Reading, sensor_id: Option<String>) {
        if let Some(id) = sensor_id {
            if self.sensor_id.as_deref() != Some(id.as_str()) {
                self.sensor_id = Some(id.clone());
                self.send(MonitorMessage::SensorId(Some(id)));
            }
        }

        let rng = &mut self.rng;
        let feedback = self
            .session
            .push_reading(reading, &mut |len| rng.gen_range(0..len));

        self.try_send(MonitorMessage::Reading(reading));
        if self.session.phase().is_measuring() {
            if let Some(sample) = self.session.window().iter().last().copied() {
                self.try_send(MonitorMessage::Sample(sample));
            }
        }

        match feedback {
            Ok(Some(feedback)) => self.send(MonitorMessage::Feedback(feedback)),
            Ok(None) => {}
            Err(e) => tracing::warn!("classification failed: {}", e),
        }
    }

    fn handle_connection_lost(&mut self, cause: String) {
        tracing::warn!(%cause, "transport lost the connection");
        if let Some(mut transport) = self.transport.take() {
            transport.disconnect();
        }
        self.session.disconnect();
        self.sensor_id = None;
        self.decoder.reset_counters();
        self.send(MonitorMessage::ConnectionLost(cause));
        self.send(MonitorMessage::ConnectionStatus(ConnectionStatus::Disconnected));
        self.send(MonitorMessage::SensorId(None));
    }

    /// Tear down transport and session. `announce` distinguishes a
    /// user-requested disconnect from worker shutdown.
    fn teardown(&mut self, announce: bool) {
        if let Some(mut transport) = self.transport.take() {
            transport.disconnect();
        }
        self.session.disconnect();
        self.sensor_id = None;
        self.decoder.reset_counters();
        if announce {
            self.send(MonitorMessage::ConnectionStatus(ConnectionStatus::Disconnected));
            self.send(MonitorMessage::SensorId(None));
        }
    }

    fn publish_stats(&mut self) {
        if self.transport.is_none() || self.last_stats_at.elapsed() < STATS_INTERVAL {
            return;
        }
        self.last_stats_at = Instant::now();
        let stats = (self.decoder.frames_decoded(), self.decoder.frames_malformed());
        if stats != self.last_stats {
            self.last_stats = stats;
            self.try_send(MonitorMessage::FrameStats {
                decoded: stats.0,
                malformed: stats.1,
            });
        }
    }

    fn auto_save(export: &ExportConfig, window: &SampleWindow) {
        let dir = export
            .directory
            .clone()
            .unwrap_or_else(|| PathBuf::from("."));
        let filename = format!("posture_{}.csv", chrono::Local::now().format("%Y%m%d_%H%M%S"));
        let path = dir.join(filename);
        if let Err(e) = write_csv(window, &path) {
            tracing::error!(path = %path.display(), "auto-save failed: {}", e);
        }
    }

    /// Send a state-bearing message; the UI must not miss these.
    fn send(&self, msg: MonitorMessage) {
        if self.message_tx.send(msg).is_err() {
            tracing::debug!("frontend gone, message dropped");
        }
    }

    /// Send a high-rate message; dropping under backpressure is fine.
    fn try_send(&self, msg: MonitorMessage) {
        if self.message_tx.try_send(msg).is_err() {
            tracing::trace!("message channel full, dropping update");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{MockInjector, MockTransport};
    use crossbeam_channel::unbounded;

    fn worker_with_mock(
        transport: MockTransport,
    ) -> (
        MonitorWorker,
        Sender<MonitorCommand>,
        Receiver<MonitorMessage>,
        MockInjector,
    ) {
        worker_with_config(transport, AppConfig::default())
    }

    fn worker_with_config(
        transport: MockTransport,
        config: AppConfig,
    ) -> (
        MonitorWorker,
        Sender<MonitorCommand>,
        Receiver<MonitorMessage>,
        MockInjector,
    ) {
        let injector = transport.injector();
        let (cmd_tx, cmd_rx) = unbounded();
        let (msg_tx, msg_rx) = unbounded();
        let mut slot = Some(transport);
        let factory: TransportFactory = Box::new(move |_, _, _| match slot.take() {
            Some(t) => Box::new(t),
            None => Box::new(MockTransport::failing("transport already consumed")),
        });
        let worker = MonitorWorker::with_factory(config, cmd_rx, msg_tx, factory).unwrap();
        (worker, cmd_tx, msg_rx, injector)
    }

    fn statuses(messages: &[MonitorMessage]) -> Vec<ConnectionStatus> {
        messages
            .iter()
            .filter_map(|m| match m {
                MonitorMessage::ConnectionStatus(s) => Some(*s),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_connect_success_announces_status_and_id() {
        let (mut worker, _cmd_tx, msg_rx, _injector) =
            worker_with_mock(MockTransport::new("KIRIRI01-TEST"));

        worker.handle_command(MonitorCommand::Connect(TransportChoice::Direct));

        let messages: Vec<_> = msg_rx.try_iter().collect();
        assert_eq!(
            statuses(&messages),
            vec![ConnectionStatus::Connecting, ConnectionStatus::Connected]
        );
        assert!(messages.iter().any(|m| matches!(
            m,
            MonitorMessage::SensorId(Some(id)) if id == "KIRIRI01-TEST"
        )));
        assert!(worker.session.phase().is_connected());
    }

    #[test]
    fn test_connect_failure_returns_to_idle() {
        let (mut worker, _cmd_tx, msg_rx, _injector) =
            worker_with_mock(MockTransport::failing("no adapter"));

        worker.handle_command(MonitorCommand::Connect(TransportChoice::Direct));

        let messages: Vec<_> = msg_rx.try_iter().collect();
        assert_eq!(
            statuses(&messages),
            vec![ConnectionStatus::Connecting, ConnectionStatus::Error]
        );
        assert!(messages.iter().any(|m| matches!(
            m,
            MonitorMessage::ConnectionError(e) if e.contains("no adapter")
        )));
        assert!(!worker.session.phase().is_connected());
        assert!(worker.transport.is_none());
    }

    #[test]
    fn test_raw_frames_become_readings() {
        let (mut worker, _cmd_tx, msg_rx, injector) =
            worker_with_mock(MockTransport::new("mock"));
        worker.handle_command(MonitorCommand::Connect(TransportChoice::Direct));
        let _ = msg_rx.try_iter().count();

        injector.push_frame("N:250:-125");
        injector.push_frame("not a frame");
        worker.drain_transport_events();

        let readings: Vec<Reading> = msg_rx
            .try_iter()
            .filter_map(|m| match m {
                MonitorMessage::Reading(r) => Some(r),
                _ => None,
            })
            .collect();
        assert_eq!(readings, vec![Reading::new(2.5, -1.25)]);
    }

    #[test]
    fn test_unsolicited_loss_resets_session() {
        let (mut worker, _cmd_tx, msg_rx, injector) =
            worker_with_mock(MockTransport::new("mock"));
        worker.handle_command(MonitorCommand::Connect(TransportChoice::Direct));
        injector.push_frame("N:0:0");
        worker.drain_transport_events();
        worker.handle_command(MonitorCommand::Calibrate);
        worker.handle_command(MonitorCommand::StartMeasurement);
        let _ = msg_rx.try_iter().count();

        injector.drop_connection("sensor went away");
        worker.drain_transport_events();

        let messages: Vec<_> = msg_rx.try_iter().collect();
        assert!(messages.iter().any(|m| matches!(
            m,
            MonitorMessage::ConnectionLost(cause) if cause.contains("went away")
        )));
        assert_eq!(statuses(&messages), vec![ConnectionStatus::Disconnected]);
        assert!(!worker.session.phase().is_connected());
        assert!(worker.session.window().is_empty());
    }

    #[test]
    fn test_end_measurement_exports_csv() {
        let (mut worker, _cmd_tx, msg_rx, injector) =
            worker_with_mock(MockTransport::new("mock"));
        worker.handle_command(MonitorCommand::Connect(TransportChoice::Direct));
        injector.push_frame("N:100:50");
        worker.drain_transport_events();
        worker.handle_command(MonitorCommand::Calibrate);
        worker.handle_command(MonitorCommand::StartMeasurement);
        injector.push_frame("N:200:100");
        injector.push_frame("N:300:150");
        worker.drain_transport_events();
        let _ = msg_rx.try_iter().count();

        worker.handle_command(MonitorCommand::EndMeasurement);

        let exported = msg_rx.try_iter().find_map(|m| match m {
            MonitorMessage::MeasurementEnded { csv, samples } => Some((csv, samples)),
            _ => None,
        });
        let (csv, samples) = exported.expect("no export message");
        assert_eq!(samples, 2);
        assert!(csv.starts_with(crate::session::CSV_HEADER));
        assert!(csv.contains("2.0000"));
        assert!(csv.contains("3.0000"));
    }

    #[test]
    fn test_feedback_toggle_emits_immediate_classification() {
        let (mut worker, _cmd_tx, msg_rx, injector) =
            worker_with_mock(MockTransport::new("mock"));
        worker.handle_command(MonitorCommand::Connect(TransportChoice::Direct));
        injector.push_frame("N:0:0");
        worker.drain_transport_events();
        worker.handle_command(MonitorCommand::Calibrate);
        worker.handle_command(MonitorCommand::StartMeasurement);
        let _ = msg_rx.try_iter().count();

        worker.handle_command(MonitorCommand::SetFeedback(true));

        let feedback = msg_rx.try_iter().find_map(|m| match m {
            MonitorMessage::Feedback(f) => Some(f),
            _ => None,
        });
        assert!(feedback.is_some());
    }

    #[test]
    fn test_feedback_state_only_confirmed_on_accepted_toggle() {
        let (mut worker, _cmd_tx, msg_rx, injector) =
            worker_with_mock(MockTransport::new("mock"));
        worker.handle_command(MonitorCommand::Connect(TransportChoice::Direct));
        let _ = msg_rx.try_iter().count();

        // Not measuring yet: the toggle is rejected and no state
        // confirmation must reach the UI.
        worker.handle_command(MonitorCommand::SetFeedback(true));
        assert!(!msg_rx
            .try_iter()
            .any(|m| matches!(m, MonitorMessage::FeedbackActive(_))));

        injector.push_frame("N:0:0");
        worker.drain_transport_events();
        worker.handle_command(MonitorCommand::Calibrate);
        worker.handle_command(MonitorCommand::StartMeasurement);
        let _ = msg_rx.try_iter().count();

        worker.handle_command(MonitorCommand::SetFeedback(true));
        let confirmations: Vec<bool> = msg_rx
            .try_iter()
            .filter_map(|m| match m {
                MonitorMessage::FeedbackActive(on) => Some(on),
                _ => None,
            })
            .collect();
        assert_eq!(confirmations, vec![true]);

        worker.handle_command(MonitorCommand::SetFeedback(false));
        assert!(msg_rx
            .try_iter()
            .any(|m| matches!(m, MonitorMessage::FeedbackActive(false))));
    }

    #[test]
    fn test_auto_save_writes_csv_on_end() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.export.auto_save = true;
        config.export.directory = Some(dir.path().to_path_buf());

        let (mut worker, _cmd_tx, msg_rx, injector) =
            worker_with_config(MockTransport::new("mock"), config);
        worker.handle_command(MonitorCommand::Connect(TransportChoice::Direct));
        injector.push_frame("N:100:50");
        worker.drain_transport_events();
        worker.handle_command(MonitorCommand::Calibrate);
        worker.handle_command(MonitorCommand::StartMeasurement);
        injector.push_frame("N:200:100");
        worker.drain_transport_events();
        worker.handle_command(MonitorCommand::EndMeasurement);
        let _ = msg_rx.try_iter().count();

        let files: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        assert_eq!(files.len(), 1);
        let name = files[0].file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("posture_") && name.ends_with(".csv"));
        let contents = std::fs::read_to_string(&files[0]).unwrap();
        assert!(contents.starts_with(crate::session::CSV_HEADER));
        assert!(contents.contains("2.0000"));
    }
}

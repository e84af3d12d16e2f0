//! Integration tests for the monitoring session lifecycle
//!
//! These tests drive the worker thread end to end through a scripted
//! transport:
//! - Connection and disconnection
//! - Calibration, measurement, and feedback
//! - Unsolicited connection loss
//! - CSV export on measurement end

use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, Sender};
use posturevis_rs::backend::{
    MonitorCommand, MonitorMessage, MonitorWorker, TransportFactory,
};
use posturevis_rs::classifier::FeedbackClass;
use posturevis_rs::config::AppConfig;
use posturevis_rs::session::CSV_HEADER;
use posturevis_rs::transport::{MockInjector, MockTransport, TransportChoice};
use posturevis_rs::types::ConnectionStatus;

struct Harness {
    cmd_tx: Sender<MonitorCommand>,
    msg_rx: Receiver<MonitorMessage>,
    injector: MockInjector,
    handle: Option<thread::JoinHandle<()>>,
}

impl Harness {
    fn spawn(transport: MockTransport) -> Self {
        let injector = transport.injector();
        let (cmd_tx, cmd_rx) = bounded(64);
        let (msg_tx, msg_rx) = bounded(2048);

        let mut slot = Some(transport);
        let factory: TransportFactory = Box::new(move |_, _, _| match slot.take() {
            Some(t) => Box::new(t),
            None => Box::new(MockTransport::failing("transport already consumed")),
        });

        let mut worker =
            MonitorWorker::with_factory(AppConfig::default(), cmd_rx, msg_tx, factory)
                .expect("worker creation failed");
        let handle = thread::spawn(move || worker.run());

        Self {
            cmd_tx,
            msg_rx,
            injector,
            handle: Some(handle),
        }
    }

    fn send(&self, cmd: MonitorCommand) {
        self.cmd_tx.send(cmd).expect("worker gone");
    }

    /// Collect messages until one matches, or panic after two seconds.
    fn wait_for(
        &self,
        what: &str,
        pred: impl Fn(&MonitorMessage) -> bool,
    ) -> Vec<MonitorMessage> {
        let deadline = Instant::now() + Duration::from_secs(2);
        let mut seen = Vec::new();
        loop {
            let remaining = deadline
                .checked_duration_since(Instant::now())
                .unwrap_or_else(|| panic!("timed out waiting for {} (saw {:?})", what, seen));
            match self.msg_rx.recv_timeout(remaining) {
                Ok(msg) => {
                    let done = pred(&msg);
                    seen.push(msg);
                    if done {
                        return seen;
                    }
                }
                Err(_) => panic!("timed out waiting for {} (saw {:?})", what, seen),
            }
        }
    }

    fn assert_no_message(&self, what: &str, pred: impl Fn(&MonitorMessage) -> bool) {
        thread::sleep(Duration::from_millis(150));
        for msg in self.msg_rx.try_iter() {
            assert!(!pred(&msg), "unexpected {}: {:?}", what, msg);
        }
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        let _ = self.cmd_tx.send(MonitorCommand::Shutdown);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

#[test]
fn test_connect_calibrate_measure_with_feedback() {
    let harness = Harness::spawn(MockTransport::new("KIRIRI01-IT"));

    harness.send(MonitorCommand::Connect(TransportChoice::Direct));
    harness.wait_for("connected status", |m| {
        matches!(m, MonitorMessage::ConnectionStatus(ConnectionStatus::Connected))
    });

    // First frame becomes the current reading, then the baseline.
    harness.injector.push_frame("N:200:-100");
    harness.wait_for("first reading", |m| {
        matches!(m, MonitorMessage::Reading(r) if r.y_angle == 2.0 && r.x_angle == -1.0)
    });
    harness.send(MonitorCommand::Calibrate);
    harness.wait_for("baseline", |m| {
        matches!(m, MonitorMessage::Calibrated(b) if b.ref_y == 2.0 && b.ref_x == -1.0)
    });

    harness.send(MonitorCommand::StartMeasurement);
    harness.wait_for("measurement start", |m| {
        matches!(m, MonitorMessage::MeasurementStarted)
    });

    // Toggling feedback on classifies the current reading immediately;
    // at the baseline that is an affirmation.
    harness.send(MonitorCommand::SetFeedback(true));
    harness.wait_for("neutral feedback", |m| {
        matches!(m, MonitorMessage::Feedback(f) if f.class == FeedbackClass::Success)
    });

    // 18 degrees forward of the baseline is a noticeable deviation.
    harness.injector.push_frame("N:2000:-100");
    harness.wait_for("deviation feedback", |m| {
        matches!(m, MonitorMessage::Feedback(f) if f.class == FeedbackClass::Error)
    });

    harness.send(MonitorCommand::EndMeasurement);
    let seen = harness.wait_for("export", |m| {
        matches!(m, MonitorMessage::MeasurementEnded { .. })
    });
    let (csv, samples) = seen
        .iter()
        .find_map(|m| match m {
            MonitorMessage::MeasurementEnded { csv, samples } => Some((csv.clone(), *samples)),
            _ => None,
        })
        .unwrap();
    // Only the frame received while measuring is in the window.
    assert_eq!(samples, 1);
    assert!(csv.starts_with(CSV_HEADER));
    assert!(csv.contains("20.0000"));
}

#[test]
fn test_connect_failure_reports_error() {
    let harness = Harness::spawn(MockTransport::failing("simulated adapter failure"));

    harness.send(MonitorCommand::Connect(TransportChoice::Direct));
    let seen = harness.wait_for("error status", |m| {
        matches!(m, MonitorMessage::ConnectionStatus(ConnectionStatus::Error))
    });
    assert!(seen.iter().any(|m| matches!(
        m,
        MonitorMessage::ConnectionError(e) if e.contains("simulated adapter failure")
    )));

    // The session never left idle, so calibrate stays rejected silently.
    harness.send(MonitorCommand::Calibrate);
    harness.assert_no_message("baseline after failed connect", |m| {
        matches!(m, MonitorMessage::Calibrated(_))
    });
}

#[test]
fn test_unsolicited_loss_resets_everything() {
    let harness = Harness::spawn(MockTransport::new("KIRIRI01-IT"));

    harness.send(MonitorCommand::Connect(TransportChoice::Direct));
    harness.wait_for("connected status", |m| {
        matches!(m, MonitorMessage::ConnectionStatus(ConnectionStatus::Connected))
    });
    harness.injector.push_frame("N:0:0");
    harness.wait_for("reading", |m| matches!(m, MonitorMessage::Reading(_)));
    harness.send(MonitorCommand::Calibrate);
    harness.send(MonitorCommand::StartMeasurement);
    harness.wait_for("measurement start", |m| {
        matches!(m, MonitorMessage::MeasurementStarted)
    });

    harness.injector.drop_connection("sensor powered off");
    let seen = harness.wait_for("disconnected status", |m| {
        matches!(m, MonitorMessage::ConnectionStatus(ConnectionStatus::Disconnected))
    });
    assert!(seen.iter().any(|m| matches!(
        m,
        MonitorMessage::ConnectionLost(cause) if cause.contains("powered off")
    )));
    assert!(seen
        .iter()
        .any(|m| matches!(m, MonitorMessage::SensorId(None))));

    // The measurement died with the session; ending it now is a no-op.
    harness.send(MonitorCommand::EndMeasurement);
    harness.assert_no_message("export after loss", |m| {
        matches!(m, MonitorMessage::MeasurementEnded { .. })
    });
}

#[test]
fn test_relay_readings_bypass_decoder() {
    let harness = Harness::spawn(MockTransport::new("ws://localhost:8765"));

    harness.send(MonitorCommand::Connect(TransportChoice::Relay));
    harness.wait_for("connected status", |m| {
        matches!(m, MonitorMessage::ConnectionStatus(ConnectionStatus::Connected))
    });

    harness
        .injector
        .push_reading(1.25, -0.5, Some("AA:BB:CC:DD:EE:FF"));
    let seen = harness.wait_for("relay reading", |m| {
        matches!(m, MonitorMessage::Reading(r) if r.y_angle == 1.25 && r.x_angle == -0.5)
    });
    // The sensor id carried in the payload replaces the endpoint id.
    assert!(seen.iter().any(|m| matches!(
        m,
        MonitorMessage::SensorId(Some(id)) if id == "AA:BB:CC:DD:EE:FF"
    )));
}

#[test]
fn test_shutdown_exits_cleanly() {
    let mut harness = Harness::spawn(MockTransport::new("KIRIRI01-IT"));
    harness.send(MonitorCommand::Connect(TransportChoice::Direct));
    harness.send(MonitorCommand::Shutdown);

    let handle = harness.handle.take().unwrap();
    assert!(handle.join().is_ok(), "worker thread should exit cleanly");
    harness.wait_for("shutdown notice", |m| {
        matches!(m, MonitorMessage::Shutdown)
    });
}

//! Scripted transport for tests and hardware-free demos
//!
//! Behaves like a real link from the worker's point of view: `connect`
//! can be made to fail with a given cause, frames and connection-loss
//! notices are injected through a cloneable [`MockInjector`], and
//! `disconnect` stops further delivery.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};

use crate::error::{MonitorError, Result};
use crate::types::Reading;

use super::{event_channel, SensorTransport, TransportEvent};

/// In-memory transport fed by a [`MockInjector`]
pub struct MockTransport {
    identifier: String,
    fail_connect: Option<String>,
    event_tx: Sender<TransportEvent>,
    event_rx: Receiver<TransportEvent>,
    active: Arc<AtomicBool>,
}

impl MockTransport {
    /// Create a mock transport that connects successfully
    pub fn new(identifier: impl Into<String>) -> Self {
        let (event_tx, event_rx) = event_channel();
        Self {
            identifier: identifier.into(),
            fail_connect: None,
            event_tx,
            event_rx,
            active: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Create a mock transport whose `connect` fails with the given cause
    pub fn failing(cause: impl Into<String>) -> Self {
        let mut transport = Self::new("mock");
        transport.fail_connect = Some(cause.into());
        transport
    }

    /// Handle for injecting events from a test
    pub fn injector(&self) -> MockInjector {
        MockInjector {
            tx: self.event_tx.clone(),
            active: self.active.clone(),
        }
    }
}

impl SensorTransport for MockTransport {
    fn connect(&mut self) -> Result<()> {
        if let Some(cause) = &self.fail_connect {
            return Err(MonitorError::Connection(cause.clone()));
        }
        self.active.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn disconnect(&mut self) {
        self.active.store(false, Ordering::SeqCst);
    }

    fn is_connected(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    fn identifier(&self) -> Option<String> {
        self.is_connected().then(|| self.identifier.clone())
    }

    fn events(&self) -> &Receiver<TransportEvent> {
        &self.event_rx
    }
}

/// Cloneable handle that feeds a [`MockTransport`]
#[derive(Clone)]
pub struct MockInjector {
    tx: Sender<TransportEvent>,
    active: Arc<AtomicBool>,
}

impl MockInjector {
    /// Inject a raw text frame (as the direct link would deliver)
    pub fn push_frame(&self, payload: &str) {
        if self.active.load(Ordering::SeqCst) {
            let _ = self.tx.send(TransportEvent::RawFrame(payload.as_bytes().to_vec()));
        }
    }

    /// Inject a pre-decoded reading (as the relay link would deliver)
    pub fn push_reading(&self, y: f64, x: f64, sensor_id: Option<&str>) {
        if self.active.load(Ordering::SeqCst) {
            let _ = self.tx.send(TransportEvent::Reading {
                reading: Reading::new(y, x),
                sensor_id: sensor_id.map(str::to_string),
            });
        }
    }

    /// Simulate an unsolicited connection loss
    pub fn drop_connection(&self, cause: &str) {
        if self.active.swap(false, Ordering::SeqCst) {
            let _ = self.tx.send(TransportEvent::ConnectionLost(cause.to_string()));
        }
    }
}

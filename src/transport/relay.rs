//! WebSocket relay transport
//!
//! Connects to a local bridge process that owns the BLE link and fans out
//! decoded samples as JSON text messages:
//!
//! ```json
//! { "y": 2.5, "x": -1.25, "id": "AA:BB:CC:DD:EE:FF" }
//! ```
//!
//! Angles arrive already in degrees, so no frame decoding happens here;
//! each message is forwarded as a ready [`TransportEvent::Reading`] and
//! the downstream pipeline stays transport-agnostic.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crossbeam_channel::Receiver;
use futures_util::StreamExt;
use serde::Deserialize;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;

use crate::config::TransportConfig;
use crate::error::{MonitorError, Result};
use crate::types::Reading;

use super::{event_channel, SensorTransport, TransportEvent};

/// One decoded sample as sent by the bridge
#[derive(Debug, Clone, Deserialize)]
struct RelayMessage {
    y: f64,
    x: f64,
    #[serde(default)]
    id: Option<String>,
}

/// WebSocket client link to the relay bridge
pub struct RelayTransport {
    config: TransportConfig,
    handle: Handle,
    event_tx: crossbeam_channel::Sender<TransportEvent>,
    event_rx: Receiver<TransportEvent>,
    active: Arc<AtomicBool>,
    reader_task: Option<JoinHandle<()>>,
    connected: bool,
}

impl RelayTransport {
    /// Create a disconnected relay transport running its I/O on `handle`
    pub fn new(config: TransportConfig, handle: Handle) -> Self {
        let (event_tx, event_rx) = event_channel();
        Self {
            config,
            handle,
            event_tx,
            event_rx,
            active: Arc::new(AtomicBool::new(false)),
            reader_task: None,
            connected: false,
        }
    }
}

impl SensorTransport for RelayTransport {
    fn connect(&mut self) -> Result<()> {
        if self.is_connected() {
            return Err(MonitorError::Connection("already connected".to_string()));
        }

        let url = self.config.relay_url.clone();
        let connect_timeout = self.config.connect_timeout();

        let ws = self.handle.block_on(async {
            tokio::time::timeout(connect_timeout, tokio_tungstenite::connect_async(&url))
                .await
                .map_err(|_| {
                    MonitorError::Connection(format!(
                        "relay {} unreachable (timed out after {}s)",
                        url, self.config.connect_timeout_secs
                    ))
                })?
                .map(|(ws, _response)| ws)
                .map_err(MonitorError::from)
        })?;

        let active = Arc::new(AtomicBool::new(true));
        self.active = active.clone();

        let tx = self.event_tx.clone();
        let task_url = url.clone();
        self.reader_task = Some(self.handle.spawn(async move {
            let mut ws = ws;
            let cause = loop {
                match ws.next().await {
                    Some(Ok(Message::Text(text))) => {
                        if !active.load(Ordering::SeqCst) {
                            break None;
                        }
                        match serde_json::from_str::<RelayMessage>(&text) {
                            Ok(msg) => {
                                let event = TransportEvent::Reading {
                                    reading: Reading::new(msg.y, msg.x),
                                    sensor_id: msg.id,
                                };
                                if tx.try_send(event).is_err() {
                                    tracing::warn!("event channel full, dropping sample");
                                }
                            }
                            Err(e) => {
                                // Relay payloads are trusted but not infallible.
                                tracing::debug!(%text, "discarding unparseable relay message: {}", e);
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        break Some("relay closed the connection".to_string());
                    }
                    Some(Ok(_)) => {} // ping/pong/binary: nothing to forward
                    Some(Err(e)) => {
                        break Some(format!("relay connection error: {}", e));
                    }
                }
            };

            if let Some(cause) = cause {
                if active.swap(false, Ordering::SeqCst) {
                    tracing::warn!(url = %task_url, %cause, "relay link lost");
                    let _ = tx.send(TransportEvent::ConnectionLost(cause));
                }
            }
        }));

        self.connected = true;
        tracing::info!(%url, "relay transport connected");
        Ok(())
    }

    fn disconnect(&mut self) {
        self.active.store(false, Ordering::SeqCst);
        if let Some(task) = self.reader_task.take() {
            task.abort();
        }
        if self.connected {
            tracing::info!("relay transport disconnected");
        }
        self.connected = false;
    }

    fn is_connected(&self) -> bool {
        self.connected && self.active.load(Ordering::SeqCst)
    }

    fn identifier(&self) -> Option<String> {
        self.is_connected().then(|| self.config.relay_url.clone())
    }

    fn events(&self) -> &Receiver<TransportEvent> {
        &self.event_rx
    }
}

impl Drop for RelayTransport {
    fn drop(&mut self) {
        self.disconnect();
    }
}

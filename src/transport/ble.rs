//! Direct Bluetooth LE transport
//!
//! Discovers the sensor by name-prefix match against the configured
//! allow-list, connects, subscribes to the Nordic UART notify
//! characteristic, and forwards each notification payload as a raw frame.
//! The sensor expects a `START` command on its write characteristic before
//! it begins streaming, and a periodic `PING` keepalive while connected.
//!
//! Unsolicited link drops are observed through the adapter's
//! `DeviceDisconnected` event and surfaced as
//! [`TransportEvent::ConnectionLost`]; all forwarding tasks stop at that
//! point.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use btleplug::api::{
    Central, CentralEvent, Characteristic, Manager as _, Peripheral as _, ScanFilter, WriteType,
};
use btleplug::platform::{Adapter, Manager, Peripheral};
use crossbeam_channel::Receiver;
use futures_util::StreamExt;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::config::TransportConfig;
use crate::error::{MonitorError, Result, ResultExt};

use super::{event_channel, SensorTransport, TransportEvent};

/// Command that tells the sensor to start streaming frames
const START_COMMAND: &[u8] = b"START\n";

/// Keepalive command written periodically while connected
const KEEPALIVE_COMMAND: &[u8] = b"PING\n";

/// Poll interval while scanning for a matching device
const SCAN_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Direct BLE link to the posture sensor
pub struct BleTransport {
    config: TransportConfig,
    handle: Handle,
    event_tx: crossbeam_channel::Sender<TransportEvent>,
    event_rx: Receiver<TransportEvent>,
    peripheral: Option<Peripheral>,
    identifier: Option<String>,
    /// Cleared on disconnect (requested or unsolicited) so stale tasks
    /// stop forwarding and at most one loss notice is emitted
    active: Arc<AtomicBool>,
    tasks: Vec<JoinHandle<()>>,
}

impl BleTransport {
    /// Create a disconnected BLE transport running its I/O on `handle`
    pub fn new(config: TransportConfig, handle: Handle) -> Self {
        let (event_tx, event_rx) = event_channel();
        Self {
            config,
            handle,
            event_tx,
            event_rx,
            peripheral: None,
            identifier: None,
            active: Arc::new(AtomicBool::new(false)),
            tasks: Vec::new(),
        }
    }

    /// Scan until a device matching the allow-list shows up, honoring
    /// prefix priority: the first prefix in the list that any discovered
    /// name starts with wins.
    async fn discover(&self, adapter: &Adapter) -> Result<(Peripheral, String)> {
        adapter.start_scan(ScanFilter::default()).await?;
        let deadline = tokio::time::Instant::now() + self.config.scan_timeout();

        let found = loop {
            tokio::time::sleep(SCAN_POLL_INTERVAL).await;
            if let Some(hit) = self.find_match(adapter).await? {
                break Some(hit);
            }
            if tokio::time::Instant::now() >= deadline {
                break None;
            }
        };
        let _ = adapter.stop_scan().await;

        found.ok_or_else(|| {
            MonitorError::Connection(format!(
                "no device matching {:?} found within {}s",
                self.config.device_name_prefixes, self.config.scan_timeout_secs
            ))
        })
    }

    async fn find_match(&self, adapter: &Adapter) -> Result<Option<(Peripheral, String)>> {
        let mut best: Option<(usize, Peripheral, String)> = None;
        for peripheral in adapter.peripherals().await? {
            let Ok(Some(props)) = peripheral.properties().await else {
                continue;
            };
            let Some(name) = props.local_name else {
                continue;
            };
            let Some(rank) = self.config.prefix_rank(&name) else {
                continue;
            };
            if best.as_ref().map_or(true, |(r, _, _)| rank < *r) {
                best = Some((rank, peripheral, name));
            }
        }

        Ok(best.map(|(_, peripheral, name)| {
            let prefix = self.config.match_prefix(&name).unwrap_or_default();
            tracing::info!(%name, %prefix, "discovered sensor");
            (peripheral, name)
        }))
    }

    fn find_characteristic(peripheral: &Peripheral, uuid: uuid::Uuid) -> Option<Characteristic> {
        peripheral
            .characteristics()
            .iter()
            .find(|c| c.uuid == uuid)
            .cloned()
    }

    fn spawn_forwarders(
        &mut self,
        adapter: Adapter,
        peripheral: Peripheral,
        write_char: Option<Characteristic>,
    ) -> Result<()> {
        let active = self.active.clone();
        let notify_uuid = self.config.notify_characteristic;

        // Frame forwarding.
        let mut notifications = self
            .handle
            .block_on(async { peripheral.notifications().await })?;
        let tx = self.event_tx.clone();
        let task_active = active.clone();
        self.tasks.push(self.handle.spawn(async move {
            while let Some(notification) = notifications.next().await {
                if !task_active.load(Ordering::SeqCst) {
                    break;
                }
                if notification.uuid != notify_uuid {
                    continue;
                }
                if tx.try_send(TransportEvent::RawFrame(notification.value)).is_err() {
                    tracing::warn!("event channel full, dropping frame");
                }
            }
            if task_active.swap(false, Ordering::SeqCst) {
                let _ = tx.send(TransportEvent::ConnectionLost(
                    "notification stream ended".to_string(),
                ));
            }
        }));

        // Unsolicited disconnect watch.
        let mut central_events = self.handle.block_on(async { adapter.events().await })?;
        let tx = self.event_tx.clone();
        let task_active = active.clone();
        let watched_id = peripheral.id();
        self.tasks.push(self.handle.spawn(async move {
            while let Some(event) = central_events.next().await {
                if !task_active.load(Ordering::SeqCst) {
                    break;
                }
                if let CentralEvent::DeviceDisconnected(id) = event {
                    if id == watched_id {
                        if task_active.swap(false, Ordering::SeqCst) {
                            let _ = tx.send(TransportEvent::ConnectionLost(
                                "sensor disconnected".to_string(),
                            ));
                        }
                        break;
                    }
                }
            }
        }));

        // Keepalive writes.
        if let (Some(interval), Some(write_char)) =
            (self.config.keepalive_interval(), write_char)
        {
            let keepalive_peripheral = peripheral.clone();
            let task_active = active;
            self.tasks.push(self.handle.spawn(async move {
                loop {
                    tokio::time::sleep(interval).await;
                    if !task_active.load(Ordering::SeqCst) {
                        break;
                    }
                    if keepalive_peripheral
                        .write(&write_char, KEEPALIVE_COMMAND, WriteType::WithoutResponse)
                        .await
                        .is_err()
                    {
                        tracing::debug!("keepalive write failed, stopping");
                        break;
                    }
                }
            }));
        }

        Ok(())
    }
}

impl SensorTransport for BleTransport {
    fn connect(&mut self) -> Result<()> {
        if self.is_connected() {
            return Err(MonitorError::Connection("already connected".to_string()));
        }

        let config = self.config.clone();
        let (adapter, peripheral, name) = self.handle.block_on(async {
            let manager = Manager::new().await?;
            let adapter = manager
                .adapters()
                .await?
                .into_iter()
                .next()
                .ok_or_else(|| {
                    MonitorError::Connection("no Bluetooth adapter available".to_string())
                })?;

            let (peripheral, name) = self.discover(&adapter).await?;

            tokio::time::timeout(config.connect_timeout(), peripheral.connect())
                .await
                .map_err(|_| {
                    MonitorError::Connection(format!(
                        "connect to {} timed out after {}s",
                        name, config.connect_timeout_secs
                    ))
                })??;
            peripheral
                .discover_services()
                .await
                .map_err(MonitorError::from)
                .with_context(|| format!("service discovery on {} failed", name))?;

            Ok::<_, MonitorError>((adapter, peripheral, name))
        })?;

        let notify_char = Self::find_characteristic(&peripheral, self.config.notify_characteristic)
            .ok_or_else(|| {
                MonitorError::Connection(format!(
                    "notify characteristic {} not found",
                    self.config.notify_characteristic
                ))
            })?;
        let write_char = Self::find_characteristic(&peripheral, self.config.write_characteristic);

        self.handle.block_on(async {
            peripheral
                .subscribe(&notify_char)
                .await
                .map_err(MonitorError::from)
                .context("notify subscription failed")?;
            if let Some(write_char) = &write_char {
                peripheral
                    .write(write_char, START_COMMAND, WriteType::WithoutResponse)
                    .await?;
            } else {
                tracing::warn!("write characteristic not found, streaming without START");
            }
            Ok::<_, MonitorError>(())
        })?;

        self.active = Arc::new(AtomicBool::new(true));
        self.spawn_forwarders(adapter, peripheral.clone(), write_char)?;

        let identifier = format!("{} ({})", name, peripheral.id());
        tracing::info!(%identifier, "BLE transport connected");
        self.identifier = Some(identifier);
        self.peripheral = Some(peripheral);
        Ok(())
    }

    fn disconnect(&mut self) {
        self.active.store(false, Ordering::SeqCst);
        for task in self.tasks.drain(..) {
            task.abort();
        }
        if let Some(peripheral) = self.peripheral.take() {
            let result = self.handle.block_on(async { peripheral.disconnect().await });
            if let Err(e) = result {
                tracing::debug!("BLE disconnect returned error: {}", e);
            }
            tracing::info!("BLE transport disconnected");
        }
        self.identifier = None;
    }

    fn is_connected(&self) -> bool {
        self.peripheral.is_some() && self.active.load(Ordering::SeqCst)
    }

    fn identifier(&self) -> Option<String> {
        self.identifier.clone()
    }

    fn events(&self) -> &Receiver<TransportEvent> {
        &self.event_rx
    }
}

impl Drop for BleTransport {
    fn drop(&mut self) {
        self.disconnect();
    }
}

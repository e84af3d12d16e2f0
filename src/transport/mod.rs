//! Sensor transport abstraction
//!
//! Two interchangeable links deliver tilt frames to the session core:
//!
//! - [`BleTransport`] - direct Bluetooth LE link to the sensor, delivering
//!   raw text frames from a notification characteristic
//! - [`RelayTransport`] - WebSocket client to a local bridge that has
//!   already decoded the frames into numeric angles
//!
//! Both push [`TransportEvent`]s into a bounded crossbeam channel that the
//! backend worker drains, so the downstream pipeline is transport-agnostic.
//! A scripted [`MockTransport`] serves tests and hardware-free demos.
//!
//! After a transport reports [`TransportEvent::ConnectionLost`] it is fully
//! torn down: no further frames arrive and reconnection requires a fresh
//! `connect()`.

pub mod ble;
pub mod mock;
pub mod relay;

pub use ble::BleTransport;
pub use mock::{MockInjector, MockTransport};
pub use relay::RelayTransport;

use crossbeam_channel::{bounded, Receiver, Sender};

use crate::error::Result;
use crate::types::Reading;

/// Capacity of the transport event channel. Frames beyond this are dropped
/// under backpressure; connection-loss notices always get through.
const EVENT_CHANNEL_CAPACITY: usize = 512;

/// Which transport to use for a connection attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportChoice {
    /// Direct Bluetooth LE link
    #[default]
    Direct,
    /// WebSocket relay bridge
    Relay,
}

impl std::fmt::Display for TransportChoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportChoice::Direct => write!(f, "Bluetooth LE"),
            TransportChoice::Relay => write!(f, "WebSocket relay"),
        }
    }
}

/// Event pushed by a transport into the worker's event channel
#[derive(Debug, Clone)]
pub enum TransportEvent {
    /// Raw text payload from the direct link; needs frame decoding
    RawFrame(Vec<u8>),
    /// Pre-decoded sample from the relay link
    Reading {
        reading: Reading,
        /// Sensor identifier carried in the relay payload, if any
        sensor_id: Option<String>,
    },
    /// The link dropped without a disconnect request. The transport is
    /// already torn down when this arrives.
    ConnectionLost(String),
}

/// Common capability set of all sensor links.
///
/// `connect` is synchronous from the caller's point of view (the worker
/// thread); implementations run their async I/O on a shared tokio runtime
/// and block on it. `disconnect` is idempotent and always safe to call.
pub trait SensorTransport: Send {
    /// Establish the link. On failure the transport stays disconnected
    /// and the error carries a human-readable cause.
    fn connect(&mut self) -> Result<()>;

    /// Tear the link down, cancelling all event forwarding. Safe to call
    /// repeatedly or when already disconnected.
    fn disconnect(&mut self);

    /// True while the link is up
    fn is_connected(&self) -> bool;

    /// Device or bridge identifier for display, once connected
    fn identifier(&self) -> Option<String>;

    /// The event stream this transport feeds
    fn events(&self) -> &Receiver<TransportEvent>;
}

/// Create the event channel pair shared by all transport implementations
pub(crate) fn event_channel() -> (Sender<TransportEvent>, Receiver<TransportEvent>) {
    bounded(EVENT_CHANNEL_CAPACITY)
}

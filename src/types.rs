//! Core data types for the posture monitor
//!
//! This module contains the fundamental data structures shared between the
//! transports, the session state machine, and the frontend.
//!
//! # Main Types
//!
//! - [`Reading`] - A single two-axis tilt sample in degrees
//! - [`Baseline`] - The user-captured reference posture
//! - [`Sample`] - A timestamped reading as stored in the sliding window
//! - [`ConnectionStatus`] - Link state surfaced to the UI

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// A single two-axis tilt reading from the sensor, in signed degrees.
///
/// `y_angle` is the forward/backward axis, `x_angle` the left/right axis.
/// One reading is produced per received frame and overwrites the previous
/// "current reading"; it is additionally appended to the sample window
/// while a measurement is running.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Forward/backward tilt in degrees
    pub y_angle: f64,
    /// Left/right tilt in degrees
    pub x_angle: f64,
}

impl Reading {
    /// Create a new reading
    pub fn new(y_angle: f64, x_angle: f64) -> Self {
        Self { y_angle, x_angle }
    }
}

impl std::fmt::Display for Reading {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Y: {:.2}°, X: {:.2}°", self.y_angle, self.x_angle)
    }
}

/// The reference posture captured by an explicit calibration action.
///
/// Exactly one baseline exists per connected session; it is cleared on
/// disconnect. All deviation classification is relative to this point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Baseline {
    /// Reference forward/backward angle in degrees
    pub ref_y: f64,
    /// Reference left/right angle in degrees
    pub ref_x: f64,
}

impl Baseline {
    /// Capture a baseline from the current reading
    pub fn from_reading(reading: Reading) -> Self {
        Self {
            ref_y: reading.y_angle,
            ref_x: reading.x_angle,
        }
    }
}

/// A timestamped reading as stored in the sliding window and exported to CSV
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    /// Local wall-clock time the sample arrived at the client
    pub timestamp: DateTime<Local>,
    /// Forward/backward tilt in degrees
    pub y_angle: f64,
    /// Left/right tilt in degrees
    pub x_angle: f64,
}

impl Sample {
    /// Create a sample from a reading, stamped with the current local time
    pub fn now(reading: Reading) -> Self {
        Self {
            timestamp: Local::now(),
            y_angle: reading.y_angle,
            x_angle: reading.x_angle,
        }
    }

    /// Create a sample with an explicit timestamp
    pub fn at(timestamp: DateTime<Local>, reading: Reading) -> Self {
        Self {
            timestamp,
            y_angle: reading.y_angle,
            x_angle: reading.x_angle,
        }
    }
}

/// Represents the connection status of the sensor link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    /// Not connected to any sensor
    #[default]
    Disconnected,
    /// Attempting to connect
    Connecting,
    /// Connected and receiving frames
    Connected,
    /// Connection attempt failed
    Error,
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionStatus::Disconnected => write!(f, "Disconnected"),
            ConnectionStatus::Connecting => write!(f, "Connecting..."),
            ConnectionStatus::Connected => write!(f, "Connected"),
            ConnectionStatus::Error => write!(f, "Error"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_baseline_from_reading() {
        let baseline = Baseline::from_reading(Reading::new(2.5, -1.25));
        assert_eq!(baseline.ref_y, 2.5);
        assert_eq!(baseline.ref_x, -1.25);
    }

    #[test]
    fn test_reading_display() {
        let reading = Reading::new(1.5, -0.5);
        assert_eq!(reading.to_string(), "Y: 1.50°, X: -0.50°");
    }
}

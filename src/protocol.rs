//! Wire frame decoder for the direct sensor link
//!
//! The sensor streams UTF-8 text frames over a notification characteristic.
//! A data frame carries the marker `N:` followed by two colon-separated
//! base-10 integers, the Y and X tilt angles in centidegrees:
//!
//! ```text
//! N:<y_centideg>:<x_centideg>
//! ```
//!
//! Anything before the marker is ignored. The wire carries framing noise
//! between data frames, so a payload that does not decode is *not* an
//! error: it is discarded silently and only counted for diagnostics.
//!
//! Splitting policy: the body must contain exactly two fields. Payloads
//! with extra separators are rejected rather than truncated, so a corrupt
//! frame can never silently produce a wrong angle.

use crate::types::Reading;

/// Marker substring identifying a data frame
const FRAME_MARKER: &str = "N:";

/// Field separator inside the frame body
const FIELD_SEPARATOR: char = ':';

/// Wire angles are centidegrees transmitted as integers; they must fit a
/// signed 16-bit register on the sensor. Values outside this range are
/// treated as corruption.
const WIRE_MIN: i32 = i16::MIN as i32;
const WIRE_MAX: i32 = i16::MAX as i32;

/// Divisor converting centidegrees to degrees
const CENTIDEGREE_SCALE: f64 = 100.0;

/// Decoder for raw text frames from the direct transport.
///
/// Stateless apart from a malformed-frame counter, which makes decode
/// noise observable without ever surfacing it to the user.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    frames_decoded: u64,
    frames_malformed: u64,
}

impl FrameDecoder {
    /// Create a new decoder
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode raw notification bytes into a reading.
    ///
    /// Returns `None` for anything that is not a well-formed data frame:
    /// invalid UTF-8, missing marker, wrong field count, non-integer
    /// fields, or out-of-range wire values.
    pub fn decode_bytes(&mut self, payload: &[u8]) -> Option<Reading> {
        match std::str::from_utf8(payload) {
            Ok(text) => self.decode(text),
            Err(_) => {
                self.record_malformed(payload);
                None
            }
        }
    }

    /// Decode a raw text payload into a reading.
    pub fn decode(&mut self, payload: &str) -> Option<Reading> {
        match decode_frame(payload) {
            Some(reading) => {
                self.frames_decoded += 1;
                Some(reading)
            }
            None => {
                // A payload without the marker is ordinary inter-frame
                // noise; only marker-bearing payloads that fail to parse
                // are worth counting.
                if payload.contains(FRAME_MARKER) {
                    self.record_malformed(payload.as_bytes());
                }
                None
            }
        }
    }

    /// Number of frames successfully decoded
    pub fn frames_decoded(&self) -> u64 {
        self.frames_decoded
    }

    /// Number of marker-bearing payloads that failed to decode
    pub fn frames_malformed(&self) -> u64 {
        self.frames_malformed
    }

    /// Reset both counters
    pub fn reset_counters(&mut self) {
        self.frames_decoded = 0;
        self.frames_malformed = 0;
    }

    fn record_malformed(&mut self, payload: &[u8]) {
        self.frames_malformed += 1;
        tracing::debug!(
            payload = %String::from_utf8_lossy(payload),
            total = self.frames_malformed,
            "discarded malformed frame"
        );
    }
}

/// Decode a single text payload into a reading.
///
/// Pure function behind [`FrameDecoder::decode`]; exposed for tests and
/// for callers that do not need the diagnostic counters.
pub fn decode_frame(payload: &str) -> Option<Reading> {
    let marker_pos = payload.find(FRAME_MARKER)?;
    let body = &payload[marker_pos + FRAME_MARKER.len()..];

    let mut fields = body.split(FIELD_SEPARATOR);
    let y_field = fields.next()?;
    let x_field = fields.next()?;
    if fields.next().is_some() {
        // More than two fields: reject rather than guess.
        return None;
    }

    let y_raw = parse_wire_value(y_field)?;
    let x_raw = parse_wire_value(x_field)?;

    Some(Reading::new(
        y_raw as f64 / CENTIDEGREE_SCALE,
        x_raw as f64 / CENTIDEGREE_SCALE,
    ))
}

/// Parse one centidegree field, enforcing the signed 16-bit wire range
fn parse_wire_value(field: &str) -> Option<i32> {
    let value: i32 = field.trim().parse().ok()?;
    if (WIRE_MIN..=WIRE_MAX).contains(&value) {
        Some(value)
    } else {
        None
    }
}

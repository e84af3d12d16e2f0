//! Posture deviation classifier
//!
//! Maps a live reading against the calibrated baseline to a graded severity
//! zone per axis and a natural-language feedback message. Classification is
//! a pure function of its inputs: the severity zones and the message class
//! are deterministic, while the message *text* is drawn from a fixed pool
//! per zone through an injectable index picker so that tests can pin the
//! selection and the UI gets varied phrasing at a steady severity.

use crate::error::{MonitorError, Result};
use crate::types::{Baseline, Reading};

/// Y-axis (forward/backward) zone thresholds in degrees, inclusive
pub const Y_NOTICEABLE_DEG: f64 = 15.0;
pub const Y_SLIGHT_DEG: f64 = 7.0;

/// X-axis (left/right) zone thresholds in degrees, inclusive
pub const X_NOTICEABLE_DEG: f64 = 10.0;
pub const X_SLIGHT_DEG: f64 = 5.0;

/// Graded deviation magnitude within a direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Past the lower threshold but short of the upper one
    Slight,
    /// At or past the upper threshold
    Noticeable,
}

/// Forward/backward deviation zone for the Y axis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YZone {
    /// Within tolerance
    Neutral,
    /// Leaning forward (positive deviation)
    Forward(Severity),
    /// Leaning backward (negative deviation)
    Backward(Severity),
}

/// Left/right deviation zone for the X axis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XZone {
    /// Within tolerance
    Neutral,
    /// Leaning right (positive deviation)
    Right(Severity),
    /// Leaning left (negative deviation)
    Left(Severity),
}

/// Severity class of the combined feedback message, used by the UI to
/// pick the banner color
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackClass {
    /// Both axes within tolerance
    Success,
    /// At least one axis slightly off, none noticeably
    Warning,
    /// At least one axis noticeably off
    Error,
}

/// Result of one classifier evaluation
#[derive(Debug, Clone, PartialEq)]
pub struct Feedback {
    /// Forward/backward zone
    pub y_zone: YZone,
    /// Left/right zone
    pub x_zone: XZone,
    /// Combined feedback text (space-joined when both axes trigger)
    pub message: String,
    /// Severity class of the message
    pub class: FeedbackClass,
}

// Message pools per zone. Ordered tables so an injected picker index is
// stable across runs.
const FORWARD_NOTICEABLE: &[&str] = &[
    "You are leaning far forward. Sit back up.",
    "Strong forward lean detected. Straighten your back.",
    "Your head is well ahead of your hips. Pull back.",
];
const FORWARD_SLIGHT: &[&str] = &[
    "You are starting to slouch forward.",
    "Slight forward lean. Check your posture.",
];
const BACKWARD_NOTICEABLE: &[&str] = &[
    "You are leaning far back. Come forward a little.",
    "Strong backward lean detected. Sit upright.",
];
const BACKWARD_SLIGHT: &[&str] = &[
    "You are reclining a bit. Ease forward.",
    "Slight backward lean. Check your posture.",
];
const RIGHT_NOTICEABLE: &[&str] = &[
    "You are tilting hard to the right. Re-center yourself.",
    "Strong right tilt detected. Level your shoulders.",
];
const RIGHT_SLIGHT: &[&str] = &[
    "You are drifting to the right.",
    "Slight right tilt. Square up.",
];
const LEFT_NOTICEABLE: &[&str] = &[
    "You are tilting hard to the left. Re-center yourself.",
    "Strong left tilt detected. Level your shoulders.",
];
const LEFT_SLIGHT: &[&str] = &[
    "You are drifting to the left.",
    "Slight left tilt. Square up.",
];
const AFFIRMATIONS: &[&str] = &[
    "Great posture, keep it up!",
    "Nicely balanced.",
    "Looking good, stay relaxed.",
    "Solid and upright, well done.",
];

/// Index picker for message pools: given the pool length, return an index
/// in `0..len`. Injectable so tests can pin the selection.
pub type MessagePicker<'a> = &'a mut dyn FnMut(usize) -> usize;

/// Classify a reading against the baseline.
///
/// Returns [`MonitorError::BaselineRequired`] when no baseline has been
/// captured. The session state machine guards against that call path, but
/// the classifier refuses on its own rather than inventing a zero
/// reference.
pub fn classify(
    reading: Reading,
    baseline: Option<Baseline>,
    pick: MessagePicker<'_>,
) -> Result<Feedback> {
    let baseline = baseline.ok_or(MonitorError::BaselineRequired)?;

    let diff_y = reading.y_angle - baseline.ref_y;
    let diff_x = reading.x_angle - baseline.ref_x;

    let y_zone = classify_y(diff_y);
    let x_zone = classify_x(diff_x);

    let mut parts: Vec<&'static str> = Vec::with_capacity(2);
    if let Some(pool) = y_pool(y_zone) {
        parts.push(pick_from(pool, pick));
    }
    if let Some(pool) = x_pool(x_zone) {
        parts.push(pick_from(pool, pick));
    }

    let class = message_class(y_zone, x_zone);
    let message = if parts.is_empty() {
        pick_from(AFFIRMATIONS, pick).to_string()
    } else {
        parts.join(" ")
    };

    Ok(Feedback {
        y_zone,
        x_zone,
        message,
        class,
    })
}

/// Zone for a Y-axis deviation in degrees. Thresholds are inclusive and
/// noticeable outranks slight.
pub fn classify_y(diff_y: f64) -> YZone {
    if diff_y >= Y_NOTICEABLE_DEG {
        YZone::Forward(Severity::Noticeable)
    } else if diff_y >= Y_SLIGHT_DEG {
        YZone::Forward(Severity::Slight)
    } else if diff_y <= -Y_NOTICEABLE_DEG {
        YZone::Backward(Severity::Noticeable)
    } else if diff_y <= -Y_SLIGHT_DEG {
        YZone::Backward(Severity::Slight)
    } else {
        YZone::Neutral
    }
}

/// Zone for an X-axis deviation in degrees
pub fn classify_x(diff_x: f64) -> XZone {
    if diff_x >= X_NOTICEABLE_DEG {
        XZone::Right(Severity::Noticeable)
    } else if diff_x >= X_SLIGHT_DEG {
        XZone::Right(Severity::Slight)
    } else if diff_x <= -X_NOTICEABLE_DEG {
        XZone::Left(Severity::Noticeable)
    } else if diff_x <= -X_SLIGHT_DEG {
        XZone::Left(Severity::Slight)
    } else {
        XZone::Neutral
    }
}

fn y_pool(zone: YZone) -> Option<&'static [&'static str]> {
    match zone {
        YZone::Neutral => None,
        YZone::Forward(Severity::Noticeable) => Some(FORWARD_NOTICEABLE),
        YZone::Forward(Severity::Slight) => Some(FORWARD_SLIGHT),
        YZone::Backward(Severity::Noticeable) => Some(BACKWARD_NOTICEABLE),
        YZone::Backward(Severity::Slight) => Some(BACKWARD_SLIGHT),
    }
}

fn x_pool(zone: XZone) -> Option<&'static [&'static str]> {
    match zone {
        XZone::Neutral => None,
        XZone::Right(Severity::Noticeable) => Some(RIGHT_NOTICEABLE),
        XZone::Right(Severity::Slight) => Some(RIGHT_SLIGHT),
        XZone::Left(Severity::Noticeable) => Some(LEFT_NOTICEABLE),
        XZone::Left(Severity::Slight) => Some(LEFT_SLIGHT),
    }
}

fn pick_from(pool: &'static [&'static str], pick: MessagePicker<'_>) -> &'static str {
    let index = pick(pool.len()).min(pool.len() - 1);
    pool[index]
}

fn message_class(y_zone: YZone, x_zone: XZone) -> FeedbackClass {
    let severities = [y_severity(y_zone), x_severity(x_zone)];
    if severities.contains(&Some(Severity::Noticeable)) {
        FeedbackClass::Error
    } else if severities.contains(&Some(Severity::Slight)) {
        FeedbackClass::Warning
    } else {
        FeedbackClass::Success
    }
}

fn y_severity(zone: YZone) -> Option<Severity> {
    match zone {
        YZone::Neutral => None,
        YZone::Forward(s) | YZone::Backward(s) => Some(s),
    }
}

fn x_severity(zone: XZone) -> Option<Severity> {
    match zone {
        XZone::Neutral => None,
        XZone::Right(s) | XZone::Left(s) => Some(s),
    }
}

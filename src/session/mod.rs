//! Session state machine
//!
//! Owns everything that lives and dies with one sensor connection: the
//! phase, the calibrated baseline, the current reading, the displayed
//! identifier, and the sliding sample window. All mutation goes through
//! guarded transition operations; there is no raw flag access, so invalid
//! combinations (feedback active while not measuring, measuring without a
//! baseline) cannot be represented.
//!
//! Guard violations return [`MonitorError::InvalidTransition`]. The UI
//! disables the corresponding buttons so these paths are normally
//! unreachable, but the machine rejects them defensively and the caller
//! logs them as no-ops.

mod export;
mod window;

pub use export::{window_to_csv, write_csv, CSV_HEADER};
pub use window::{SampleWindow, DEFAULT_WINDOW_CAPACITY};

use crate::classifier::{classify, Feedback, MessagePicker};
use crate::error::{MonitorError, Result};
use crate::types::{Baseline, Reading};

/// Lifecycle phase of a monitoring session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// No transport active
    #[default]
    Idle,
    /// Transport up, no baseline captured yet
    Connected,
    /// Baseline captured, ready to measure
    Calibrated,
    /// Sample window accumulating
    Measuring,
    /// Measuring with the classifier active
    MeasuringWithFeedback,
}

impl Phase {
    /// Short name for logs and error messages
    pub fn name(&self) -> &'static str {
        match self {
            Phase::Idle => "Idle",
            Phase::Connected => "Connected",
            Phase::Calibrated => "Calibrated",
            Phase::Measuring => "Measuring",
            Phase::MeasuringWithFeedback => "Measuring+Feedback",
        }
    }

    /// True in any phase with an active transport
    pub fn is_connected(&self) -> bool {
        !matches!(self, Phase::Idle)
    }

    /// True while the sample window is accumulating
    pub fn is_measuring(&self) -> bool {
        matches!(self, Phase::Measuring | Phase::MeasuringWithFeedback)
    }

    /// True while the classifier runs on every frame
    pub fn feedback_active(&self) -> bool {
        matches!(self, Phase::MeasuringWithFeedback)
    }
}

/// State for one monitoring session
#[derive(Debug)]
pub struct Session {
    phase: Phase,
    baseline: Option<Baseline>,
    current: Option<Reading>,
    identifier: Option<String>,
    window: SampleWindow,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_CAPACITY)
    }
}

impl Session {
    /// Create an idle session with the given window capacity
    pub fn new(window_capacity: usize) -> Self {
        Self {
            phase: Phase::Idle,
            baseline: None,
            current: None,
            identifier: None,
            window: SampleWindow::new(window_capacity),
        }
    }

    /// Current lifecycle phase
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// The calibrated baseline, if captured
    pub fn baseline(&self) -> Option<Baseline> {
        self.baseline
    }

    /// The most recent reading, if any has arrived
    pub fn current_reading(&self) -> Option<Reading> {
        self.current
    }

    /// The device/bridge identifier surfaced to the UI
    pub fn identifier(&self) -> Option<&str> {
        self.identifier.as_deref()
    }

    /// The sliding sample window
    pub fn window(&self) -> &SampleWindow {
        &self.window
    }

    /// Transport established: `Idle -> Connected`.
    pub fn connected(&mut self, identifier: impl Into<String>) -> Result<()> {
        if self.phase != Phase::Idle {
            return Err(self.rejected("connect"));
        }
        self.identifier = Some(identifier.into());
        self.phase = Phase::Connected;
        tracing::info!(id = self.identifier.as_deref(), "session connected");
        Ok(())
    }

    /// Capture the current reading as the baseline:
    /// `Connected/Calibrated -> Calibrated`. Requires at least one frame
    /// to have arrived.
    pub fn calibrate(&mut self) -> Result<Baseline> {
        if !matches!(self.phase, Phase::Connected | Phase::Calibrated) {
            return Err(self.rejected("calibrate"));
        }
        let Some(reading) = self.current else {
            return Err(MonitorError::InvalidTransition {
                action: "calibrate",
                phase: "awaiting first reading",
            });
        };
        let baseline = Baseline::from_reading(reading);
        self.baseline = Some(baseline);
        self.phase = Phase::Calibrated;
        tracing::info!(ref_y = baseline.ref_y, ref_x = baseline.ref_x, "baseline captured");
        Ok(baseline)
    }

    /// Begin accumulating samples: `Calibrated -> Measuring`.
    /// Clears the window.
    pub fn start_measurement(&mut self) -> Result<()> {
        if self.phase != Phase::Calibrated {
            return Err(self.rejected("startMeasurement"));
        }
        debug_assert!(self.baseline.is_some());
        self.window.clear();
        self.phase = Phase::Measuring;
        tracing::info!("measurement started");
        Ok(())
    }

    /// Stop accumulating: `Measuring(+Feedback) -> Calibrated`. The window
    /// is left intact for export until the next start or disconnect.
    pub fn end_measurement(&mut self) -> Result<&SampleWindow> {
        if !self.phase.is_measuring() {
            return Err(self.rejected("endMeasurement"));
        }
        self.phase = Phase::Calibrated;
        tracing::info!(samples = self.window.len(), "measurement ended");
        Ok(&self.window)
    }

    /// Toggle feedback while measuring. Turning feedback on evaluates the
    /// classifier once against the current reading rather than waiting
    /// for the next frame.
    pub fn set_feedback(&mut self, on: bool, pick: MessagePicker<'_>) -> Result<Option<Feedback>> {
        if !self.phase.is_measuring() {
            return Err(self.rejected(if on { "feedbackOn" } else { "feedbackOff" }));
        }
        if on {
            self.phase = Phase::MeasuringWithFeedback;
            match self.current {
                Some(reading) => classify(reading, self.baseline, pick).map(Some),
                None => Ok(None),
            }
        } else {
            self.phase = Phase::Measuring;
            Ok(None)
        }
    }

    /// Feed one decoded reading through the session. Always updates the
    /// current reading; appends to the window while measuring; runs the
    /// classifier while feedback is active.
    pub fn push_reading(&mut self, reading: Reading, pick: MessagePicker<'_>) -> Result<Option<Feedback>> {
        self.current = Some(reading);
        if self.phase.is_measuring() {
            self.window.append(reading);
        }
        if self.phase.feedback_active() {
            classify(reading, self.baseline, pick).map(Some)
        } else {
            Ok(None)
        }
    }

    /// Tear down to `Idle` from any phase. Clears the baseline, window,
    /// current reading, and identifier. Idempotent.
    pub fn disconnect(&mut self) {
        if self.phase != Phase::Idle {
            tracing::info!(from = self.phase.name(), "session reset to idle");
        }
        self.phase = Phase::Idle;
        self.baseline = None;
        self.current = None;
        self.identifier = None;
        self.window.clear();
    }

    fn rejected(&self, action: &'static str) -> MonitorError {
        MonitorError::InvalidTransition {
            action,
            phase: self.phase.name(),
        }
    }
}

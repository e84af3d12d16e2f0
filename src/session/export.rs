//! CSV export of a finished measurement
//!
//! Emits the sample window as `Timestamp,Y_Angle,X_Angle` with angles to
//! four decimal places and the timestamp as local time-of-day. Where the
//! text ends up (file, console, clipboard) is the caller's concern.

use std::path::Path;

use crate::error::Result;
use crate::session::SampleWindow;

/// CSV header line
pub const CSV_HEADER: &str = "Timestamp,Y_Angle,X_Angle";

/// Render the window as CSV text, oldest sample first
pub fn window_to_csv(window: &SampleWindow) -> String {
    let mut out = String::with_capacity(32 + window.len() * 32);
    out.push_str(CSV_HEADER);
    out.push('\n');
    for sample in window.iter() {
        out.push_str(&format!(
            "{},{:.4},{:.4}\n",
            sample.timestamp.format("%H:%M:%S"),
            sample.y_angle,
            sample.x_angle,
        ));
    }
    out
}

/// Write the window as CSV to a file
pub fn write_csv(window: &SampleWindow, path: impl AsRef<Path>) -> Result<()> {
    std::fs::write(path.as_ref(), window_to_csv(window))?;
    tracing::info!(path = %path.as_ref().display(), rows = window.len(), "exported measurement CSV");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Reading, Sample};
    use chrono::{Local, TimeZone};

    fn window_with_fixed_samples() -> SampleWindow {
        let mut window = SampleWindow::new(10);
        let t0 = Local.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap();
        let t1 = Local.with_ymd_and_hms(2024, 5, 1, 9, 30, 1).unwrap();
        window.append_sample(Sample::at(t0, Reading::new(1.5, -0.25)));
        window.append_sample(Sample::at(t1, Reading::new(-2.0, 3.125)));
        window
    }

    #[test]
    fn test_csv_header_and_rows() {
        let csv = window_to_csv(&window_with_fixed_samples());
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "Timestamp,Y_Angle,X_Angle");
        assert_eq!(lines[1], "09:30:00,1.5000,-0.2500");
        assert_eq!(lines[2], "09:30:01,-2.0000,3.1250");
    }

    #[test]
    fn test_empty_window_is_header_only() {
        let csv = window_to_csv(&SampleWindow::new(5));
        assert_eq!(csv, "Timestamp,Y_Angle,X_Angle\n");
    }

    #[test]
    fn test_write_csv_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("measurement.csv");
        write_csv(&window_with_fixed_samples(), &path).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with("Timestamp,Y_Angle,X_Angle\n"));
        assert_eq!(contents.lines().count(), 3);
    }
}

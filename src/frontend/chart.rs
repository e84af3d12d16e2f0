//! Live tilt chart rendered with egui_plot
//!
//! Plots both axes of the sample window against seconds since the first
//! sample, with optional horizontal reference lines at the calibrated
//! baseline.

use egui::{Color32, Ui};
use egui_plot::{Corner, HLine, Legend, Line, Plot, PlotPoints};

use crate::session::SampleWindow;
use crate::types::Baseline;

/// Plot configuration for the tilt chart
pub struct TiltChart {
    pub show_y_axis: bool,
    pub show_x_axis: bool,
    pub show_baseline: bool,
}

impl Default for TiltChart {
    fn default() -> Self {
        Self {
            show_y_axis: true,
            show_x_axis: true,
            show_baseline: true,
        }
    }
}

impl TiltChart {
    /// Render the chart from the current window contents
    pub fn render(&self, ui: &mut Ui, window: &SampleWindow, baseline: Option<Baseline>) {
        let points = window.plot_points();

        let plot = Plot::new("tilt_chart")
            .x_axis_label("Time (s)")
            .y_axis_label("Tilt (°)")
            .legend(
                Legend::default()
                    .position(Corner::RightTop)
                    .background_alpha(0.8),
            )
            .show_grid(true);

        plot.show(ui, |plot_ui| {
            if self.show_y_axis {
                let y_points: Vec<[f64; 2]> = points.iter().map(|[t, y, _]| [*t, *y]).collect();
                plot_ui.line(
                    Line::new("Forward/back (Y)", PlotPoints::from(y_points))
                        .color(Color32::from_rgb(100, 160, 255))
                        .width(1.5),
                );
            }
            if self.show_x_axis {
                let x_points: Vec<[f64; 2]> = points.iter().map(|[t, _, x]| [*t, *x]).collect();
                plot_ui.line(
                    Line::new("Left/right (X)", PlotPoints::from(x_points))
                        .color(Color32::from_rgb(255, 160, 100))
                        .width(1.5),
                );
            }
            if self.show_baseline {
                if let Some(baseline) = baseline {
                    plot_ui.hline(
                        HLine::new("Y baseline", baseline.ref_y)
                            .color(Color32::from_rgba_unmultiplied(100, 160, 255, 80))
                            .width(1.0),
                    );
                    plot_ui.hline(
                        HLine::new("X baseline", baseline.ref_x)
                            .color(Color32::from_rgba_unmultiplied(255, 160, 100, 80))
                            .width(1.0),
                    );
                }
            }
        });
    }
}

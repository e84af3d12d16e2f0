//! Bounded sliding window of recent samples
//!
//! Backs the live chart and the end-of-measurement CSV export. Fixed
//! capacity, FIFO eviction: once full, appending drops the oldest sample
//! so the window always holds the most recent `capacity` entries in
//! arrival order.

use std::collections::VecDeque;

use crate::types::{Reading, Sample};

/// Default window capacity in samples
pub const DEFAULT_WINDOW_CAPACITY: usize = 90;

/// Bounded FIFO of timestamped readings
#[derive(Debug, Clone)]
pub struct SampleWindow {
    samples: VecDeque<Sample>,
    capacity: usize,
}

impl Default for SampleWindow {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_CAPACITY)
    }
}

impl SampleWindow {
    /// Create a window with the given capacity (minimum 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a reading stamped with the current local time
    pub fn append(&mut self, reading: Reading) {
        self.append_sample(Sample::now(reading));
    }

    /// Append a pre-stamped sample, evicting the oldest entry when full
    pub fn append_sample(&mut self, sample: Sample) {
        if self.samples.len() >= self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    /// Drop all samples
    pub fn clear(&mut self) {
        self.samples.clear();
    }

    /// Number of samples currently held
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// True when no samples are held
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Maximum number of samples held at once
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Iterate samples oldest-first
    pub fn iter(&self) -> impl Iterator<Item = &Sample> {
        self.samples.iter()
    }

    /// Snapshot the samples oldest-first
    pub fn snapshot(&self) -> Vec<Sample> {
        self.samples.iter().copied().collect()
    }

    /// Chart points as (seconds since first sample, y, x) triples
    pub fn plot_points(&self) -> Vec<[f64; 3]> {
        let Some(first) = self.samples.front() else {
            return Vec::new();
        };
        let origin = first.timestamp;
        self.samples
            .iter()
            .map(|s| {
                let dt = (s.timestamp - origin).num_milliseconds() as f64 / 1000.0;
                [dt, s.y_angle, s.x_angle]
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_append_and_len() {
        let mut window = SampleWindow::new(4);
        assert!(window.is_empty());
        window.append(Reading::new(1.0, 2.0));
        window.append(Reading::new(3.0, 4.0));
        assert_eq!(window.len(), 2);
    }

    #[test]
    fn test_eviction_keeps_last_capacity_entries() {
        let cap = 5;
        let extra = 7;
        let mut window = SampleWindow::new(cap);
        for i in 0..(cap + extra) {
            window.append(Reading::new(i as f64, 0.0));
        }
        assert_eq!(window.len(), cap);
        let first = window.iter().next().unwrap();
        assert_eq!(first.y_angle, extra as f64);
        let last = window.iter().last().unwrap();
        assert_eq!(last.y_angle, (cap + extra - 1) as f64);
    }

    #[test]
    fn test_clear() {
        let mut window = SampleWindow::new(3);
        window.append(Reading::new(1.0, 1.0));
        window.clear();
        assert!(window.is_empty());
        assert_eq!(window.capacity(), 3);
    }

    #[test]
    fn test_zero_capacity_clamped() {
        let window = SampleWindow::new(0);
        assert_eq!(window.capacity(), 1);
    }

    proptest! {
        #[test]
        fn window_never_exceeds_capacity(cap in 1usize..32, appends in 0usize..200) {
            let mut window = SampleWindow::new(cap);
            for i in 0..appends {
                window.append(Reading::new(i as f64, -(i as f64)));
            }
            prop_assert!(window.len() <= cap);
            prop_assert_eq!(window.len(), appends.min(cap));
            // Arrival order preserved.
            let ys: Vec<f64> = window.iter().map(|s| s.y_angle).collect();
            for pair in ys.windows(2) {
                prop_assert!(pair[0] < pair[1]);
            }
        }
    }
}

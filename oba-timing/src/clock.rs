use std::time::Instant;

/// Trial-relative clock. The epoch is reset at each trial's stimulus onset
/// and every timestamp within the trial is milliseconds since that reset.
pub trait Clock {
    fn reset(&mut self);
    fn elapsed_ms(&self) -> f64;
}

/// Instant-backed monotonic clock used by the live application.
#[derive(Debug, Clone)]
pub struct MonotonicClock {
    epoch: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        MonotonicClock {
            epoch: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn reset(&mut self) {
        self.epoch = Instant::now();
    }

    fn elapsed_ms(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64() * 1000.0
    }
}

/// Hand-stepped clock for frame-loop tests.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now_ms: f64,
}

impl ManualClock {
    pub fn new() -> Self {
        ManualClock { now_ms: 0.0 }
    }

    pub fn advance_ms(&mut self, ms: f64) {
        self.now_ms += ms;
    }
}

impl Clock for ManualClock {
    fn reset(&mut self) {
        self.now_ms = 0.0;
    }

    fn elapsed_ms(&self) -> f64 {
        self.now_ms
    }
}

/// Summary statistics over recorded frame intervals.
#[derive(Debug, Clone)]
pub struct FrameStats {
    pub mean_interval_ms: f64,
    pub jitter_ms: f64,
    pub min_interval_ms: f64,
    pub max_interval_ms: f64,
    pub effective_hz: f64,
}

/// Collects frame-to-frame intervals during the pre-flight refresh check.
#[derive(Debug, Clone)]
pub struct FrameMonitor {
    intervals_ms: Vec<f64>,
    max_samples: usize,
}

impl FrameMonitor {
    pub fn new(max_samples: usize) -> Self {
        FrameMonitor {
            intervals_ms: Vec::with_capacity(max_samples),
            max_samples,
        }
    }

    pub fn record_interval(&mut self, ms: f64) {
        if self.intervals_ms.len() >= self.max_samples {
            self.intervals_ms.remove(0);
        }
        self.intervals_ms.push(ms);
    }

    pub fn sample_count(&self) -> usize {
        self.intervals_ms.len()
    }

    pub fn stats(&self) -> FrameStats {
        if self.intervals_ms.is_empty() {
            return FrameStats {
                mean_interval_ms: 0.0,
                jitter_ms: 0.0,
                min_interval_ms: 0.0,
                max_interval_ms: 0.0,
                effective_hz: 0.0,
            };
        }
        let n = self.intervals_ms.len() as f64;
        let mean = self.intervals_ms.iter().sum::<f64>() / n;
        let var = self
            .intervals_ms
            .iter()
            .map(|x| (x - mean).powi(2))
            .sum::<f64>()
            / n;
        let min = self.intervals_ms.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = self
            .intervals_ms
            .iter()
            .cloned()
            .fold(f64::NEG_INFINITY, f64::max);
        FrameStats {
            mean_interval_ms: mean,
            jitter_ms: var.sqrt(),
            min_interval_ms: min,
            max_interval_ms: max,
            effective_hz: if mean > 0.0 { 1000.0 / mean } else { 0.0 },
        }
    }

    /// True when the measured mean interval is within `tolerance` (as a
    /// fraction, e.g. 0.1) of the nominal interval for `refresh_rate`.
    pub fn matches_refresh(&self, refresh_rate: f64, tolerance: f64) -> bool {
        let nominal = 1000.0 / refresh_rate;
        let measured = self.stats().mean_interval_ms;
        measured > 0.0 && ((measured - nominal) / nominal).abs() <= tolerance
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_steps_and_resets() {
        let mut clock = ManualClock::new();
        clock.advance_ms(16.7);
        clock.advance_ms(16.7);
        assert!((clock.elapsed_ms() - 33.4).abs() < 1e-9);
        clock.reset();
        assert_eq!(clock.elapsed_ms(), 0.0);
    }

    #[test]
    fn monitor_accepts_matching_refresh() {
        let mut monitor = FrameMonitor::new(200);
        for _ in 0..120 {
            monitor.record_interval(1000.0 / 60.0);
        }
        assert!(monitor.matches_refresh(60.0, 0.1));
        let stats = monitor.stats();
        assert!((stats.effective_hz - 60.0).abs() < 0.01);
        assert!(stats.jitter_ms < 1e-9);
    }

    #[test]
    fn monitor_rejects_mismatched_refresh() {
        let mut monitor = FrameMonitor::new(200);
        for _ in 0..120 {
            // 30 Hz intervals against a 60 Hz expectation
            monitor.record_interval(1000.0 / 30.0);
        }
        assert!(!monitor.matches_refresh(60.0, 0.1));
    }

    #[test]
    fn monitor_caps_samples() {
        let mut monitor = FrameMonitor::new(10);
        for i in 0..50 {
            monitor.record_interval(i as f64);
        }
        assert_eq!(monitor.sample_count(), 10);
    }
}

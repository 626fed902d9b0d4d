use std::sync::Mutex;

/// Counters shared between a stream loop and its dispatch worker.
pub struct MetricsRecorder {
    inner: Mutex<MetricsSnapshot>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub cycles: u64,
    pub candidates: u64,
    pub events: u64,
    pub background_samples: u64,
    pub capture_failures: u64,
    pub malformed_detections: u64,
    pub persistence_failures: u64,
    pub dispatch_attempts: u64,
    pub dispatch_failures: u64,
    /// Clips kept locally because the upload queue was full or shutting down.
    pub dispatches_dropped: u64,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MetricsSnapshot::default()),
        }
    }

    fn update(&self, apply: impl FnOnce(&mut MetricsSnapshot)) {
        if let Ok(mut metrics) = self.inner.lock() {
            apply(&mut metrics);
        }
    }

    pub fn record_cycle(&self) {
        self.update(|m| m.cycles += 1);
    }

    pub fn record_candidates(&self, count: usize) {
        self.update(|m| m.candidates += count as u64);
    }

    pub fn record_event(&self) {
        self.update(|m| m.events += 1);
    }

    pub fn record_background(&self) {
        self.update(|m| m.background_samples += 1);
    }

    pub fn record_capture_failure(&self) {
        self.update(|m| m.capture_failures += 1);
    }

    pub fn record_malformed(&self) {
        self.update(|m| m.malformed_detections += 1);
    }

    pub fn record_persistence_failure(&self) {
        self.update(|m| m.persistence_failures += 1);
    }

    pub fn record_dispatch(&self, succeeded: bool) {
        self.update(|m| {
            m.dispatch_attempts += 1;
            if !succeeded {
                m.dispatch_failures += 1;
            }
        });
    }

    pub fn record_dispatch_dropped(&self, count: u64) {
        self.update(|m| m.dispatches_dropped += count);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        self.inner.lock().map(|m| *m).unwrap_or_default()
    }
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatch_failures_count_as_attempts() {
        let metrics = MetricsRecorder::new();
        metrics.record_dispatch(true);
        metrics.record_dispatch(false);
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.dispatch_attempts, 2);
        assert_eq!(snapshot.dispatch_failures, 1);
        assert_eq!(snapshot.dispatches_dropped, 0);
    }
}

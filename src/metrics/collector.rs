//! Metrics collection and registry.

use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};
use thiserror::Error;

/// Errors that can occur during metrics operations.
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),
}

/// What released a pending capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerSource {
    /// The auto-focus completion callback.
    Focus,
    /// The fallback timer.
    Fallback,
}

impl TriggerSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerSource::Focus => "focus",
            TriggerSource::Fallback => "fallback",
        }
    }
}

/// Prometheus metrics registry for the capture pipeline.
pub struct CaptureMetrics {
    registry: Registry,

    // Protocol metrics
    requests_total: IntCounter,
    ignored_total: IntCounter,
    focus_triggers_total: IntCounter,
    fallback_triggers_total: IntCounter,
    focus_failures_total: IntCounter,

    // Persist metrics
    artifacts_stored_total: IntCounter,
    persist_failures_total: IntCounter,
    capture_in_flight: IntGauge,
}

impl CaptureMetrics {
    /// Creates a new registry with all capture metrics registered.
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let requests_total = IntCounter::new(
            "still_capture_requests_total",
            "Capture calls that armed the focus/fallback race",
        )?;
        let ignored_total = IntCounter::new(
            "still_capture_ignored_total",
            "Capture calls ignored because a capture was already pending",
        )?;
        let focus_triggers_total = IntCounter::new(
            "still_capture_focus_triggers_total",
            "Captures released by auto-focus completion",
        )?;
        let fallback_triggers_total = IntCounter::new(
            "still_capture_fallback_triggers_total",
            "Captures released by the fallback timer",
        )?;
        let focus_failures_total = IntCounter::new(
            "still_capture_focus_failures_total",
            "Auto-focus requests rejected by the hardware",
        )?;
        let artifacts_stored_total = IntCounter::new(
            "still_capture_artifacts_stored_total",
            "Artifacts written to storage",
        )?;
        let persist_failures_total = IntCounter::new(
            "still_capture_persist_failures_total",
            "Frames that could not be decoded or stored",
        )?;
        let capture_in_flight = IntGauge::new(
            "still_capture_in_flight",
            "Whether a capture is in flight (1) or not (0)",
        )?;

        registry.register(Box::new(requests_total.clone()))?;
        registry.register(Box::new(ignored_total.clone()))?;
        registry.register(Box::new(focus_triggers_total.clone()))?;
        registry.register(Box::new(fallback_triggers_total.clone()))?;
        registry.register(Box::new(focus_failures_total.clone()))?;
        registry.register(Box::new(artifacts_stored_total.clone()))?;
        registry.register(Box::new(persist_failures_total.clone()))?;
        registry.register(Box::new(capture_in_flight.clone()))?;

        Ok(Self {
            registry,
            requests_total,
            ignored_total,
            focus_triggers_total,
            fallback_triggers_total,
            focus_failures_total,
            artifacts_stored_total,
            persist_failures_total,
            capture_in_flight,
        })
    }

    pub fn record_request(&self) {
        self.requests_total.inc();
    }

    pub fn record_ignored(&self) {
        self.ignored_total.inc();
    }

    /// Records which side of the race released the capture.
    pub fn record_trigger(&self, source: TriggerSource) {
        match source {
            TriggerSource::Focus => self.focus_triggers_total.inc(),
            TriggerSource::Fallback => self.fallback_triggers_total.inc(),
        }
        self.capture_in_flight.set(1);
    }

    pub fn record_focus_failure(&self) {
        self.focus_failures_total.inc();
    }

    /// Records the end of a persist attempt.
    pub fn record_persisted(&self, stored: bool) {
        if stored {
            self.artifacts_stored_total.inc();
        } else {
            self.persist_failures_total.inc();
        }
        self.capture_in_flight.set(0);
    }

    /// Marks the in-flight capture as finished without a persist attempt.
    pub fn record_abandoned(&self) {
        self.capture_in_flight.set(0);
    }

    /// Returns the underlying Prometheus registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Encodes all metrics in Prometheus text format.
    pub fn encode(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

impl std::fmt::Debug for CaptureMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureMetrics")
            .field("requests", &self.requests_total.get())
            .field("stored", &self.artifacts_stored_total.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_creation() {
        assert!(CaptureMetrics::new().is_ok());
    }

    #[test]
    fn test_trigger_and_persist_update_gauge() {
        let metrics = CaptureMetrics::new().unwrap();

        metrics.record_request();
        metrics.record_trigger(TriggerSource::Fallback);
        let output = metrics.encode().unwrap();
        assert!(output.contains("still_capture_fallback_triggers_total 1"));
        assert!(output.contains("still_capture_in_flight 1"));

        metrics.record_persisted(true);
        let output = metrics.encode().unwrap();
        assert!(output.contains("still_capture_artifacts_stored_total 1"));
        assert!(output.contains("still_capture_in_flight 0"));
    }

    #[test]
    fn test_metrics_encode() {
        let metrics = CaptureMetrics::new().unwrap();
        let output = metrics.encode().unwrap();

        assert!(output.contains("still_capture_requests_total"));
        assert!(output.contains("still_capture_focus_failures_total"));
        assert!(output.contains("still_capture_persist_failures_total"));
    }
}

//! Prometheus metrics for the authorization manager
//!
//! Counters and the latency histogram are atomics owned by the `prometheus`
//! crate, so recording never blocks concurrent evaluations.

use crate::error::Result;
use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, Opts, Registry, TextEncoder};
use std::sync::Arc;
use std::time::Duration;

const NAMESPACE: &str = "component_authz";

/// Snapshot of manager counters
#[derive(Debug, Clone, Default)]
pub struct EvaluationMetrics {
    /// Total number of `authorize` calls
    pub total_evaluations: u64,

    /// Evaluations that granted access
    pub granted: u64,

    /// Evaluations that denied access
    pub denied: u64,

    /// Calls with no requirements at all
    pub unrestricted: u64,

    /// Grants that skipped at least one later requirement
    pub short_circuits: u64,

    /// Service calls that hit the evaluation deadline
    pub timeouts: u64,

    /// Evaluations aborted by a cancellation token
    pub cancellations: u64,

    /// Evaluations that named an unregistered policy
    pub configuration_errors: u64,

    /// Evaluations that failed inside a service
    pub service_errors: u64,

    /// Decisions with a recorded latency
    pub latency_samples: u64,

    /// Average latency
    pub avg_latency_ms: f64,
}

impl EvaluationMetrics {
    /// Fraction of decided evaluations that granted access
    pub fn grant_rate(&self) -> f64 {
        let total = self.granted + self.denied;
        if total == 0 {
            0.0
        } else {
            self.granted as f64 / total as f64
        }
    }
}

/// Metrics collector
pub struct ManagerMetrics {
    evaluations: IntCounter,
    granted: IntCounter,
    denied: IntCounter,
    unrestricted: IntCounter,
    short_circuits: IntCounter,
    timeouts: IntCounter,
    cancellations: IntCounter,
    configuration_errors: IntCounter,
    service_errors: IntCounter,

    /// Decision latency in seconds
    latency: Histogram,

    registry: Arc<Registry>,
}

impl ManagerMetrics {
    /// Create a collector with its own Prometheus registry
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let counter = |name: &str, help: &str| -> Result<IntCounter> {
            let counter = IntCounter::with_opts(Opts::new(name, help).namespace(NAMESPACE))?;
            registry.register(Box::new(counter.clone()))?;
            Ok(counter)
        };

        let evaluations = counter("evaluations_total", "Total number of authorization evaluations")?;
        let granted = counter("granted_total", "Evaluations that granted access")?;
        let denied = counter("denied_total", "Evaluations that denied access")?;
        let unrestricted = counter("unrestricted_total", "Evaluations with no requirements")?;
        let short_circuits = counter(
            "short_circuits_total",
            "Grants that skipped later requirements",
        )?;
        let timeouts = counter("timeouts_total", "Service calls that exceeded the deadline")?;
        let cancellations = counter("cancellations_total", "Evaluations aborted by cancellation")?;
        let configuration_errors = counter(
            "configuration_errors_total",
            "Evaluations that named an unregistered policy",
        )?;
        let service_errors = counter("service_errors_total", "Evaluations that failed inside a service")?;

        let latency = Histogram::with_opts(
            HistogramOpts::new("evaluation_latency_seconds", "Authorization decision latency")
                .namespace(NAMESPACE)
                .buckets(vec![
                    0.000_001, 0.000_005, 0.000_01, 0.000_05, 0.000_1, 0.000_5, 0.001, 0.005,
                    0.01, 0.05, 0.1, 0.5, 1.0, 5.0,
                ]),
        )?;
        registry.register(Box::new(latency.clone()))?;

        Ok(Self {
            evaluations,
            granted,
            denied,
            unrestricted,
            short_circuits,
            timeouts,
            cancellations,
            configuration_errors,
            service_errors,
            latency,
            registry: Arc::new(registry),
        })
    }

    /// Record a final decision
    pub fn record_decision(&self, granted: bool) {
        self.evaluations.inc();
        if granted {
            self.granted.inc();
        } else {
            self.denied.inc();
        }
    }

    /// Record a call with no requirements
    pub fn record_unrestricted(&self) {
        self.unrestricted.inc();
        self.record_decision(true);
    }

    pub fn record_short_circuit(&self) {
        self.short_circuits.inc();
    }

    pub fn record_timeout(&self) {
        self.timeouts.inc();
    }

    pub fn record_cancellation(&self) {
        self.cancellations.inc();
    }

    /// Record an evaluation that failed on configuration
    pub fn record_configuration_error(&self) {
        self.evaluations.inc();
        self.configuration_errors.inc();
    }

    /// Record an evaluation that failed inside a service
    pub fn record_service_error(&self) {
        self.evaluations.inc();
        self.service_errors.inc();
    }

    /// Record evaluation latency
    pub fn record_latency(&self, latency: Duration) {
        self.latency.observe(latency.as_secs_f64());
    }

    /// Current snapshot
    pub fn snapshot(&self) -> EvaluationMetrics {
        let latency_samples = self.latency.get_sample_count();
        let avg_latency_ms = if latency_samples == 0 {
            0.0
        } else {
            self.latency.get_sample_sum() * 1000.0 / latency_samples as f64
        };

        EvaluationMetrics {
            total_evaluations: self.evaluations.get(),
            granted: self.granted.get(),
            denied: self.denied.get(),
            unrestricted: self.unrestricted.get(),
            short_circuits: self.short_circuits.get(),
            timeouts: self.timeouts.get(),
            cancellations: self.cancellations.get(),
            configuration_errors: self.configuration_errors.get(),
            service_errors: self.service_errors.get(),
            latency_samples,
            avg_latency_ms,
        }
    }

    /// Prometheus registry holding every collector
    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    /// Export metrics in Prometheus text format
    pub fn export_prometheus(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_decision() {
        let collector = ManagerMetrics::new().unwrap();

        collector.record_decision(true);
        collector.record_decision(false);
        collector.record_unrestricted();

        let metrics = collector.snapshot();
        assert_eq!(metrics.total_evaluations, 3);
        assert_eq!(metrics.granted, 2);
        assert_eq!(metrics.denied, 1);
        assert_eq!(metrics.unrestricted, 1);
        assert!((metrics.grant_rate() - 0.666).abs() < 0.01);
    }

    #[test]
    fn test_record_errors() {
        let collector = ManagerMetrics::new().unwrap();

        collector.record_configuration_error();
        collector.record_service_error();

        let metrics = collector.snapshot();
        assert_eq!(metrics.total_evaluations, 2);
        assert_eq!(metrics.granted + metrics.denied, 0);
        assert_eq!(metrics.grant_rate(), 0.0);
    }

    #[test]
    fn test_record_latency() {
        let collector = ManagerMetrics::new().unwrap();

        collector.record_latency(Duration::from_millis(5));
        collector.record_latency(Duration::from_millis(10));
        collector.record_latency(Duration::from_millis(15));

        let metrics = collector.snapshot();
        assert_eq!(metrics.latency_samples, 3);
        assert!((metrics.avg_latency_ms - 10.0).abs() < 0.5);
    }

    #[test]
    fn test_prometheus_export() {
        let collector = ManagerMetrics::new().unwrap();
        collector.record_decision(true);
        collector.record_latency(Duration::from_micros(30));

        let text = collector.export_prometheus().unwrap();
        assert!(text.contains("component_authz_evaluations_total 1"));
        assert!(text.contains("component_authz_granted_total 1"));
        assert!(text.contains("component_authz_evaluation_latency_seconds_count 1"));
        assert!(text.contains("# TYPE component_authz_evaluation_latency_seconds histogram"));
    }

    #[test]
    fn test_collectors_are_independent() {
        let first = ManagerMetrics::new().unwrap();
        let second = ManagerMetrics::new().unwrap();

        first.record_timeout();
        assert_eq!(first.snapshot().timeouts, 1);
        assert_eq!(second.snapshot().timeouts, 0);
    }
}

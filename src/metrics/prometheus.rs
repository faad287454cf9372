use std::time::Duration;

use prometheus::{
    Encoder, GaugeVec, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};

use crate::config::WaitKind;

/// How a wait ended
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WaitOutcome {
    Converged,
    Failed,
    Timeout,
}

impl WaitOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            WaitOutcome::Converged => "converged",
            WaitOutcome::Failed => "failed",
            WaitOutcome::Timeout => "timeout",
        }
    }
}

/// Prometheus metrics state for a harness run
pub struct HarnessMetrics {
    registry: Registry,
    pub wait_duration_seconds: HistogramVec,
    pub wait_total: IntCounterVec,
    pub checks_total: IntCounterVec,
    pub suite_duration_seconds: GaugeVec,
}

impl Default for HarnessMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl HarnessMetrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let wait_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "backup_harness_wait_duration_seconds",
                "Time spent waiting for a control-plane object to converge",
            )
            .buckets(vec![
                1.0, 10.0, 30.0, 60.0, 120.0, 300.0, 600.0, 1200.0, 2400.0,
            ]),
            &["kind", "outcome"],
        )
        .expect("metric creation");
        registry
            .register(Box::new(wait_duration_seconds.clone()))
            .expect("metric registration");

        let wait_total = IntCounterVec::new(
            Opts::new(
                "backup_harness_wait_total",
                "Number of completed waits by kind and outcome",
            ),
            &["kind", "outcome"],
        )
        .expect("metric creation");
        registry
            .register(Box::new(wait_total.clone()))
            .expect("metric registration");

        let checks_total = IntCounterVec::new(
            Opts::new(
                "backup_harness_checks_total",
                "Number of verification checks by suite and result",
            ),
            &["suite", "result"],
        )
        .expect("metric creation");
        registry
            .register(Box::new(checks_total.clone()))
            .expect("metric registration");

        let suite_duration_seconds = GaugeVec::new(
            Opts::new(
                "backup_harness_suite_duration_seconds",
                "Wall-clock duration of the last run of each suite",
            ),
            &["suite"],
        )
        .expect("metric creation");
        registry
            .register(Box::new(suite_duration_seconds.clone()))
            .expect("metric registration");

        Self {
            registry,
            wait_duration_seconds,
            wait_total,
            checks_total,
            suite_duration_seconds,
        }
    }

    /// Gather all metrics and encode as Prometheus text format
    pub fn gather(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
            return format!("# failed to encode metrics: {e}\n");
        }
        String::from_utf8_lossy(&buffer).into_owned()
    }

    pub fn record_wait(&self, kind: WaitKind, outcome: WaitOutcome, elapsed: Duration) {
        let labels = [kind.as_str(), outcome.as_str()];
        self.wait_total.with_label_values(&labels).inc();
        self.wait_duration_seconds
            .with_label_values(&labels)
            .observe(elapsed.as_secs_f64());
    }

    pub fn record_check(&self, suite: &str, passed: bool) {
        let result = if passed { "passed" } else { "failed" };
        self.checks_total.with_label_values(&[suite, result]).inc();
    }

    pub fn record_suite(&self, suite: &str, elapsed: Duration) {
        self.suite_duration_seconds
            .with_label_values(&[suite])
            .set(elapsed.as_secs_f64());
    }
}

//! Recording of verification checks.
//!
//! A fatal check stops the calling suite on failure. A soft check is recorded and
//! the suite carries on; the suite still fails at the end if any soft check did.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::error::{Error, Result};
use crate::metrics::HarnessMetrics;

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CheckRecord {
    pub suite: String,
    pub description: String,
    pub passed: bool,
    pub fatal: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub timestamp: DateTime<Utc>,
}

pub struct Verifier {
    suite: String,
    records: Vec<CheckRecord>,
    metrics: Option<Arc<HarnessMetrics>>,
}

impl Verifier {
    pub fn new(suite: impl Into<String>) -> Self {
        Self {
            suite: suite.into(),
            records: Vec::new(),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<HarnessMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn suite(&self) -> &str {
        &self.suite
    }

    /// Record `result`; a failure is returned to the caller for `?`.
    pub fn fatal<T>(&mut self, result: Result<T>, description: &str) -> Result<T> {
        match result {
            Ok(v) => {
                self.record(description, true, true, None);
                Ok(v)
            }
            Err(e) => {
                error!(suite = %self.suite, check = description, error = %e, "Check failed");
                self.record(description, false, true, Some(e.to_string()));
                Err(e)
            }
        }
    }

    /// Record `result` and keep going. Returns the value on success.
    pub fn soft<T>(&mut self, result: Result<T>, description: &str) -> Option<T> {
        match result {
            Ok(v) => {
                self.record(description, true, false, None);
                Some(v)
            }
            Err(e) => {
                warn!(suite = %self.suite, check = description, error = %e, "Soft check failed");
                self.record(description, false, false, Some(e.to_string()));
                None
            }
        }
    }

    /// Record a boolean assertion as a soft check.
    pub fn soft_assert(&mut self, passed: bool, description: &str, message: impl FnOnce() -> String) {
        if passed {
            self.record(description, true, false, None);
        } else {
            let message = message();
            warn!(suite = %self.suite, check = description, %message, "Soft check failed");
            self.record(description, false, false, Some(message));
        }
    }

    pub fn soft_failures(&self) -> usize {
        self.records.iter().filter(|r| !r.passed && !r.fatal).count()
    }

    pub fn records(&self) -> &[CheckRecord] {
        &self.records
    }

    /// Consume the verifier. The result is the suite's outcome given how its body ended.
    pub fn finish(self, outcome: Result<()>) -> (Vec<CheckRecord>, Result<()>) {
        let soft = self.soft_failures();
        let result = match outcome {
            Err(e) => Err(e),
            Ok(()) if soft > 0 => Err(Error::SoftFailures(soft)),
            Ok(()) => Ok(()),
        };
        (self.records, result)
    }

    fn record(&mut self, description: &str, passed: bool, fatal: bool, message: Option<String>) {
        if let Some(metrics) = &self.metrics {
            metrics.record_check(&self.suite, passed);
        }
        if passed {
            info!(suite = %self.suite, check = description, "Check passed");
        }
        self.records.push(CheckRecord {
            suite: self.suite.clone(),
            description: description.to_string(),
            passed,
            fatal,
            message,
            timestamp: Utc::now(),
        });
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SuiteSummary {
    pub name: String,
    pub passed: bool,
    pub duration_seconds: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Outcome of a whole harness run, written as JSON.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub suites: Vec<SuiteSummary>,
    pub checks: Vec<CheckRecord>,
}

impl Report {
    pub fn passed(&self) -> bool {
        self.suites.iter().all(|s| s.passed)
    }

    pub fn failed_suites(&self) -> Vec<&str> {
        self.suites
            .iter()
            .filter(|s| !s.passed)
            .map(|s| s.name.as_str())
            .collect()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn write_to(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        info!(path = %path.display(), "Wrote harness report");
        Ok(())
    }
}

use std::future::Future;
use std::sync::Arc;

use tokio::time::Instant;

use crate::api::BackupApi;
use crate::cluster::ClusterApi;
use crate::config::{HarnessConfig, WaitKind};
use crate::metrics::{HarnessMetrics, WaitOutcome};
use crate::retry::{retry_with_timeout, Attempt, RetryError};

/// Shared state handed to every workflow and suite
#[derive(Clone)]
pub struct Context {
    pub api: Arc<dyn BackupApi>,
    pub cluster: Arc<dyn ClusterApi>,
    pub config: Arc<HarnessConfig>,
    pub metrics: Arc<HarnessMetrics>,
}

impl Context {
    pub fn new(
        api: Arc<dyn BackupApi>,
        cluster: Arc<dyn ClusterApi>,
        config: Arc<HarnessConfig>,
        metrics: Arc<HarnessMetrics>,
    ) -> Self {
        Self {
            api,
            cluster,
            config,
            metrics,
        }
    }

    pub fn org(&self) -> &str {
        &self.config.org_id
    }

    /// Run `probe` under the configured policy for `kind` and record the outcome.
    pub async fn wait<T, F, Fut>(
        &self,
        kind: WaitKind,
        subject: &str,
        probe: F,
    ) -> Result<T, RetryError<T>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Attempt<T>>,
    {
        let policy = self.config.policy(kind);
        let operation = format!("{kind} of [{subject}]");
        let start = Instant::now();

        let result = retry_with_timeout(&policy, &operation, probe).await;

        let outcome = match &result {
            Ok(_) => WaitOutcome::Converged,
            Err(e) if e.is_timeout() => WaitOutcome::Timeout,
            Err(_) => WaitOutcome::Failed,
        };
        self.metrics.record_wait(kind, outcome, start.elapsed());
        result
    }
}

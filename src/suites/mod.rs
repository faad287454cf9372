//! End-to-end suites and the runner that selects and executes them.

pub mod backup_restore;
pub mod license;
pub mod platform;

use std::fmt;

use chrono::Utc;
use regex::Regex;
use tokio::time::Instant;
use tracing::{error, info, info_span, Instrument};

use crate::config::SuiteFilter;
use crate::context::Context;
use crate::error::Result;
use crate::report::{Report, SuiteSummary, Verifier};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Suite {
    PlatformPods,
    BackupRestore,
    LicenseCount,
}

impl Suite {
    /// Execution order.
    pub const ALL: [Suite; 3] = [Suite::PlatformPods, Suite::BackupRestore, Suite::LicenseCount];

    pub fn name(&self) -> &'static str {
        match self {
            Suite::PlatformPods => "platform-pods",
            Suite::BackupRestore => "backup-restore",
            Suite::LicenseCount => "license-count",
        }
    }

    pub async fn run(&self, ctx: &Context, verifier: &mut Verifier) -> Result<()> {
        match self {
            Suite::PlatformPods => platform::run(ctx, verifier).await,
            Suite::BackupRestore => backup_restore::run(ctx, verifier).await,
            Suite::LicenseCount => license::run(ctx, verifier).await,
        }
    }
}

impl fmt::Display for Suite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Suites whose name matches `focus` (when set) and does not match `skip`.
pub fn select(filter: &SuiteFilter) -> Result<Vec<Suite>> {
    let focus = filter.focus.as_deref().map(Regex::new).transpose()?;
    let skip = filter.skip.as_deref().map(Regex::new).transpose()?;

    Ok(Suite::ALL
        .into_iter()
        .filter(|s| focus.as_ref().is_none_or(|re| re.is_match(s.name())))
        .filter(|s| !skip.as_ref().is_some_and(|re| re.is_match(s.name())))
        .collect())
}

/// Run `suites` one after another. A failing suite does not stop the ones after it.
pub async fn run_all(ctx: &Context, suites: &[Suite]) -> Report {
    let started_at = Utc::now();
    let mut summaries = Vec::with_capacity(suites.len());
    let mut checks = Vec::new();

    for suite in suites {
        info!(suite = %suite, "Starting suite");
        let start = Instant::now();
        let mut verifier = Verifier::new(suite.name()).with_metrics(ctx.metrics.clone());

        let outcome = suite
            .run(ctx, &mut verifier)
            .instrument(info_span!("suite", name = suite.name()))
            .await;
        let (records, result) = verifier.finish(outcome);

        let elapsed = start.elapsed();
        ctx.metrics.record_suite(suite.name(), elapsed);
        match &result {
            Ok(()) => info!(suite = %suite, elapsed_secs = elapsed.as_secs(), "Suite passed"),
            Err(e) => error!(suite = %suite, error = %e, "Suite failed"),
        }

        summaries.push(SuiteSummary {
            name: suite.name().to_string(),
            passed: result.is_ok(),
            duration_seconds: elapsed.as_secs_f64(),
            error: result.err().map(|e| e.to_string()),
        });
        checks.extend(records);
    }

    Report {
        started_at,
        finished_at: Utc::now(),
        suites: summaries,
        checks,
    }
}

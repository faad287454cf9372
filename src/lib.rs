//! Integration-test harness for a Kubernetes backup control plane.
//!
//! Every check is a bounded wait: a probe observes the control plane once, the retry
//! executor calls it on a fixed interval, and the result is classified against the
//! terminal statuses the caller expects.

pub mod api;
pub mod cluster;
pub mod config;
pub mod context;
pub mod error;
pub mod metrics;
pub mod probes;
pub mod report;
pub mod retry;
pub mod status;
pub mod storage;
pub mod suites;
pub mod util;
pub mod workflows;

pub use context::Context;
pub use error::{Error, Result};

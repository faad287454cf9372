pub mod prometheus;

pub use self::prometheus::{HarnessMetrics, WaitOutcome};

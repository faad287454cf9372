pub mod checks;

pub use checks::{CheckRecord, Report, SuiteSummary, Verifier};

pub mod executor;
pub mod tasks;

pub use executor::{retry_with_timeout, Attempt, RetryError, RetryPolicy, MAX_TIMEOUT};
pub use tasks::{run_tasks, ExecutionMode, SharedVec};

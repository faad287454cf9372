//! Fan-out helpers for running the same task over many inputs.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

use futures::future::join_all;
use tracing::debug;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecutionMode {
    Sequential,
    Parallel,
}

/// Run `task` once per input and collect every output in input order.
///
/// A single input always runs sequentially. In parallel mode all tasks are polled
/// concurrently and the call returns once the last one finishes.
pub async fn run_tasks<I, T, F, Fut>(inputs: I, mode: ExecutionMode, task: F) -> Vec<T>
where
    I: IntoIterator,
    F: Fn(usize, I::Item) -> Fut,
    Fut: Future<Output = T>,
{
    let inputs: Vec<I::Item> = inputs.into_iter().collect();
    let mode = if inputs.len() <= 1 {
        ExecutionMode::Sequential
    } else {
        mode
    };
    debug!(count = inputs.len(), ?mode, "Running tasks");

    match mode {
        ExecutionMode::Sequential => {
            let mut outputs = Vec::with_capacity(inputs.len());
            for (index, input) in inputs.into_iter().enumerate() {
                outputs.push(task(index, input).await);
            }
            outputs
        }
        ExecutionMode::Parallel => {
            join_all(
                inputs
                    .into_iter()
                    .enumerate()
                    .map(|(index, input)| task(index, input)),
            )
            .await
        }
    }
}

/// A vector that concurrent tasks can append to.
#[derive(Debug, Default)]
pub struct SharedVec<T> {
    inner: Arc<Mutex<Vec<T>>>,
}

impl<T> Clone for SharedVec<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> SharedVec<T> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn push(&self, item: T) {
        self.lock().push(item);
    }

    pub fn extend(&self, items: impl IntoIterator<Item = T>) {
        self.lock().extend(items);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Take everything appended so far.
    pub fn take(&self) -> Vec<T> {
        std::mem::take(&mut *self.lock())
    }

    // Poisoned locks still hold a consistent Vec.
    fn lock(&self) -> MutexGuard<'_, Vec<T>> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

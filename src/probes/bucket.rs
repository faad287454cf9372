use object_store::ObjectStore;

use crate::retry::Attempt;
use crate::storage::list_keys;

/// Done once nothing is stored under `prefix`. Listing errors are retried.
pub async fn objects_absent(store: &dyn ObjectStore, prefix: &str) -> Attempt<usize> {
    match list_keys(store, prefix).await {
        Ok(keys) if keys.is_empty() => Attempt::Done(0),
        Ok(keys) => Attempt::pending_with(
            keys.len(),
            format!("{} object(s) remain under [{prefix}]", keys.len()),
        ),
        Err(e) => Attempt::pending(format!("listing [{prefix}] failed: {e}")),
    }
}

use std::sync::{Mutex, MutexGuard};

use tracing::warn;

/// Lock the cache state, recovering it if a previous holder panicked.
///
/// Every mutation of the state is a whole-entry insert or remove, so a
/// poisoned guard still holds consistent maps.
pub(crate) fn mutex_lock<'a, T>(
    lock: &'a Mutex<T>,
    target: &'static str,
    op: &'static str,
) -> MutexGuard<'a, T> {
    match lock.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            warn!(
                op,
                target_module = target,
                lock_kind = "mutex.lock",
                result = "poisoned_recovered",
                "Recovered from poisoned cache lock"
            );
            poisoned.into_inner()
        }
    }
}

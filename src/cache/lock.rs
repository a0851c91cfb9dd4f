use std::sync::{Mutex, MutexGuard};

use tracing::warn;

/// Lock the client state, recovering the guard if a previous holder panicked.
///
/// Critical sections never leave the trie half-updated across an await, so
/// the recovered state is still consistent.
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
                "Recovered from poisoned query cache lock"
            );
            poisoned.into_inner()
        }
    }
}

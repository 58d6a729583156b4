//! Token-addressed endpoint registry.
//!
//! C callers hold plain `u64` tokens. `0` is never issued, so it doubles as
//! the null handle. A destroyed token is never reissued.

use bridge_types::BridgeError;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Token for "no handle".
pub const NULL_HANDLE: u64 = 0;

pub(crate) struct Registry<T> {
    next: AtomicU64,
    entries: Mutex<HashMap<u64, Arc<Mutex<T>>>>,
}

impl<T> Registry<T> {
    pub(crate) fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Store `value` and return its fresh token.
    pub(crate) fn insert(&self, value: T) -> u64 {
        let token = self.next.fetch_add(1, Ordering::Relaxed);
        self.entries
            .lock()
            .insert(token, Arc::new(Mutex::new(value)));
        token
    }

    /// Resolve a live token.
    pub(crate) fn get(&self, token: u64) -> Result<Arc<Mutex<T>>, BridgeError> {
        if token == NULL_HANDLE {
            return Err(BridgeError::NullArgument("handle"));
        }
        self.entries
            .lock()
            .get(&token)
            .cloned()
            .ok_or(BridgeError::StaleHandle(token))
    }

    /// Run `f` against the endpoint behind `token`.
    ///
    /// The registry lock is released before `f` runs; only the entry is held.
    pub(crate) fn with<R>(
        &self,
        token: u64,
        f: impl FnOnce(&mut T) -> Result<R, BridgeError>,
    ) -> Result<R, BridgeError> {
        let entry = self.get(token)?;
        let mut guard = entry.lock();
        f(&mut guard)
    }

    /// Unregister `token`. Returns the value when no other call still holds it.
    pub(crate) fn remove(&self, token: u64) -> Result<Option<T>, BridgeError> {
        if token == NULL_HANDLE {
            return Err(BridgeError::NullArgument("handle"));
        }
        let entry = self
            .entries
            .lock()
            .remove(&token)
            .ok_or(BridgeError::StaleHandle(token))?;
        Ok(Arc::try_unwrap(entry).ok().map(Mutex::into_inner))
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.lock().len()
    }
}

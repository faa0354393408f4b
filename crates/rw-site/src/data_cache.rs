//! Memoization of expensive data-producing calls.
//!
//! [`DataCache`] stores the *pending* computation, not just its result: every
//! caller that arrives while the computation is in flight attaches to the same
//! shared future, so the producer runs at most once between two
//! [`DataCache::clear`] calls. Failures are cached as well and handed to every
//! waiter until the cache is cleared.

use std::future::Future;
use std::sync::{Arc, Mutex};

use futures::future::{BoxFuture, FutureExt, Shared, TryFutureExt};

use crate::error::SiteError;

/// Shared handle to a cached computation.
///
/// Awaiting it yields the cached value, driving the computation if nobody
/// else is.
pub type Pending<T> = Shared<BoxFuture<'static, Result<Arc<T>, SiteError>>>;

/// Lifecycle of a cached value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CacheState {
    /// Nothing cached.
    Empty,
    /// Computation started but not finished.
    Populating,
    /// Value (or failure) cached.
    Populated,
}

/// Single-slot cache for a value computed asynchronously.
pub struct DataCache<T> {
    slot: Mutex<Option<Pending<T>>>,
}

impl<T> Default for DataCache<T> {
    fn default() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }
}

impl<T: Send + Sync + 'static> DataCache<T> {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached computation, starting it with `init` if the cache is
    /// empty.
    ///
    /// `init` is called synchronously, under the cache lock, only when no
    /// computation is cached. The returned future is lazy: it makes progress
    /// when awaited.
    ///
    /// # Panics
    ///
    /// Panics if the internal `Mutex` is poisoned.
    pub fn get_or_init<F, Fut>(&self, init: F) -> Pending<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, SiteError>> + Send + 'static,
    {
        let mut slot = self.slot.lock().unwrap();
        if let Some(pending) = slot.as_ref() {
            tracing::debug!("using cached data");
            return pending.clone();
        }

        tracing::debug!("computing data");
        let pending = init().map_ok(Arc::new).boxed().shared();
        *slot = Some(pending.clone());
        pending
    }

    /// Drop the cached computation.
    ///
    /// Callers already awaiting the old computation still receive its result.
    ///
    /// # Panics
    ///
    /// Panics if the internal `Mutex` is poisoned.
    pub fn clear(&self) {
        self.slot.lock().unwrap().take();
    }

    /// Current lifecycle state.
    ///
    /// # Panics
    ///
    /// Panics if the internal `Mutex` is poisoned.
    pub fn state(&self) -> CacheState {
        match self.slot.lock().unwrap().as_ref() {
            None => CacheState::Empty,
            Some(pending) if pending.peek().is_some() => CacheState::Populated,
            Some(_) => CacheState::Populating,
        }
    }
}

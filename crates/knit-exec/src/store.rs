//! Shared cache store
//!
//! Maps group ids to execution caches. Every access goes through one mutex
//! that is held for a whole dispatch pass, so two concurrent runs can
//! neither create two contexts for the same group nor overwrite each
//! other's results with stale ones. The guard is released on every exit
//! path, including cancellation and unwinding.
//!
//! A hung evaluation holds the lock and blocks every other run.

use crate::cache::{CachedCell, ExecutionCache};
use crate::dispatch::{dispatch, Dispatched, Fragment};
use crate::error::Cancelled;
use crate::evaluator::EvaluationBackend;
use crate::group::GroupId;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;

/// Store statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    /// Number of groups with a cache
    pub groups: usize,
    /// Total cached cells across groups
    pub cells: usize,
}

/// Lock-guarded map from group id to execution cache
///
/// Empty on construction; entries are created lazily by [`CacheStore::run`]
/// and removed all together by [`CacheStore::reset`].
pub struct CacheStore<C> {
    caches: Mutex<HashMap<GroupId, ExecutionCache<C>>>,
}

impl<C: Send> CacheStore<C> {
    /// Create empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            caches: Mutex::new(HashMap::new()),
        }
    }

    /// Run fragments through their groups' caches
    ///
    /// Holds the store lock for the whole pass.
    ///
    /// # Errors
    /// - `Cancelled` if an evaluation is cancelled
    pub fn run<B>(&self, backend: &B, fragments: &[Fragment]) -> Result<Dispatched, Cancelled>
    where
        B: EvaluationBackend<Context = C> + ?Sized,
    {
        let mut caches = self.caches.lock();
        dispatch(&mut caches, backend, fragments)
    }

    /// Drop every group's cache and context
    ///
    /// The next run re-evaluates every group from scratch.
    pub fn reset(&self) {
        let mut caches = self.caches.lock();
        let groups = caches.len();
        caches.clear();
        tracing::debug!(groups, "cache store reset");
    }

    /// Check if a group has a cache
    #[must_use]
    pub fn contains(&self, group: &GroupId) -> bool {
        self.caches.lock().contains_key(group)
    }

    /// Copy of a group's cached cells
    #[must_use]
    pub fn cells(&self, group: &GroupId) -> Option<Vec<CachedCell>> {
        self.caches
            .lock()
            .get(group)
            .map(|cache| cache.cells().to_vec())
    }

    /// Current statistics
    #[must_use]
    pub fn stats(&self) -> StoreStats {
        let caches = self.caches.lock();
        StoreStats {
            groups: caches.len(),
            cells: caches.values().map(ExecutionCache::len).sum(),
        }
    }
}

impl<C: Send> Default for CacheStore<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> std::fmt::Debug for CacheStore<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let groups = self.caches.try_lock().map(|caches| caches.len());
        f.debug_struct("CacheStore")
            .field("groups", &groups)
            .finish()
    }
}

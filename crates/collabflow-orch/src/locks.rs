//! Per-project mutual exclusion for signal handling.
//!
//! Completion signals for the same project must be serialized through the
//! whole evaluate -> decide -> dispatch sequence, in arrival order, while
//! signals for different projects proceed concurrently. This module keys
//! an async mutex by project ID.
//!
//! The outbound webhook call is the only suspension point inside the
//! critical section and runs under a timeout, so a stalled endpoint
//! cannot hold a project lock indefinitely.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use collabflow_core::ProjectId;

/// Registry of per-project async mutexes.
///
/// Entries are created lazily on first use and kept for the life of the
/// process; the per-entry cost is a single `Arc<Mutex<()>>`.
#[derive(Debug, Default)]
pub struct ProjectLocks {
    inner: Mutex<HashMap<ProjectId, Arc<AsyncMutex<()>>>>,
}

impl ProjectLocks {
    /// Creates an empty lock registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires the lock for a project, waiting if another handler for
    /// the same project holds it. Waiters are granted the lock in FIFO
    /// order, which preserves per-project signal ordering.
    pub async fn acquire(&self, project_id: ProjectId) -> OwnedMutexGuard<()> {
        let entry = {
            let mut map = self
                .inner
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            map.entry(project_id)
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        entry.lock_owned().await
    }

    /// Removes the lock entry for a project.
    ///
    /// Called when a project finishes orchestration so the registry does
    /// not retain an entry per finished project for the life of the
    /// process. A handler still holding or awaiting the old entry keeps
    /// it alive through its `Arc`; a later [`Self::acquire`] simply
    /// creates a fresh entry.
    pub fn evict(&self, project_id: &ProjectId) {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(project_id);
    }

    /// Returns the number of projects with a registered lock.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns true if no project has a registered lock.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn same_project_is_serialized() {
        let locks = Arc::new(ProjectLocks::new());
        let project_id = ProjectId::generate();
        let concurrent = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let locks = locks.clone();
            let concurrent = concurrent.clone();
            let peak = peak.clone();
            handles.push(tokio::spawn(async move {
                let _guard = locks.acquire(project_id).await;
                let now = concurrent.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                concurrent.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(peak.load(Ordering::SeqCst), 1);
        assert_eq!(locks.len(), 1);
    }

    #[tokio::test]
    async fn different_projects_do_not_block_each_other() {
        let locks = ProjectLocks::new();
        let guard_a = locks.acquire(ProjectId::generate()).await;

        // Acquiring another project's lock must not wait on guard_a.
        let guard_b = tokio::time::timeout(
            Duration::from_millis(50),
            locks.acquire(ProjectId::generate()),
        )
        .await
        .expect("independent project lock should be immediate");

        drop(guard_a);
        drop(guard_b);
        assert_eq!(locks.len(), 2);
    }

    #[tokio::test]
    async fn evict_drops_the_entry_and_acquire_recreates_it() {
        let locks = ProjectLocks::new();
        let project_id = ProjectId::generate();

        drop(locks.acquire(project_id).await);
        assert_eq!(locks.len(), 1);

        locks.evict(&project_id);
        assert!(locks.is_empty());

        // Eviction of an unknown project is a no-op.
        locks.evict(&ProjectId::generate());

        drop(locks.acquire(project_id).await);
        assert_eq!(locks.len(), 1);
    }
}

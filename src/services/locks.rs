//! Per-resource write serialization for the catalog files.
//!
//! Lock order is bucket lock first, then the catalog lock. Never take a
//! bucket lock while holding the catalog lock.
//!
//! Bucket locks only live while someone holds or waits on them; idle entries
//! are pruned on the next lookup, so the registry never outgrows the number
//! of in-flight requests.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

#[derive(Clone, Default)]
pub struct LockRegistry {
    catalog: Arc<AsyncMutex<()>>,
    buckets: Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>,
}

impl LockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Exclusive access to `buckets.csv`.
    pub async fn catalog(&self) -> OwnedMutexGuard<()> {
        self.catalog.clone().lock_owned().await
    }

    /// Exclusive access to one bucket's directory and `objects.csv`.
    pub async fn bucket(&self, name: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut buckets = self
                .buckets
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            // Only the map references an idle lock.
            buckets.retain(|_, lock| Arc::strong_count(lock) > 1);
            buckets
                .entry(name.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }

    #[cfg(test)]
    pub(crate) fn tracked_buckets(&self) -> usize {
        self.buckets
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_bucket_is_exclusive() {
        let locks = LockRegistry::new();
        let guard = locks.bucket("alpha").await;

        let contender = locks.clone();
        let waiting = tokio::spawn(async move {
            let _guard = contender.bucket("alpha").await;
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiting.is_finished());

        drop(guard);
        waiting.await.unwrap();
    }

    #[tokio::test]
    async fn test_distinct_buckets_do_not_block() {
        let locks = LockRegistry::new();
        let _alpha = locks.bucket("alpha").await;
        let beta = tokio::time::timeout(Duration::from_millis(100), locks.bucket("beta")).await;
        assert!(beta.is_ok());
        let catalog = tokio::time::timeout(Duration::from_millis(100), locks.catalog()).await;
        assert!(catalog.is_ok());
    }

    #[tokio::test]
    async fn test_released_locks_are_pruned() {
        let locks = LockRegistry::new();
        for i in 0..100 {
            let _guard = locks.bucket(&format!("bucket-{i}")).await;
        }
        let held = locks.bucket("held").await;
        assert_eq!(locks.tracked_buckets(), 1);

        drop(held);
        let _other = locks.bucket("other").await;
        assert_eq!(locks.tracked_buckets(), 1);
    }

    #[tokio::test]
    async fn test_pruning_keeps_contended_lock_exclusive() {
        let locks = LockRegistry::new();
        let guard = locks.bucket("alpha").await;

        let contender = locks.clone();
        let waiting = tokio::spawn(async move {
            let _guard = contender.bucket("alpha").await;
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        // Lookups of other names prune, but must not drop a held lock.
        let _beta = locks.bucket("beta").await;
        let again = tokio::time::timeout(Duration::from_millis(50), locks.bucket("alpha")).await;
        assert!(again.is_err());
        assert!(!waiting.is_finished());

        drop(guard);
        waiting.await.unwrap();
    }
}

//! Per-image critical sections
//!
//! Votes on the same image run their append → recompute → mutate sequence one
//! at a time; votes on different images never contend. Entries nobody holds or
//! waits on are pruned once the registry grows past a threshold.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use uuid::Uuid;

const DEFAULT_PRUNE_THRESHOLD: usize = 1024;

pub struct ImageLocks {
    locks: Mutex<HashMap<Uuid, Arc<AsyncMutex<()>>>>,
    prune_threshold: usize,
}

impl Default for ImageLocks {
    fn default() -> Self {
        Self::with_prune_threshold(DEFAULT_PRUNE_THRESHOLD)
    }
}

impl ImageLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prune_threshold(prune_threshold: usize) -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
            prune_threshold,
        }
    }

    /// Wait for exclusive access to one image
    pub async fn acquire(&self, image_id: Uuid) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            if locks.len() >= self.prune_threshold {
                // Held or awaited locks have clones outside the map
                locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            }
            locks.entry(image_id).or_default().clone()
        };

        lock.lock_owned().await
    }

    /// Number of registered images
    pub fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_same_image_is_serialized() {
        let locks = Arc::new(ImageLocks::new());
        let image_id = Uuid::new_v4();
        let inside = Arc::new(AtomicUsize::new(0));
        let max_inside = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let locks = locks.clone();
            let inside = inside.clone();
            let max_inside = max_inside.clone();
            handles.push(tokio::spawn(async move {
                let _guard = locks.acquire(image_id).await;
                let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                max_inside.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                inside.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(max_inside.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_different_images_do_not_block() {
        let locks = ImageLocks::new();
        let _first = locks.acquire(Uuid::new_v4()).await;

        let second = tokio::time::timeout(Duration::from_millis(100), locks.acquire(Uuid::new_v4())).await;

        assert!(second.is_ok(), "Lock on another image should be immediately available");
    }

    #[tokio::test]
    async fn test_idle_entries_pruned() {
        let locks = ImageLocks::with_prune_threshold(4);
        let held_id = Uuid::new_v4();
        let _held = locks.acquire(held_id).await;

        for _ in 0..4 {
            drop(locks.acquire(Uuid::new_v4()).await);
        }

        // Threshold reached on the last acquire: idle entries dropped, held one kept
        assert!(locks.len() <= 4);
        let again = tokio::time::timeout(Duration::from_millis(50), locks.acquire(held_id)).await;
        assert!(again.is_err(), "Held lock must survive pruning");
    }
}

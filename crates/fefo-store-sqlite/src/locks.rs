//! Per-key async mutexes.
//!
//! Allocation holds the lock of its product from the first read of the
//! product's lots until the transaction that decrements them has committed.
//! Different keys map to different mutexes, so unrelated products never wait
//! on each other.

use std::{
  collections::HashMap,
  hash::Hash,
  sync::{Arc, Mutex, PoisonError},
};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

pub struct KeyedLocks<K> {
  slots: Mutex<HashMap<K, Arc<AsyncMutex<()>>>>,
}

impl<K: Eq + Hash> KeyedLocks<K> {
  pub fn new() -> Self { Self { slots: Mutex::new(HashMap::new()) } }

  /// Wait for exclusive access to `key`. Access ends when the guard drops.
  pub async fn lock(&self, key: K) -> OwnedMutexGuard<()> {
    let slot = {
      let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
      // Forget mutexes nobody holds or waits for.
      slots.retain(|_, m| Arc::strong_count(m) > 1);
      slots.entry(key).or_default().clone()
    };
    slot.lock_owned().await
  }
}

#[cfg(test)]
mod tests {
  use std::time::Duration;

  use super::*;

  #[tokio::test]
  async fn same_key_is_exclusive() {
    let locks = KeyedLocks::new();
    let _held = locks.lock(1).await;
    let second = tokio::time::timeout(Duration::from_millis(50), locks.lock(1)).await;
    assert!(second.is_err(), "second lock on the same key must wait");
  }

  #[tokio::test]
  async fn distinct_keys_do_not_contend() {
    let locks = KeyedLocks::new();
    let _a = locks.lock("a").await;
    let b = tokio::time::timeout(Duration::from_millis(50), locks.lock("b")).await;
    assert!(b.is_ok());
  }

  #[tokio::test]
  async fn released_key_can_be_taken_again() {
    let locks = KeyedLocks::new();
    drop(locks.lock(7).await);
    let again = tokio::time::timeout(Duration::from_millis(50), locks.lock(7)).await;
    assert!(again.is_ok());
  }
}

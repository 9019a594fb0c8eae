//! In-memory read-through cache of orders.
//!
//! The cache is a derived view of the store: entries are written only after a
//! successful save (or during rehydration) and it can always be rebuilt from
//! the store. Lookups are served from here exclusively.
//!
//! # Locking
//!
//! One `RwLock` guards the map. Readers share the lock; a writer holds it
//! for a single insert/remove. No method awaits while holding the lock, and
//! callers must never hold a guard across store I/O (none is exposed).

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use order_stream_core::{Order, OrderUid};

/// Concurrent map from `order_uid` to the latest stored [`Order`].
///
/// Cheaply cloneable handle; clones share the same map.
#[derive(Clone, Default)]
pub struct OrderCache {
    inner: Arc<RwLock<HashMap<OrderUid, Arc<Order>>>>,
}

impl OrderCache {
    /// Create a new empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an order. Last writer wins.
    pub fn set(&self, order_uid: OrderUid, order: Order) {
        let order = Arc::new(order);
        self.write().insert(order_uid, order);
    }

    /// Get an order by identifier.
    #[must_use]
    pub fn get(&self, order_uid: &OrderUid) -> Option<Arc<Order>> {
        self.read().get(order_uid).cloned()
    }

    /// Snapshot of every cached order, in no particular order.
    #[must_use]
    pub fn get_all(&self) -> Vec<Arc<Order>> {
        self.read().values().cloned().collect()
    }

    /// Remove one order. Returns whether it was present.
    pub fn delete(&self, order_uid: &OrderUid) -> bool {
        self.write().remove(order_uid).is_some()
    }

    /// Remove every order.
    pub fn clear(&self) {
        self.write().clear();
    }

    /// Number of cached orders.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Whether the cache holds no orders.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    // A panic mid-insert cannot leave the map half-written, so a poisoned
    // lock still guards consistent data.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<OrderUid, Arc<Order>>> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<OrderUid, Arc<Order>>> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for OrderCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderCache")
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use order_stream_core::sample_order;

    use super::*;

    #[test]
    fn test_set_and_get() {
        let cache = OrderCache::new();
        let order = sample_order("test-order-123");
        cache.set(order.order_uid.clone(), order.clone());

        let cached = cache.get(&OrderUid::from("test-order-123")).expect("cached");
        assert_eq!(cached.delivery.name, order.delivery.name);
        assert_eq!(cached.items.len(), order.items.len());

        assert!(cache.get(&OrderUid::from("non-existent-order")).is_none());
        assert_eq!(cache.get_all().len(), 1);
    }

    #[test]
    fn test_set_replaces_existing() {
        let cache = OrderCache::new();
        let uid = OrderUid::from("A1");
        cache.set(uid.clone(), sample_order("A1"));

        let mut updated = sample_order("A1");
        updated.items.clear();
        cache.set(uid.clone(), updated);

        assert_eq!(cache.len(), 1);
        assert!(cache.get(&uid).expect("cached").items.is_empty());
    }

    #[test]
    fn test_delete_and_clear() {
        let cache = OrderCache::new();
        cache.set(OrderUid::from("A1"), sample_order("A1"));
        cache.set(OrderUid::from("A2"), sample_order("A2"));

        assert!(cache.delete(&OrderUid::from("A1")));
        assert!(!cache.delete(&OrderUid::from("A1")));
        assert_eq!(cache.len(), 1);

        cache.clear();
        assert!(cache.is_empty());
        assert!(cache.get_all().is_empty());
    }

    #[test]
    fn test_clones_share_state() {
        let cache = OrderCache::new();
        let handle = cache.clone();
        handle.set(OrderUid::from("A1"), sample_order("A1"));
        assert!(cache.get(&OrderUid::from("A1")).is_some());
    }

    #[test]
    fn test_concurrent_writers_and_readers() {
        let cache = OrderCache::new();

        let writers: Vec<_> = (0..4)
            .map(|w| {
                let cache = cache.clone();
                thread::spawn(move || {
                    for i in 0..50 {
                        let uid = format!("w{w}-{i}");
                        cache.set(OrderUid::from(uid.as_str()), sample_order(&uid));
                    }
                })
            })
            .collect();

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let cache = cache.clone();
                thread::spawn(move || {
                    for _ in 0..50 {
                        let _ = cache.get_all();
                        let _ = cache.get(&OrderUid::from("w0-0"));
                    }
                })
            })
            .collect();

        for handle in writers.into_iter().chain(readers) {
            handle.join().expect("thread panicked");
        }

        assert_eq!(cache.len(), 200);
    }
}

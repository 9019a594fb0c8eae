//! Startup rehydration of the order cache from the store.

use futures::StreamExt;
use tracing::{info, instrument, warn};

use crate::cache::OrderCache;
use crate::db::OrderStore;

/// Counts from one rehydration run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RehydrationReport {
    /// Orders placed in the cache.
    pub loaded: usize,
    /// Orders, or the cursor itself, that failed to load.
    pub failed: usize,
}

/// Load every stored order into `cache`.
///
/// Never fails: an order that cannot be reassembled is logged and skipped,
/// and a broken cursor ends the run early. The service starts with whatever
/// was loaded, possibly nothing.
#[instrument(skip_all)]
pub async fn rehydrate<S: OrderStore>(store: &S, cache: &OrderCache) -> RehydrationReport {
    let mut report = RehydrationReport::default();
    let mut orders = store.load_all();

    while let Some(result) = orders.next().await {
        match result {
            Ok(order) => {
                cache.set(order.order_uid.clone(), order);
                report.loaded += 1;
            }
            Err(e) if e.is_transient() => {
                warn!(error = %e, "Store unavailable during rehydration, stopping early");
                report.failed += 1;
                break;
            }
            Err(e) => {
                warn!(error = %e, "Skipping order that failed to load");
                report.failed += 1;
            }
        }
    }

    info!(loaded = report.loaded, failed = report.failed, "Cache rehydrated");
    report
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{Duration, Utc};
    use order_stream_core::{OrderUid, sample_order};

    use super::*;
    use crate::db::memory::MemoryOrderStore;

    async fn seeded(uids: &[&str]) -> MemoryOrderStore {
        let store = MemoryOrderStore::new();
        let base = Utc::now();
        for (i, uid) in uids.iter().enumerate() {
            let mut order = sample_order(uid);
            order.date_created = base - Duration::minutes(i64::try_from(i).unwrap());
            store.save(&order).await.unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_empty_store() {
        let cache = OrderCache::new();
        let report = rehydrate(&MemoryOrderStore::new(), &cache).await;

        assert_eq!(report, RehydrationReport::default());
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_every_stored_order_is_cached() {
        let uids = ["A1", "A2", "A3", "A4", "A5"];
        let store = seeded(&uids).await;
        let cache = OrderCache::new();

        let report = rehydrate(&store, &cache).await;

        assert_eq!(report.loaded, uids.len());
        assert_eq!(report.failed, 0);
        assert_eq!(cache.get_all().len(), uids.len());
        for uid in uids {
            let cached = cache.get(&OrderUid::from(uid)).unwrap();
            assert_eq!(cached.as_ref(), &store.load(&OrderUid::from(uid)).await.unwrap());
        }
    }

    #[tokio::test]
    async fn test_broken_aggregate_is_skipped() {
        let store = seeded(&["A1", "A2", "A3"]).await;
        store.remove_delivery("A2");
        let cache = OrderCache::new();

        let report = rehydrate(&store, &cache).await;

        assert_eq!(report, RehydrationReport { loaded: 2, failed: 1 });
        assert_eq!(cache.get_all().len(), 2);
        assert!(cache.get(&OrderUid::from("A2")).is_none());
        assert!(cache.get(&OrderUid::from("A3")).is_some());
    }

    #[tokio::test]
    async fn test_missing_payment_loads_with_default() {
        let store = seeded(&["A1"]).await;
        store.remove_payment("A1");
        let cache = OrderCache::new();

        let report = rehydrate(&store, &cache).await;

        assert_eq!(report.loaded, 1);
        let cached = cache.get(&OrderUid::from("A1")).unwrap();
        assert_eq!(cached.payment, order_stream_core::Payment::default());
        assert_eq!(cached.items.len(), 1);
    }
}

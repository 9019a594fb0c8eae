//! In-memory [`OrderStore`] used by unit tests.
//!
//! Writes are staged on a copy of the tables and swapped in at the end, so an
//! injected failure at any step leaves the previous state untouched, the same
//! guarantee the Postgres transaction gives.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures::StreamExt;
use futures::stream::{self, BoxStream};

use order_stream_core::{Delivery, Item, Order, OrderUid, Payment};

use super::{OrderStore, StoreError};

/// Where an injected save failure strikes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailAt {
    /// Before the transaction starts (store unreachable).
    Begin,
    /// After the header/delivery/payment upserts, while inserting items.
    Items,
}

#[derive(Debug, Clone, Default)]
struct Tables {
    headers: HashMap<OrderUid, Order>,
    delivery: HashMap<OrderUid, Delivery>,
    payment: HashMap<OrderUid, Payment>,
    items: Vec<(OrderUid, Item)>,
}

#[derive(Debug, Default)]
pub struct MemoryOrderStore {
    tables: Mutex<Tables>,
    fail_at: Mutex<Option<FailAt>>,
    saves: AtomicUsize,
}

impl MemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following save fail at `point` until cleared.
    pub fn fail_saves_at(&self, point: Option<FailAt>) {
        *self.fail_at.lock().unwrap_or_else(std::sync::PoisonError::into_inner) = point;
    }

    /// Number of `save` calls, successful or not.
    pub fn save_calls(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Number of item rows stored for `order_uid`.
    pub fn item_rows(&self, order_uid: &str) -> usize {
        self.lock()
            .items
            .iter()
            .filter(|(uid, _)| uid.as_str() == order_uid)
            .count()
    }

    /// Drop the payment row, as found in partially migrated data.
    pub fn remove_payment(&self, order_uid: &str) {
        self.lock().payment.remove(&OrderUid::from(order_uid));
    }

    /// Drop the delivery row, leaving a broken aggregate.
    pub fn remove_delivery(&self, order_uid: &str) {
        self.lock().delivery.remove(&OrderUid::from(order_uid));
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Tables> {
        self.tables
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn injected(&self) -> Option<FailAt> {
        *self
            .fail_at
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn load_sync(&self, order_uid: &OrderUid) -> Result<Order, StoreError> {
        let tables = self.lock();
        let header = tables
            .headers
            .get(order_uid)
            .ok_or_else(|| StoreError::NotFound(order_uid.clone()))?;
        let delivery = tables
            .delivery
            .get(order_uid)
            .cloned()
            .ok_or_else(|| StoreError::DataCorruption(format!("order {order_uid} has no delivery")))?;
        let payment = tables.payment.get(order_uid).cloned().unwrap_or_default();
        let items = tables
            .items
            .iter()
            .filter(|(uid, _)| uid == order_uid)
            .map(|(_, item)| item.clone())
            .collect();

        Ok(Order {
            delivery,
            payment,
            items,
            ..header.clone()
        })
    }
}

impl OrderStore for MemoryOrderStore {
    async fn save(&self, order: &Order) -> Result<(), StoreError> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        let fail_at = self.injected();

        if fail_at == Some(FailAt::Begin) {
            return Err(StoreError::Unavailable(sqlx::Error::PoolTimedOut));
        }

        let mut tables = self.lock();
        let mut staged = tables.clone();
        let uid = order.order_uid.clone();

        staged.headers.insert(
            uid.clone(),
            Order {
                delivery: Delivery::default(),
                payment: Payment::default(),
                items: Vec::new(),
                ..order.clone()
            },
        );
        staged.delivery.insert(uid.clone(), order.delivery.clone());
        staged.payment.insert(uid.clone(), order.payment.clone());
        staged.items.retain(|(existing, _)| existing != &uid);

        if fail_at == Some(FailAt::Items) {
            return Err(StoreError::Data(sqlx::Error::Encode(
                "invalid byte sequence for encoding \"UTF8\": 0x00".into(),
            )));
        }

        staged
            .items
            .extend(order.items.iter().cloned().map(|item| (uid.clone(), item)));

        *tables = staged;
        Ok(())
    }

    async fn load(&self, order_uid: &OrderUid) -> Result<Order, StoreError> {
        self.load_sync(order_uid)
    }

    fn load_all(&self) -> BoxStream<'_, Result<Order, StoreError>> {
        let mut headers: Vec<_> = self
            .lock()
            .headers
            .values()
            .map(|o| (o.date_created, o.order_uid.clone()))
            .collect();
        headers.sort_by(|a, b| b.0.cmp(&a.0));

        stream::iter(headers)
            .map(move |(_, uid)| self.load_sync(&uid))
            .boxed()
    }
}

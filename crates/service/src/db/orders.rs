//! `PostgreSQL` implementation of [`OrderStore`].
//!
//! Queries are runtime-checked (`sqlx::query` / `sqlx::query_as`) so the
//! crate builds without a live database. Row structs are kept separate from
//! the domain types so that column names and nullability stay in this file.

use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use futures::{StreamExt, TryStreamExt};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use tracing::{debug, instrument};

use order_stream_core::{Delivery, Item, Order, OrderUid, Payment};

use super::{OrderStore, StoreError};

/// Items per multi-row `INSERT`. Twelve binds per item keeps each statement
/// well under the Postgres limit of 65535 bind parameters.
const ITEM_INSERT_CHUNK: usize = 1000;

/// Order store backed by `PostgreSQL`.
///
/// `load_all` holds one pooled connection for its cursor while each
/// aggregate is loaded on another, so the pool needs at least two
/// connections.
#[derive(Clone)]
pub struct PgOrderStore {
    pool: PgPool,
}

impl PgOrderStore {
    /// Create a new order store.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// =============================================================================
// Row types
// =============================================================================

#[derive(Debug, FromRow)]
struct OrderRow {
    order_uid: OrderUid,
    track_number: String,
    entry: String,
    locale: String,
    internal_signature: String,
    customer_id: String,
    delivery_service: String,
    shardkey: String,
    sm_id: i32,
    date_created: DateTime<Utc>,
    oof_shard: String,
}

impl OrderRow {
    fn into_order(self, delivery: Delivery, payment: Payment, items: Vec<Item>) -> Order {
        Order {
            order_uid: self.order_uid,
            track_number: self.track_number,
            entry: self.entry,
            delivery,
            payment,
            items,
            locale: self.locale,
            internal_signature: self.internal_signature,
            customer_id: self.customer_id,
            delivery_service: self.delivery_service,
            shardkey: self.shardkey,
            sm_id: self.sm_id,
            date_created: self.date_created,
            oof_shard: self.oof_shard,
        }
    }
}

#[derive(Debug, FromRow)]
struct DeliveryRow {
    name: String,
    phone: String,
    zip: String,
    city: String,
    address: String,
    region: String,
    email: String,
}

impl From<DeliveryRow> for Delivery {
    fn from(r: DeliveryRow) -> Self {
        Self {
            name: r.name,
            phone: r.phone,
            zip: r.zip,
            city: r.city,
            address: r.address,
            region: r.region,
            email: r.email,
        }
    }
}

#[derive(Debug, FromRow)]
struct PaymentRow {
    transaction: String,
    request_id: String,
    currency: String,
    provider: String,
    amount: i64,
    payment_dt: i64,
    bank: String,
    delivery_cost: i64,
    goods_total: i64,
    custom_fee: i64,
}

impl From<PaymentRow> for Payment {
    fn from(r: PaymentRow) -> Self {
        Self {
            transaction: r.transaction,
            request_id: r.request_id,
            currency: r.currency,
            provider: r.provider,
            amount: r.amount,
            payment_dt: r.payment_dt,
            bank: r.bank,
            delivery_cost: r.delivery_cost,
            goods_total: r.goods_total,
            custom_fee: r.custom_fee,
        }
    }
}

#[derive(Debug, FromRow)]
struct ItemRow {
    chrt_id: i64,
    track_number: String,
    price: i64,
    rid: String,
    name: String,
    sale: i32,
    size: String,
    total_price: i64,
    nm_id: i64,
    brand: String,
    status: i32,
}

impl From<ItemRow> for Item {
    fn from(r: ItemRow) -> Self {
        Self {
            chrt_id: r.chrt_id,
            track_number: r.track_number,
            price: r.price,
            rid: r.rid,
            name: r.name,
            sale: r.sale,
            size: r.size,
            total_price: r.total_price,
            nm_id: r.nm_id,
            brand: r.brand,
            status: r.status,
        }
    }
}

// =============================================================================
// OrderStore
// =============================================================================

impl OrderStore for PgOrderStore {
    #[instrument(
        skip(self, order),
        fields(order_uid = %order.order_uid, items = order.items.len())
    )]
    async fn save(&self, order: &Order) -> Result<(), StoreError> {
        // Dropping `tx` on any early return rolls the whole aggregate back.
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r"
            INSERT INTO orders (order_uid, track_number, entry, locale, internal_signature,
                customer_id, delivery_service, shardkey, sm_id, date_created, oof_shard)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (order_uid) DO UPDATE SET
                track_number = EXCLUDED.track_number,
                entry = EXCLUDED.entry,
                locale = EXCLUDED.locale,
                internal_signature = EXCLUDED.internal_signature,
                customer_id = EXCLUDED.customer_id,
                delivery_service = EXCLUDED.delivery_service,
                shardkey = EXCLUDED.shardkey,
                sm_id = EXCLUDED.sm_id,
                date_created = EXCLUDED.date_created,
                oof_shard = EXCLUDED.oof_shard
            ",
        )
        .bind(&order.order_uid)
        .bind(&order.track_number)
        .bind(&order.entry)
        .bind(&order.locale)
        .bind(&order.internal_signature)
        .bind(&order.customer_id)
        .bind(&order.delivery_service)
        .bind(&order.shardkey)
        .bind(order.sm_id)
        .bind(order.date_created)
        .bind(&order.oof_shard)
        .execute(&mut *tx)
        .await?;

        let d = &order.delivery;
        sqlx::query(
            r"
            INSERT INTO delivery (order_uid, name, phone, zip, city, address, region, email)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (order_uid) DO UPDATE SET
                name = EXCLUDED.name,
                phone = EXCLUDED.phone,
                zip = EXCLUDED.zip,
                city = EXCLUDED.city,
                address = EXCLUDED.address,
                region = EXCLUDED.region,
                email = EXCLUDED.email
            ",
        )
        .bind(&order.order_uid)
        .bind(&d.name)
        .bind(&d.phone)
        .bind(&d.zip)
        .bind(&d.city)
        .bind(&d.address)
        .bind(&d.region)
        .bind(&d.email)
        .execute(&mut *tx)
        .await?;

        let p = &order.payment;
        sqlx::query(
            r"
            INSERT INTO payment (order_uid, transaction, request_id, currency, provider,
                amount, payment_dt, bank, delivery_cost, goods_total, custom_fee)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (order_uid) DO UPDATE SET
                transaction = EXCLUDED.transaction,
                request_id = EXCLUDED.request_id,
                currency = EXCLUDED.currency,
                provider = EXCLUDED.provider,
                amount = EXCLUDED.amount,
                payment_dt = EXCLUDED.payment_dt,
                bank = EXCLUDED.bank,
                delivery_cost = EXCLUDED.delivery_cost,
                goods_total = EXCLUDED.goods_total,
                custom_fee = EXCLUDED.custom_fee
            ",
        )
        .bind(&order.order_uid)
        .bind(&p.transaction)
        .bind(&p.request_id)
        .bind(&p.currency)
        .bind(&p.provider)
        .bind(p.amount)
        .bind(p.payment_dt)
        .bind(&p.bank)
        .bind(p.delivery_cost)
        .bind(p.goods_total)
        .bind(p.custom_fee)
        .execute(&mut *tx)
        .await?;

        let removed = sqlx::query("DELETE FROM items WHERE order_uid = $1")
            .bind(&order.order_uid)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        for chunk in order.items.chunks(ITEM_INSERT_CHUNK) {
            let mut builder: QueryBuilder<'_, Postgres> = QueryBuilder::new(
                "INSERT INTO items (order_uid, chrt_id, track_number, price, rid, name, \
                 sale, size, total_price, nm_id, brand, status) ",
            );
            builder.push_values(chunk, |mut b, item| {
                b.push_bind(&order.order_uid)
                    .push_bind(item.chrt_id)
                    .push_bind(&item.track_number)
                    .push_bind(item.price)
                    .push_bind(&item.rid)
                    .push_bind(&item.name)
                    .push_bind(item.sale)
                    .push_bind(&item.size)
                    .push_bind(item.total_price)
                    .push_bind(item.nm_id)
                    .push_bind(&item.brand)
                    .push_bind(item.status);
            });
            builder.build().execute(&mut *tx).await?;
        }

        tx.commit().await?;

        debug!(replaced_items = removed, "Order saved");
        Ok(())
    }

    #[instrument(skip(self), fields(order_uid = %order_uid))]
    async fn load(&self, order_uid: &OrderUid) -> Result<Order, StoreError> {
        let mut tx = self.pool.begin().await?;

        // One snapshot for all four reads, so a concurrent save is seen
        // either entirely or not at all.
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
            .execute(&mut *tx)
            .await?;

        let header = sqlx::query_as::<_, OrderRow>(
            r"
            SELECT order_uid, track_number, entry, locale, internal_signature,
                   customer_id, delivery_service, shardkey, sm_id, date_created, oof_shard
            FROM orders
            WHERE order_uid = $1
            ",
        )
        .bind(order_uid)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| StoreError::NotFound(order_uid.clone()))?;

        let delivery = sqlx::query_as::<_, DeliveryRow>(
            r"
            SELECT name, phone, zip, city, address, region, email
            FROM delivery
            WHERE order_uid = $1
            ",
        )
        .bind(order_uid)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| StoreError::DataCorruption(format!("order {order_uid} has no delivery")))?;

        // Rows written before payment was mandatory may lack it.
        let payment = sqlx::query_as::<_, PaymentRow>(
            r"
            SELECT transaction, request_id, currency, provider, amount, payment_dt,
                   bank, delivery_cost, goods_total, custom_fee
            FROM payment
            WHERE order_uid = $1
            ",
        )
        .bind(order_uid)
        .fetch_optional(&mut *tx)
        .await?
        .map(Payment::from)
        .unwrap_or_default();

        let items = sqlx::query_as::<_, ItemRow>(
            r"
            SELECT chrt_id, track_number, price, rid, name, sale, size,
                   total_price, nm_id, brand, status
            FROM items
            WHERE order_uid = $1
            ORDER BY chrt_id
            ",
        )
        .bind(order_uid)
        .fetch_all(&mut *tx)
        .await?
        .into_iter()
        .map(Item::from)
        .collect();

        tx.commit().await?;

        Ok(header.into_order(delivery.into(), payment, items))
    }

    fn load_all(&self) -> BoxStream<'_, Result<Order, StoreError>> {
        sqlx::query_scalar::<_, OrderUid>("SELECT order_uid FROM orders ORDER BY date_created DESC")
            .fetch(&self.pool)
            .map_err(StoreError::from)
            .and_then(move |order_uid| async move { self.load(&order_uid).await })
            .boxed()
    }
}

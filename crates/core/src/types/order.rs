//! The order aggregate.
//!
//! An [`Order`] owns exactly one [`Delivery`], exactly one [`Payment`], and
//! any number of [`Item`]s. The same structure is used for the JSON payload
//! received from the channel, the rows written to the store, and the
//! responses served by the lookup API.
//!
//! All money-like fields are integer minor units. Nothing here is floating
//! point.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::id::{OrderUid, OrderUidError};

/// Reasons an order is rejected by the validation gate.
///
/// A message failing validation can never become valid through redelivery,
/// so the consumer acknowledges and discards it.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// `order_uid` is missing, empty, or whitespace.
    #[error("missing order_uid")]
    MissingOrderUid,
    /// `order_uid` does not fit the store's key column.
    #[error("order_uid too long: {len} characters (max {max})")]
    OrderUidTooLong {
        /// Maximum allowed length.
        max: usize,
        /// Actual length.
        len: usize,
    },
}

impl From<OrderUidError> for ValidationError {
    fn from(err: OrderUidError) -> Self {
        match err {
            OrderUidError::Empty => Self::MissingOrderUid,
            OrderUidError::TooLong { max, len } => Self::OrderUidTooLong { max, len },
        }
    }
}

/// Root entity of the aggregate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Order {
    pub order_uid: OrderUid,
    pub track_number: String,
    pub entry: String,
    pub delivery: Delivery,
    pub payment: Payment,
    #[serde(deserialize_with = "null_as_empty")]
    pub items: Vec<Item>,
    pub locale: String,
    pub internal_signature: String,
    pub customer_id: String,
    pub delivery_service: String,
    pub shardkey: String,
    pub sm_id: i32,
    pub date_created: DateTime<Utc>,
    pub oof_shard: String,
}

impl Order {
    /// Check the order before it is allowed anywhere near the store.
    ///
    /// Only the identifier is checked; every other field is the producer's
    /// contract.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] if `order_uid` is blank or too long.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.order_uid.check()?;
        Ok(())
    }
}

/// Delivery details, 1:1 with [`Order`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Delivery {
    pub name: String,
    pub phone: String,
    pub zip: String,
    pub city: String,
    pub address: String,
    pub region: String,
    pub email: String,
}

/// Payment details, 1:1 with [`Order`].
///
/// `Default` is the zero-valued payment returned when a stored order has no
/// payment row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Payment {
    pub transaction: String,
    pub request_id: String,
    pub currency: String,
    pub provider: String,
    /// Total charged, in minor units.
    pub amount: i64,
    /// Unix epoch seconds.
    pub payment_dt: i64,
    pub bank: String,
    pub delivery_cost: i64,
    pub goods_total: i64,
    pub custom_fee: i64,
}

/// A line item. Items have no identity of their own beyond
/// (`order_uid`, `chrt_id`) and are always replaced as a whole set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Item {
    pub chrt_id: i64,
    pub track_number: String,
    pub price: i64,
    pub rid: String,
    pub name: String,
    /// Sale percentage.
    pub sale: i32,
    pub size: String,
    pub total_price: i64,
    pub nm_id: i64,
    pub brand: String,
    pub status: i32,
}

/// Producers serialize an empty item list as `null`.
fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<Item>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<Item>>::deserialize(deserializer)?.unwrap_or_default())
}

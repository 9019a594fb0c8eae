//! Reference order used by the test publisher and by tests.

use chrono::{DateTime, Utc};

use super::id::OrderUid;
use super::order::{Delivery, Item, Order, Payment};

/// Build the reference order with the given identifier.
///
/// The payload mirrors what the upstream producer sends: one delivery, one
/// payment, one item.
#[must_use]
pub fn sample_order(order_uid: &str) -> Order {
    Order {
        order_uid: OrderUid::from(order_uid),
        track_number: "WBILMTESTTRACK".to_owned(),
        entry: "WBIL".to_owned(),
        delivery: Delivery {
            name: "Test Testov".to_owned(),
            phone: "+9720000000".to_owned(),
            zip: "2639809".to_owned(),
            city: "Kiryat Mozkin".to_owned(),
            address: "Ploshad Mira 15".to_owned(),
            region: "Kraiot".to_owned(),
            email: "test@gmail.com".to_owned(),
        },
        payment: Payment {
            transaction: order_uid.to_owned(),
            request_id: String::new(),
            currency: "USD".to_owned(),
            provider: "wbpay".to_owned(),
            amount: 1817,
            payment_dt: 1_637_907_727,
            bank: "alpha".to_owned(),
            delivery_cost: 1500,
            goods_total: 317,
            custom_fee: 0,
        },
        items: vec![Item {
            chrt_id: 9_934_930,
            track_number: "WBILMTESTTRACK".to_owned(),
            price: 453,
            rid: "ab4219087a764ae0btest".to_owned(),
            name: "Mascaras".to_owned(),
            sale: 30,
            size: "0".to_owned(),
            total_price: 317,
            nm_id: 2_389_212,
            brand: "Vivienne Sabo".to_owned(),
            status: 202,
        }],
        locale: "en".to_owned(),
        internal_signature: String::new(),
        customer_id: "test".to_owned(),
        delivery_service: "meest".to_owned(),
        shardkey: "9".to_owned(),
        sm_id: 99,
        date_created: DateTime::<Utc>::from_timestamp(1_637_907_739, 0).unwrap_or_default(),
        oof_shard: "1".to_owned(),
    }
}

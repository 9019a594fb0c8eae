//! Order lookup API.
//!
//! Both handlers read only the cache. A store outage never surfaces here; an
//! order that is stored but not yet cached is simply not found.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
};
use tracing::{debug, instrument};

use order_stream_core::{Order, OrderUid};

use crate::error::{AppError, Result};
use crate::state::AppState;

/// Get one order by identifier.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(order_uid): Path<String>,
) -> Result<Json<Arc<Order>>> {
    let order_uid = OrderUid::parse(&order_uid).map_err(|e| AppError::BadRequest(e.to_string()))?;

    state.cache().get(&order_uid).map(Json).ok_or_else(|| {
        debug!("Order not in cache");
        AppError::NotFound(format!("order {order_uid}"))
    })
}

/// List every cached order, newest first.
#[instrument(skip(state))]
pub async fn index(State(state): State<AppState>) -> Json<Vec<Arc<Order>>> {
    let mut orders = state.cache().get_all();
    orders.sort_by(|a, b| {
        b.date_created
            .cmp(&a.date_created)
            .then_with(|| a.order_uid.cmp(&b.order_uid))
    });
    Json(orders)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode},
    };
    use chrono::Duration;
    use serde_json::Value;
    use tower::ServiceExt;

    use order_stream_core::sample_order;

    use crate::cache::OrderCache;
    use crate::routes::test_support::app;

    async fn get(cache: &OrderCache, uri: &str) -> (StatusCode, Vec<u8>) {
        let response = app(cache.clone())
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, body.to_vec())
    }

    #[tokio::test]
    async fn test_show_cached_order() {
        let cache = OrderCache::new();
        let order = sample_order("b563feb7b2b84b6test");
        cache.set(order.order_uid.clone(), order.clone());

        let (status, body) = get(&cache, "/api/order/b563feb7b2b84b6test").await;

        assert_eq!(status, StatusCode::OK);
        let decoded: order_stream_core::Order = serde_json::from_slice(&body).unwrap();
        assert_eq!(decoded, order);
    }

    #[tokio::test]
    async fn test_show_unknown_order_is_404() {
        let cache = OrderCache::new();
        cache.set("A1".into(), sample_order("A1"));

        let (status, body) = get(&cache, "/api/order/missing").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(String::from_utf8(body).unwrap(), "Not found: order missing");
    }

    #[tokio::test]
    async fn test_show_blank_uid_is_400() {
        let (status, _) = get(&OrderCache::new(), "/api/order/%20").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_show_reflects_cache_updates() {
        let cache = OrderCache::new();
        cache.set("A1".into(), sample_order("A1"));

        let (_, body) = get(&cache, "/api/order/A1").await;
        let v: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(v["items"].as_array().unwrap().len(), 1);

        let mut update = sample_order("A1");
        update.items.clear();
        cache.set("A1".into(), update);

        let (_, body) = get(&cache, "/api/order/A1").await;
        let v: Value = serde_json::from_slice(&body).unwrap();
        assert!(v["items"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_index_lists_newest_first() {
        let cache = OrderCache::new();
        let older = sample_order("older");
        let mut newer = sample_order("newer");
        newer.date_created = older.date_created + Duration::hours(1);
        cache.set(older.order_uid.clone(), older);
        cache.set(newer.order_uid.clone(), newer);

        let (status, body) = get(&cache, "/api/orders").await;

        assert_eq!(status, StatusCode::OK);
        let v: Value = serde_json::from_slice(&body).unwrap();
        let uids: Vec<_> = v
            .as_array()
            .unwrap()
            .iter()
            .map(|o| o["order_uid"].as_str().unwrap().to_owned())
            .collect();
        assert_eq!(uids, ["newer", "older"]);
    }

    #[tokio::test]
    async fn test_index_empty_cache() {
        let (status, body) = get(&OrderCache::new(), "/api/orders").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"[]");
    }
}

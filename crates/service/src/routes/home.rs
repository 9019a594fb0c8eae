//! Lookup page route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::State;
use tracing::instrument;

use crate::state::AppState;

/// Identifiers offered as one-click examples on the page.
const RECENT_ORDERS: usize = 10;

/// Lookup page template.
#[derive(Template, WebTemplate)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    /// Number of orders currently cached.
    pub cached: usize,
    /// Most recently created cached order identifiers.
    pub recent: Vec<String>,
}

/// Display the lookup page.
///
/// The page itself queries `/api/order/{order_uid}` from the browser.
#[instrument(skip(state))]
pub async fn index(State(state): State<AppState>) -> IndexTemplate {
    let mut orders = state.cache().get_all();
    orders.sort_by(|a, b| b.date_created.cmp(&a.date_created));

    IndexTemplate {
        cached: orders.len(),
        recent: orders
            .iter()
            .take(RECENT_ORDERS)
            .map(|o| o.order_uid.to_string())
            .collect(),
    }
}

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::Json;
use serde_json::{json, Value};
use tracing::{error, info};

use crate::cache::token_store::TokenStore;
use crate::error::ProxyError;
use crate::observability::metrics::get_metrics;
use crate::orders::{to_rows, FallbackFilter, OrderRows};
use crate::query::{OrderQuery, RawOrderParams};
use crate::server::server::AppState;

static ORDERS_ENDPOINT: &str = "orders";
static ROWS_ENDPOINT: &str = "order_rows";
static SUCCESS_MSG: &str = "success";

/// `GET /api/orders`: upstream body passed through verbatim.
pub async fn get_orders<S: TokenStore>(
    State(state): State<AppState<S>>,
    params: Result<Query<RawOrderParams>, QueryRejection>,
) -> Result<Json<Value>, ProxyError> {
    let outcome = fetch_orders(&state, params).await;
    record_outcome(ORDERS_ENDPOINT, &outcome).await;
    outcome.map(|(_, body)| Json(body))
}

/// `GET /api/orders/rows`: flattened rows, re-filtered by the caller's dates and status.
pub async fn get_order_rows<S: TokenStore>(
    State(state): State<AppState<S>>,
    params: Result<Query<RawOrderParams>, QueryRejection>,
) -> Result<Json<OrderRows>, ProxyError> {
    let outcome = fetch_orders(&state, params).await;
    record_outcome(ROWS_ENDPOINT, &outcome).await;
    let (query, body) = outcome?;

    let rows = to_rows(&body, &FallbackFilter::from_query(&query));
    info!("serving {} order rows", rows.count);
    Ok(Json(rows))
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn fetch_orders<S: TokenStore>(
    state: &AppState<S>,
    params: Result<Query<RawOrderParams>, QueryRejection>,
) -> Result<(OrderQuery, Value), ProxyError> {
    let Query(raw) = params.map_err(|rejection| ProxyError::validation(rejection.body_text()))?;
    let query = state.translator.validate(&raw)?;
    let upstream_params = state.translator.to_upstream_params(&query);
    let body = state.forwarder.forward(&upstream_params).await?;
    Ok((query, body))
}

async fn record_outcome<T>(endpoint: &str, outcome: &Result<T, ProxyError>) {
    let label = match outcome {
        Ok(_) => SUCCESS_MSG,
        Err(ProxyError::Validation(msg)) => {
            info!("{} request rejected: {}", endpoint, msg);
            "validation"
        }
        Err(e) => {
            error!("{} request failed: {}", endpoint, e);
            e.kind()
        }
    };
    get_metrics()
        .await
        .request_outcomes
        .with_label_values(&[endpoint, label])
        .inc();
}

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::routing::get;
use axum::Router;
use http::{HeaderValue, Method};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::cache::token_store::TokenStore;
use crate::config::settings::{CorsConfig, SettingsConfig};
use crate::observability::metrics::get_metrics;
use crate::observability::routes::MetricsState;
use crate::proxy::ProxyForwarder;
use crate::query::QueryTranslator;
use crate::server::orders::{get_order_rows, get_orders, health};
use crate::utils::constants::{HEALTH_PATH, ORDERS_PATH, ORDER_ROWS_PATH};

pub struct AppState<S: TokenStore> {
    pub translator: Arc<QueryTranslator>,
    pub forwarder: Arc<ProxyForwarder<S>>,
}

impl<S: TokenStore> AppState<S> {
    pub fn new(translator: QueryTranslator, forwarder: ProxyForwarder<S>) -> Self {
        Self {
            translator: Arc::new(translator),
            forwarder: Arc::new(forwarder),
        }
    }
}

impl<S: TokenStore> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            translator: self.translator.clone(),
            forwarder: self.forwarder.clone(),
        }
    }
}

/// Order endpoints, health and (when enabled) metrics, behind CORS and request tracing.
pub async fn build_router<S: TokenStore>(state: AppState<S>, settings: &SettingsConfig) -> Router {
    let metrics = get_metrics().await;
    let metrics_state = MetricsState::new(metrics.registry.clone());

    Router::new()
        .route(ORDERS_PATH, get(get_orders::<S>))
        .route(ORDER_ROWS_PATH, get(get_order_rows::<S>))
        .route(HEALTH_PATH, get(health))
        .with_state(state)
        .merge(metrics_state.router(&settings.metrics))
        .layer(cors_layer(&settings.cors))
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(cors: &CorsConfig) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers(Any);

    if cors.allowed_origins.is_empty() {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = cors
        .allowed_origins
        .iter()
        .filter_map(|origin| {
            HeaderValue::from_str(origin)
                .inspect_err(|e| warn!("ignoring cors origin '{}': {}", origin, e))
                .ok()
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(origins))
}

/// Serves `router` until Ctrl-C or SIGTERM.
pub async fn start(settings_config: &SettingsConfig, router: Router) -> Result<()> {
    let bind_addr = format!("{}:{}", settings_config.server.host, settings_config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("cannot bind {}", bind_addr))?;

    let metrics = get_metrics().await;
    info!("Backend server running on http://{}", bind_addr);
    metrics.up.set(1);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("http server failed")?;

    metrics.up.set(0);
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("cannot listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("cannot listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}

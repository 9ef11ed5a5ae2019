use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use dmc_order_proxy::cache::token_store::OAuth2TokenStore;
use dmc_order_proxy::config::types::UpstreamConfig;
use dmc_order_proxy::observability::service_resources_metrics::collect_process_metrics;
use dmc_order_proxy::proxy::ProxyForwarder;
use dmc_order_proxy::query::QueryTranslator;
use dmc_order_proxy::server::server::{self, AppState};
use dmc_order_proxy::utils::config_loader;
use dmc_order_proxy::utils::constants::DEFAULT_CONFIG_PATH;
use dmc_order_proxy::utils::logging::{self, LogLevel};
use reqwest::Client;
use tracing::{error, info};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, env = "CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: String,
    #[arg(long, env = "LOG_LEVEL", value_enum)]
    log_level: Option<LogLevel>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // -------------------------------
    // 1. Load YAML config, start logging
    // -------------------------------

    let args = Args::parse();
    let service_config = config_loader::run(&args.config).await?;
    logging::run(&service_config, args.log_level)?;
    info!("config loaded: {:?}", service_config.token);

    // -------------------------------
    // 2. Create request client
    // -------------------------------

    let client = build_client(&service_config.upstream)?;

    // -------------------------------
    // 3. Wire token store, translator and forwarder
    // -------------------------------

    let store = Arc::new(OAuth2TokenStore::new(client.clone(), &service_config.token));
    let forwarder = ProxyForwarder::new(client, &service_config.upstream.orders_url, store);
    let translator = QueryTranslator::new(&service_config.upstream.plant);
    let state = AppState::new(translator, forwarder);

    // -------------------------------
    // 4. Scrape process resources in background
    // -------------------------------

    let metrics_enabled = service_config.settings.metrics.is_enabled;
    tokio::spawn(async move {
        if let Err(e) = collect_process_metrics(metrics_enabled).await {
            error!("process metrics collection stopped: {}", e);
        }
    });

    // -------------------------------
    // 5. Serve http until shutdown
    // -------------------------------

    let router = server::build_router(state, &service_config.settings).await;
    info!("Service starting...");
    server::start(&service_config.settings, router).await
}

fn build_client(upstream: &UpstreamConfig) -> Result<Client> {
    let mut builder = Client::builder();
    if let Some(timeout_ms) = upstream.timeout_ms {
        builder = builder.timeout(Duration::from_millis(timeout_ms));
    }
    Ok(builder.build()?)
}

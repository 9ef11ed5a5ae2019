//! Configuration validation with aggregated errors.
//! - Aggregates all issues into Vec<String>
//! - Checks:
//!   * token endpoint url and client credentials
//!   * retry invariants
//!   * upstream url, timeout and plant policy
//!   * server / metrics path / logging level

use reqwest::Url;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::config::settings::SettingsConfig;
use crate::config::types::{PlantMode, RetryConfig, ServiceConfig, TokenConfig, UpstreamConfig};
use crate::observability::metrics::get_metrics;

/// Public entrypoint: returns Ok(()) or Err(Vec<String>) containing all issues.
pub async fn validate_service_config(cfg: &ServiceConfig) -> Result<(), Vec<String>> {
    let mut errors: Vec<String> = Vec::new();

    validate_settings(&cfg.settings, &mut errors);
    validate_token(&cfg.token, &mut errors);
    validate_upstream(&cfg.upstream, &mut errors);

    if errors.is_empty() {
        info!("config validation passed");
        Ok(())
    } else {
        let metrics = get_metrics().await;
        for e in &errors {
            error!("config validation: {}", e);
            metrics.config_validation_errors.inc();
        }
        Err(errors)
    }
}

fn validate_settings(settings: &SettingsConfig, errors: &mut Vec<String>) {
    if settings.server.host.trim().is_empty() {
        errors.push("settings.server.host must not be empty".to_string());
    }
    if settings.server.port == 0 {
        errors.push("settings.server.port must be > 0".to_string());
    }
    if settings.metrics.is_enabled && !settings.metrics.path.starts_with('/') {
        errors.push(format!(
            "settings.metrics.path '{}' must start with '/'",
            settings.metrics.path
        ));
    }
    if let Some(logging) = &settings.logging {
        if EnvFilter::try_new(&logging.level).is_err() {
            errors.push(format!(
                "settings.logging.level '{}' is not a valid filter",
                logging.level
            ));
        }
    }
    for origin in &settings.cors.allowed_origins {
        if Url::parse(origin).is_err() {
            errors.push(format!(
                "settings.cors.allowed_origins entry '{}' is not a valid origin",
                origin
            ));
        }
    }
}

fn validate_token(token: &TokenConfig, errors: &mut Vec<String>) {
    validate_url("token.url", &token.url, errors);
    if token.client_id.trim().is_empty() {
        errors.push("token.client_id must be set".to_string());
    }
    if token.client_secret.trim().is_empty() {
        errors.push("token.client_secret must be set".to_string());
    }
    validate_retry(&token.retry, errors);
}

fn validate_retry(retry: &RetryConfig, errors: &mut Vec<String>) {
    if retry.attempts == 0 {
        errors.push("token.retry.attempts must be >= 1".to_string());
    }
    if retry.max_delay_ms < retry.base_delay_ms {
        errors.push(format!(
            "token.retry.max_delay_ms ({}) must be >= base_delay_ms ({})",
            retry.max_delay_ms, retry.base_delay_ms
        ));
    }
}

fn validate_upstream(upstream: &UpstreamConfig, errors: &mut Vec<String>) {
    validate_url("upstream.orders_url", &upstream.orders_url, errors);
    if upstream.timeout_ms == Some(0) {
        errors.push("upstream.timeout_ms must be > 0 when set".to_string());
    }
    let has_value = upstream
        .plant
        .value
        .as_deref()
        .map(|v| !v.trim().is_empty())
        .unwrap_or(false);
    if upstream.plant.mode != PlantMode::Caller && !has_value {
        errors.push(format!(
            "upstream.plant.value is required when plant mode is {:?}",
            upstream.plant.mode
        ));
    }
}

fn validate_url(field: &str, value: &str, errors: &mut Vec<String>) {
    if value.trim().is_empty() {
        errors.push(format!("{} must be set", field));
        return;
    }
    match Url::parse(value) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
        Ok(url) => errors.push(format!(
            "{} has unsupported scheme '{}'",
            field,
            url.scheme()
        )),
        Err(e) => errors.push(format!("{} '{}' is not a valid url: {}", field, value, e)),
    }
}

use std::path::Path;
use std::sync::LazyLock;

use anyhow::{anyhow, Result};
use regex::Regex;
use tracing::{debug, error, info};

use crate::config::proc_validator;
use crate::config::settings::LoggingConfig;
use crate::config::types::ServiceConfig;
use crate::observability::metrics::get_metrics;

/// Used when no config file exists: everything comes from the environment.
pub const DEFAULT_CONFIG: &str = r#"
settings:
  server:
    host: "${HOST:0.0.0.0}"
    port: ${PORT:3000}
  logging:
    level: "info"
    format: "${LOG_FORMAT:compact}"
  metrics:
    is_enabled: ${METRICS_ENABLED:false}
    path: "/metrics"
token:
  url: "${TOKEN_URL}"
  client_id: "${CLIENT_ID}"
  client_secret: "${CLIENT_SECRET}"
upstream:
  orders_url: "${ORDERS_URL:https://api.test.us20.dmc.cloud.sap/order/v1/orders/list}"
  plant:
    mode: "${PLANT_MODE:caller}"
    value: "${PLANT}"
"#;

/// Load and validate config from YAML file, or from the built-in template if the file is absent
pub async fn file_to_config(path: &Path) -> Result<ServiceConfig> {
    let content = if path.exists() {
        tokio::fs::read_to_string(path).await?
    } else {
        info!(
            "config file {} not found, using environment driven defaults",
            path.display()
        );
        DEFAULT_CONFIG.to_owned()
    };

    let expanded = expand_env_vars(&content);
    parse_config(expanded).await
}

pub async fn parse_config(content: String) -> Result<ServiceConfig> {
    let metrics = get_metrics().await;
    let mut service_config: ServiceConfig = serde_yaml::from_str(&content).inspect_err(|e| {
        error!("parse config error: {}", e);
        metrics.config_validation_errors.inc();
    })?;

    // Apply defaults
    if service_config.settings.logging.is_none() {
        service_config.settings.logging = Some(LoggingConfig::default());
    }

    debug!("validation config ...");
    proc_validator::validate_service_config(&service_config)
        .await
        .map_err(|errors| anyhow!(errors.join("; ")))?;

    Ok(service_config)
}

static ENV_VAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{(\w+)(?::([^\}]*))?\}").expect("static env var pattern"));

/// Replaces `${VAR}` and `${VAR:default}` with the environment value, the default, or "".
pub fn expand_env_vars(input: &str) -> String {
    ENV_VAR.replace_all(input, |caps: &regex::Captures| {
        let var = &caps[1];
        let default = caps.get(2).map(|m| m.as_str()).unwrap_or("");
        std::env::var(var).unwrap_or_else(|_| default.to_string())
    })
    .to_string()
}

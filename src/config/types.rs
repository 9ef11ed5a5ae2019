use serde::Deserialize;

use crate::config::settings::SettingsConfig;
use crate::utils::constants::{
    DEFAULT_RETRY_ATTEMPTS, DEFAULT_RETRY_BASE_DELAY_MS, DEFAULT_RETRY_MAX_DELAY_MS,
};

/// ================================
/// Full service configuration
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct ServiceConfig {
    pub settings: SettingsConfig,
    pub token: TokenConfig,
    pub upstream: UpstreamConfig,
}

/// ================================
/// OAuth2 client-credentials endpoint
/// ================================
#[derive(Deserialize, Clone)]
pub struct TokenConfig {
    pub url: String,
    pub client_id: String,
    pub client_secret: String,
    #[serde(default)]
    pub retry: RetryConfig,
}

impl std::fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenConfig")
            .field("url", &self.url)
            .field("client_id", &self.client_id)
            .field("client_secret", &"***")
            .field("retry", &self.retry)
            .finish()
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetryConfig {
    #[serde(default = "default_attempts")]
    pub attempts: u32,
    /// will be mutiply by 2 on every attempt until max_delay_ms
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    /// invariant: >= base_delay_ms
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: default_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

/// ================================
/// Upstream order API
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct UpstreamConfig {
    pub orders_url: String,
    /// Whole-request timeout; the HTTP client default applies when absent.
    pub timeout_ms: Option<u64>,
    #[serde(default)]
    pub plant: PlantConfig,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct PlantConfig {
    #[serde(default)]
    pub mode: PlantMode,
    pub value: Option<String>,
}

/// Where the `plant` sent upstream comes from.
#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PlantMode {
    /// taken from the request, omitted when blank
    #[default]
    Caller,
    /// always the configured value
    Fixed,
    /// request value, else the configured value
    Fallback,
}

fn default_attempts() -> u32 {
    DEFAULT_RETRY_ATTEMPTS
}

fn default_base_delay_ms() -> u64 {
    DEFAULT_RETRY_BASE_DELAY_MS
}

fn default_max_delay_ms() -> u64 {
    DEFAULT_RETRY_MAX_DELAY_MS
}

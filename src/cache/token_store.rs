use std::future::Future;

use reqwest::Client;
use serde::Deserialize;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::cache::token::Credential;
use crate::config::types::TokenConfig;
use crate::error::AuthError;
use crate::observability::metrics::get_metrics;
use crate::resilience::retry::RetrySettings;

/// Owner of the upstream credential.
///
/// Injected into the forwarder so the credential lifetime is explicit and tests can swap the store.
pub trait TokenStore: Send + Sync + 'static {
    /// Cached credential, or a freshly exchanged one when nothing is cached.
    fn get_token(&self) -> impl Future<Output = Result<Credential, AuthError>> + Send;

    /// Drops the cached credential. Idempotent.
    fn invalidate(&self) -> impl Future<Output = ()> + Send;
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
}

/// Client-credentials store.
///
/// The cache lock is held for the whole exchange, so concurrent callers that find the
/// cache empty wait for the in-flight exchange and reuse its result instead of starting another.
pub struct OAuth2TokenStore {
    client: Client,
    url: String,
    client_id: String,
    client_secret: String,
    retry: RetrySettings,
    cached: Mutex<Option<Credential>>,
}

impl OAuth2TokenStore {
    pub fn new(client: Client, cfg: &TokenConfig) -> Self {
        Self {
            client,
            url: cfg.url.to_owned(),
            client_id: cfg.client_id.to_owned(),
            client_secret: cfg.client_secret.to_owned(),
            retry: RetrySettings::from(&cfg.retry),
            cached: Mutex::new(None),
        }
    }

    #[cfg(test)]
    pub fn with_retry(mut self, retry: RetrySettings) -> Self {
        self.retry = retry;
        self
    }

    async fn exchange(&self) -> Result<Credential, AuthError> {
        let metrics = get_metrics().await;
        let start = Instant::now();

        let result = self
            .retry
            .run_with_retry(|| self.exchange_once(), AuthError::is_transient)
            .await;

        metrics
            .token_fetch_duration
            .observe(start.elapsed().as_secs_f64());
        match &result {
            Ok(_) => info!("token fetched from {} in {:?}", self.url, start.elapsed()),
            Err(e) => {
                metrics
                    .token_fetch_failures
                    .with_label_values(&[e.reason()])
                    .inc();
                warn!("token exchange against {} failed: {}", self.url, e);
            }
        }
        result
    }

    async fn exchange_once(&self) -> Result<Credential, AuthError> {
        get_metrics().await.token_fetch_requests.inc();
        debug!("requesting client credentials token from {}", self.url);

        let response = self
            .client
            .post(&self.url)
            .query(&[("grant_type", "client_credentials")])
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AuthError::Rejected(status));
        }

        let body = response.text().await?;
        let parsed: TokenResponse =
            serde_json::from_str(&body).map_err(|e| AuthError::Malformed(e.to_string()))?;

        parsed
            .access_token
            .filter(|token| !token.is_empty())
            .map(Credential::new)
            .ok_or_else(|| AuthError::Malformed("access_token is missing".to_owned()))
    }
}

impl TokenStore for OAuth2TokenStore {
    async fn get_token(&self) -> Result<Credential, AuthError> {
        let mut cached = self.cached.lock().await;
        if let Some(credential) = cached.as_ref() {
            debug!("reusing credential fetched at {}", credential.fetched_at());
            return Ok(credential.clone());
        }

        let credential = self.exchange().await?;
        *cached = Some(credential.clone());
        Ok(credential)
    }

    async fn invalidate(&self) {
        if self.cached.lock().await.take().is_some() {
            get_metrics().await.token_invalidations.inc();
            info!("cached credential invalidated");
        }
    }
}

use std::sync::Arc;

use http::StatusCode;
use reqwest::Client;
use serde_json::Value;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::cache::token::Credential;
use crate::cache::token_store::TokenStore;
use crate::error::ProxyError;
use crate::observability::metrics::get_metrics;
use crate::query::UpstreamParams;
use crate::utils::constants::MAX_UPSTREAM_ATTEMPTS;

static ERROR_MSG: &str = "error";

/// Result of one upstream call that did not fail outright.
enum Attempt {
    Success(Value),
    Unauthorized,
}

/// Authenticated GET against the upstream order list.
///
/// A 401 drops the cached credential and repeats the call once with a fresh one;
/// every other failure is returned as is.
pub struct ProxyForwarder<S: TokenStore> {
    client: Client,
    orders_url: String,
    store: Arc<S>,
}

impl<S: TokenStore> ProxyForwarder<S> {
    pub fn new(client: Client, orders_url: impl Into<String>, store: Arc<S>) -> Self {
        Self {
            client,
            orders_url: orders_url.into(),
            store,
        }
    }

    pub async fn forward(&self, params: &UpstreamParams) -> Result<Value, ProxyError> {
        debug!("outgoing upstream params: {:?}", params);
        let mut attempt = 1;

        loop {
            let credential = self.store.get_token().await?;
            match self.call(params, &credential, attempt).await? {
                Attempt::Success(body) => return Ok(body),
                Attempt::Unauthorized if attempt < MAX_UPSTREAM_ATTEMPTS => {
                    warn!("upstream rejected the credential, refreshing it and retrying once");
                    self.store.invalidate().await;
                    get_metrics().await.upstream_retries.inc();
                    attempt += 1;
                }
                Attempt::Unauthorized => {
                    warn!("upstream rejected the refreshed credential as well");
                    return Err(ProxyError::UpstreamAuth(format!(
                        "Request failed with status code {}",
                        StatusCode::UNAUTHORIZED.as_u16()
                    )));
                }
            }
        }
    }

    async fn call(
        &self,
        params: &UpstreamParams,
        credential: &Credential,
        attempt: u32,
    ) -> Result<Attempt, ProxyError> {
        let metrics = get_metrics().await;
        let start = Instant::now();
        let attempt_label = attempt.to_string();

        let sent = self
            .client
            .get(&self.orders_url)
            .query(params)
            .bearer_auth(credential.bearer())
            .send()
            .await;
        metrics
            .upstream_duration
            .with_label_values(&[attempt_label.as_str()])
            .observe(start.elapsed().as_secs_f64());

        let response = sent.inspect_err(|e| {
            metrics.upstream_requests.with_label_values(&[ERROR_MSG]).inc();
            warn!("upstream request to {} failed: {}", self.orders_url, e);
        })?;

        let status = response.status();
        metrics
            .upstream_requests
            .with_label_values(&[status.as_str()])
            .inc();
        info!("upstream answered {} on attempt {}", status, attempt);

        if status == StatusCode::UNAUTHORIZED {
            return Ok(Attempt::Unauthorized);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(
                "upstream error {}: {}",
                status,
                body.chars().take(512).collect::<String>()
            );
            return Err(ProxyError::upstream_status(status));
        }

        response
            .json::<Value>()
            .await
            .map(Attempt::Success)
            .map_err(|e| ProxyError::Upstream {
                status: Some(status),
                message: format!("invalid upstream response body: {}", e),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::common::{spawn_upstream, FakeTokenStore, UPSTREAM_PATH};
    use serde_json::json;

    fn params(material: &str) -> UpstreamParams {
        UpstreamParams {
            material: material.to_owned(),
            plant: None,
            order: None,
            execution_status: None,
            date_from: None,
            date_to: None,
        }
    }

    #[tokio::test]
    async fn success_passes_body_through() {
        let body = json!({"content": [{"order": "1", "extra": {"kept": true}}]});
        let upstream = spawn_upstream(vec![(StatusCode::OK, body.clone())]).await;
        let store = Arc::new(FakeTokenStore::default());
        let forwarder = ProxyForwarder::new(Client::new(), upstream.url(), store.clone());

        let got = forwarder.forward(&params("W1")).await.unwrap();

        assert_eq!(got, body);
        let seen = upstream.requests();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].bearer.as_deref(), Some("token-1"));
        assert_eq!(seen[0].query.get("material").map(String::as_str), Some("W1"));
        assert_eq!(store.fetches(), 1);
        assert_eq!(store.invalidations(), 0);
    }

    #[tokio::test]
    async fn retries_once_with_fresh_credential_after_401() {
        let upstream = spawn_upstream(vec![
            (StatusCode::UNAUTHORIZED, json!({"error": "expired"})),
            (StatusCode::OK, json!({"content": []})),
        ])
        .await;
        let store = Arc::new(FakeTokenStore::default());
        let forwarder = ProxyForwarder::new(Client::new(), upstream.url(), store.clone());

        let got = forwarder.forward(&params("W1")).await.unwrap();

        assert_eq!(got, json!({"content": []}));
        let bearers: Vec<_> = upstream.requests().into_iter().map(|r| r.bearer).collect();
        assert_eq!(bearers, vec![Some("token-1".to_owned()), Some("token-2".to_owned())]);
        assert_eq!(store.fetches(), 2);
        assert_eq!(store.invalidations(), 1);
    }

    #[tokio::test]
    async fn second_401_is_terminal() {
        let upstream = spawn_upstream(vec![(StatusCode::UNAUTHORIZED, json!({}))]).await;
        let store = Arc::new(FakeTokenStore::default());
        let forwarder = ProxyForwarder::new(Client::new(), upstream.url(), store.clone());

        let err = forwarder.forward(&params("W1")).await.unwrap_err();

        assert!(matches!(err, ProxyError::UpstreamAuth(_)));
        assert_eq!(err.to_string(), "Request failed with status code 401");
        assert_eq!(upstream.requests().len(), 2);
        assert_eq!(store.invalidations(), 1);
    }

    #[tokio::test]
    async fn other_statuses_are_not_retried() {
        for status in [StatusCode::FORBIDDEN, StatusCode::NOT_FOUND, StatusCode::INTERNAL_SERVER_ERROR] {
            let upstream = spawn_upstream(vec![(status, json!({"error": "nope"}))]).await;
            let store = Arc::new(FakeTokenStore::default());
            let forwarder = ProxyForwarder::new(Client::new(), upstream.url(), store.clone());

            let err = forwarder.forward(&params("W1")).await.unwrap_err();

            match err {
                ProxyError::Upstream { status: Some(s), message } => {
                    assert_eq!(s, status);
                    assert_eq!(message, format!("Request failed with status code {}", status.as_u16()));
                }
                other => panic!("unexpected {:?}", other),
            }
            assert_eq!(upstream.requests().len(), 1);
            assert_eq!(store.invalidations(), 0);
        }
    }

    #[tokio::test]
    async fn token_failure_surfaces_as_auth_error_without_calling_upstream() {
        let upstream = spawn_upstream(vec![(StatusCode::OK, json!({}))]).await;
        let store = Arc::new(FakeTokenStore::failing());
        let forwarder = ProxyForwarder::new(Client::new(), upstream.url(), store);

        let err = forwarder.forward(&params("W1")).await.unwrap_err();

        assert!(matches!(err, ProxyError::UpstreamAuth(_)));
        assert!(upstream.requests().is_empty());
    }

    #[tokio::test]
    async fn network_failure_is_upstream_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let store = Arc::new(FakeTokenStore::default());
        let url = format!("http://{}{}", addr, UPSTREAM_PATH);
        let forwarder = ProxyForwarder::new(Client::new(), url, store.clone());

        let err = forwarder.forward(&params("W1")).await.unwrap_err();

        assert!(matches!(err, ProxyError::Upstream { status: None, .. }));
        assert_eq!(store.fetches(), 1);
        assert_eq!(store.invalidations(), 0);
    }

    #[tokio::test]
    async fn non_json_success_body_is_upstream_error() {
        let upstream = spawn_upstream(vec![]).await;
        let store = Arc::new(FakeTokenStore::default());
        let forwarder = ProxyForwarder::new(Client::new(), upstream.text_url(), store);

        let err = forwarder.forward(&params("W1")).await.unwrap_err();
        assert!(matches!(err, ProxyError::Upstream { status: Some(s), .. } if s == StatusCode::OK));
    }
}

// src/tests/common/mod.rs
pub use axum::Router;
pub use serde_json::json;
pub use tokio::task::JoinHandle;

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::Query;
use axum::http::{header::AUTHORIZATION, HeaderMap, StatusCode};
use axum::routing::get;
use axum::Json;
use reqwest::Client;
use serde_json::Value;

use crate::cache::token::Credential;
use crate::cache::token_store::TokenStore;
use crate::error::AuthError;

pub const UPSTREAM_PATH: &str = "/order/v1/orders/list";
const TEXT_PATH: &str = "/text";

/// Spawn an Axum router on an ephemeral port and return (JoinHandle, SocketAddr)
pub async fn spawn_axum(router: Router) -> (JoinHandle<()>, SocketAddr) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind failed");
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, router).await.expect("server failed");
    });
    (handle, addr)
}

pub fn build_reqwest_client() -> Client {
    Client::builder()
        .timeout(std::time::Duration::from_secs(5))
        .build()
        .expect("reqwest client")
}

/// One request as seen by the fake upstream.
#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub bearer: Option<String>,
    pub query: HashMap<String, String>,
}

/// Fake order list API answering from a script: the n-th call gets the n-th entry,
/// calls past the end repeat the last one.
pub struct UpstreamMock {
    handle: JoinHandle<()>,
    addr: SocketAddr,
    seen: Arc<Mutex<Vec<SeenRequest>>>,
}

impl UpstreamMock {
    pub fn url(&self) -> String {
        format!("http://{}{}", self.addr, UPSTREAM_PATH)
    }

    /// Endpoint answering 200 with a plain text body.
    pub fn text_url(&self) -> String {
        format!("http://{}{}", self.addr, TEXT_PATH)
    }

    pub fn requests(&self) -> Vec<SeenRequest> {
        self.seen.lock().unwrap().clone()
    }
}

impl Drop for UpstreamMock {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub async fn spawn_upstream(script: Vec<(StatusCode, Value)>) -> UpstreamMock {
    let seen: Arc<Mutex<Vec<SeenRequest>>> = Arc::new(Mutex::new(Vec::new()));
    let script = Arc::new(script);

    let seen_clone = seen.clone();
    let router = Router::new()
        .route(
            UPSTREAM_PATH,
            get(move |headers: HeaderMap, Query(query): Query<HashMap<String, String>>| {
                let seen = seen_clone.clone();
                let script = script.clone();
                async move {
                    let bearer = headers
                        .get(AUTHORIZATION)
                        .and_then(|v| v.to_str().ok())
                        .and_then(|v| v.strip_prefix("Bearer "))
                        .map(str::to_owned);
                    let n = {
                        let mut seen = seen.lock().unwrap();
                        seen.push(SeenRequest { bearer, query });
                        seen.len() - 1
                    };
                    let (status, body) = script
                        .get(n)
                        .or(script.last())
                        .cloned()
                        .unwrap_or((StatusCode::OK, json!({})));
                    (status, Json(body))
                }
            }),
        )
        .route(TEXT_PATH, get(|| async { "plain text" }));

    let (handle, addr) = spawn_axum(router).await;
    UpstreamMock { handle, addr, seen }
}

/// In-memory store handing out `token-1`, `token-2`, ... one per exchange.
#[derive(Default)]
pub struct FakeTokenStore {
    fetches: AtomicUsize,
    invalidations: AtomicUsize,
    cached: Mutex<Option<Credential>>,
    fail: bool,
}

impl FakeTokenStore {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn invalidations(&self) -> usize {
        self.invalidations.load(Ordering::SeqCst)
    }
}

impl TokenStore for FakeTokenStore {
    async fn get_token(&self) -> Result<Credential, AuthError> {
        if self.fail {
            return Err(AuthError::Rejected(StatusCode::UNAUTHORIZED));
        }
        let mut cached = self.cached.lock().unwrap();
        if let Some(credential) = cached.as_ref() {
            return Ok(credential.clone());
        }
        let n = self.fetches.fetch_add(1, Ordering::SeqCst) + 1;
        let credential = Credential::new(format!("token-{}", n));
        *cached = Some(credential.clone());
        Ok(credential)
    }

    async fn invalidate(&self) {
        self.invalidations.fetch_add(1, Ordering::SeqCst);
        self.cached.lock().unwrap().take();
    }
}

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Failure of the client-credentials exchange against the token endpoint.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("token request failed with status code {0}")]
    Rejected(StatusCode),

    #[error("token response is malformed: {0}")]
    Malformed(String),

    #[error("token request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

impl AuthError {
    /// Transport errors and 5xx answers may succeed on a later attempt.
    pub fn is_transient(&self) -> bool {
        match self {
            AuthError::Rejected(status) => status.is_server_error(),
            AuthError::Malformed(_) => false,
            AuthError::Transport(_) => true,
        }
    }

    pub fn reason(&self) -> &'static str {
        match self {
            AuthError::Rejected(_) => "rejected",
            AuthError::Malformed(_) => "malformed",
            AuthError::Transport(_) => "transport",
        }
    }
}

/// Everything the order endpoints can answer with instead of the upstream body.
#[derive(Error, Debug)]
pub enum ProxyError {
    /// Caller input was rejected; never retried.
    #[error("{0}")]
    Validation(String),

    /// Upstream kept answering 401, or no credential could be obtained.
    #[error("{0}")]
    UpstreamAuth(String),

    #[error("{message}")]
    Upstream {
        status: Option<StatusCode>,
        message: String,
    },
}

impl ProxyError {
    pub fn validation(msg: impl Into<String>) -> Self {
        ProxyError::Validation(msg.into())
    }

    pub fn upstream_status(status: StatusCode) -> Self {
        ProxyError::Upstream {
            status: Some(status),
            message: format!("Request failed with status code {}", status.as_u16()),
        }
    }

    /// Label used for the request outcome metric.
    pub fn kind(&self) -> &'static str {
        match self {
            ProxyError::Validation(_) => "validation",
            ProxyError::UpstreamAuth(_) => "upstream_auth",
            ProxyError::Upstream { .. } => "upstream",
        }
    }
}

impl From<AuthError> for ProxyError {
    fn from(err: AuthError) -> Self {
        ProxyError::UpstreamAuth(err.to_string())
    }
}

impl From<reqwest::Error> for ProxyError {
    fn from(err: reqwest::Error) -> Self {
        ProxyError::Upstream {
            status: err.status(),
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        match self {
            ProxyError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": msg }))).into_response()
            }
            ProxyError::UpstreamAuth(msg) | ProxyError::Upstream { message: msg, .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "API error", "details": msg })),
            )
                .into_response(),
        }
    }
}

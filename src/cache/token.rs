use chrono::{DateTime, Utc};

/// Bearer credential for the upstream API.
///
/// There is no local expiry: a credential is valid until upstream answers 401.
#[derive(Clone)]
pub struct Credential {
    value: String,
    fetched_at: DateTime<Utc>,
}

impl Credential {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            fetched_at: Utc::now(),
        }
    }

    pub fn bearer(&self) -> &str {
        &self.value
    }

    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("value", &"***")
            .field("fetched_at", &self.fetched_at)
            .finish()
    }
}

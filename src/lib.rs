//! # DMC Order Proxy Library
//!
//! Backend for an order-search form: validates the form's filters, translates them to the
//! SAP DMC order list vocabulary and forwards the call with an OAuth2 client-credentials
//! bearer token, refreshing the token once when upstream answers 401.
//!
//! Modules:
//! - `config`: service configuration, env expansion and validation
//! - `cache`: credential and the single-flight token store
//! - `query`: filter validation and translation to upstream params
//! - `proxy`: authenticated forward with bounded retry
//! - `orders`: typed order records, unit-of-measure chain, rows view
//! - `server`: axum router and handlers

pub mod cache;
pub mod config;
pub mod error;
pub mod observability;
pub mod orders;
pub mod proxy;
pub mod query;
pub mod resilience;
pub mod server;
pub mod utils;

#[cfg(test)]
mod tests;

pub use crate::config::types::ServiceConfig;
pub use crate::error::{AuthError, ProxyError};

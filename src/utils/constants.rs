//! Shared constants and invariants

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_CONFIG_PATH: &str = "dmc-order-proxy.yaml";

pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
pub const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 200;
pub const DEFAULT_RETRY_MAX_DELAY_MS: u64 = 1000;

// Upstream calls per request: the first one plus a single retry after a 401
pub const MAX_UPSTREAM_ATTEMPTS: u32 = 2;

pub const ORDERS_PATH: &str = "/api/orders";
pub const ORDER_ROWS_PATH: &str = "/api/orders/rows";
pub const HEALTH_PATH: &str = "/health";

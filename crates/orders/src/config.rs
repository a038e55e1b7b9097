use std::time::Duration;

/// Default per-request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Connection settings for the order service.
#[derive(Debug, Clone)]
pub struct OrderApiConfig {
    /// Base URL the `/order/{id}` path is appended to.
    pub base_url: String,
    /// Timeout applied to every request.
    pub timeout: Duration,
}

impl OrderApiConfig {
    /// Load configuration from environment variables.
    ///
    /// | Env Var                  | Default    |
    /// |--------------------------|------------|
    /// | `ORDER_API_BASE_URL`     | (required) |
    /// | `ORDER_API_TIMEOUT_SECS` | `10`       |
    pub fn from_env() -> Self {
        let base_url = std::env::var("ORDER_API_BASE_URL").expect("ORDER_API_BASE_URL must be set");

        let timeout_secs: u64 = std::env::var("ORDER_API_TIMEOUT_SECS")
            .unwrap_or_else(|_| DEFAULT_TIMEOUT_SECS.to_string())
            .parse()
            .expect("ORDER_API_TIMEOUT_SECS must be a valid u64");

        Self {
            base_url,
            timeout: Duration::from_secs(timeout_secs),
        }
    }
}

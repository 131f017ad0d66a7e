pub mod fetch;
pub mod github;
pub mod jira;

use once_cell::sync::Lazy;
use std::time::Duration;

/// One pooled client for every tracker request.
pub static HTTP_CLIENT: Lazy<reqwest::Client> = Lazy::new(|| {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .pool_max_idle_per_host(5)
        .user_agent(concat!("jg/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_else(|e| {
            tracing::warn!("Falling back to default HTTP client: {}", e);
            reqwest::Client::new()
        })
});

/// Per-request timeout for the dev-status PR lookup.
pub const DEV_STATUS_TIMEOUT: Duration = Duration::from_secs(15);

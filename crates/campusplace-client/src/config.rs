//! Client configuration.

use std::time::Duration;

/// Default URL of a locally hosted data service.
pub const DEFAULT_URL: &str = "http://127.0.0.1:54321";

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Client configuration.
///
/// A config is handed to an explicitly constructed [`crate::DataClient`];
/// there is no process-wide shared instance.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the hosted data service.
    pub url: String,

    /// API key presented on every request.
    pub api_key: String,

    /// Client identifier for server-side tracking.
    pub client_ref: String,

    /// Request timeout.
    pub timeout: Duration,
}

impl ClientConfig {
    /// Create a new configuration for the given service URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            api_key: String::new(),
            client_ref: generate_client_ref(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Configuration for a locally hosted service.
    pub fn localhost() -> Self {
        Self::new(DEFAULT_URL)
    }

    /// Set the API key.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = api_key.into();
        self
    }

    /// Set the client identifier.
    pub fn with_client_ref(mut self, client_ref: impl Into<String>) -> Self {
        self.client_ref = client_ref.into();
        self
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::localhost()
    }
}

/// Generate a unique client identifier.
fn generate_client_ref() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};

    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);

    format!("client-{:x}", timestamp)
}

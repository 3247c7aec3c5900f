//! Connection settings for the Tuya `OpenAPI`.

use std::time::Duration;

/// Western America data center, the platform's default region.
pub const DEFAULT_ENDPOINT: &str = "https://openapi.tuyaus.com";

/// Credentials and endpoint of a Tuya cloud project.
#[derive(Clone)]
pub struct TuyaConfig {
    /// Project access id, sent as `client_id`.
    pub access_id: String,
    /// Project secret used as the HMAC key. Never logged.
    pub access_key: String,
    /// Base URL without a trailing slash.
    pub endpoint: String,
    /// Per-request HTTP timeout.
    pub timeout: Duration,
}

impl TuyaConfig {
    /// Settings for the default region with a 10 second timeout.
    #[must_use]
    pub fn new(access_id: impl Into<String>, access_key: impl Into<String>) -> Self {
        Self {
            access_id: access_id.into(),
            access_key: access_key.into(),
            endpoint: DEFAULT_ENDPOINT.to_owned(),
            timeout: Duration::from_secs(10),
        }
    }

    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_owned();
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl std::fmt::Debug for TuyaConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TuyaConfig")
            .field("access_id", &self.access_id)
            .field("access_key", &"<redacted>")
            .field("endpoint", &self.endpoint)
            .field("timeout", &self.timeout)
            .finish()
    }
}

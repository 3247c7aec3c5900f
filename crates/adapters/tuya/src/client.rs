//! HTTP client for the Tuya `OpenAPI`.

use std::time::{Duration, Instant};

use chrono::Utc;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio::sync::Mutex;
use uuid::Uuid;

use wattlog_app::ports::TelemetrySource;
use wattlog_domain::error::WattlogError;
use wattlog_domain::telemetry::TelemetryPoint;

use crate::config::TuyaConfig;
use crate::error::TuyaError;
use crate::response::Envelope;
use crate::sign::{SIGN_METHOD, sign, string_to_sign};

const TOKEN_PATH: &str = "/v1.0/token?grant_type=1";

/// Tokens are refreshed this long before the platform expires them.
const TOKEN_MARGIN: Duration = Duration::from_secs(60);

#[derive(Deserialize)]
struct TokenResult {
    access_token: String,
    /// Lifetime in seconds.
    expire_time: u64,
}

struct CachedToken {
    access_token: String,
    refresh_at: Instant,
}

/// Signed client for one Tuya cloud project.
pub struct TuyaClient {
    http: Client,
    config: TuyaConfig,
    token: Mutex<Option<CachedToken>>,
}

impl TuyaClient {
    /// Build a client from project credentials.
    ///
    /// # Errors
    ///
    /// Returns [`TuyaError::InvalidHeader`] when the access id cannot be sent
    /// as a header, or [`TuyaError::Http`] if the HTTP client cannot be built.
    pub fn try_new(config: TuyaConfig) -> Result<Self, TuyaError> {
        let mut headers = HeaderMap::new();
        headers.insert("client_id", HeaderValue::from_str(&config.access_id)?);
        headers.insert("sign_method", HeaderValue::from_static(SIGN_METHOD));
        let http = Client::builder()
            .user_agent("wattlog")
            .default_headers(headers)
            .timeout(config.timeout)
            .build()?;
        Ok(Self {
            http,
            config,
            token: Mutex::new(None),
        })
    }

    /// Current status points of a device.
    ///
    /// # Errors
    ///
    /// Returns [`TuyaError`] on transport failure or a platform error.
    #[tracing::instrument(skip(self))]
    pub async fn device_status(&self, device_id: &str) -> Result<Vec<TelemetryPoint>, TuyaError> {
        self.call(&format!("/v1.0/devices/{device_id}/status")).await
    }

    /// Signed business call, retried once with a fresh token when the
    /// platform rejects the cached one.
    async fn call<R: DeserializeOwned>(&self, path: &str) -> Result<R, TuyaError> {
        let token = self.access_token().await?;
        match self.send(Method::GET, path, Some(&token)).await {
            Err(err) if err.is_token_invalid() => {
                tracing::debug!("access token rejected, refreshing");
                self.token.lock().await.take();
                let token = self.access_token().await?;
                self.send(Method::GET, path, Some(&token)).await
            }
            other => other,
        }
    }

    async fn access_token(&self) -> Result<String, TuyaError> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached
            .as_ref()
            .filter(|token| token.refresh_at > Instant::now())
        {
            return Ok(token.access_token.clone());
        }

        let fresh: TokenResult = self.send(Method::GET, TOKEN_PATH, None).await?;
        tracing::debug!(expire_time = fresh.expire_time, "acquired access token");
        let lifetime = Duration::from_secs(fresh.expire_time).saturating_sub(TOKEN_MARGIN);
        *cached = Some(CachedToken {
            access_token: fresh.access_token.clone(),
            refresh_at: Instant::now() + lifetime,
        });
        Ok(fresh.access_token)
    }

    async fn send<R: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        access_token: Option<&str>,
    ) -> Result<R, TuyaError> {
        let t = Utc::now().timestamp_millis().to_string();
        let nonce = Uuid::new_v4().simple().to_string();
        let signature = sign(
            &self.config.access_key,
            &self.config.access_id,
            access_token,
            &t,
            &nonce,
            &string_to_sign(method.as_str(), b"", path),
        );

        let mut request = self
            .http
            .request(method, format!("{}{path}", self.config.endpoint))
            .header("sign", signature)
            .header("t", t)
            .header("nonce", nonce);
        if let Some(token) = access_token {
            request = request.header("access_token", HeaderValue::from_str(token)?);
        }

        let envelope: Envelope<R> = request.send().await?.error_for_status()?.json().await?;
        tracing::debug!(path, server_time = ?envelope.server_time(), "call completed");
        envelope.into()
    }
}

impl TelemetrySource for TuyaClient {
    async fn current_status(&self, device_id: &str) -> Result<Vec<TelemetryPoint>, WattlogError> {
        Ok(self.device_status(device_id).await?)
    }
}

//! Telemetry source selected at startup.

use wattlog_adapter_tuya::{TuyaClient, TuyaError};
use wattlog_app::ports::TelemetrySource;
use wattlog_domain::error::WattlogError;
use wattlog_domain::telemetry::TelemetryPoint;

use crate::config::TuyaSettings;

/// Returned for every fetch when no vendor credentials are configured.
#[derive(Debug, thiserror::Error)]
#[error("no telemetry source configured")]
pub struct TelemetryDisabled;

/// The vendor client, or nothing when credentials are missing. The HTTP
/// API stays usable either way; collection runs then report every meter as
/// failed.
pub enum Telemetry {
    Tuya(TuyaClient),
    Disabled,
}

impl Telemetry {
    /// Build the client when both credentials are present.
    ///
    /// # Errors
    ///
    /// Returns [`TuyaError`] when the HTTP client cannot be built.
    pub fn from_settings(settings: &TuyaSettings) -> Result<Self, TuyaError> {
        match settings.client_config() {
            Some(config) => Ok(Self::Tuya(TuyaClient::try_new(config)?)),
            None => Ok(Self::Disabled),
        }
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        matches!(self, Self::Tuya(_))
    }
}

impl TelemetrySource for Telemetry {
    async fn current_status(&self, device_id: &str) -> Result<Vec<TelemetryPoint>, WattlogError> {
        match self {
            Self::Tuya(client) => client.current_status(device_id).await,
            Self::Disabled => Err(WattlogError::Telemetry(Box::new(TelemetryDisabled))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn should_fail_fetches_when_disabled() {
        let telemetry = Telemetry::from_settings(&TuyaSettings::default()).unwrap();

        assert!(!telemetry.is_enabled());
        let err = telemetry.current_status("bf01").await.unwrap_err();
        assert!(matches!(err, WattlogError::Telemetry(_)));
    }

    #[test]
    fn should_build_client_when_credentials_present() {
        let settings = TuyaSettings {
            access_id: Some("id".to_string()),
            access_key: Some("key".to_string()),
            ..TuyaSettings::default()
        };

        assert!(Telemetry::from_settings(&settings).unwrap().is_enabled());
    }
}

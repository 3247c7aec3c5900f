//! Telemetry port — current device status from the vendor platform.

use std::future::Future;

use wattlog_domain::error::WattlogError;
use wattlog_domain::telemetry::TelemetryPoint;

/// Source of live device status.
///
/// Implementations map their transport failures to [`WattlogError::Telemetry`].
/// They should bound their own network calls; the collection job adds an
/// outer timeout on top.
pub trait TelemetrySource: Send + Sync {
    /// Fetch the current `{code, value}` status list of a device.
    fn current_status(
        &self,
        device_id: &str,
    ) -> impl Future<Output = Result<Vec<TelemetryPoint>, WattlogError>> + Send;
}

//! Tuya-specific error type.

use wattlog_domain::error::WattlogError;

/// Platform code returned when the access token is no longer valid.
pub(crate) const TOKEN_INVALID: i64 = 1010;

/// Errors originating from the Tuya adapter.
#[derive(Debug, thiserror::Error)]
pub enum TuyaError {
    /// Transport failure, non-2xx status or undecodable body.
    #[error("http error")]
    Http(#[from] reqwest::Error),

    /// The platform answered with `success: false`.
    #[error("tuya api error {code}: {message}")]
    Api { code: i64, message: String },

    /// `success: true` without a `result` field.
    #[error("tuya response has no result")]
    MissingResult,

    /// A credential contains characters not allowed in a header.
    #[error("invalid header value")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),
}

impl TuyaError {
    pub(crate) fn is_token_invalid(&self) -> bool {
        matches!(self, Self::Api { code, .. } if *code == TOKEN_INVALID)
    }
}

impl From<TuyaError> for WattlogError {
    fn from(err: TuyaError) -> Self {
        Self::Telemetry(Box::new(err))
    }
}

//! Generic response envelope.

use serde::Deserialize;

use crate::error::TuyaError;

/// Every `OpenAPI` answer wraps its payload in this envelope, with HTTP 200
/// even on failure.
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<R> {
    success: bool,

    result: Option<R>,

    code: Option<i64>,

    #[serde(rename = "msg")]
    message: Option<String>,

    /// Server time in milliseconds.
    #[serde(rename = "t")]
    server_time: Option<i64>,
}

impl<R> Envelope<R> {
    pub(crate) fn server_time(&self) -> Option<i64> {
        self.server_time
    }
}

impl<R> From<Envelope<R>> for Result<R, TuyaError> {
    fn from(envelope: Envelope<R>) -> Self {
        if !envelope.success {
            return Err(TuyaError::Api {
                code: envelope.code.unwrap_or_default(),
                message: envelope
                    .message
                    .unwrap_or_else(|| "unknown error".to_owned()),
            });
        }
        envelope.result.ok_or(TuyaError::MissingResult)
    }
}

use thiserror::Error;

/// Failure kinds the gateway can surface. Transport and decode failures are
/// distinct variants so callers can apply different recovery policies to
/// each.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("request to model endpoint failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("model endpoint returned status {status}: {body}")]
    Api { status: u16, body: String },

    #[error("could not decode model response envelope: {0}")]
    Envelope(String),

    #[error("model returned an empty response")]
    EmptyResponse,

    #[error("model output failed to decode: {detail}")]
    Decode { detail: String },
}

impl GatewayError {
    pub fn decode(detail: impl Into<String>) -> Self {
        GatewayError::Decode {
            detail: detail.into(),
        }
    }
}

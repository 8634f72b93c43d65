use serde::Deserialize;
use thiserror::Error;

/// Provider-originated failures, pre-classified so the orchestrator can map
/// retryable races (already exists / not found) to the protocol's canonical
/// errors instead of a generic failure.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("resource already exists: {0}")]
    Conflict(String),
    #[error("resource not found: {0}")]
    NotFound(String),
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("provider request failed ({status}): {message}")]
    Other { status: u16, message: String },
    #[error("provider transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

impl ProviderError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ProviderError::NotFound(_))
    }
}

/// Error body shape the provider returns alongside non-2xx statuses.
#[derive(Debug, Default, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub detail: String,
    #[serde(default, rename = "errorCode")]
    pub error_code: String,
}

/// Map an HTTP status plus decoded error body onto the taxonomy. The
/// provider signals duplicates either with 409 or with a DUPLICATE error
/// code on 400.
pub fn classify(status: u16, body: ApiErrorBody) -> ProviderError {
    let message = if body.detail.is_empty() {
        body.error_code.clone()
    } else {
        body.detail.clone()
    };
    match status {
        404 => ProviderError::NotFound(message),
        409 => ProviderError::Conflict(message),
        401 | 403 => ProviderError::Unauthorized(message),
        _ if body.error_code.contains("DUPLICATE") || body.error_code.contains("ALREADY_EXISTS") => {
            ProviderError::Conflict(message)
        }
        _ if body.error_code.contains("NOT_FOUND") => ProviderError::NotFound(message),
        _ => ProviderError::Other { status, message },
    }
}

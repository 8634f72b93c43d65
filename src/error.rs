use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;
use thiserror::Error;

use crate::provider::ProviderError;

/// Broker-level error taxonomy. Provider errors are reclassified here (never
/// swallowed, never retried) so the platform can tell retryable races from
/// real failures.
#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("template parse error: {0}")]
    TemplateParse(String),
    #[error("template render error: {0}")]
    Render(String),
    #[error("plan decode error: {0}")]
    Decode(String),
    #[error("plan validation error: {0}")]
    Validation(String),
    #[error("resource already exists: {0}")]
    AlreadyExists(String),
    #[error("resource does not exist: {0}")]
    DoesNotExist(String),
    #[error("this broker only supports asynchronous operations")]
    AsyncRequired,
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("unknown custom operation: {0}")]
    UnknownOperation(String),
    #[error("provider request failed ({status}): {message}")]
    Provider { status: u16, message: String },
    #[error("state store error: {0}")]
    Store(#[from] anyhow::Error),
}

impl From<ProviderError> for BrokerError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Conflict(msg) => BrokerError::AlreadyExists(msg),
            ProviderError::NotFound(msg) => BrokerError::DoesNotExist(msg),
            ProviderError::Unauthorized(msg) => BrokerError::Unauthorized(msg),
            ProviderError::Other { status, message } => BrokerError::Provider { status, message },
            ProviderError::Transport(e) => BrokerError::Provider {
                status: 0,
                message: e.to_string(),
            },
        }
    }
}

/// OSB error body: machine-readable code plus a human description.
#[derive(Debug, Serialize)]
pub struct OsbErrorBody {
    pub error: String,
    pub description: String,
}

impl BrokerError {
    fn status(&self) -> StatusCode {
        match self {
            BrokerError::AlreadyExists(_) => StatusCode::CONFLICT,
            BrokerError::DoesNotExist(_) => StatusCode::GONE,
            BrokerError::AsyncRequired => StatusCode::UNPROCESSABLE_ENTITY,
            BrokerError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            BrokerError::Validation(_) | BrokerError::UnknownOperation(_) => {
                StatusCode::BAD_REQUEST
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            BrokerError::AlreadyExists(_) => "AlreadyExists",
            BrokerError::DoesNotExist(_) => "DoesNotExist",
            BrokerError::AsyncRequired => "AsyncRequired",
            BrokerError::Unauthorized(_) => "Unauthorized",
            BrokerError::Validation(_) => "ValidationError",
            BrokerError::UnknownOperation(_) => "UnknownOperation",
            _ => "InternalError",
        }
    }
}

impl IntoResponse for BrokerError {
    fn into_response(self) -> Response {
        let status = self.status();
        // Internal diagnostic detail is logged, not returned verbatim to
        // untrusted callers.
        let description = if status.is_server_error() {
            log::error!("request failed: {}", self);
            "internal broker error".to_string()
        } else {
            log::warn!("request rejected: {}", self);
            self.to_string()
        };
        let body = OsbErrorBody {
            error: self.code().to_string(),
            description,
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_errors_map_to_canonical_variants() {
        let err: BrokerError = ProviderError::Conflict("cluster exists".into()).into();
        assert!(matches!(err, BrokerError::AlreadyExists(_)));
        assert_eq!(err.status(), StatusCode::CONFLICT);

        let err: BrokerError = ProviderError::NotFound("no cluster".into()).into();
        assert!(matches!(err, BrokerError::DoesNotExist(_)));
        assert_eq!(err.status(), StatusCode::GONE);

        let err: BrokerError = ProviderError::Other {
            status: 503,
            message: "down".into(),
        }
        .into();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn async_required_uses_osb_code() {
        assert_eq!(BrokerError::AsyncRequired.code(), "AsyncRequired");
        assert_eq!(
            BrokerError::AsyncRequired.status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }
}

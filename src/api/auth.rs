use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::sync::Arc;

use crate::error::BrokerError;
use crate::logic::Broker;
use crate::store::InstanceStore;

/// Extractor asserting the request carries the broker's basic-auth
/// credential. Every OSB endpoint requires it.
pub struct Operator;

#[async_trait]
impl<S: InstanceStore + 'static> FromRequestParts<Arc<Broker<S>>> for Operator {
    type Rejection = BrokerError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<Broker<S>>,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| BrokerError::Unauthorized("missing Authorization header".into()))?;

        let encoded = header
            .strip_prefix("Basic ")
            .ok_or_else(|| BrokerError::Unauthorized("expected basic authentication".into()))?;
        let decoded = STANDARD
            .decode(encoded)
            .ok()
            .and_then(|bytes| String::from_utf8(bytes).ok())
            .ok_or_else(|| BrokerError::Unauthorized("malformed basic credentials".into()))?;
        let (username, password) = decoded
            .split_once(':')
            .ok_or_else(|| BrokerError::Unauthorized("malformed basic credentials".into()))?;

        let broker = &state.credentials.broker;
        if username != broker.username || password != broker.password {
            return Err(BrokerError::Unauthorized("invalid broker credentials".into()));
        }
        Ok(Operator)
    }
}

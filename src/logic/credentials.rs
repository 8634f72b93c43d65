use std::fs;

use crate::error::BrokerError;
use crate::model::{CredentialBundle, CredentialSet};

pub const APIKEYS_ENV: &str = "BROKER_APIKEYS";
pub const VCAP_ENV: &str = "VCAP_SERVICES";

/// Resolve provider credentials from the environment. Sources are tried in
/// fixed precedence; a present-but-malformed source is fatal and never
/// falls through to the next one:
/// 1. `BROKER_APIKEYS` — inline JSON bundle, or a path to a JSON file.
/// 2. `VCAP_SERVICES` — a platform-injected secret binding carrying the
///    same bundle shape under some service's `credentials` object.
/// 3. Nothing else. There is no degraded single-credential fallback;
///    startup fails loudly instead.
pub fn resolve() -> Result<CredentialSet, BrokerError> {
    resolve_from(
        std::env::var(APIKEYS_ENV).ok().as_deref(),
        std::env::var(VCAP_ENV).ok().as_deref(),
    )
}

pub fn resolve_from(
    apikeys: Option<&str>,
    vcap: Option<&str>,
) -> Result<CredentialSet, BrokerError> {
    if let Some(raw) = apikeys {
        let raw = raw.trim();
        if !raw.is_empty() {
            log::info!("resolving credentials from {}", APIKEYS_ENV);
            return parse_bundle_source(raw);
        }
    }

    if let Some(raw) = vcap {
        let raw = raw.trim();
        if !raw.is_empty() {
            log::info!("resolving credentials from {}", VCAP_ENV);
            return parse_vcap(raw);
        }
    }

    Err(BrokerError::Config(format!(
        "no credentials found: set {} to a credential bundle (inline JSON or a file path) \
         or bind one through {}",
        APIKEYS_ENV, VCAP_ENV
    )))
}

/// Inline JSON when the value looks like a document, a file path otherwise.
fn parse_bundle_source(raw: &str) -> Result<CredentialSet, BrokerError> {
    let json = if raw.starts_with('{') {
        raw.to_string()
    } else {
        fs::read_to_string(raw).map_err(|e| {
            BrokerError::Config(format!("cannot read credential file {}: {}", raw, e))
        })?
    };
    let bundle: serde_json::Result<CredentialBundle> = serde_json::from_str(&json);
    let bundle =
        bundle.map_err(|e| BrokerError::Config(format!("malformed credential bundle: {}", e)))?;
    CredentialSet::from_bundle(bundle).map_err(BrokerError::Config)
}

/// `VCAP_SERVICES` is a mapping of service label to an array of bound
/// service instances; the first entry whose `credentials` object decodes as
/// a bundle wins. A binding that is present but malformed is fatal.
fn parse_vcap(raw: &str) -> Result<CredentialSet, BrokerError> {
    let services: serde_json::Value = serde_json::from_str(raw)
        .map_err(|e| BrokerError::Config(format!("malformed {}: {}", VCAP_ENV, e)))?;

    let entries = services
        .as_object()
        .into_iter()
        .flat_map(|m| m.values())
        .flat_map(|v| v.as_array().into_iter().flatten());

    for entry in entries {
        let Some(credentials) = entry.get("credentials") else {
            continue;
        };
        let bundle: CredentialBundle = serde_json::from_value(credentials.clone())
            .map_err(|e| BrokerError::Config(format!("malformed bound credentials: {}", e)))?;
        return CredentialSet::from_bundle(bundle).map_err(BrokerError::Config);
    }

    Err(BrokerError::Config(format!(
        "{} is set but contains no service binding with credentials",
        VCAP_ENV
    )))
}

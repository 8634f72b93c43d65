pub mod binding;
pub mod catalog;
pub mod credentials;
pub mod custom_ops;
pub mod poll;
pub mod provision;
pub mod render;
pub mod templates;

pub use binding::*;
pub use catalog::*;
pub use poll::*;
pub use provision::*;
pub use render::*;
pub use templates::*;

use std::sync::Arc;

use crate::config::ServiceSettings;
use crate::error::BrokerError;
use crate::model::{Credential, CredentialSet, Plan};
use crate::provider::AtlasClient;
use crate::store::InstanceStore;

/// The broker core: immutable startup state plus the persisted instance
/// store. One instance is shared read-only by every request handler; no
/// in-process lock serializes operations against the same instance id.
pub struct Broker<S: InstanceStore> {
    pub provider_base_url: String,
    pub credentials: Arc<CredentialSet>,
    pub templates: Arc<TemplateCatalog>,
    pub catalog: Arc<BuiltCatalog>,
    pub store: Arc<S>,
}

impl<S: InstanceStore> Broker<S> {
    pub fn new(
        provider_base_url: String,
        credentials: CredentialSet,
        templates: TemplateCatalog,
        whitelist: Whitelist,
        service: &ServiceSettings,
        store: Arc<S>,
    ) -> Self {
        let built = build_catalog(&templates, &credentials, &whitelist, service);
        Self {
            provider_base_url,
            credentials: Arc::new(credentials),
            templates: Arc::new(templates),
            catalog: Arc::new(built),
            store,
        }
    }

    /// Provider client for a plan: the plan's own API key when it names
    /// one, the first resolved project credential otherwise.
    pub(crate) fn client_for(&self, plan: &Plan) -> Result<AtlasClient, BrokerError> {
        let credential: Credential = match &plan.api_key {
            Some(key) if !key.is_empty() => key.clone(),
            _ => self.credentials.first_project().clone(),
        };
        if credential.public_key.is_empty() || credential.private_key.is_empty() {
            return Err(BrokerError::Config(format!(
                "plan \"{}\" resolves to an empty provider credential",
                plan.name
            )));
        }
        Ok(AtlasClient::new(&self.provider_base_url, credential))
    }
}

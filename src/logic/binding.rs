use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::Deserialize;
use serde_json::Value;

use crate::error::BrokerError;
use crate::logic::Broker;
use crate::model::{
    ConnectionDetails, DatabaseUserRole, DatabaseUserSpec, Plan, DEFAULT_BIND_DATABASE,
    DEFAULT_BIND_ROLE, SETTING_OVERRIDE_BIND_DB, SETTING_OVERRIDE_BIND_DB_ROLE,
};
use crate::store::InstanceStore;

/// Caller-supplied bind parameters: an optional partial database-user
/// descriptor merged over plan defaults. The username, if supplied, is
/// ignored; the binding id is the identity.
#[derive(Debug, Default, Deserialize)]
struct BindParams {
    #[serde(default)]
    user: Option<DatabaseUserSpec>,
}

impl<S: InstanceStore> Broker<S> {
    /// Create an ephemeral per-binding database user and derive connection
    /// information from the live cluster. Nothing is persisted broker-side;
    /// the remote user record is the binding.
    pub async fn bind(
        &self,
        instance_id: &str,
        binding_id: &str,
        raw_params: Option<&Value>,
    ) -> Result<ConnectionDetails, BrokerError> {
        let instance = self
            .store
            .get_instance(instance_id)
            .await?
            .ok_or_else(|| {
                BrokerError::DoesNotExist(format!("service instance \"{}\"", instance_id))
            })?;
        let client = self.client_for(&instance.plan)?;

        // Re-verify the target cluster exists; its absence is the
        // protocol's does-not-exist error, not a generic failure.
        let cluster = client
            .get_cluster(&instance.group_id, &instance.plan.cluster.name)
            .await
            .map_err(|err| {
                if err.is_not_found() {
                    BrokerError::DoesNotExist(format!(
                        "cluster for service instance \"{}\"",
                        instance_id
                    ))
                } else {
                    err.into()
                }
            })?;

        let password = generate_password();
        let user = binding_user(&instance.plan, binding_id, &password, raw_params)?;
        client.create_database_user(&instance.group_id, &user).await?;
        log::info!(
            "created binding user \"{}\" on instance {}",
            binding_id,
            instance_id
        );

        let endpoint = cluster.connection_base().ok_or_else(|| {
            BrokerError::Provider {
                status: 0,
                message: format!(
                    "cluster \"{}\" exposes no connection endpoint yet",
                    cluster.name
                ),
            }
        })?;
        let uri = connection_uri(endpoint, binding_id, &password, &user.database_name);

        Ok(ConnectionDetails {
            username: binding_id.to_string(),
            password,
            connection_string: uri.clone(),
            uri,
        })
    }

    /// Delete the database user named exactly `binding_id`.
    pub async fn unbind(&self, instance_id: &str, binding_id: &str) -> Result<(), BrokerError> {
        let instance = self
            .store
            .get_instance(instance_id)
            .await?
            .ok_or_else(|| {
                BrokerError::DoesNotExist(format!("service instance \"{}\"", instance_id))
            })?;
        let client = self.client_for(&instance.plan)?;

        client
            .get_cluster(&instance.group_id, &instance.plan.cluster.name)
            .await
            .map_err(|err| {
                if err.is_not_found() {
                    BrokerError::DoesNotExist(format!(
                        "cluster for service instance \"{}\"",
                        instance_id
                    ))
                } else {
                    BrokerError::from(err)
                }
            })?;

        let database = bind_database(&instance.plan);
        client
            .delete_database_user(&instance.group_id, &database, binding_id)
            .await?;
        log::info!(
            "deleted binding user \"{}\" on instance {}",
            binding_id,
            instance_id
        );
        Ok(())
    }
}

/// 32 bytes from the OS entropy source, URL-safe encoded.
pub fn generate_password() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

fn bind_database(plan: &Plan) -> String {
    plan.setting(SETTING_OVERRIDE_BIND_DB)
        .unwrap_or(DEFAULT_BIND_DATABASE)
        .to_string()
}

/// Build the binding's database-user descriptor: caller overrides merged
/// with plan defaults, username forced to the binding id.
fn binding_user(
    plan: &Plan,
    binding_id: &str,
    password: &str,
    raw_params: Option<&Value>,
) -> Result<DatabaseUserSpec, BrokerError> {
    let params: BindParams = match raw_params {
        Some(raw) => serde_json::from_value(raw.clone())
            .map_err(|e| BrokerError::Validation(format!("bind parameters: {}", e)))?,
        None => BindParams::default(),
    };
    let mut user = params.user.unwrap_or_default();

    user.username = binding_id.to_string();
    user.password = password.to_string();
    user.database_name = bind_database(plan);

    if user.roles.is_empty() {
        user.roles = if plan.default_binding_roles.is_empty() {
            vec![DatabaseUserRole {
                role_name: plan
                    .setting(SETTING_OVERRIDE_BIND_DB_ROLE)
                    .unwrap_or(DEFAULT_BIND_ROLE)
                    .to_string(),
                database_name: DEFAULT_BIND_DATABASE.to_string(),
                collection_name: None,
            }]
        } else {
            plan.default_binding_roles.clone()
        };
    }

    Ok(user)
}

/// Embed credentials and the target database into a provider connection
/// string of the form `scheme://host`.
fn connection_uri(endpoint: &str, username: &str, password: &str, database: &str) -> String {
    match endpoint.split_once("://") {
        Some((scheme, host)) => {
            let host = host.trim_end_matches('/');
            format!("{}://{}:{}@{}/{}", scheme, username, password, host, database)
        }
        None => format!("{}:{}@{}/{}", username, password, endpoint, database),
    }
}

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

use crate::model::{Credential, REDACTED};

/// Plan setting key overriding the database bindings are scoped to.
pub const SETTING_OVERRIDE_BIND_DB: &str = "overrideBindDB";
/// Plan setting key overriding the role granted to binding users.
pub const SETTING_OVERRIDE_BIND_DB_ROLE: &str = "overrideBindDBRole";

pub const DEFAULT_BIND_DATABASE: &str = "admin";
pub const DEFAULT_BIND_ROLE: &str = "readWriteAnyDatabase";

/// The rendered, concrete resource specification a template produces for
/// one service plan. Immutable once rendered; persisted verbatim with the
/// service instance so update and deprovision can replay it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    /// Logical plan name; falls back to the template name when omitted.
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub free: bool,
    /// Provider API key this plan operates under. When absent the first
    /// project credential from the resolved set is used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<Credential>,
    pub project: ProjectSpec,
    pub cluster: ClusterSpec,
    #[serde(default)]
    pub database_users: Vec<DatabaseUserSpec>,
    #[serde(default)]
    pub ip_access_lists: Vec<IpAccessListSpec>,
    /// Roles granted to binding users when the caller supplies none.
    #[serde(default)]
    pub default_binding_roles: Vec<DatabaseUserRole>,
    /// Plan-declared side-effect operations run after the resource graph
    /// is created.
    #[serde(default)]
    pub operations: Vec<PlanOperation>,
    /// Open settings bag for provider-specific toggles.
    #[serde(default)]
    pub settings: HashMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSpec {
    pub name: String,
    #[serde(default)]
    pub provider_settings: ProviderSettings,
    /// Provider fields passed through untouched (disk size, sharding,
    /// backup toggles, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderSettings {
    #[serde(default)]
    pub provider_name: String,
    #[serde(default)]
    pub instance_size_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region_name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseUserSpec {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_database_name")]
    pub database_name: String,
    #[serde(default)]
    pub roles: Vec<DatabaseUserRole>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseUserRole {
    pub role_name: String,
    #[serde(default = "default_database_name")]
    pub database_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IpAccessListSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cidr_block: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanOperation {
    pub op: String,
    #[serde(default)]
    pub params: Map<String, Value>,
}

fn default_database_name() -> String {
    DEFAULT_BIND_DATABASE.to_string()
}

impl Plan {
    /// A plan without a concrete provider and instance size cannot be
    /// provisioned and must not be surfaced in the catalog.
    pub fn validate(&self) -> Result<(), String> {
        let settings = &self.cluster.provider_settings;
        if settings.provider_name.trim().is_empty() {
            return Err(format!(
                "plan \"{}\": cluster is missing providerSettings.providerName",
                self.name
            ));
        }
        if settings.instance_size_name.trim().is_empty() {
            return Err(format!(
                "plan \"{}\": cluster is missing providerSettings.instanceSizeName",
                self.name
            ));
        }
        Ok(())
    }

    /// Copy of the plan safe to log or surface externally: private keys and
    /// user passwords are replaced with the redaction marker.
    pub fn redacted(&self) -> Plan {
        let mut plan = self.clone();
        if let Some(key) = &mut plan.api_key {
            if !key.private_key.is_empty() {
                key.private_key = REDACTED.to_string();
            }
        }
        for user in &mut plan.database_users {
            if !user.password.is_empty() {
                user.password = REDACTED.to_string();
            }
        }
        plan
    }

    pub fn setting(&self, key: &str) -> Option<&str> {
        self.settings.get(key).map(String::as_str)
    }
}

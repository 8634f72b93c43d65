use serde::{Deserialize, Serialize};

use crate::model::ProviderSettings;

/// Provider-side project (group) container.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectInput {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org_id: Option<String>,
}

/// Observed cluster lifecycle states as the provider reports them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClusterState {
    Idle,
    Creating,
    Updating,
    Deleting,
    Deleted,
    Repairing,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionStrings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub standard: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub standard_srv: Option<String>,
}

/// Provider-observed cluster. Only the fields the broker reads are typed;
/// create and update bodies are built from the plan's cluster spec instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cluster {
    pub name: String,
    pub state_name: ClusterState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_settings: Option<ProviderSettings>,
    #[serde(default)]
    pub connection_strings: ConnectionStrings,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub srv_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paused: Option<bool>,
}

impl Cluster {
    /// Preferred connection endpoint: SRV record when available, plain
    /// standard string otherwise.
    pub fn connection_base(&self) -> Option<&str> {
        self.connection_strings
            .standard_srv
            .as_deref()
            .or(self.srv_address.as_deref())
            .or(self.connection_strings.standard.as_deref())
    }
}

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::model::Id;

/// The OSB catalog advertised on GET /v2/catalog.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    pub services: Vec<Service>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    pub id: Id,
    pub name: String,
    pub description: String,
    pub bindable: bool,
    /// Instance and binding retrieval are declared unsupported; callers
    /// must not rely on GET endpoints.
    pub instances_retrievable: bool,
    pub bindings_retrievable: bool,
    pub plan_updateable: bool,
    pub plans: Vec<ServicePlan>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServicePlan {
    pub id: Id,
    pub name: String,
    pub description: String,
    pub free: bool,
    /// Carries provider name, instance size, and the redacted rendered
    /// plan for audit.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
}

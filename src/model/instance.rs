use serde::{Deserialize, Serialize};

use crate::model::{Id, Plan};

/// Persisted record of one provisioned cluster. Created on successful
/// provisioning submission, read on every subsequent lifecycle call for the
/// instance, deleted once deprovisioning is confirmed complete.
///
/// The full rendered plan is stored unredacted so update and deprovision can
/// replay it after a process restart; protecting the store at rest is a
/// deployment concern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceInstance {
    pub id: Id,
    pub service_id: Id,
    pub plan_id: Id,
    /// Provider-side project (group) owning the cluster.
    pub group_id: String,
    pub dashboard_url: String,
    pub plan: Plan,
    /// When the instance was created. ISO 8601 string
    pub created_at: String,
}

use crate::model::ServiceInstance;
use anyhow::Result;

/// Persisted service-instance state. Read fresh on every lifecycle call:
/// the record is the single source of truth, there is no in-memory
/// instance table.
#[async_trait::async_trait]
pub trait InstanceStore: Send + Sync {
    async fn get_instance(&self, id: &str) -> Result<Option<ServiceInstance>>;
    async fn upsert_instance(&self, instance: ServiceInstance) -> Result<()>;
    async fn delete_instance(&self, id: &str) -> Result<bool>;
}

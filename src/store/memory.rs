use anyhow::Result;
use parking_lot::RwLock;
use std::collections::HashMap;

use crate::model::ServiceInstance;
use crate::store::traits::InstanceStore;

/// In-memory instance store for tests and local development. State does not
/// survive a restart; production deployments use the Postgres store.
#[derive(Default)]
pub struct MemoryInstanceStore {
    instances: RwLock<HashMap<String, ServiceInstance>>,
}

impl MemoryInstanceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl InstanceStore for MemoryInstanceStore {
    async fn get_instance(&self, id: &str) -> Result<Option<ServiceInstance>> {
        Ok(self.instances.read().get(id).cloned())
    }

    async fn upsert_instance(&self, instance: ServiceInstance) -> Result<()> {
        self.instances
            .write()
            .insert(instance.id.clone(), instance);
        Ok(())
    }

    async fn delete_instance(&self, id: &str) -> Result<bool> {
        Ok(self.instances.write().remove(id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ClusterSpec, Plan, ProjectSpec, ProviderSettings};

    fn instance(id: &str) -> ServiceInstance {
        ServiceInstance {
            id: id.to_string(),
            service_id: "svc".into(),
            plan_id: "plan".into(),
            group_id: "group".into(),
            dashboard_url: "https://example.test".into(),
            plan: Plan {
                name: "basic".into(),
                description: String::new(),
                free: true,
                api_key: None,
                project: ProjectSpec {
                    name: "proj".into(),
                    desc: None,
                },
                cluster: ClusterSpec {
                    name: "cls".into(),
                    provider_settings: ProviderSettings {
                        provider_name: "AWS".into(),
                        instance_size_name: "M10".into(),
                        region_name: None,
                        extra: Default::default(),
                    },
                    extra: Default::default(),
                },
                database_users: vec![],
                ip_access_lists: vec![],
                default_binding_roles: vec![],
                operations: vec![],
                settings: Default::default(),
            },
            created_at: "2024-01-01T00:00:00Z".into(),
        }
    }

    #[tokio::test]
    async fn round_trips_instances() {
        let store = MemoryInstanceStore::new();
        store.upsert_instance(instance("a")).await.unwrap();

        let found = store.get_instance("a").await.unwrap().unwrap();
        assert_eq!(found.plan.name, "basic");

        assert!(store.delete_instance("a").await.unwrap());
        assert!(!store.delete_instance("a").await.unwrap());
        assert!(store.get_instance("a").await.unwrap().is_none());
    }
}

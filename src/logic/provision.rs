use serde_json::Value;

use crate::error::BrokerError;
use crate::logic::custom_ops;
use crate::logic::render::render_plan;
use crate::logic::Broker;
use crate::model::{
    ClusterSpec, OperationType, Plan, RuntimeContext, ServiceInstance,
};
use crate::provider::{AtlasClient, Cluster, Project, ProjectInput};
use crate::store::InstanceStore;

/// Outcome of an accepted asynchronous lifecycle request.
#[derive(Debug, Clone)]
pub struct AcceptedOperation {
    pub operation: OperationType,
    pub dashboard_url: Option<String>,
}

impl<S: InstanceStore> Broker<S> {
    /// Provision a new service instance. Always asynchronous: the provider
    /// never completes cluster creation synchronously, so callers that do
    /// not accept incomplete responses are rejected outright.
    pub async fn provision(
        &self,
        instance_id: &str,
        service_id: &str,
        plan_id: &str,
        parameters: Option<&Value>,
        osb_context: Option<&Value>,
        accepts_incomplete: bool,
    ) -> Result<AcceptedOperation, BrokerError> {
        if !accepts_incomplete {
            return Err(BrokerError::AsyncRequired);
        }
        if service_id != self.catalog.service_id {
            return Err(BrokerError::Validation(format!(
                "unknown service id \"{}\"",
                service_id
            )));
        }
        if self.store.get_instance(instance_id).await?.is_some() {
            return Err(BrokerError::AlreadyExists(format!(
                "service instance \"{}\"",
                instance_id
            )));
        }

        let plan = self.render_for_instance(instance_id, plan_id, parameters, osb_context)?;
        let client = self.client_for(&plan)?;
        let project = self.ensure_project(&client, &plan).await?;

        let dashboard_url = format!(
            "{}/v2/{}#clusters",
            self.provider_base_url.trim_end_matches('/'),
            project.id
        );

        // Persist before submitting cluster creation so a crash after
        // submission is still recoverable by the poller.
        let instance = ServiceInstance {
            id: instance_id.to_string(),
            service_id: service_id.to_string(),
            plan_id: plan_id.to_string(),
            group_id: project.id.clone(),
            dashboard_url: dashboard_url.clone(),
            plan: plan.clone(),
            created_at: chrono::Utc::now().to_rfc3339(),
        };
        self.store.upsert_instance(instance).await?;

        let body = cluster_body(&plan.cluster)?;
        client.create_cluster(&project.id, &body).await?;
        log::info!(
            "submitted cluster \"{}\" for instance {} in group {}",
            plan.cluster.name,
            instance_id,
            project.id
        );

        Ok(AcceptedOperation {
            operation: OperationType::Provision,
            dashboard_url: Some(dashboard_url),
        })
    }

    /// Update an existing instance. A `paused` boolean in the merged
    /// context bypasses the full cluster update with a single-field
    /// request; otherwise the plan is re-rendered and merged over the
    /// provider's current cluster definition.
    pub async fn update(
        &self,
        instance_id: &str,
        plan_id: Option<&str>,
        parameters: Option<&Value>,
        osb_context: Option<&Value>,
        accepts_incomplete: bool,
    ) -> Result<AcceptedOperation, BrokerError> {
        if !accepts_incomplete {
            return Err(BrokerError::AsyncRequired);
        }
        let mut instance = self
            .store
            .get_instance(instance_id)
            .await?
            .ok_or_else(|| {
                BrokerError::DoesNotExist(format!("service instance \"{}\"", instance_id))
            })?;

        let context = self.merged_context(instance_id, parameters, osb_context);

        // Pause/unpause fast path: a single-field request, no re-render.
        if let Some(paused) = context.get_bool("paused") {
            let client = self.client_for(&instance.plan)?;
            let body = serde_json::json!({ "paused": paused });
            client
                .update_cluster(&instance.group_id, &instance.plan.cluster.name, &body)
                .await?;
            log::info!(
                "instance {}: cluster \"{}\" {}",
                instance_id,
                instance.plan.cluster.name,
                if paused { "pausing" } else { "resuming" }
            );
            return Ok(AcceptedOperation {
                operation: OperationType::Update,
                dashboard_url: None,
            });
        }

        let plan_id = plan_id.unwrap_or(&instance.plan_id);
        let plan = self.render_for_instance(instance_id, plan_id, parameters, osb_context)?;
        let client = self.client_for(&plan)?;

        // The provider requires the instance size to be explicit on every
        // update, even unrelated ones, so fetch the current definition and
        // merge before submitting.
        let current = client
            .get_cluster(&instance.group_id, &instance.plan.cluster.name)
            .await?;
        let body = merged_update_body(&current, &plan.cluster)?;
        client
            .update_cluster(&instance.group_id, &instance.plan.cluster.name, &body)
            .await?;

        instance.plan_id = plan_id.to_string();
        instance.plan = plan;
        self.store.upsert_instance(instance).await?;

        Ok(AcceptedOperation {
            operation: OperationType::Update,
            dashboard_url: None,
        })
    }

    /// Submit cluster deletion. The persisted record is removed only once
    /// the poller confirms completion.
    pub async fn deprovision(
        &self,
        instance_id: &str,
        accepts_incomplete: bool,
    ) -> Result<AcceptedOperation, BrokerError> {
        if !accepts_incomplete {
            return Err(BrokerError::AsyncRequired);
        }
        let instance = self
            .store
            .get_instance(instance_id)
            .await?
            .ok_or_else(|| {
                BrokerError::DoesNotExist(format!("service instance \"{}\"", instance_id))
            })?;

        let client = self.client_for(&instance.plan)?;
        client
            .delete_cluster(&instance.group_id, &instance.plan.cluster.name)
            .await?;
        log::info!(
            "submitted deletion of cluster \"{}\" for instance {}",
            instance.plan.cluster.name,
            instance_id
        );

        Ok(AcceptedOperation {
            operation: OperationType::Deprovision,
            dashboard_url: None,
        })
    }

    fn merged_context(
        &self,
        instance_id: &str,
        parameters: Option<&Value>,
        osb_context: Option<&Value>,
    ) -> RuntimeContext {
        let mut context = RuntimeContext::with_instance_id(instance_id);
        if let Some(parameters) = parameters {
            context.merge_value(parameters);
        }
        if let Some(osb_context) = osb_context {
            context.merge_value(osb_context);
        }
        context.merge_credentials(&self.credentials);
        context
    }

    fn render_for_instance(
        &self,
        instance_id: &str,
        plan_id: &str,
        parameters: Option<&Value>,
        osb_context: Option<&Value>,
    ) -> Result<Plan, BrokerError> {
        let template = self
            .catalog
            .template_for_plan(plan_id)
            .ok_or_else(|| BrokerError::DoesNotExist(format!("service plan \"{}\"", plan_id)))?;
        let context = self.merged_context(instance_id, parameters, osb_context);
        render_plan(&self.templates, template, &context)
    }

    /// Resolve the plan's project, creating the whole declared resource
    /// graph when it does not exist yet: project, database users, network
    /// access rules, then plan-declared custom operations. Best effort in
    /// sequence; the first provider failure aborts and surfaces as-is,
    /// already-created siblings are deliberately left in place.
    async fn ensure_project(
        &self,
        client: &AtlasClient,
        plan: &Plan,
    ) -> Result<Project, BrokerError> {
        match client.get_project_by_name(&plan.project.name).await {
            Ok(project) => return Ok(project),
            Err(err) if err.is_not_found() => {}
            Err(err) => return Err(err.into()),
        }

        let project = client
            .create_project(&ProjectInput {
                name: plan.project.name.clone(),
                org_id: None,
            })
            .await?;
        log::info!("created project \"{}\" ({})", project.name, project.id);

        for user in &plan.database_users {
            client.create_database_user(&project.id, user).await?;
        }
        if !plan.ip_access_lists.is_empty() {
            client
                .create_ip_access_list(&project.id, &plan.ip_access_lists)
                .await?;
        }
        for operation in &plan.operations {
            custom_ops::perform(client, &project.id, operation).await?;
        }

        Ok(project)
    }
}

fn cluster_body(cluster: &ClusterSpec) -> Result<Value, BrokerError> {
    serde_json::to_value(cluster)
        .map_err(|e| BrokerError::Decode(format!("cluster specification: {}", e)))
}

/// Update body: the desired cluster spec with the instance size filled in
/// from the provider's current definition when the spec leaves it blank.
fn merged_update_body(current: &Cluster, desired: &ClusterSpec) -> Result<Value, BrokerError> {
    let mut body = cluster_body(desired)?;
    let desired_size = &desired.provider_settings.instance_size_name;
    if desired_size.trim().is_empty() {
        if let Some(settings) = &current.provider_settings {
            if let Some(provider_settings) = body
                .get_mut("providerSettings")
                .and_then(Value::as_object_mut)
            {
                provider_settings.insert(
                    "instanceSizeName".into(),
                    Value::String(settings.instance_size_name.clone()),
                );
            }
        }
    }
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ProviderSettings;
    use crate::provider::{ClusterState, ConnectionStrings};

    fn cluster_spec(size: &str) -> ClusterSpec {
        ClusterSpec {
            name: "cls".into(),
            provider_settings: ProviderSettings {
                provider_name: "AWS".into(),
                instance_size_name: size.into(),
                region_name: None,
                extra: Default::default(),
            },
            extra: Default::default(),
        }
    }

    fn observed(size: &str) -> Cluster {
        Cluster {
            name: "cls".into(),
            state_name: ClusterState::Idle,
            provider_settings: Some(ProviderSettings {
                provider_name: "AWS".into(),
                instance_size_name: size.into(),
                region_name: None,
                extra: Default::default(),
            }),
            connection_strings: ConnectionStrings::default(),
            srv_address: None,
            paused: None,
        }
    }

    #[test]
    fn update_body_keeps_explicit_instance_size() {
        let body = merged_update_body(&observed("M30"), &cluster_spec("M10")).unwrap();
        assert_eq!(body["providerSettings"]["instanceSizeName"], "M10");
    }

    #[test]
    fn update_body_fills_instance_size_from_current_cluster() {
        let body = merged_update_body(&observed("M30"), &cluster_spec("")).unwrap();
        assert_eq!(body["providerSettings"]["instanceSizeName"], "M30");
    }
}

use crate::error::BrokerError;
use crate::logic::Broker;
use crate::model::{LastOperationState, OperationType};
use crate::provider::ClusterState;
use crate::store::InstanceStore;

/// Map the provider-observed cluster state onto the protocol's three-state
/// operation model. `observed` is `None` when the provider reports 404.
///
/// For deprovision, "resource gone" is deliberately conflated with
/// "operation succeeded": the provider's delete API is not guaranteed to
/// leave a terminal DELETED record visible before removing it entirely.
pub fn operation_state(
    operation: OperationType,
    observed: Option<ClusterState>,
) -> LastOperationState {
    match operation {
        OperationType::Provision | OperationType::Update => match observed {
            Some(ClusterState::Idle) => LastOperationState::Succeeded,
            Some(ClusterState::Creating) | Some(ClusterState::Updating) => {
                LastOperationState::InProgress
            }
            _ => LastOperationState::Failed,
        },
        OperationType::Deprovision => match observed {
            None | Some(ClusterState::Deleted) => LastOperationState::Succeeded,
            Some(ClusterState::Deleting) => LastOperationState::InProgress,
            _ => LastOperationState::Failed,
        },
    }
}

impl<S: InstanceStore> Broker<S> {
    /// OSB last_operation: fetch the observed cluster state and classify it
    /// under the polled operation tag. A confirmed deprovision removes the
    /// persisted instance record as a side effect.
    pub async fn last_operation(
        &self,
        instance_id: &str,
        operation: OperationType,
    ) -> Result<LastOperationState, BrokerError> {
        let instance = self
            .store
            .get_instance(instance_id)
            .await?
            .ok_or_else(|| {
                BrokerError::DoesNotExist(format!("service instance \"{}\"", instance_id))
            })?;

        let client = self.client_for(&instance.plan)?;
        let observed = match client
            .get_cluster(&instance.group_id, &instance.plan.cluster.name)
            .await
        {
            Ok(cluster) => Some(cluster.state_name),
            Err(err) if err.is_not_found() => None,
            Err(err) => return Err(err.into()),
        };

        let state = operation_state(operation, observed);
        log::debug!(
            "instance {}: operation={} observed={:?} -> {:?}",
            instance_id,
            operation,
            observed,
            state
        );

        if operation == OperationType::Deprovision && state == LastOperationState::Succeeded {
            self.store.delete_instance(instance_id).await?;
            log::info!("instance {} deprovisioned, record removed", instance_id);
        }

        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use LastOperationState::{Failed, InProgress, Succeeded};
    use OperationType::{Deprovision, Provision, Update};

    #[test]
    fn provision_and_update_states() {
        for op in [Provision, Update] {
            assert_eq!(operation_state(op, None), Failed);
            assert_eq!(operation_state(op, Some(ClusterState::Idle)), Succeeded);
            assert_eq!(
                operation_state(op, Some(ClusterState::Creating)),
                InProgress
            );
            assert_eq!(
                operation_state(op, Some(ClusterState::Updating)),
                InProgress
            );
            assert_eq!(operation_state(op, Some(ClusterState::Deleting)), Failed);
            assert_eq!(operation_state(op, Some(ClusterState::Unknown)), Failed);
        }
    }

    #[test]
    fn deprovision_conflates_gone_with_success() {
        assert_eq!(operation_state(Deprovision, None), Succeeded);
        assert_eq!(
            operation_state(Deprovision, Some(ClusterState::Deleted)),
            Succeeded
        );
        assert_eq!(
            operation_state(Deprovision, Some(ClusterState::Deleting)),
            InProgress
        );
        assert_eq!(
            operation_state(Deprovision, Some(ClusterState::Idle)),
            Failed
        );
        assert_eq!(
            operation_state(Deprovision, Some(ClusterState::Creating)),
            Failed
        );
    }
}

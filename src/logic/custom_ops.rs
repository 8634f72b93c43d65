use serde_json::Value;

use crate::error::BrokerError;
use crate::model::PlanOperation;
use crate::provider::AtlasClient;

pub const OP_ADD_PROJECT_USER: &str = "add-project-user";
pub const OP_REMOVE_PROJECT_USER: &str = "remove-project-user";

const DEFAULT_PROJECT_ROLE: &str = "GROUP_READ_ONLY";

/// Closed dispatch over plan-declared side-effect operations that are not
/// part of the core resource graph. Each operation is idempotent by intent
/// (create-or-accept-existing, remove-or-accept-missing) but is not retried
/// on partial failure.
pub async fn perform(
    client: &AtlasClient,
    group_id: &str,
    operation: &PlanOperation,
) -> Result<(), BrokerError> {
    match operation.op.as_str() {
        OP_ADD_PROJECT_USER => {
            let username = required_str(operation, "username")?;
            let roles = roles_param(operation);
            match client.add_project_user(group_id, username, &roles).await {
                Ok(()) => {}
                // Already a member: the desired state holds.
                Err(err) if matches!(err, crate::provider::ProviderError::Conflict(_)) => {
                    log::debug!("project user \"{}\" already present", username);
                }
                Err(err) => return Err(err.into()),
            }
            log::info!("ensured project user \"{}\" on group {}", username, group_id);
            Ok(())
        }
        OP_REMOVE_PROJECT_USER => {
            let username = required_str(operation, "username")?;
            match client.remove_project_user(group_id, username).await {
                Ok(()) => {}
                Err(err) if err.is_not_found() => {
                    log::debug!("project user \"{}\" already absent", username);
                }
                Err(err) => return Err(err.into()),
            }
            log::info!("removed project user \"{}\" from group {}", username, group_id);
            Ok(())
        }
        other => Err(BrokerError::UnknownOperation(other.to_string())),
    }
}

fn required_str<'a>(operation: &'a PlanOperation, key: &str) -> Result<&'a str, BrokerError> {
    operation
        .params
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            BrokerError::Validation(format!(
                "operation \"{}\" requires a \"{}\" parameter",
                operation.op, key
            ))
        })
}

fn roles_param(operation: &PlanOperation) -> Vec<String> {
    let roles: Vec<String> = operation
        .params
        .get("roles")
        .and_then(Value::as_array)
        .map(|values| {
            values
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    if roles.is_empty() {
        vec![DEFAULT_PROJECT_ROLE.to_string()]
    } else {
        roles
    }
}

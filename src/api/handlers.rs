use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use crate::api::auth::Operator;
use crate::error::{BrokerError, OsbErrorBody};
use crate::logic::Broker;
use crate::model::{Catalog, ConnectionDetails, LastOperationState, OperationType};
use crate::store::InstanceStore;

pub type AppState<S> = Arc<Broker<S>>;

#[derive(Debug, Deserialize)]
pub struct AsyncQuery {
    #[serde(default)]
    pub accepts_incomplete: bool,
}

#[derive(Debug, Deserialize)]
pub struct ProvisionRequest {
    pub service_id: String,
    pub plan_id: String,
    #[serde(default)]
    pub parameters: Option<Value>,
    #[serde(default)]
    pub context: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRequest {
    #[serde(default)]
    pub plan_id: Option<String>,
    #[serde(default)]
    pub parameters: Option<Value>,
    #[serde(default)]
    pub context: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct BindRequest {
    #[serde(default)]
    pub parameters: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct LastOperationQuery {
    pub operation: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProvisionResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dashboard_url: Option<String>,
    pub operation: OperationType,
}

#[derive(Debug, Serialize)]
pub struct OperationResponse {
    pub operation: OperationType,
}

#[derive(Debug, Serialize)]
pub struct LastOperationResponse {
    pub state: LastOperationState,
}

#[derive(Debug, Serialize)]
pub struct BindResponse {
    pub credentials: ConnectionDetails,
}

pub async fn get_catalog<S: InstanceStore>(
    State(state): State<AppState<S>>,
    _operator: Operator,
) -> Json<Catalog> {
    Json(state.catalog.catalog.clone())
}

pub async fn provision_instance<S: InstanceStore>(
    State(state): State<AppState<S>>,
    _operator: Operator,
    Path(instance_id): Path<String>,
    Query(query): Query<AsyncQuery>,
    Json(request): Json<ProvisionRequest>,
) -> Result<(StatusCode, Json<ProvisionResponse>), BrokerError> {
    let accepted = state
        .provision(
            &instance_id,
            &request.service_id,
            &request.plan_id,
            request.parameters.as_ref(),
            request.context.as_ref(),
            query.accepts_incomplete,
        )
        .await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(ProvisionResponse {
            dashboard_url: accepted.dashboard_url,
            operation: accepted.operation,
        }),
    ))
}

pub async fn update_instance<S: InstanceStore>(
    State(state): State<AppState<S>>,
    _operator: Operator,
    Path(instance_id): Path<String>,
    Query(query): Query<AsyncQuery>,
    Json(request): Json<UpdateRequest>,
) -> Result<(StatusCode, Json<OperationResponse>), BrokerError> {
    let accepted = state
        .update(
            &instance_id,
            request.plan_id.as_deref(),
            request.parameters.as_ref(),
            request.context.as_ref(),
            query.accepts_incomplete,
        )
        .await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(OperationResponse {
            operation: accepted.operation,
        }),
    ))
}

pub async fn deprovision_instance<S: InstanceStore>(
    State(state): State<AppState<S>>,
    _operator: Operator,
    Path(instance_id): Path<String>,
    Query(query): Query<AsyncQuery>,
) -> Result<(StatusCode, Json<OperationResponse>), BrokerError> {
    let accepted = state
        .deprovision(&instance_id, query.accepts_incomplete)
        .await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(OperationResponse {
            operation: accepted.operation,
        }),
    ))
}

pub async fn last_operation<S: InstanceStore>(
    State(state): State<AppState<S>>,
    _operator: Operator,
    Path(instance_id): Path<String>,
    Query(query): Query<LastOperationQuery>,
) -> Result<Json<LastOperationResponse>, BrokerError> {
    let operation: OperationType = query
        .operation
        .as_deref()
        .unwrap_or_default()
        .parse()
        .map_err(BrokerError::Validation)?;
    let operation_state = state.last_operation(&instance_id, operation).await?;
    Ok(Json(LastOperationResponse {
        state: operation_state,
    }))
}

pub async fn bind_instance<S: InstanceStore>(
    State(state): State<AppState<S>>,
    _operator: Operator,
    Path((instance_id, binding_id)): Path<(String, String)>,
    Json(request): Json<BindRequest>,
) -> Result<(StatusCode, Json<BindResponse>), BrokerError> {
    let credentials = state
        .bind(&instance_id, &binding_id, request.parameters.as_ref())
        .await?;
    Ok((StatusCode::CREATED, Json(BindResponse { credentials })))
}

pub async fn unbind_instance<S: InstanceStore>(
    State(state): State<AppState<S>>,
    _operator: Operator,
    Path((instance_id, binding_id)): Path<(String, String)>,
) -> Result<Json<Value>, BrokerError> {
    state.unbind(&instance_id, &binding_id).await?;
    Ok(Json(serde_json::json!({})))
}

/// Instance and binding retrieval are declared unsupported in the catalog;
/// the endpoints answer 404 with an explicit error body rather than
/// pretending to be absent.
pub async fn retrieval_not_supported<S: InstanceStore>(
    State(_state): State<AppState<S>>,
    _operator: Operator,
) -> (StatusCode, Json<OsbErrorBody>) {
    (
        StatusCode::NOT_FOUND,
        Json(OsbErrorBody {
            error: "NotSupported".to_string(),
            description: "instance and binding retrieval are not supported by this broker"
                .to_string(),
        }),
    )
}

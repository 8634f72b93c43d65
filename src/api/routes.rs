use axum::{routing::get, routing::put, Router};

use crate::api::handlers::{self, AppState};
use crate::store::InstanceStore;

pub fn create_router<S: InstanceStore + 'static>() -> Router<AppState<S>> {
    Router::new()
        // Catalog
        .route("/v2/catalog", get(handlers::get_catalog::<S>))
        // Instance lifecycle
        .route(
            "/v2/service_instances/:instance_id",
            put(handlers::provision_instance::<S>)
                .patch(handlers::update_instance::<S>)
                .delete(handlers::deprovision_instance::<S>)
                .get(handlers::retrieval_not_supported::<S>),
        )
        .route(
            "/v2/service_instances/:instance_id/last_operation",
            get(handlers::last_operation::<S>),
        )
        // Bindings
        .route(
            "/v2/service_instances/:instance_id/service_bindings/:binding_id",
            put(handlers::bind_instance::<S>)
                .delete(handlers::unbind_instance::<S>)
                .get(handlers::retrieval_not_supported::<S>),
        )
}

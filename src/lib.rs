pub mod api;
pub mod config;
pub mod error;
pub mod logic;
pub mod model;
pub mod provider;
pub mod store;

// Export API types
pub use api::handlers;
pub use api::routes;

// Export the broker core and its collaborators
pub use error::BrokerError;
pub use logic::{
    build_catalog, generate_password, operation_state, render_plan, Broker, BuiltCatalog,
    TemplateCatalog, Whitelist,
};

// Export all model types
pub use model::*;

// Export store types
pub use store::{InstanceStore, MemoryInstanceStore, PostgresInstanceStore};

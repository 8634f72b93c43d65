use atlas_broker::api::routes::create_router;
use atlas_broker::config::AppConfig;
use atlas_broker::logic::{self, Broker, TemplateCatalog, Whitelist};
use atlas_broker::store::PostgresInstanceStore;
use axum::serve;
use std::path::Path;
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if it exists
    dotenvy::dotenv().ok();

    // Initialize logging with explicit filter to suppress sqlx debug logs
    use env_logger::Builder;
    use log::LevelFilter;

    Builder::new()
        .filter_level(LevelFilter::Info)
        .filter_module("sqlx", LevelFilter::Warn)
        .init();

    let config = AppConfig::load()?;
    log::info!(
        "configuration loaded: server={}:{} provider={}",
        config.server.host,
        config.server.port,
        config.atlas.base_url
    );

    // Credentials and templates are resolved once; both are fatal on error.
    let credentials = logic::credentials::resolve()?;
    let templates = TemplateCatalog::load(Path::new(&config.atlas.templates_dir))?;
    let whitelist = match &config.atlas.whitelist_file {
        Some(path) => Whitelist::load(Path::new(path))?,
        None => Whitelist::allow_all(),
    };

    log::info!("connecting to PostgreSQL...");
    let database_url = config.database_url()?;
    let store = PostgresInstanceStore::new(&database_url).await?;
    store.migrate().await?;

    let broker = Arc::new(Broker::new(
        config.atlas.base_url.clone(),
        credentials,
        templates,
        whitelist,
        &config.service,
        Arc::new(store),
    ));
    log::info!(
        "advertising {} plan(s)",
        broker.catalog.catalog.services[0].plans.len()
    );

    let app = create_router().with_state(broker);
    let bind_address = config.server_address();
    let listener = TcpListener::bind(&bind_address).await?;
    log::info!("broker listening on http://{}", bind_address);

    serve(listener, app).await?;

    Ok(())
}

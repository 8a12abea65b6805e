use rusty_library_catalog::{
    adapters::{memory::MemoryStore, postgres::PostgresStore},
    api::{AppState, create_router},
    application::ServiceDependencies,
    config::AppConfig,
    ports::UnitOfWorkFactory,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "rusty_library_catalog=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;

    // DATABASE_URLがなければインメモリで起動する
    let stores: Arc<dyn UnitOfWorkFactory> = match &config.database_url {
        Some(database_url) => {
            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(5)
                .connect(database_url)
                .await?;
            sqlx::migrate!().run(&pool).await?;
            tracing::info!("Using PostgreSQL storage");
            Arc::new(PostgresStore::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL is not set; using in-memory storage");
            Arc::new(MemoryStore::new())
        }
    };

    let deps = ServiceDependencies::new(stores, config.policy());
    let app = create_router(Arc::new(AppState { deps }));

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}

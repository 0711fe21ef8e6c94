use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use docshelf::config::AppConfig;
use docshelf::db;
use docshelf::maintenance;
use docshelf::routes::create_router;
use docshelf::state::AppState;
use docshelf::storage::build_storage;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    let config = AppConfig::from_env()?;
    tracing::info!(
        server_host = %config.server_host,
        server_port = config.server_port,
        storage_driver = config.storage_driver.as_str(),
        retention_days = config.documents_retention_days,
        sweep_enabled = config.expiration_sweep_enabled,
        intake_emails_enabled = config.intake_emails_enabled,
        "loaded configuration"
    );

    let pool = db::init_pool_with_size(&config.database_url, config.database_max_pool_size)?;
    {
        let mut conn = pool.get()?;
        db::run_migrations(&mut conn)?;
    }

    let storage = build_storage(&config).await?;
    let state = AppState::new(pool, config, storage);

    if state.config.expiration_sweep_enabled {
        let sweep_state = Arc::new(state.clone());
        tokio::spawn(maintenance::run_expiration_sweep(sweep_state));
    }

    let listen_addr: SocketAddr =
        format!("{}:{}", state.config.server_host, state.config.server_port).parse()?;
    let router = create_router(state);

    let listener = TcpListener::bind(listen_addr).await?;
    tracing::info!("listening on {}", listen_addr);
    axum::serve(listener, router).await?;
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

use anyhow::Context;
use arbledger::{api, config::Config, db::open_ledger_db, Ledger, Repository};
use std::net::SocketAddr;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
        )
        .init();

    let config = Config::from_env().context("loading configuration")?;
    let port = config.port;

    let pool = open_ledger_db(&config.database_path)
        .await
        .with_context(|| format!("opening ledger database at {}", config.database_path))?;
    let repo = Arc::new(Repository::new(pool));

    // Env defaults only apply to a fresh database.
    let seeded = repo
        .seed_config(&config.ledger_defaults)
        .await
        .context("seeding ledger config")?;
    if seeded {
        tracing::info!("Ledger config seeded from environment defaults");
    }

    let ledger = Ledger::new(repo);
    let app = api::create_router(api::AppState::new(ledger, config));

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding to {}", addr))?;

    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}

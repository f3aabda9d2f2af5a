use std::net::SocketAddr;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use voiceup_server::{config::Config, db::Database, services::seed, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "voiceup_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env();

    // Initialize database
    let db = Database::connect(&config.database_url, config.database_max_connections).await?;
    db.run_migrations().await?;

    match std::env::args().nth(1).as_deref() {
        None | Some("serve") => serve(db, config).await,
        Some("seed") => {
            let summary = seed::seed(&db, &config.seed).await?;
            tracing::info!(?summary, "seed complete");
            Ok(())
        }
        Some("reset") => {
            let summary = seed::reset(&db, &config.seed).await?;
            tracing::info!(?summary, "reset complete");
            Ok(())
        }
        Some(other) => anyhow::bail!("unknown command `{other}` (expected serve, seed or reset)"),
    }
}

async fn serve(db: Database, config: Config) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let app = voiceup_server::app(AppState { db, config });

    // Start server
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

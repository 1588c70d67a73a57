use std::net::SocketAddr;
use std::sync::Arc;

use tokio::signal;
use tracing_subscriber::EnvFilter;

use elfume::config::Config;
use elfume::db::{self, MongoPerfumeStore, MongoRoleStore, MongoUserStore};
use elfume::state::AppState;
use elfume::upload::{GithubUploader, ImageUploader};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    let config = Config::from_env()?;

    // Init tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .init();

    tracing::info!("Starting Elfume");

    let client = db::connect(&config.mongo_url).await?;
    let database = client.database(&config.mongo_db);
    db::init_indexes(&database).await?;

    let users = Arc::new(MongoUserStore::new(&database));
    let roles = Arc::new(MongoRoleStore::new(&database));
    let perfumes = Arc::new(MongoPerfumeStore::new(&database));

    db::seed_default_roles(roles.as_ref()).await?;

    let images: Option<Arc<dyn ImageUploader>> = match config.github.clone() {
        Some(github) => {
            tracing::info!(owner = %github.owner, repo = %github.repo, "Image host configured");
            Some(Arc::new(GithubUploader::new(github)?))
        }
        None => {
            tracing::warn!("GITHUB_OWNER/GITHUB_REPO/GITHUB_TOKEN not set, image uploads disabled");
            None
        }
    };

    let addr = SocketAddr::new(config.host, config.port);
    let state = AppState::new(config, users, roles, perfumes, images);
    if let Some(seed) = &state.config.admin {
        state.auth.ensure_admin(seed).await?;
    }
    let app = elfume::build_app(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}

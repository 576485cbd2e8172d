use anyhow::Result;
use file_api::{
    AppState,
    config::{AppConfig, Command},
    db,
    services::{
        credential_service::{SqliteCredentials, StaticCredentials, hash_secret},
        memory_store::MemoryStore,
        storage_service::StorageService,
        token_service::TokenService,
    },
};
use std::{fs, io::ErrorKind, path::Path, sync::Arc};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // --- Parse config + command ---
    let (cfg, command) = AppConfig::from_env_and_args()?;

    if let Command::HashPassword(plain) = &command {
        println!("{}", hash_secret(plain)?);
        return Ok(());
    }

    tracing::info!("Starting file-api with config: {:?}", cfg);

    let state = if cfg.memory {
        if command != Command::Serve {
            anyhow::bail!("--migrate and --add-user need persistent storage; drop --memory");
        }
        tracing::warn!("Using in-memory storage; objects and credentials are not persisted");
        AppState::new(
            Arc::new(MemoryStore::new()),
            Arc::new(StaticCredentials::new(cfg.users.clone())),
            TokenService::new(cfg.jwt_secret()?),
        )
    } else {
        // --- Ensure storage directory exists ---
        if !Path::new(&cfg.storage_dir).exists() {
            fs::create_dir_all(&cfg.storage_dir)?;
            tracing::info!("Created storage directory at {}", cfg.storage_dir);
        }

        if !cfg.users.is_empty() {
            tracing::warn!("--user only applies to --memory mode; use --add-user to persist credentials");
        }

        // --- Initialize SQLite connection + schema ---
        let db = Arc::new(db::connect(&cfg.database_url).await?);
        db::run_migrations(&db).await?;

        match command {
            Command::Migrate => {
                tracing::info!("Database migration complete.");
                return Ok(());
            }
            Command::AddUser { username, secret } => {
                SqliteCredentials::new(db.clone())
                    .upsert(&username, &secret)
                    .await?;
                tracing::info!("Stored credential for `{}`", username);
                return Ok(());
            }
            Command::Serve | Command::HashPassword(_) => {}
        }

        AppState::new(
            Arc::new(StorageService::new(db.clone(), cfg.storage_dir.clone())),
            Arc::new(SqliteCredentials::new(db)),
            TokenService::new(cfg.jwt_secret()?),
        )
    };

    // --- Build router ---
    let app = file_api::routes(state);

    // --- Start server ---
    let addr = cfg.addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(cfg.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", cfg.port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!("Server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}

use anyhow::Result;
use axum::Router;
use std::{io::ErrorKind, sync::Arc};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

mod config;
mod errors;
mod handlers;
mod models;
mod routes;
mod services;
mod state;

use services::{image_service::ImageService, s3_store::S3ObjectStore, session::SessionGate};

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // --- Parse config ---
    let cfg = config::AppConfig::from_env_and_args()?;

    tracing::info!("Starting imghost with config: {:?}", cfg);

    // --- Initialize object store client ---
    let store = S3ObjectStore::new(&cfg.store).await;
    tracing::info!(
        "Using bucket `{}` at {}",
        cfg.store.bucket,
        cfg.store.endpoint
    );

    // --- Initialize core services ---
    let images = ImageService::new(Arc::new(store), cfg.public_url.clone(), cfg.uploads);
    let sessions = SessionGate::new(cfg.admin_password.clone(), cfg.production);
    if !cfg.production {
        tracing::debug!("session cookies are not marked Secure outside production");
    }

    // --- Build router ---
    let app: Router = routes::routes::routes(cfg.uploads.max_file_size)
        .with_state(state::AppState::new(images, sessions));

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

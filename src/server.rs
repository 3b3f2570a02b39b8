use std::sync::Arc;

use anyhow::Result;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, services::ServeDir};
use tracing::info;

use crate::config::ServerConfig;
use crate::storage::{JsonFileStore, MetadataStore, PUBLIC_MOUNT, UploadStorage};
use crate::web_pages;

/// Shared handler state. The metadata store is injected so another
/// implementation can replace the JSON file without touching handlers.
#[derive(Clone)]
pub struct AppState {
    pub uploads: Arc<UploadStorage>,
    pub metadata: Arc<dyn MetadataStore>,
}

impl AppState {
    pub fn new(uploads: UploadStorage, metadata: Arc<dyn MetadataStore>) -> Self {
        Self {
            uploads: Arc::new(uploads),
            metadata,
        }
    }

    pub fn from_config(config: &ServerConfig) -> Self {
        Self::new(
            UploadStorage::new(config.upload_dir.clone()),
            Arc::new(JsonFileStore::new(config.metadata_file.clone())),
        )
    }
}

pub fn build_router(state: AppState, body_limit: usize) -> Router {
    let static_files = ServeDir::new(state.uploads.base_dir().to_path_buf());
    Router::new()
        .route("/", get(web_pages::index_page))
        .route(
            "/upload",
            post(web_pages::handle_image_upload).layer(DefaultBodyLimit::max(body_limit)),
        )
        .route("/images", get(web_pages::list_images))
        .nest_service(&format!("/{PUBLIC_MOUNT}"), static_files)
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve until ctrl-c. The upload directory is created before the listener
/// accepts its first request.
pub async fn serve(listener: TcpListener, config: &ServerConfig) -> Result<()> {
    let state = AppState::from_config(config);
    state.uploads.ensure_dir().await?;
    let router = build_router(state, config.body_limit);

    info!(
        address = %listener.local_addr()?,
        upload_dir = %config.upload_dir.display(),
        metadata_file = %config.metadata_file.display(),
        "image upload server started"
    );

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    Ok(())
}

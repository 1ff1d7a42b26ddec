use axum::{
    routing::{get, post},
    Router,
};
use rd_core::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

pub mod handlers;
pub mod state;

pub use state::AppState;

pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::permissive();

    Router::new()
        .route("/api/health", get(handlers::health))
        .route("/api/articles", get(handlers::list_articles))
        .route("/api/articles/:id", get(handlers::get_article))
        .route("/api/categories", get(handlers::list_categories))
        .route("/api/sources", get(handlers::list_sources))
        .route("/api/trending", get(handlers::trending))
        .route("/api/admin/scrape", post(handlers::admin_scrape))
        .layer(cors)
        .with_state(Arc::new(state))
}

/// Bind `addr` and serve the API until the process is stopped.
pub async fn serve(addr: SocketAddr, state: AppState) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("🌐 Serving API on http://{}", addr);
    axum::serve(listener, create_app(state)).await?;
    Ok(())
}

pub mod prelude {
    pub use crate::{create_app, serve, AppState};
    pub use rd_core::Result;
}

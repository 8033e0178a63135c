mod handlers;
mod state;

use axum::http::{header, HeaderValue};
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::set_header::SetResponseHeaderLayer;

use crate::config::Config;
use crate::location::LocationError;

pub use state::AppState;

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/areas", get(handlers::areas))
        .route("/api/parse", get(handlers::parse_link))
        .route("/api/search", get(handlers::search_listings))
        .route("/api/enhance", post(handlers::enhance_all))
        .route("/api/businesses/{id}/location", get(handlers::business_location))
        // Listings change under the batch; nothing here is cacheable.
        .layer(SetResponseHeaderLayer::if_not_present(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn start(config: Config, host: &str, port: u16) -> Result<(), LocationError> {
    let state = Arc::new(AppState::from_config(config)?);
    let app = build_router(state.clone());
    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await.map_err(|e| {
        log::error!("Cannot bind to {}: {}", addr, e);
        e
    })?;

    log::info!(
        "Listing locator listening on http://{} ({} listings from {})",
        addr,
        state.store().len(),
        state.config.store_path.display(),
    );
    log::info!("Press Ctrl+C to stop.");

    axum::serve(listener, app).await?;
    Ok(())
}

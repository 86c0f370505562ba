use axum::{
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::handlers;
use super::AppState;

/// Creates the application router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/api/v1", api_routes())
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
}

/// API routes under /api/v1
fn api_routes() -> Router<AppState> {
    Router::new()
        // Playability
        .route("/songs/playable", post(handlers::playable_songs))
        // Recommendations
        .route("/recommendations/chord", post(handlers::recommend_chord))
        .route("/recommendations/unlocks", post(handlers::unlocked_songs))
        .route("/recommendations/songs", post(handlers::personalized_songs))
        .route("/recommendations/path", post(handlers::learning_path))
        // Groups
        .route("/groups/overlap", post(handlers::group_overlap))
        .route("/groups/songs", post(handlers::group_songs))
        // Catalog cache
        .route("/catalog/status", get(handlers::catalog_status))
        .route("/catalog/invalidate", post(handlers::invalidate_catalog))
}

use axum::Router;
use tower_http::cors::CorsLayer;

use crate::routes::{health, search, subscriptions, watches};
use crate::state::AppState;

pub fn create_app(state: AppState) -> Router {
    Router::<AppState>::new()
        .nest("/health", health::router())
        .nest("/api/watches", watches::router())
        .nest("/api/subscriptions", subscriptions::router())
        .nest("/api/search", search::router())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

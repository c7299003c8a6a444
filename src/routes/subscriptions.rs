use axum::{
    extract::State,
    routing::{delete, post},
    Json, Router,
};
use serde_json::json;
use tracing::info;

use crate::db::{subscription_queries, watch_queries};
use crate::errors::AppError;
use crate::models::SubscribeRequest;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(subscribe))
        .route("/", delete(unsubscribe))
}

async fn subscribe(
    State(state): State<AppState>,
    Json(req): Json<SubscribeRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let email = validate_email(&req.email)?;

    if watch_queries::fetch_watch(&state.pool, req.watch_id)
        .await?
        .is_none()
    {
        return Err(AppError::NotFound);
    }

    let sub = subscription_queries::ensure_subscription(&state.pool, req.watch_id, &email).await?;
    info!("Subscribed {} to watch {}", email, req.watch_id);

    Ok(Json(json!({
        "subscription_id": sub.id,
        "watch_id": sub.watch_id,
        "email": sub.email,
    })))
}

async fn unsubscribe(
    State(state): State<AppState>,
    Json(req): Json<SubscribeRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let email = validate_email(&req.email)?;
    let deleted = subscription_queries::delete_subscription(&state.pool, req.watch_id, &email).await?;

    if deleted {
        info!("Unsubscribed {} from watch {}", email, req.watch_id);
    }

    Ok(Json(json!({
        "deleted": deleted,
        "watch_id": req.watch_id,
        "email": email,
    })))
}

/// Light sanity check; the mail transport does the real validation.
fn validate_email(email: &str) -> Result<String, AppError> {
    let email = email.trim().to_lowercase();
    let looks_valid = email.split_once('@').is_some_and(|(local, domain)| {
        !local.is_empty() && domain.contains('.') && !domain.starts_with('.')
    });

    if !looks_valid {
        return Err(AppError::Validation(format!("invalid email '{}'", email)));
    }
    Ok(email)
}

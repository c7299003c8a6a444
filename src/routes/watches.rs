use axum::{
    extract::{Path, Query, State},
    routing::{delete, get, post},
    Json, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::db::{snapshot_queries, subscription_queries, watch_queries};
use crate::errors::AppError;
use crate::models::{is_iata_code, CreateWatchRequest, HistoryPoint, Subscription, WatchWithStats};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_watches))
        .route("/", post(create_watch))
        .route("/cheapest", get(cheapest_in_window))
        .route("/:id", delete(delete_watch))
        .route("/:id/history", get(get_history))
        .route("/:id/subscriptions", get(get_subscriptions))
}

async fn list_watches(
    State(state): State<AppState>,
) -> Result<Json<Vec<WatchWithStats>>, AppError> {
    let watches = watch_queries::list_watches(&state.pool).await?;
    let mut out = Vec::with_capacity(watches.len());

    for watch in watches {
        let stats = snapshot_queries::stats(&state.pool, watch.id).await?;
        let subscriber_count = subscription_queries::count_for_watch(&state.pool, watch.id).await?;
        out.push(WatchWithStats {
            subscriber_count,
            snapshot_count: stats.map(|s| s.count).unwrap_or(0),
            min_cents: stats.map(|s| s.min_cents),
            median_cents: stats.map(|s| s.median_cents),
            latest_cents: stats.map(|s| s.latest_cents),
            watch,
        });
    }

    Ok(Json(out))
}

/// Create-or-reuse a watch on its identity tuple, optionally subscribing an
/// email in the same call.
async fn create_watch(
    State(state): State<AppState>,
    Json(req): Json<CreateWatchRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let req = req.normalize()?;

    let watch = watch_queries::ensure_watch(&state.pool, &req).await?;
    info!(
        "Watch {} ready: {} -> {} on {}",
        watch.id, watch.origin, watch.destination, watch.depart_date
    );

    let subscription_id = match &req.alert_email {
        Some(email) => {
            let sub =
                subscription_queries::ensure_subscription(&state.pool, watch.id, email).await?;
            Some(sub.id)
        }
        None => None,
    };

    Ok(Json(json!({
        "watch": watch,
        "subscription_id": subscription_id,
    })))
}

#[derive(Debug, Deserialize)]
struct WindowQuery {
    origin: String,
    destination: String,
    start: NaiveDate,
    end: NaiveDate,
}

/// Cheapest-date scan over stored snapshots: per-date minimum prices for the
/// route's watches departing inside [start, end], plus the overall cheapest.
async fn cheapest_in_window(
    State(state): State<AppState>,
    Query(q): Query<WindowQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let origin = q.origin.trim().to_uppercase();
    let destination = q.destination.trim().to_uppercase();

    if !is_iata_code(&origin) || !is_iata_code(&destination) {
        return Err(AppError::Validation(
            "origin and destination must be 3-letter IATA codes".to_string(),
        ));
    }
    if q.start > q.end {
        return Err(AppError::Validation(
            "start must not be after end".to_string(),
        ));
    }

    let dates =
        snapshot_queries::window_minimums(&state.pool, &origin, &destination, q.start, q.end)
            .await?;
    let cheapest = dates.iter().min_by_key(|p| p.min_cents).cloned();

    Ok(Json(json!({
        "origin": origin,
        "destination": destination,
        "start": q.start,
        "end": q.end,
        "dates": dates,
        "cheapest": cheapest,
    })))
}

async fn delete_watch(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, AppError> {
    let deleted = watch_queries::delete_watch(&state.pool, id).await?;
    if !deleted {
        return Err(AppError::NotFound);
    }
    info!("Deleted watch {} (with history and subscriptions)", id);
    Ok(Json(json!({ "deleted": true, "watch_id": id })))
}

async fn get_history(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<HistoryPoint>>, AppError> {
    if watch_queries::fetch_watch(&state.pool, id).await?.is_none() {
        return Err(AppError::NotFound);
    }
    let history = snapshot_queries::fetch_history(&state.pool, id).await?;
    Ok(Json(history))
}

async fn get_subscriptions(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<Subscription>>, AppError> {
    if watch_queries::fetch_watch(&state.pool, id).await?.is_none() {
        return Err(AppError::NotFound);
    }
    let subs = subscription_queries::subscriptions_for_watch(&state.pool, id).await?;
    Ok(Json(subs))
}

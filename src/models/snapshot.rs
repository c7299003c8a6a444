use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One immutable price observation for a watch. Rows are append-only and are
/// never mutated or deleted by normal operation; the raw provider payload is
/// kept for audit and debugging.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FareSnapshot {
    pub id: i64,
    pub watch_id: i64,
    pub seen_utc: DateTime<Utc>,
    pub provider: String,
    pub price_cents: i64,
    pub currency: String,
    pub offer_json: serde_json::Value,
}

/// Derived statistics over a watch's full snapshot history. Computed on read,
/// never stored. All prices are in minor currency units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WatchStats {
    pub count: i64,
    pub min_cents: i64,
    pub median_cents: i64,
    pub latest_cents: i64,
}

/// A single history row as exposed by the history endpoint.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct HistoryPoint {
    pub seen_utc: DateTime<Utc>,
    pub price_cents: i64,
    pub currency: String,
}

/// One departure date inside a cheapest-date scan: the lowest observed price
/// for the watch departing on that date.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct WindowPoint {
    pub watch_id: i64,
    pub depart_date: NaiveDate,
    pub min_cents: i64,
    pub currency: String,
}

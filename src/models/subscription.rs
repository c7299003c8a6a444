use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One email's registration for alerts on one watch, unique per (watch, email).
/// The last-alerted fields are mutated only by the alert dispatcher after a
/// successful send.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Subscription {
    pub id: i64,
    pub watch_id: i64,
    pub email: String,
    pub created_utc: DateTime<Utc>,
    pub last_emailed_cents: Option<i64>,
    pub last_emailed_utc: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubscribeRequest {
    pub watch_id: i64,
    pub email: String,
}

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::models::Subscription;

/// Get-or-create for (watch_id, email). Safe to call repeatedly.
pub async fn ensure_subscription(
    pool: &SqlitePool,
    watch_id: i64,
    email: &str,
) -> Result<Subscription, sqlx::Error> {
    let existing = sqlx::query_as::<_, Subscription>(
        "SELECT * FROM watch_subscriptions WHERE watch_id = ? AND email = ?",
    )
    .bind(watch_id)
    .bind(email)
    .fetch_optional(pool)
    .await?;

    if let Some(sub) = existing {
        return Ok(sub);
    }

    sqlx::query_as::<_, Subscription>(
        r#"
        INSERT INTO watch_subscriptions (watch_id, email, created_utc)
        VALUES (?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(watch_id)
    .bind(email)
    .bind(Utc::now())
    .fetch_one(pool)
    .await
}

pub async fn subscriptions_for_watch(
    pool: &SqlitePool,
    watch_id: i64,
) -> Result<Vec<Subscription>, sqlx::Error> {
    sqlx::query_as::<_, Subscription>(
        "SELECT * FROM watch_subscriptions WHERE watch_id = ? ORDER BY id ASC",
    )
    .bind(watch_id)
    .fetch_all(pool)
    .await
}

/// Records a successful send. Single UPDATE on the subscription row, so the
/// price and timestamp move together.
pub async fn mark_alerted(
    pool: &SqlitePool,
    subscription_id: i64,
    price_cents: i64,
    seen_utc: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE watch_subscriptions
        SET last_emailed_cents = ?, last_emailed_utc = ?
        WHERE id = ?
        "#,
    )
    .bind(price_cents)
    .bind(seen_utc)
    .bind(subscription_id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Delete by (watch_id, email); returns false when nothing matched.
pub async fn delete_subscription(
    pool: &SqlitePool,
    watch_id: i64,
    email: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM watch_subscriptions WHERE watch_id = ? AND email = ?")
        .bind(watch_id)
        .bind(email)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn count_for_watch(pool: &SqlitePool, watch_id: i64) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM watch_subscriptions WHERE watch_id = ?")
        .bind(watch_id)
        .fetch_one(pool)
        .await
}

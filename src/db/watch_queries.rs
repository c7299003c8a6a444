use chrono::{NaiveDate, Utc};
use sqlx::SqlitePool;

use crate::models::{CreateWatchRequest, Watch};

/// Get-or-create on the identity tuple. Re-posting the same watch returns the
/// existing row instead of violating the unique index.
pub async fn ensure_watch(
    pool: &SqlitePool,
    req: &CreateWatchRequest,
) -> Result<Watch, sqlx::Error> {
    let existing = sqlx::query_as::<_, Watch>(
        r#"
        SELECT * FROM watches
        WHERE origin = ? AND destination = ? AND depart_date = ?
          AND cabin = ? AND adults = ? AND currency = ?
        "#,
    )
    .bind(&req.origin)
    .bind(&req.destination)
    .bind(req.depart_date)
    .bind(&req.cabin)
    .bind(req.adults)
    .bind(&req.currency)
    .fetch_optional(pool)
    .await?;

    if let Some(watch) = existing {
        return Ok(watch);
    }

    sqlx::query_as::<_, Watch>(
        r#"
        INSERT INTO watches
          (origin, destination, depart_date, cabin, adults, currency, baseline_price_cents, created_utc)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(&req.origin)
    .bind(&req.destination)
    .bind(req.depart_date)
    .bind(&req.cabin)
    .bind(req.adults)
    .bind(&req.currency)
    .bind(req.baseline_price_cents)
    .bind(Utc::now())
    .fetch_one(pool)
    .await
}

pub async fn fetch_watch(pool: &SqlitePool, watch_id: i64) -> Result<Option<Watch>, sqlx::Error> {
    sqlx::query_as::<_, Watch>("SELECT * FROM watches WHERE id = ?")
        .bind(watch_id)
        .fetch_optional(pool)
        .await
}

pub async fn list_watches(pool: &SqlitePool) -> Result<Vec<Watch>, sqlx::Error> {
    sqlx::query_as::<_, Watch>("SELECT * FROM watches ORDER BY depart_date ASC, id DESC")
        .fetch_all(pool)
        .await
}

/// Watches eligible for a snapshot pass: at least one active subscription and
/// a departure date that has not passed. Dormant watches cost no provider calls.
pub async fn list_watches_with_subscribers(
    pool: &SqlitePool,
    today: NaiveDate,
) -> Result<Vec<Watch>, sqlx::Error> {
    sqlx::query_as::<_, Watch>(
        r#"
        SELECT DISTINCT w.*
        FROM watches w
        JOIN watch_subscriptions s ON s.watch_id = w.id
        WHERE w.depart_date >= ?
        ORDER BY w.depart_date ASC, w.id DESC
        "#,
    )
    .bind(today)
    .fetch_all(pool)
    .await
}

/// Deletes the watch together with its snapshots and subscriptions.
/// Returns false when no such watch existed.
pub async fn delete_watch(pool: &SqlitePool, watch_id: i64) -> Result<bool, sqlx::Error> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM fare_snapshots WHERE watch_id = ?")
        .bind(watch_id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM watch_subscriptions WHERE watch_id = ?")
        .bind(watch_id)
        .execute(&mut *tx)
        .await?;
    let result = sqlx::query("DELETE FROM watches WHERE id = ?")
        .bind(watch_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use serde_json::json;

    use super::*;
    use crate::db;
    use crate::db::{snapshot_queries, subscription_queries};

    fn request(destination: &str, depart_date: NaiveDate) -> CreateWatchRequest {
        CreateWatchRequest {
            origin: "BWI".to_string(),
            destination: destination.to_string(),
            depart_date,
            adults: 1,
            cabin: "ECONOMY".to_string(),
            currency: "USD".to_string(),
            baseline_price_cents: None,
            alert_email: None,
        }
    }

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 12, day).unwrap()
    }

    #[tokio::test]
    async fn ensure_watch_is_get_or_create() {
        let pool = db::test_pool().await;

        let first = ensure_watch(&pool, &request("SFO", date(25))).await.unwrap();
        let again = ensure_watch(&pool, &request("SFO", date(25))).await.unwrap();
        assert_eq!(first.id, again.id);

        let other_date = ensure_watch(&pool, &request("SFO", date(26))).await.unwrap();
        assert_ne!(first.id, other_date.id);

        assert_eq!(list_watches(&pool).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn only_subscribed_future_watches_are_eligible() {
        let pool = db::test_pool().await;
        let today = date(20);

        let subscribed = ensure_watch(&pool, &request("SFO", date(25))).await.unwrap();
        let departed = ensure_watch(&pool, &request("LAX", date(10))).await.unwrap();
        let dormant = ensure_watch(&pool, &request("SEA", date(25))).await.unwrap();

        subscription_queries::ensure_subscription(&pool, subscribed.id, "a@example.com")
            .await
            .unwrap();
        subscription_queries::ensure_subscription(&pool, departed.id, "a@example.com")
            .await
            .unwrap();
        // Two subscribers must still yield one row.
        subscription_queries::ensure_subscription(&pool, subscribed.id, "b@example.com")
            .await
            .unwrap();

        let eligible = list_watches_with_subscribers(&pool, today).await.unwrap();
        assert_eq!(eligible.len(), 1);
        assert_eq!(eligible[0].id, subscribed.id);
        assert_ne!(eligible[0].id, dormant.id);
    }

    #[tokio::test]
    async fn delete_watch_removes_dependents() {
        let pool = db::test_pool().await;

        let watch = ensure_watch(&pool, &request("SFO", date(25))).await.unwrap();
        subscription_queries::ensure_subscription(&pool, watch.id, "a@example.com")
            .await
            .unwrap();
        snapshot_queries::append_snapshot(&pool, watch.id, "stub", 41_230, "USD", &json!({}))
            .await
            .unwrap();

        assert!(delete_watch(&pool, watch.id).await.unwrap());
        assert!(fetch_watch(&pool, watch.id).await.unwrap().is_none());
        assert!(snapshot_queries::fetch_history(&pool, watch.id)
            .await
            .unwrap()
            .is_empty());
        assert_eq!(
            subscription_queries::count_for_watch(&pool, watch.id)
                .await
                .unwrap(),
            0
        );

        assert!(!delete_watch(&pool, watch.id).await.unwrap());
    }
}

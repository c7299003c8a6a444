use chrono::{NaiveDate, Utc};
use sqlx::SqlitePool;

use crate::models::{FareSnapshot, HistoryPoint, WatchStats, WindowPoint};

/// Append one immutable observation with the current timestamp. Snapshots are
/// never deduplicated; two appends of the same confirmed offer are two rows.
pub async fn append_snapshot(
    pool: &SqlitePool,
    watch_id: i64,
    provider: &str,
    price_cents: i64,
    currency: &str,
    offer_json: &serde_json::Value,
) -> Result<FareSnapshot, sqlx::Error> {
    sqlx::query_as::<_, FareSnapshot>(
        r#"
        INSERT INTO fare_snapshots (watch_id, seen_utc, provider, price_cents, currency, offer_json)
        VALUES (?, ?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(watch_id)
    .bind(Utc::now())
    .bind(provider)
    .bind(price_cents)
    .bind(currency)
    .bind(offer_json)
    .fetch_one(pool)
    .await
}

/// Full history for a watch, ascending by observation time with insertion
/// order breaking timestamp ties. Empty vec when no history exists.
pub async fn fetch_history(
    pool: &SqlitePool,
    watch_id: i64,
) -> Result<Vec<HistoryPoint>, sqlx::Error> {
    sqlx::query_as::<_, HistoryPoint>(
        r#"
        SELECT seen_utc, price_cents, currency
        FROM fare_snapshots
        WHERE watch_id = ?
        ORDER BY seen_utc ASC, id ASC
        "#,
    )
    .bind(watch_id)
    .fetch_all(pool)
    .await
}

/// Cheapest-date scan: the lowest observed price per watch on the route with a
/// departure inside [start, end], ascending by date. Watches without snapshots
/// do not appear.
pub async fn window_minimums(
    pool: &SqlitePool,
    origin: &str,
    destination: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<WindowPoint>, sqlx::Error> {
    sqlx::query_as::<_, WindowPoint>(
        r#"
        SELECT w.id AS watch_id, w.depart_date, MIN(s.price_cents) AS min_cents, w.currency
        FROM watches w
        JOIN fare_snapshots s ON s.watch_id = w.id
        WHERE w.origin = ? AND w.destination = ? AND w.depart_date BETWEEN ? AND ?
        GROUP BY w.id
        ORDER BY w.depart_date ASC, w.id ASC
        "#,
    )
    .bind(origin)
    .bind(destination)
    .bind(start)
    .bind(end)
    .fetch_all(pool)
    .await
}

/// Derived stats over the full snapshot history; None when no snapshots exist.
pub async fn stats(pool: &SqlitePool, watch_id: i64) -> Result<Option<WatchStats>, sqlx::Error> {
    let prices: Vec<i64> = sqlx::query_scalar(
        r#"
        SELECT price_cents
        FROM fare_snapshots
        WHERE watch_id = ?
        ORDER BY seen_utc ASC, id ASC
        "#,
    )
    .bind(watch_id)
    .fetch_all(pool)
    .await?;

    Ok(compute_stats(&prices))
}

/// Pure stats computation over prices in observation order. Median uses the
/// even/odd rule over the sorted sequence with integer floor on even counts,
/// so results are reproducible in minor-currency-unit arithmetic.
pub fn compute_stats(prices_in_time_order: &[i64]) -> Option<WatchStats> {
    let latest_cents = *prices_in_time_order.last()?;

    let mut sorted = prices_in_time_order.to_vec();
    sorted.sort_unstable();

    let n = sorted.len();
    let median_cents = if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2
    };

    Some(WatchStats {
        count: n as i64,
        min_cents: sorted[0],
        median_cents,
        latest_cents,
    })
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use serde_json::json;

    use super::*;
    use crate::db;
    use crate::db::watch_queries;
    use crate::models::CreateWatchRequest;

    async fn seed_watch_on(pool: &SqlitePool, destination: &str, day: u32) -> i64 {
        let req = CreateWatchRequest {
            origin: "BWI".to_string(),
            destination: destination.to_string(),
            depart_date: NaiveDate::from_ymd_opt(2026, 12, day).unwrap(),
            adults: 1,
            cabin: "ECONOMY".to_string(),
            currency: "USD".to_string(),
            baseline_price_cents: None,
            alert_email: None,
        };
        watch_queries::ensure_watch(pool, &req).await.unwrap().id
    }

    async fn seed_watch(pool: &SqlitePool) -> i64 {
        seed_watch_on(pool, "SFO", 25).await
    }

    #[tokio::test]
    async fn repeated_appends_are_distinct_rows() {
        let pool = db::test_pool().await;
        let watch_id = seed_watch(&pool).await;

        let offer = json!({"price": {"total": "412.30"}});
        append_snapshot(&pool, watch_id, "stub", 41_230, "USD", &offer)
            .await
            .unwrap();
        append_snapshot(&pool, watch_id, "stub", 41_230, "USD", &offer)
            .await
            .unwrap();

        let history = fetch_history(&pool, watch_id).await.unwrap();
        assert_eq!(history.len(), 2);

        let s = stats(&pool, watch_id).await.unwrap().unwrap();
        assert_eq!(s.count, 2);
        assert_eq!(s.min_cents, 41_230);
        assert_eq!(s.latest_cents, 41_230);
    }

    #[tokio::test]
    async fn history_comes_back_in_observation_order() {
        let pool = db::test_pool().await;
        let watch_id = seed_watch(&pool).await;

        for price in [100_000, 120_000, 90_000] {
            append_snapshot(&pool, watch_id, "stub", price, "USD", &json!({}))
                .await
                .unwrap();
        }

        let history = fetch_history(&pool, watch_id).await.unwrap();
        let prices: Vec<i64> = history.iter().map(|p| p.price_cents).collect();
        assert_eq!(prices, vec![100_000, 120_000, 90_000]);

        let s = stats(&pool, watch_id).await.unwrap().unwrap();
        assert_eq!(s.latest_cents, 90_000);
        assert_eq!(s.min_cents, 90_000);
        assert_eq!(s.median_cents, 100_000);
    }

    #[tokio::test]
    async fn window_scan_returns_per_date_minimums() {
        let pool = db::test_pool().await;

        let dec25 = seed_watch_on(&pool, "SFO", 25).await;
        let dec26 = seed_watch_on(&pool, "SFO", 26).await;
        // Outside the window and on another route; neither may appear.
        let dec30 = seed_watch_on(&pool, "SFO", 30).await;
        let other_route = seed_watch_on(&pool, "LAX", 26).await;

        for (watch_id, price) in [
            (dec25, 50_000),
            (dec25, 45_000),
            (dec26, 42_000),
            (dec30, 10_000),
            (other_route, 1_000),
        ] {
            append_snapshot(&pool, watch_id, "stub", price, "USD", &json!({}))
                .await
                .unwrap();
        }

        let start = NaiveDate::from_ymd_opt(2026, 12, 24).unwrap();
        let end = NaiveDate::from_ymd_opt(2026, 12, 28).unwrap();
        let points = window_minimums(&pool, "BWI", "SFO", start, end)
            .await
            .unwrap();

        assert_eq!(points.len(), 2);
        assert_eq!(points[0].watch_id, dec25);
        assert_eq!(points[0].min_cents, 45_000);
        assert_eq!(points[1].watch_id, dec26);
        assert_eq!(points[1].min_cents, 42_000);

        let cheapest = points.iter().min_by_key(|p| p.min_cents).unwrap();
        assert_eq!(cheapest.depart_date, NaiveDate::from_ymd_opt(2026, 12, 26).unwrap());
    }

    #[tokio::test]
    async fn window_scan_skips_watches_without_snapshots() {
        let pool = db::test_pool().await;
        seed_watch_on(&pool, "SFO", 25).await;

        let start = NaiveDate::from_ymd_opt(2026, 12, 24).unwrap();
        let end = NaiveDate::from_ymd_opt(2026, 12, 28).unwrap();
        let points = window_minimums(&pool, "BWI", "SFO", start, end)
            .await
            .unwrap();
        assert!(points.is_empty());
    }

    #[tokio::test]
    async fn append_for_missing_watch_is_rejected() {
        let pool = db::test_pool().await;
        let result = append_snapshot(&pool, 999, "stub", 1_000, "USD", &json!({})).await;
        assert!(result.is_err());
    }

    #[test]
    fn empty_history_has_no_stats() {
        assert_eq!(compute_stats(&[]), None);
    }

    #[test]
    fn single_observation() {
        let s = compute_stats(&[1000]).unwrap();
        assert_eq!(s.count, 1);
        assert_eq!(s.min_cents, 1000);
        assert_eq!(s.median_cents, 1000);
        assert_eq!(s.latest_cents, 1000);
    }

    #[test]
    fn latest_is_last_by_time_not_by_value() {
        let s = compute_stats(&[900, 1200, 1100]).unwrap();
        assert_eq!(s.latest_cents, 1100);
        assert_eq!(s.min_cents, 900);
    }

    #[test]
    fn odd_count_median_is_middle_of_sorted() {
        let s = compute_stats(&[1200, 900, 1100]).unwrap();
        assert_eq!(s.median_cents, 1100);
    }

    #[test]
    fn even_count_median_floors_the_average() {
        // sorted: 900, 1001 -> (900 + 1001) / 2 = 950 with integer division
        let s = compute_stats(&[1001, 900]).unwrap();
        assert_eq!(s.median_cents, 950);

        let s = compute_stats(&[800, 1000, 900, 1200]).unwrap();
        assert_eq!(s.median_cents, 950);
    }

    #[test]
    fn duplicate_prices_do_not_corrupt_stats() {
        let s = compute_stats(&[1000, 900, 900]).unwrap();
        assert_eq!(s.count, 3);
        assert_eq!(s.min_cents, 900);
        assert_eq!(s.median_cents, 900);
        assert_eq!(s.latest_cents, 900);
    }
}

pub(crate) mod snapshot_queries;
pub(crate) mod subscription_queries;
pub(crate) mod watch_queries;

use sqlx::SqlitePool;

/// Idempotent schema bootstrap, run once at startup. Full migration tooling is
/// out of scope; every statement here is safe to re-run.
pub async fn init_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS watches (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          origin TEXT NOT NULL,
          destination TEXT NOT NULL,
          depart_date TEXT NOT NULL,
          cabin TEXT NOT NULL DEFAULT 'ECONOMY',
          adults INTEGER NOT NULL DEFAULT 1,
          currency TEXT NOT NULL DEFAULT 'USD',
          baseline_price_cents INTEGER,
          created_utc TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE UNIQUE INDEX IF NOT EXISTS uq_watch_route_date
        ON watches (origin, destination, depart_date, cabin, adults, currency)
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS fare_snapshots (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          watch_id INTEGER NOT NULL,
          seen_utc TEXT NOT NULL,
          provider TEXT NOT NULL,
          price_cents INTEGER NOT NULL,
          currency TEXT NOT NULL,
          offer_json TEXT NOT NULL,
          FOREIGN KEY (watch_id) REFERENCES watches(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_snapshots_watch_time
        ON fare_snapshots (watch_id, seen_utc)
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS watch_subscriptions (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          watch_id INTEGER NOT NULL,
          email TEXT NOT NULL,
          created_utc TEXT NOT NULL,
          last_emailed_cents INTEGER,
          last_emailed_utc TEXT,
          UNIQUE (watch_id, email)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

#[cfg(test)]
pub(crate) async fn test_pool() -> SqlitePool {
    use sqlx::sqlite::SqlitePoolOptions;

    // One connection: every pooled connection of an in-memory SQLite database
    // would otherwise see its own empty database.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory sqlite");
    init_schema(&pool).await.expect("schema init");
    pool
}

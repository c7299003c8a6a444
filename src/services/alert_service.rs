use chrono::{DateTime, Duration, Utc};
use sqlx::SqlitePool;
use tracing::info;

use crate::db::subscription_queries;
use crate::models::{FareSnapshot, Subscription, Watch, WatchStats};
use crate::services::deal_service::{drop_pct, NewLow};
use crate::services::notifier::Notifier;

/// Decide whether this subscriber gets an email for the latest snapshot.
///
/// All three gates must pass:
/// 1. the watch as a whole classified as a new low,
/// 2. strict improvement over the price this subscriber was last told about,
/// 3. the per-subscription cooldown has elapsed.
pub fn should_send(
    sub: &Subscription,
    deal: Option<&NewLow>,
    latest_cents: i64,
    cooldown: Duration,
    now: DateTime<Utc>,
) -> bool {
    if deal.is_none() {
        return false;
    }

    if let Some(last_cents) = sub.last_emailed_cents {
        if latest_cents >= last_cents {
            return false;
        }
    }

    if let Some(last_at) = sub.last_emailed_utc {
        if now - last_at < cooldown {
            return false;
        }
    }

    true
}

/// Runs the decision sequence for one subscription and performs the send plus
/// the alert-state update when it passes. Returns whether an email went out.
#[allow(clippy::too_many_arguments)]
pub async fn maybe_alert(
    pool: &SqlitePool,
    notifier: &dyn Notifier,
    watch: &Watch,
    sub: &Subscription,
    snapshot: &FareSnapshot,
    stats: &WatchStats,
    deal: Option<&NewLow>,
    cooldown: Duration,
    now: DateTime<Utc>,
) -> Result<bool, sqlx::Error> {
    if !should_send(sub, deal, snapshot.price_cents, cooldown, now) {
        return Ok(false);
    }

    let (subject, body) = format_alert(watch, snapshot, stats);
    notifier.send(&sub.email, &subject, &body).await;

    subscription_queries::mark_alerted(pool, sub.id, snapshot.price_cents, snapshot.seen_utc)
        .await?;

    info!(
        "✉️  [watch {}] alerted {} at {} {}",
        watch.id,
        sub.email,
        format_price(snapshot.price_cents),
        snapshot.currency
    );
    Ok(true)
}

pub fn format_alert(watch: &Watch, snapshot: &FareSnapshot, stats: &WatchStats) -> (String, String) {
    let price = format_price(snapshot.price_cents);
    let median = format_price(stats.median_cents);
    let below_median = drop_pct(stats.median_cents, snapshot.price_cents);

    let subject = format!(
        "[Farewatch] New low fare {} → {} on {}: {} {}",
        watch.origin, watch.destination, watch.depart_date, price, snapshot.currency
    );

    let body = format!(
        "Good news!\n\n\
         We just found a new low price for one of your fare watches:\n\n\
         Route: {} → {}\n\
         Date: {}\n\
         Cabin: {}, Adults: {}\n\n\
         Latest price: {} {}\n\
         Median so far: {} {} ({:.1}% below median)\n\
         Snapshots so far: {}\n\
         Seen at: {} UTC\n\n\
         You're getting this email because you subscribed to this watch in Farewatch.\n",
        watch.origin,
        watch.destination,
        watch.depart_date,
        watch.cabin,
        watch.adults,
        price,
        snapshot.currency,
        median,
        snapshot.currency,
        below_median,
        stats.count,
        snapshot.seen_utc.format("%Y-%m-%d %H:%M:%S"),
    );

    (subject, body)
}

/// Minor units to a display amount: 41230 -> "412.30".
pub fn format_price(cents: i64) -> String {
    format!("{}.{:02}", cents / 100, (cents % 100).abs())
}

use std::sync::atomic::Ordering;

use chrono::{Duration, Utc};
use tracing::{error, info, warn};

use crate::db::{snapshot_queries, subscription_queries, watch_queries};
use crate::errors::AppError;
use crate::external::price_source::{PriceSource, PriceSourceError};
use crate::models::{FareOffer, OfferQuery, Watch};
use crate::services::job_scheduler_service::JobContext;
use crate::services::{alert_service, deal_service};

/// What happened to a single watch during one pass.
#[derive(Debug)]
pub enum WatchOutcome {
    Saved {
        price_cents: i64,
        alerts_sent: u32,
    },
    Skipped(String),
}

/// Per-run tally. The run itself never fails; a bad pass just produces a
/// smaller set of successful snapshots, corrected on the next scheduled run.
#[derive(Debug, Default)]
pub struct RunReport {
    pub saved: i32,
    pub skipped: i32,
    pub failed: i32,
}

/// One full snapshot pass over all eligible watches: fetch offers, confirm the
/// cheapest, append a snapshot, evaluate, dispatch alerts. Watches are
/// processed sequentially and failures are isolated per watch.
pub async fn run_snapshot_pass(ctx: &JobContext) -> RunReport {
    let today = Utc::now().date_naive();
    let mut report = RunReport::default();

    let watches = match watch_queries::list_watches_with_subscribers(&ctx.pool, today).await {
        Ok(watches) => watches,
        Err(e) => {
            error!("Failed to load eligible watches: {}", e);
            report.failed = 1;
            return report;
        }
    };

    if watches.is_empty() {
        info!("No watches with subscribers to snapshot");
        return report;
    }

    info!("Snapshot pass over {} watches", watches.len());

    for (i, watch) in watches.iter().enumerate() {
        if ctx.shutdown.load(Ordering::Relaxed) {
            info!("Stop signal received; ending pass after {} watches", i);
            break;
        }

        match process_watch(ctx, watch).await {
            Ok(WatchOutcome::Saved {
                price_cents,
                alerts_sent,
            }) => {
                report.saved += 1;
                info!(
                    "[watch {} {}->{} {}] saved {} {} ({} alerts)",
                    watch.id,
                    watch.origin,
                    watch.destination,
                    watch.depart_date,
                    alert_service::format_price(price_cents),
                    watch.currency,
                    alerts_sent
                );
            }
            Ok(WatchOutcome::Skipped(reason)) => {
                report.skipped += 1;
                info!(
                    "[watch {} {}->{} {}] skipped: {}",
                    watch.id, watch.origin, watch.destination, watch.depart_date, reason
                );
            }
            Err(e) => {
                report.failed += 1;
                error!(
                    "[watch {} {}->{} {}] failed: {}",
                    watch.id, watch.origin, watch.destination, watch.depart_date, e
                );
            }
        }

        // Throttle outbound provider calls between watches.
        if i + 1 < watches.len() {
            tokio::time::sleep(ctx.settings.inter_watch_delay).await;
        }
    }

    info!(
        "Snapshot pass finished: {} saved, {} skipped, {} failed",
        report.saved, report.skipped, report.failed
    );
    report
}

/// Pipeline for one watch. Evaluation order is fixed: append, recompute stats
/// once, classify, then dispatch — every subscriber sees the same stats.
async fn process_watch(ctx: &JobContext, watch: &Watch) -> Result<WatchOutcome, AppError> {
    let query = OfferQuery::for_watch(watch, ctx.settings.offer_limit);
    let offers = ctx.price_source.search_offers(&query).await?;

    if offers.is_empty() {
        return Ok(WatchOutcome::Skipped("no offers".to_string()));
    }

    let confirmed = match confirm_cheapest(
        ctx.price_source.as_ref(),
        offers,
        ctx.settings.max_confirm_candidates,
    )
    .await?
    {
        Some(offer) => offer,
        None => {
            return Ok(WatchOutcome::Skipped(
                "no candidate offer survived price confirmation".to_string(),
            ))
        }
    };

    let snapshot = snapshot_queries::append_snapshot(
        &ctx.pool,
        watch.id,
        ctx.price_source.name(),
        confirmed.price_cents,
        &confirmed.currency,
        &confirmed.raw,
    )
    .await?;

    let stats = match snapshot_queries::stats(&ctx.pool, watch.id).await? {
        Some(stats) => stats,
        // Unreachable after a successful append, but not worth a panic.
        None => return Ok(WatchOutcome::Skipped("no stats after append".to_string())),
    };

    let deal = deal_service::is_new_low(&stats);
    let subscriptions = subscription_queries::subscriptions_for_watch(&ctx.pool, watch.id).await?;

    let cooldown = Duration::hours(ctx.settings.alert_cooldown_hours);
    let now = Utc::now();
    let mut alerts_sent = 0;

    for sub in &subscriptions {
        let sent = alert_service::maybe_alert(
            &ctx.pool,
            ctx.notifier.as_ref(),
            watch,
            sub,
            &snapshot,
            &stats,
            deal.as_ref(),
            cooldown,
            now,
        )
        .await?;
        if sent {
            alerts_sent += 1;
        }
    }

    Ok(WatchOutcome::Saved {
        price_cents: snapshot.price_cents,
        alerts_sent,
    })
}

/// Confirm candidates cheapest-first, up to `max_candidates`. An offer the
/// provider rejects moves us to the next candidate; anything else surfaces.
/// None means every candidate was rejected.
async fn confirm_cheapest(
    source: &dyn PriceSource,
    mut offers: Vec<FareOffer>,
    max_candidates: usize,
) -> Result<Option<FareOffer>, PriceSourceError> {
    offers.sort_by_key(|o| o.price_cents);

    for offer in offers.into_iter().take(max_candidates) {
        match source.confirm_price(&offer).await {
            Ok(confirmed) => return Ok(Some(confirmed)),
            Err(PriceSourceError::Unconfirmable { status, message }) => {
                warn!(
                    "offer at {} rejected by provider ({}): {}; trying next candidate",
                    alert_service::format_price(offer.price_cents),
                    status,
                    message
                );
            }
            Err(e) => return Err(e),
        }
    }

    Ok(None)
}

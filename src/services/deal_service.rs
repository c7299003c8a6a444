use crate::models::WatchStats;

/// Watch-level classification: the latest observation matches or beats the
/// historical minimum. The minimum already includes the latest snapshot by the
/// time this runs, hence `<=` rather than `<`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewLow {
    pub min_cents: i64,
    pub samples: i64,
}

/// A single observation cannot be a "low" relative to itself, so at least two
/// observations are required before anything classifies.
pub fn is_new_low(stats: &WatchStats) -> Option<NewLow> {
    if stats.count < 2 {
        return None;
    }
    if stats.latest_cents <= stats.min_cents {
        return Some(NewLow {
            min_cents: stats.min_cents,
            samples: stats.count,
        });
    }
    None
}

/// Percentage drop from old to new. A non-positive old price means there is no
/// meaningful baseline; that yields 0.0 rather than an error.
pub fn drop_pct(old_cents: i64, new_cents: i64) -> f64 {
    if old_cents <= 0 {
        return 0.0;
    }
    100.0 * (old_cents - new_cents) as f64 / old_cents as f64
}

use std::time::Duration;

/// Process-level tunables. Everything here has a sensible default and can be
/// overridden through the environment; none of it is a hardcoded contract of
/// the pipeline logic.
#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: String,
    pub port: u16,
    /// How often the snapshot job runs.
    pub poll_interval_hours: u32,
    /// Minimum time between alert emails to the same subscription.
    pub alert_cooldown_hours: i64,
    /// How many cheapest candidates to attempt price confirmation on.
    pub max_confirm_candidates: usize,
    /// Pause between watches to throttle outbound provider calls.
    pub inter_watch_delay: Duration,
    /// Max offers requested from the provider per search.
    pub offer_limit: u32,
}

impl Settings {
    pub fn from_env() -> Self {
        Self {
            database_url: env_or("DATABASE_URL", "sqlite:farewatch.db"),
            port: parse_env("PORT", 3000),
            poll_interval_hours: parse_env("POLL_INTERVAL_HOURS", 12),
            alert_cooldown_hours: parse_env("ALERT_COOLDOWN_HOURS", 6),
            max_confirm_candidates: parse_env("MAX_CONFIRM_CANDIDATES", 3),
            inter_watch_delay: Duration::from_millis(parse_env("INTER_WATCH_DELAY_MS", 1000)),
            offer_limit: parse_env("OFFER_LIMIT", 10),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_url: "sqlite:farewatch.db".to_string(),
            port: 3000,
            poll_interval_hours: 12,
            alert_cooldown_hours: 6,
            max_confirm_candidates: 3,
            inter_watch_delay: Duration::from_millis(1000),
            offer_limit: 10,
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

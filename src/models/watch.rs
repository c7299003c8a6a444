use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A tracked (route, date, cabin, adults, currency) combination.
/// The tuple is the natural key; at most one watch exists per tuple.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Watch {
    pub id: i64,
    pub origin: String,
    pub destination: String,
    pub depart_date: NaiveDate,
    pub cabin: String,
    pub adults: i64,
    pub currency: String,
    pub baseline_price_cents: Option<i64>,
    pub created_utc: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateWatchRequest {
    pub origin: String,
    pub destination: String,
    pub depart_date: NaiveDate,
    #[serde(default = "default_adults")]
    pub adults: i64,
    #[serde(default = "default_cabin")]
    pub cabin: String,
    #[serde(default = "default_currency")]
    pub currency: String,
    pub baseline_price_cents: Option<i64>,
    /// Optional subscription created together with the watch.
    pub alert_email: Option<String>,
}

fn default_adults() -> i64 {
    1
}

fn default_cabin() -> String {
    "ECONOMY".to_string()
}

fn default_currency() -> String {
    "USD".to_string()
}

pub const VALID_CABINS: [&str; 4] = ["ECONOMY", "PREMIUM_ECONOMY", "BUSINESS", "FIRST"];

impl CreateWatchRequest {
    /// Uppercases codes and rejects malformed fields before anything hits the store.
    pub fn normalize(mut self) -> Result<Self, String> {
        self.origin = self.origin.trim().to_uppercase();
        self.destination = self.destination.trim().to_uppercase();
        self.currency = self.currency.trim().to_uppercase();
        self.cabin = self.cabin.trim().to_uppercase();

        if !is_iata_code(&self.origin) {
            return Err(format!("origin must be a 3-letter IATA code, got '{}'", self.origin));
        }
        if !is_iata_code(&self.destination) {
            return Err(format!(
                "destination must be a 3-letter IATA code, got '{}'",
                self.destination
            ));
        }
        if self.currency.len() != 3 || !self.currency.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(format!("currency must be a 3-letter code, got '{}'", self.currency));
        }
        if !VALID_CABINS.contains(&self.cabin.as_str()) {
            return Err(format!("cabin must be one of {:?}", VALID_CABINS));
        }
        if !(1..=9).contains(&self.adults) {
            return Err("adults must be between 1 and 9".to_string());
        }
        Ok(self)
    }
}

pub(crate) fn is_iata_code(code: &str) -> bool {
    code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic())
}

/// Watch plus derived read-only stats, as returned by the list endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct WatchWithStats {
    #[serde(flatten)]
    pub watch: Watch,
    pub subscriber_count: i64,
    pub snapshot_count: i64,
    pub min_cents: Option<i64>,
    pub median_cents: Option<i64>,
    pub latest_cents: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(origin: &str, destination: &str, cabin: &str, adults: i64) -> CreateWatchRequest {
        CreateWatchRequest {
            origin: origin.to_string(),
            destination: destination.to_string(),
            depart_date: NaiveDate::from_ymd_opt(2026, 12, 25).unwrap(),
            adults,
            cabin: cabin.to_string(),
            currency: "usd".to_string(),
            baseline_price_cents: None,
            alert_email: None,
        }
    }

    #[test]
    fn normalize_uppercases_codes() {
        let req = request("bwi", "sfo", "economy", 1).normalize().unwrap();
        assert_eq!(req.origin, "BWI");
        assert_eq!(req.destination, "SFO");
        assert_eq!(req.currency, "USD");
        assert_eq!(req.cabin, "ECONOMY");
    }

    #[test]
    fn normalize_rejects_bad_fields() {
        assert!(request("BWII", "SFO", "ECONOMY", 1).normalize().is_err());
        assert!(request("BWI", "S1O", "ECONOMY", 1).normalize().is_err());
        assert!(request("BWI", "SFO", "COACH", 1).normalize().is_err());
        assert!(request("BWI", "SFO", "ECONOMY", 0).normalize().is_err());
        assert!(request("BWI", "SFO", "ECONOMY", 10).normalize().is_err());
    }
}

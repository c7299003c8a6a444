use chrono::NaiveDate;
use serde::Serialize;

use crate::models::Watch;

/// Request fields for one provider search, derived from a watch.
#[derive(Debug, Clone)]
pub struct OfferQuery {
    pub origin: String,
    pub destination: String,
    pub depart_date: NaiveDate,
    pub adults: i64,
    pub cabin: String,
    pub currency: String,
    pub limit: u32,
}

impl OfferQuery {
    pub fn for_watch(watch: &Watch, limit: u32) -> Self {
        Self {
            origin: watch.origin.clone(),
            destination: watch.destination.clone(),
            depart_date: watch.depart_date,
            adults: watch.adults,
            cabin: watch.cabin.clone(),
            currency: watch.currency.clone(),
            limit,
        }
    }
}

/// One fare offer as returned by the price source. `raw` is the untouched
/// provider payload; confirmation must echo it back exactly as received.
#[derive(Debug, Clone, Serialize)]
pub struct FareOffer {
    pub price_cents: i64,
    pub currency: String,
    pub carrier: Option<String>,
    pub segments: i64,
    pub duration: Option<String>,
    pub raw: serde_json::Value,
}

/// Parse a decimal price string ("412.30") into integer minor currency units,
/// rounding half-up on a third fractional digit. Integer arithmetic throughout
/// so snapshot prices never pick up floating-point drift.
pub fn parse_minor_units(text: &str) -> Option<i64> {
    let text = text.trim();
    if text.is_empty() || text.starts_with('-') {
        return None;
    }

    let (whole, frac) = match text.split_once('.') {
        Some((whole, frac)) => (whole, frac),
        None => (text, ""),
    };

    let whole: i64 = whole.parse().ok()?;
    if !frac.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    let mut digits = frac.bytes().map(|b| i64::from(b - b'0'));
    let tens = digits.next().unwrap_or(0);
    let units = digits.next().unwrap_or(0);
    let round = digits.next().unwrap_or(0);

    let mut cents = whole.checked_mul(100)?.checked_add(tens * 10 + units)?;
    if round >= 5 {
        cents += 1;
    }
    Some(cents)
}

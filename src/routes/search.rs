use axum::{extract::State, routing::post, Json, Router};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use crate::errors::AppError;
use crate::models::{CreateWatchRequest, FareOffer, OfferQuery};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/", post(search_flights))
}

#[derive(Debug, Deserialize)]
struct SearchRequest {
    origin: String,
    destination: String,
    depart_date: NaiveDate,
    #[serde(default = "default_adults")]
    adults: i64,
    #[serde(default = "default_cabin")]
    cabin: String,
    #[serde(default = "default_currency")]
    currency: String,
    max_price_cents: Option<i64>,
    #[serde(default = "default_max_results")]
    max_results: usize,
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

fn default_max_results() -> usize {
    10
}

#[derive(Debug, Serialize)]
struct SearchOffer {
    price_cents: i64,
    currency: String,
    carrier: Option<String>,
    segments: i64,
    duration: Option<String>,
}

impl From<FareOffer> for SearchOffer {
    fn from(offer: FareOffer) -> Self {
        Self {
            price_cents: offer.price_cents,
            currency: offer.currency,
            carrier: offer.carrier,
            segments: offer.segments,
            duration: offer.duration,
        }
    }
}

/// Live one-off search against the price source; nothing is persisted.
async fn search_flights(
    State(state): State<AppState>,
    Json(req): Json<SearchRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    // Reuse the watch-field validation; searches take the same tuple.
    let validated = CreateWatchRequest {
        origin: req.origin,
        destination: req.destination,
        depart_date: req.depart_date,
        adults: req.adults,
        cabin: req.cabin,
        currency: req.currency,
        baseline_price_cents: None,
        alert_email: None,
    }
    .normalize()?;

    info!(
        "Live search {} -> {} on {}",
        validated.origin, validated.destination, validated.depart_date
    );

    let query = OfferQuery {
        origin: validated.origin.clone(),
        destination: validated.destination.clone(),
        depart_date: validated.depart_date,
        adults: validated.adults,
        cabin: validated.cabin.clone(),
        currency: validated.currency.clone(),
        limit: 20,
    };

    let mut offers = state.price_source.search_offers(&query).await?;
    offers.sort_by_key(|o| o.price_cents);

    let mut simplified: Vec<SearchOffer> = offers.into_iter().map(SearchOffer::from).collect();
    if let Some(cap) = req.max_price_cents {
        simplified.retain(|o| o.price_cents <= cap);
    }
    simplified.truncate(req.max_results);

    Ok(Json(json!({
        "origin": validated.origin,
        "destination": validated.destination,
        "depart_date": validated.depart_date,
        "count": simplified.len(),
        "offers": simplified,
    })))
}

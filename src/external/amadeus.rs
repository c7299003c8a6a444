use std::future::Future;
use std::time::Duration;

use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::{json, Value};
use tokio::sync::Mutex;

use async_trait::async_trait;

use crate::external::price_source::{PriceSource, PriceSourceError};
use crate::external::retry::RetryPolicy;
use crate::models::{parse_minor_units, FareOffer, OfferQuery};

pub const PROVIDER_NAME: &str = "amadeus";

const DEFAULT_BASE_URL: &str = "https://test.api.amadeus.com";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Amadeus flight-offers adapter. Credentials are loaded once at construction;
/// the OAuth token is cached and refreshed transparently on a 401.
pub struct AmadeusSource {
    client: Client,
    base_url: String,
    api_key: String,
    api_secret: String,
    token: Mutex<Option<String>>,
    retry: RetryPolicy,
}

impl AmadeusSource {
    pub fn from_env() -> Result<Self, PriceSourceError> {
        let api_key = std::env::var("AMADEUS_KEY")
            .map_err(|_| PriceSourceError::Credentials("AMADEUS_KEY not set".into()))?;
        let api_secret = std::env::var("AMADEUS_SECRET")
            .map_err(|_| PriceSourceError::Credentials("AMADEUS_SECRET not set".into()))?;
        let base_url =
            std::env::var("AMADEUS_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());

        Ok(Self::new(base_url, api_key, api_secret))
    }

    pub fn new(base_url: String, api_key: String, api_secret: String) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url,
            api_key,
            api_secret,
            token: Mutex::new(None),
            retry: RetryPolicy::default(),
        }
    }

    async fn token(&self) -> Result<String, PriceSourceError> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            return Ok(token.clone());
        }

        let resp = self
            .client
            .post(format!("{}/v1/security/oauth2/token", self.base_url))
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.api_key.as_str()),
                ("client_secret", self.api_secret.as_str()),
            ])
            .send()
            .await
            .map_err(|e| PriceSourceError::Network(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(PriceSourceError::Server {
                status: resp.status().as_u16(),
                message: "token request failed".to_string(),
            });
        }

        let body: Value = resp
            .json()
            .await
            .map_err(|e| PriceSourceError::Parse(e.to_string()))?;
        let token = body["access_token"]
            .as_str()
            .ok_or_else(|| PriceSourceError::Parse("missing access_token".to_string()))?
            .to_string();

        *cached = Some(token.clone());
        Ok(token)
    }

    async fn clear_token(&self) {
        *self.token.lock().await = None;
    }

    /// One authenticated request. Status mapping: 401 -> AuthExpired,
    /// 429 -> RateLimited, other 4xx -> Unconfirmable, 5xx -> Server.
    async fn execute_once<F>(&self, make: &F) -> Result<Value, PriceSourceError>
    where
        F: Fn(&Client, &str) -> RequestBuilder,
    {
        let token = self.token().await?;
        let resp = make(&self.client, &token)
            .send()
            .await
            .map_err(|e| PriceSourceError::Network(e.to_string()))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| PriceSourceError::Network(e.to_string()))?;

        if status.is_success() {
            return serde_json::from_str(&text)
                .map_err(|e| PriceSourceError::Parse(e.to_string()));
        }

        let message = error_summary(&text);
        match status {
            StatusCode::UNAUTHORIZED => Err(PriceSourceError::AuthExpired),
            StatusCode::TOO_MANY_REQUESTS => Err(PriceSourceError::RateLimited),
            s if s.is_client_error() => Err(PriceSourceError::Unconfirmable {
                status: s.as_u16(),
                message,
            }),
            s => Err(PriceSourceError::Server {
                status: s.as_u16(),
                message,
            }),
        }
    }

    /// Authenticated request with one transparent credential refresh on 401
    /// and bounded backoff for transient failures.
    async fn execute<F>(&self, make: F) -> Result<Value, PriceSourceError>
    where
        F: Fn(&Client, &str) -> RequestBuilder,
    {
        let make = &make;
        self.retry
            .run(PriceSourceError::is_transient, move || async move {
                with_auth_refresh(move || self.execute_once(make), move || self.clear_token())
                    .await
            })
            .await
    }
}

/// Clears credentials and retries exactly once when the first attempt reports
/// an expired token. A second expiry surfaces to the caller; any other error
/// skips the refresh entirely.
async fn with_auth_refresh<T, F, Fut, R, RFut>(mut op: F, refresh: R) -> Result<T, PriceSourceError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, PriceSourceError>>,
    R: FnOnce() -> RFut,
    RFut: Future<Output = ()>,
{
    match op().await {
        Err(PriceSourceError::AuthExpired) => {
            refresh().await;
            op().await
        }
        other => other,
    }
}

#[async_trait]
impl PriceSource for AmadeusSource {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn search_offers(&self, query: &OfferQuery) -> Result<Vec<FareOffer>, PriceSourceError> {
        let url = format!("{}/v2/shopping/flight-offers", self.base_url);
        let depart_date = query.depart_date.format("%Y-%m-%d").to_string();
        let adults = query.adults.max(1).to_string();
        let max = query.limit.min(20).to_string();

        let body = self
            .execute(|client, token| {
                client
                    .get(&url)
                    .bearer_auth(token)
                    .query(&[
                        ("originLocationCode", query.origin.as_str()),
                        ("destinationLocationCode", query.destination.as_str()),
                        ("departureDate", depart_date.as_str()),
                        ("adults", adults.as_str()),
                        ("travelClass", query.cabin.as_str()),
                        ("currencyCode", query.currency.as_str()),
                        ("max", max.as_str()),
                    ])
            })
            .await?;

        let offers = body["data"]
            .as_array()
            .map(|data| {
                data.iter()
                    .filter_map(|raw| offer_from_json(raw, &query.currency))
                    .collect()
            })
            .unwrap_or_default();

        Ok(offers)
    }

    async fn confirm_price(&self, offer: &FareOffer) -> Result<FareOffer, PriceSourceError> {
        let url = format!("{}/v1/shopping/flight-offers/pricing", self.base_url);
        // The provider requires the offer exactly as returned by search.
        let payload = json!({
            "data": {
                "type": "flight-offers-pricing",
                "flightOffers": [offer.raw],
            }
        });

        let body = self
            .execute(|client, token| client.post(&url).bearer_auth(token).json(&payload))
            .await?;

        let confirmed = &body["data"]["flightOffers"][0];
        offer_from_json(confirmed, &offer.currency)
            .ok_or_else(|| PriceSourceError::Parse("malformed pricing response".to_string()))
    }
}

/// Map one raw provider offer into the typed shape. None when the advertised
/// price is missing or unparseable.
fn offer_from_json(raw: &Value, fallback_currency: &str) -> Option<FareOffer> {
    let price = &raw["price"];
    let price_cents = parse_minor_units(price["total"].as_str()?)?;
    let currency = price["currency"]
        .as_str()
        .unwrap_or(fallback_currency)
        .to_string();

    let itinerary = raw["itineraries"].get(0);
    let duration = itinerary
        .and_then(|it| it["duration"].as_str())
        .map(str::to_string);
    let segments = itinerary
        .and_then(|it| it["segments"].as_array())
        .map(|segs| segs.len() as i64)
        .unwrap_or(0);
    let carrier = itinerary
        .and_then(|it| it["segments"][0]["carrierCode"].as_str())
        .map(str::to_string);

    Some(FareOffer {
        price_cents,
        currency,
        carrier,
        segments,
        duration,
        raw: raw.clone(),
    })
}

fn error_summary(body: &str) -> String {
    let parsed: Result<Value, _> = serde_json::from_str(body);
    match parsed {
        Ok(value) => value["errors"][0]["detail"]
            .as_str()
            .or_else(|| value["error_description"].as_str())
            .map(str::to_string)
            .unwrap_or_else(|| truncate(body, 300)),
        Err(_) => truncate(body, 300),
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.len() <= max {
        text.to_string()
    } else {
        text.chars().take(max).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_offer() -> Value {
        json!({
            "type": "flight-offer",
            "price": { "total": "412.30", "currency": "USD" },
            "itineraries": [{
                "duration": "PT6H15M",
                "segments": [
                    { "carrierCode": "UA" },
                    { "carrierCode": "UA" }
                ]
            }]
        })
    }

    #[test]
    fn maps_offer_fields() {
        let offer = offer_from_json(&sample_offer(), "USD").unwrap();
        assert_eq!(offer.price_cents, 41230);
        assert_eq!(offer.currency, "USD");
        assert_eq!(offer.carrier.as_deref(), Some("UA"));
        assert_eq!(offer.segments, 2);
        assert_eq!(offer.duration.as_deref(), Some("PT6H15M"));
        // The raw payload must survive untouched for confirm-price echo.
        assert_eq!(offer.raw, sample_offer());
    }

    #[test]
    fn missing_price_is_skipped() {
        let raw = json!({ "itineraries": [] });
        assert!(offer_from_json(&raw, "USD").is_none());
    }

    #[test]
    fn currency_falls_back_to_query() {
        let raw = json!({ "price": { "total": "99.00" } });
        let offer = offer_from_json(&raw, "EUR").unwrap();
        assert_eq!(offer.currency, "EUR");
        assert_eq!(offer.segments, 0);
    }

    #[test]
    fn error_summary_prefers_provider_detail() {
        let body = r#"{"errors":[{"status":400,"detail":"No fare applicable"}]}"#;
        assert_eq!(error_summary(body), "No fare applicable");
        assert_eq!(error_summary("plain text"), "plain text");
    }

    mod auth_refresh {
        use std::sync::atomic::{AtomicU32, Ordering};

        use super::super::{with_auth_refresh, PriceSourceError};

        #[tokio::test]
        async fn expired_token_is_refreshed_once() {
            let calls = AtomicU32::new(0);
            let refreshes = AtomicU32::new(0);

            let result = with_auth_refresh(
                || {
                    let n = calls.fetch_add(1, Ordering::SeqCst);
                    async move {
                        if n == 0 {
                            Err(PriceSourceError::AuthExpired)
                        } else {
                            Ok(7)
                        }
                    }
                },
                || async {
                    refreshes.fetch_add(1, Ordering::SeqCst);
                },
            )
            .await;

            assert_eq!(result.unwrap(), 7);
            assert_eq!(calls.load(Ordering::SeqCst), 2);
            assert_eq!(refreshes.load(Ordering::SeqCst), 1);
        }

        #[tokio::test]
        async fn second_expiry_surfaces_without_another_refresh() {
            let calls = AtomicU32::new(0);
            let refreshes = AtomicU32::new(0);

            let result: Result<u32, _> = with_auth_refresh(
                || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Err(PriceSourceError::AuthExpired) }
                },
                || async {
                    refreshes.fetch_add(1, Ordering::SeqCst);
                },
            )
            .await;

            assert!(matches!(result, Err(PriceSourceError::AuthExpired)));
            assert_eq!(calls.load(Ordering::SeqCst), 2);
            assert_eq!(refreshes.load(Ordering::SeqCst), 1);
        }

        #[tokio::test]
        async fn healthy_calls_never_refresh() {
            let refreshes = AtomicU32::new(0);

            let result = with_auth_refresh(
                || async { Ok(42) },
                || async {
                    refreshes.fetch_add(1, Ordering::SeqCst);
                },
            )
            .await;

            assert_eq!(result.unwrap(), 42);
            assert_eq!(refreshes.load(Ordering::SeqCst), 0);
        }

        #[tokio::test]
        async fn non_auth_errors_skip_the_refresh() {
            let calls = AtomicU32::new(0);
            let refreshes = AtomicU32::new(0);

            let result: Result<u32, _> = with_auth_refresh(
                || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Err(PriceSourceError::RateLimited) }
                },
                || async {
                    refreshes.fetch_add(1, Ordering::SeqCst);
                },
            )
            .await;

            assert!(matches!(result, Err(PriceSourceError::RateLimited)));
            assert_eq!(calls.load(Ordering::SeqCst), 1);
            assert_eq!(refreshes.load(Ordering::SeqCst), 0);
        }
    }
}

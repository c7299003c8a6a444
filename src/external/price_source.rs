use async_trait::async_trait;
use thiserror::Error;

use crate::models::{FareOffer, OfferQuery};

#[derive(Debug, Error)]
pub enum PriceSourceError {
    #[error("network error: {0}")]
    Network(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("rate limited")]
    RateLimited,

    #[error("provider error {status}: {message}")]
    Server { status: u16, message: String },

    /// Offer rejected by the provider (4xx). Never retried; for confirmation
    /// the caller moves on to the next cheapest candidate.
    #[error("offer rejected ({status}): {message}")]
    Unconfirmable { status: u16, message: String },

    #[error("authentication expired")]
    AuthExpired,

    #[error("missing credentials: {0}")]
    Credentials(String),
}

impl PriceSourceError {
    /// Transient conditions worth a bounded retry with backoff.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            PriceSourceError::Network(_)
                | PriceSourceError::RateLimited
                | PriceSourceError::Server { .. }
        )
    }
}

/// Capability the orchestrator depends on. Advertised prices are not
/// guaranteed; `confirm_price` re-prices a specific offer before it is
/// trusted, echoing the exact structure returned by search.
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Stable provider identifier recorded on every snapshot.
    fn name(&self) -> &str;

    async fn search_offers(&self, query: &OfferQuery) -> Result<Vec<FareOffer>, PriceSourceError>;

    async fn confirm_price(&self, offer: &FareOffer) -> Result<FareOffer, PriceSourceError>;
}

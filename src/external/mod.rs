pub mod amadeus;
pub mod price_source;
pub mod retry;

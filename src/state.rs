use std::sync::Arc;

use sqlx::SqlitePool;

use crate::config::Settings;
use crate::external::price_source::PriceSource;
use crate::services::notifier::Notifier;

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub price_source: Arc<dyn PriceSource>,
    pub notifier: Arc<dyn Notifier>,
    pub settings: Settings,
}

mod offer;
mod snapshot;
mod subscription;
mod watch;

pub use offer::{parse_minor_units, FareOffer, OfferQuery};
pub use snapshot::{FareSnapshot, HistoryPoint, WatchStats, WindowPoint};
pub use subscription::{SubscribeRequest, Subscription};
pub use watch::{CreateWatchRequest, Watch, WatchWithStats, VALID_CABINS};
pub(crate) use watch::is_iata_code;

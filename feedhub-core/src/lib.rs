pub mod config;
pub mod error;
pub mod feed;
pub mod fetch;
mod jsonfeed;
pub mod refresh;
pub mod snapshot;
pub mod store;

pub use config::Config;
pub use error::{ConfigError, FetchError, RefreshError, StoreError};
pub use feed::{Enclosure, FeedDocument, FeedImage, FeedItem, FeedType};
pub use fetch::{parse_feed, FeedFetcher, HttpFetcher};
pub use refresh::{refresh_once, spawn_refresher, CycleReport, RefresherHandle};
pub use snapshot::read_snapshot;
pub use store::CacheStore;

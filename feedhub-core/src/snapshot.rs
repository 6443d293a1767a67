use tracing::warn;

use crate::feed::FeedDocument;
use crate::store::CacheStore;

/// Decoded cached feeds in source order.
///
/// Sources without a usable cache entry are logged and left out, so the
/// result may be shorter than `sources`.
pub async fn read_snapshot(store: &CacheStore, sources: &[String]) -> Vec<FeedDocument> {
    let mut feeds = Vec::with_capacity(sources.len());
    for source in sources {
        let raw = match store.get(source).await {
            Ok(raw) => raw,
            Err(err) => {
                warn!(source = %source, error = %err, "no cached feed");
                continue;
            }
        };
        match serde_json::from_str::<FeedDocument>(&raw) {
            Ok(feed) => feeds.push(feed),
            Err(err) => warn!(source = %source, error = %err, "failed to decode cached feed"),
        }
    }
    feeds
}

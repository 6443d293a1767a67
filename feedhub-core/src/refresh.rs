use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::RefreshError;
use crate::fetch::FeedFetcher;
use crate::store::CacheStore;

/// Outcome of one refresh cycle, in source order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub stored: Vec<String>,
    pub failed: Vec<String>,
}

pub struct RefresherHandle {
    cancel_tx: broadcast::Sender<()>,
    join: JoinHandle<()>,
}

impl RefresherHandle {
    /// Stops the loop at its next suspension point and waits for it.
    ///
    /// Dropping the handle instead detaches the loop, which then runs for
    /// the rest of the process.
    pub async fn stop(self) -> Result<(), RefreshError> {
        let _ = self.cancel_tx.send(());
        self.join.await.map_err(RefreshError::from)
    }
}

/// Fetches every source once and stores each success.
///
/// A failing source is logged and skipped; its previous cache entry is left
/// untouched.
pub async fn refresh_once(
    sources: &[String],
    fetcher: &dyn FeedFetcher,
    store: &CacheStore,
) -> CycleReport {
    let mut report = CycleReport::default();
    for source in sources {
        let feed = match fetcher.fetch(source).await {
            Ok(feed) => feed,
            Err(err) => {
                warn!(source = %source, error = %err, "failed to fetch feed");
                report.failed.push(source.clone());
                continue;
            }
        };
        let json = match serde_json::to_string(&feed) {
            Ok(json) => json,
            Err(err) => {
                warn!(source = %source, error = %err, "failed to serialize feed");
                report.failed.push(source.clone());
                continue;
            }
        };
        match store.put(source, json).await {
            Ok(()) => {
                debug!(source = %source, items = feed.items.len(), "feed cached");
                report.stored.push(source.clone());
            }
            Err(err) => {
                warn!(source = %source, error = %err, "failed to save feed to cache");
                report.failed.push(source.clone());
            }
        }
    }
    report
}

/// Runs `refresh_once` forever, sleeping `interval` after each completed cycle.
pub fn spawn_refresher(
    sources: Arc<[String]>,
    interval: Duration,
    fetcher: Arc<dyn FeedFetcher>,
    store: CacheStore,
) -> RefresherHandle {
    let (cancel_tx, mut cancel_rx) = broadcast::channel(1);
    // keeps the channel open once the handle is dropped
    let keepalive = cancel_tx.clone();
    let join = tokio::spawn(async move {
        let _keepalive = keepalive;
        loop {
            tokio::select! {
                _ = cancel_rx.recv() => {
                    info!("refresh loop shutdown requested");
                    break;
                }
                report = refresh_once(&sources, fetcher.as_ref(), &store) => {
                    info!(
                        stored = report.stored.len(),
                        failed = report.failed.len(),
                        "refresh cycle complete"
                    );
                }
            }
            tokio::select! {
                _ = cancel_rx.recv() => {
                    info!("refresh loop shutdown requested");
                    break;
                }
                _ = tokio::time::sleep(interval) => {}
            }
        }
    });

    RefresherHandle { cancel_tx, join }
}

//! Per-connection push session
//!
//! A session streams the raw cached value of every source, one text frame
//! each, once per pass. With pushing enabled it repeats the pass every push
//! interval and runs a heartbeat task next to it. All frames go through one
//! mutex-guarded sink, so heartbeat and data frames never interleave.
//!
//! The push loop, the heartbeat task and the inbound reader share a
//! cancellation token: whichever of them sees the connection die ends the
//! other two, and the session only returns once all of them are done.

use std::error::Error as StdError;
use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::Message;
use feedhub_core::{CacheStore, Config};
use futures::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::Mutex;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::SessionError;

/// Heartbeat interval while pushing is enabled
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(10);

/// Text payload of a heartbeat frame
pub const HEARTBEAT_PAYLOAD: &str = "heartbeat";

#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub sources: Arc<[String]>,
    /// `None` sends a single pass and ends the session.
    pub push_interval: Option<Duration>,
    pub heartbeat_interval: Duration,
}

impl SessionSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            sources: config.values.clone().into(),
            push_interval: config.push_interval(),
            heartbeat_interval: HEARTBEAT_INTERVAL,
        }
    }
}

/// Why a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// Single pass finished with pushing disabled
    Completed,
    /// A data frame could not be written
    WriteFailed,
    /// The heartbeat failed or the client went away
    Cancelled,
}

/// Shared write half of a connection
struct SessionWriter<S> {
    sink: Arc<Mutex<S>>,
}

impl<S> Clone for SessionWriter<S> {
    fn clone(&self) -> Self {
        Self {
            sink: Arc::clone(&self.sink),
        }
    }
}

impl<S> SessionWriter<S>
where
    S: Sink<Message> + Unpin + Send,
    S::Error: StdError + Send + Sync + 'static,
{
    fn new(sink: S) -> Self {
        Self {
            sink: Arc::new(Mutex::new(sink)),
        }
    }

    async fn send_text(&self, text: String) -> Result<(), SessionError> {
        let mut sink = self.sink.lock().await;
        sink.send(Message::Text(text.into()))
            .await
            .map_err(|e| SessionError::Write(Box::new(e)))
    }

    async fn close(&self) {
        let mut sink = self.sink.lock().await;
        if let Err(e) = sink.close().await {
            debug!(error = %e, "closing connection failed");
        }
    }
}

/// Drives one connection until it ends.
pub async fn run_session<S, R, E>(
    sink: S,
    incoming: R,
    store: CacheStore,
    settings: SessionSettings,
) -> SessionEnd
where
    S: Sink<Message> + Unpin + Send + 'static,
    S::Error: StdError + Send + Sync + 'static,
    R: Stream<Item = Result<Message, E>> + Unpin + Send + 'static,
    E: Display + Send + 'static,
{
    info!(
        sources = settings.sources.len(),
        push = settings.push_interval.is_some(),
        "session started"
    );

    let writer = SessionWriter::new(sink);
    let cancel = CancellationToken::new();

    let reader = tokio::spawn(drain_incoming(incoming, cancel.clone()));
    let heartbeat = settings.push_interval.map(|_| {
        tokio::spawn(heartbeat_loop(
            writer.clone(),
            settings.heartbeat_interval,
            cancel.clone(),
        ))
    });

    let end = push_loop(&writer, &store, &settings, &cancel).await;
    cancel.cancel();

    if let Some(heartbeat) = heartbeat {
        if let Err(e) = heartbeat.await {
            warn!(error = %e, "heartbeat task failed");
        }
    }
    if let Err(e) = reader.await {
        warn!(error = %e, "reader task failed");
    }
    writer.close().await;

    info!(end = ?end, "session closed");
    end
}

async fn push_loop<S>(
    writer: &SessionWriter<S>,
    store: &CacheStore,
    settings: &SessionSettings,
    cancel: &CancellationToken,
) -> SessionEnd
where
    S: Sink<Message> + Unpin + Send,
    S::Error: StdError + Send + Sync + 'static,
{
    loop {
        for source in settings.sources.iter() {
            if cancel.is_cancelled() {
                return SessionEnd::Cancelled;
            }
            let raw = match store.get(source).await {
                Ok(raw) => raw,
                Err(err) => {
                    warn!(source = %source, error = %err, "no cached feed to push");
                    continue;
                }
            };
            if let Err(err) = writer.send_text(raw).await {
                warn!(source = %source, error = %err, "push failed, closing session");
                return SessionEnd::WriteFailed;
            }
        }

        let Some(interval) = settings.push_interval else {
            return SessionEnd::Completed;
        };
        tokio::select! {
            _ = cancel.cancelled() => return SessionEnd::Cancelled,
            _ = time::sleep(interval) => {}
        }
    }
}

async fn heartbeat_loop<S>(writer: SessionWriter<S>, period: Duration, cancel: CancellationToken)
where
    S: Sink<Message> + Unpin + Send,
    S::Error: StdError + Send + Sync + 'static,
{
    let mut ticker = time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                if let Err(err) = writer.send_text(HEARTBEAT_PAYLOAD.to_owned()).await {
                    warn!(error = %err, "heartbeat failed, closing session");
                    cancel.cancel();
                    break;
                }
            }
        }
    }
}

/// Consumes client frames so a close from the client ends the session.
async fn drain_incoming<R, E>(mut incoming: R, cancel: CancellationToken)
where
    R: Stream<Item = Result<Message, E>> + Unpin,
    E: Display,
{
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            msg = incoming.next() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => {
                        debug!("client closed the connection");
                        cancel.cancel();
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        debug!(error = %e, "connection read failed");
                        cancel.cancel();
                        break;
                    }
                }
            }
        }
    }
}

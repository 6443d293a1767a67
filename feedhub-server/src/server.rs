//! HTTP server
//!
//! `/feeds` answers with the current snapshot, `/ws` upgrades to a push
//! session, `/static/*` serves assets and every other path gets the index page.

use std::future::Future;
use std::sync::Arc;

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::State;
use axum::response::Response;
use axum::routing::get;
use axum::{Json, Router};
use feedhub_core::{read_snapshot, CacheStore, Config, FeedDocument};
use futures::StreamExt;
use tokio::net::TcpListener;
use tower_http::services::{ServeDir, ServeFile};
use tracing::{info, warn};

use crate::error::ServerError;
use crate::session::{run_session, SessionSettings};

/// Handles shared by every request
#[derive(Clone)]
pub struct AppState {
    pub store: CacheStore,
    pub config: Arc<Config>,
}

async fn feeds_handler(State(state): State<AppState>) -> Json<Vec<FeedDocument>> {
    Json(read_snapshot(&state.store, &state.config.values).await)
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_failed_upgrade(|e| warn!(error = %e, "WebSocket upgrade failed"))
        .on_upgrade(move |socket| async move {
            info!("WebSocket upgrade accepted");
            let (sink, stream) = socket.split();
            let settings = SessionSettings::from_config(&state.config);
            run_session(sink, stream, state.store, settings).await;
        })
}

/// Build the axum application router
///
/// Separated from `run_server` to enable testing without TCP binding.
pub fn build_app(state: AppState) -> Router {
    let assets = ServeDir::new(&state.config.static_dir);
    let index = ServeFile::new(&state.config.index_file);
    Router::new()
        .route("/feeds", get(feeds_handler))
        .route("/ws", get(ws_handler))
        .nest_service("/static", assets)
        .fallback_service(index)
        .with_state(state)
}

/// Serves until `shutdown` resolves.
pub async fn run_server(
    state: AppState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), ServerError> {
    let addr = state.config.listen;
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })?;
    info!(%addr, "feedhub listening");

    axum::serve(listener, build_app(state))
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(ServerError::Serve)
}

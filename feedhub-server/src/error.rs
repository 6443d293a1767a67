use std::error::Error as StdError;

use feedhub_core::{ConfigError, FetchError, StoreError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("websocket write failed: {0}")]
    Write(#[source] Box<dyn StdError + Send + Sync>),
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("cannot open cache store: {0}")]
    Store(#[from] StoreError),
    #[error("cannot build HTTP client: {0}")]
    Client(#[from] FetchError),
    #[error("cannot bind {addr}: {source}")]
    Bind {
        addr: std::net::SocketAddr,
        #[source]
        source: std::io::Error,
    },
    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("unexpected HTTP status {0}")]
    Status(reqwest::StatusCode),
    #[error("feed parsing error: rss: {rss}; atom: {atom}; json: {json}")]
    Parse {
        rss: rss::Error,
        atom: atom_syndication::Error,
        json: serde_json::Error,
    },
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no cached value for {0}")]
    NotFound(String),
    #[error("store write failed: {0}")]
    Fault(#[from] std::io::Error),
    #[error("store is closed")]
    Closed,
    #[error("store encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot parse config file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Error)]
pub enum RefreshError {
    #[error("refresh task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("failed to open repository at {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: rusqlite::Error,
    },
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("stored timestamp for {signature} is not RFC 3339: {value:?}")]
    InvalidTimestamp { signature: String, value: String },
    #[error("repository lock poisoned")]
    Poisoned,
}

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("{url} returned {status}")]
    Status {
        status: reqwest::StatusCode,
        url: String,
    },
    #[error("invalid upstream url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("upstream url {0} cannot carry path segments")]
    OpaqueUrl(String),
}

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("{url} returned {status}")]
    Status {
        status: reqwest::StatusCode,
        url: String,
    },
}

#[derive(Debug, Error)]
#[error("timestamp {0} ms is outside the representable range")]
pub struct TimestampOutOfRange(pub i64);

/// Failure classes of the scrape pipeline. Only `ConfigInvalid` is fatal, and only at
/// startup; everything else is logged and the loop keeps its cadence.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),
    #[error("failed to list fleets: {0}")]
    UpstreamListFailure(#[source] UpstreamError),
    #[error("failed to list assets for fleet {fleet_id}: {source}")]
    UpstreamAssetListFailure {
        fleet_id: String,
        #[source]
        source: UpstreamError,
    },
    #[error("repository failure for {signature}: {source}")]
    RepositoryFailure {
        signature: String,
        #[source]
        source: RepositoryError,
    },
    #[error("failed to forward metrics downstream: {0}")]
    DownstreamForwardFailure(#[source] SinkError),
}

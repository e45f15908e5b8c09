mod inmem;
mod sqlite;

pub use inmem::InMemoryRepository;
pub use sqlite::{SqliteRepository, SqliteRepositoryConfig};

use crate::error::RepositoryError;
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;

pub const REPOSITORY_INMEM: &str = "inmem";
pub const REPOSITORY_SQLITE: &str = "sqlite";

/// Deduplication unit: one metric of one asset.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AssetMetricKey {
    pub asset_id: String,
    pub metric: String,
}

impl AssetMetricKey {
    pub fn new(asset_id: impl Into<String>, metric: impl Into<String>) -> Self {
        Self {
            asset_id: asset_id.into(),
            metric: metric.into(),
        }
    }

    pub fn signature(&self) -> String {
        format!("{}.{}", self.asset_id, self.metric)
    }
}

impl fmt::Display for AssetMetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.asset_id, self.metric)
    }
}

/// Last-emitted timestamp per (asset, metric). Records are created on first acceptance and
/// overwritten afterwards; nothing is ever deleted.
pub trait TimestampRepository: Send + Sync {
    fn store(&self, key: &AssetMetricKey, ts: DateTime<Utc>) -> Result<(), RepositoryError>;

    /// `Ok(None)` means the key has never been stored.
    fn get(&self, key: &AssetMetricKey) -> Result<Option<DateTime<Utc>>, RepositoryError>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum RepositoryConfig {
    #[default]
    InMemory,
    Sqlite(SqliteRepositoryConfig),
}

impl RepositoryConfig {
    pub fn name(&self) -> &'static str {
        match self {
            RepositoryConfig::InMemory => REPOSITORY_INMEM,
            RepositoryConfig::Sqlite(_) => REPOSITORY_SQLITE,
        }
    }
}

pub fn open_repository(
    config: &RepositoryConfig,
) -> Result<Arc<dyn TimestampRepository>, RepositoryError> {
    let repository: Arc<dyn TimestampRepository> = match config {
        RepositoryConfig::InMemory => Arc::new(InMemoryRepository::new()),
        RepositoryConfig::Sqlite(cfg) => Arc::new(SqliteRepository::open(cfg)?),
    };
    tracing::info!(backend = config.name(), "asset metric repository ready");
    Ok(repository)
}

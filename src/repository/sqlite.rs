use super::{AssetMetricKey, TimestampRepository};
use crate::error::RepositoryError;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqliteRepositoryConfig {
    pub db_path: PathBuf,
}

/// Single-file store with one `asset_metrics` table: signature -> RFC 3339 text.
pub struct SqliteRepository {
    conn: Mutex<Connection>,
}

impl SqliteRepository {
    pub fn open(config: &SqliteRepositoryConfig) -> Result<Self, RepositoryError> {
        let open_error = |source| RepositoryError::Open {
            path: config.db_path.display().to_string(),
            source,
        };
        let conn = Connection::open(&config.db_path).map_err(open_error)?;
        // Other receivers may share the file; sqlite's own locking serialises writers.
        conn.busy_timeout(BUSY_TIMEOUT).map_err(open_error)?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS asset_metrics (
                signature TEXT PRIMARY KEY NOT NULL,
                value TEXT NOT NULL
            );
            "#,
        )
        .map_err(open_error)?;
        tracing::debug!(path = %config.db_path.display(), "opened sqlite asset metric repository");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl TimestampRepository for SqliteRepository {
    fn store(&self, key: &AssetMetricKey, ts: DateTime<Utc>) -> Result<(), RepositoryError> {
        let conn = self.conn.lock().map_err(|_| RepositoryError::Poisoned)?;
        conn.execute(
            "INSERT OR REPLACE INTO asset_metrics (signature, value) VALUES (?1, ?2)",
            params![key.signature(), ts.to_rfc3339_opts(SecondsFormat::Millis, true)],
        )?;
        Ok(())
    }

    fn get(&self, key: &AssetMetricKey) -> Result<Option<DateTime<Utc>>, RepositoryError> {
        let signature = key.signature();
        let stored: Option<String> = {
            let conn = self.conn.lock().map_err(|_| RepositoryError::Poisoned)?;
            conn.query_row(
                "SELECT value FROM asset_metrics WHERE signature = ?1",
                params![signature],
                |row| row.get(0),
            )
            .optional()?
        };

        let Some(value) = stored.filter(|value| !value.is_empty()) else {
            return Ok(None);
        };
        DateTime::parse_from_rfc3339(&value)
            .map(|ts| Some(ts.with_timezone(&Utc)))
            .map_err(|_| RepositoryError::InvalidTimestamp { signature, value })
    }
}
